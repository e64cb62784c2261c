//! Keycloak admin API: wire types, the [`AuthenticationApi`] seam the
//! sub-flow manager talks through, and its HTTP implementation.

pub mod api;
pub mod client;
pub mod types;

pub use api::AuthenticationApi;
pub use client::KeycloakClient;
pub use types::*;
