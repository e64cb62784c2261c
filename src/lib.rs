pub mod cli;
pub mod config;
pub mod error;
pub mod keycloak;
pub mod logging;
pub mod subflow;
