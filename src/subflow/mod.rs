//! The sub-flow entity and the protocol that keeps its flow and its
//! execution consistent.

pub mod locator;
pub mod manager;
pub mod requirement;
pub mod types;

pub use crate::keycloak::Requirement;
pub use locator::{ExecutionLocator, find_execution_id};
pub use manager::SubFlowManager;
pub use requirement::RequirementSync;
pub use types::{SubFlow, SubFlowKey};
