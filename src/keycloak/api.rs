use async_trait::async_trait;

use super::types::{AuthenticationFlow, Execution, ExecutionInfo, NewSubFlowExecution, RequirementUpdate};
use crate::error::ApiError;

/// The authentication admin calls a sub-flow is built from.
///
/// Implemented by [`super::KeycloakClient`] over HTTP. Every call is scoped to
/// a realm; calls whose REST path lives under a flow also take the parent
/// flow alias.
#[async_trait]
pub trait AuthenticationApi: Send + Sync {
    /// Create a flow as a child execution of `parent_flow_alias`.
    /// Returns the id of the new flow.
    async fn create_subflow_execution(
        &self,
        realm_id: &str,
        parent_flow_alias: &str,
        body: &NewSubFlowExecution,
    ) -> Result<String, ApiError>;

    async fn get_flow(&self, realm_id: &str, id: &str) -> Result<AuthenticationFlow, ApiError>;

    async fn put_flow(&self, realm_id: &str, flow: &AuthenticationFlow) -> Result<(), ApiError>;

    /// Executions of a flow in the order the server reports them.
    async fn list_executions(
        &self,
        realm_id: &str,
        parent_flow_alias: &str,
    ) -> Result<Vec<ExecutionInfo>, ApiError>;

    async fn get_execution(&self, realm_id: &str, id: &str) -> Result<Execution, ApiError>;

    async fn update_execution_requirement(
        &self,
        realm_id: &str,
        parent_flow_alias: &str,
        update: &RequirementUpdate,
    ) -> Result<(), ApiError>;

    async fn delete_execution(&self, realm_id: &str, id: &str) -> Result<(), ApiError>;

    async fn raise_execution_priority(&self, realm_id: &str, id: &str) -> Result<(), ApiError>;

    async fn lower_execution_priority(&self, realm_id: &str, id: &str) -> Result<(), ApiError>;
}
