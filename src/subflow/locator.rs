use crate::error::ApiError;
use crate::keycloak::{AuthenticationApi, ExecutionInfo};

/// Finds the execution that embeds a sub-flow in its parent flow.
///
/// Keycloak has no lookup from flow id to execution, so every call lists the
/// parent's executions and scans them. Nothing is cached between calls.
pub struct ExecutionLocator<'a, A: ?Sized> {
    api: &'a A,
}

impl<'a, A: AuthenticationApi + ?Sized> ExecutionLocator<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Id of the execution whose `flowId` is `subflow_id`.
    ///
    /// `ApiError::NotFound` when no execution references the sub-flow; list
    /// failures are returned unchanged.
    pub async fn locate(
        &self,
        realm_id: &str,
        parent_flow_alias: &str,
        subflow_id: &str,
    ) -> Result<String, ApiError> {
        let executions = self.api.list_executions(realm_id, parent_flow_alias).await?;

        match find_execution_id(&executions, subflow_id) {
            Some(execution_id) => {
                tracing::debug!(
                    realm = realm_id,
                    parent = parent_flow_alias,
                    subflow_id,
                    execution_id,
                    siblings = executions.len(),
                    "Located sub-flow execution"
                );
                Ok(execution_id.to_string())
            }
            None => Err(ApiError::not_found(format!(
                "execution for sub-flow {subflow_id} in flow {parent_flow_alias}"
            ))),
        }
    }
}

/// First execution referencing `subflow_id`. An empty id matches nothing.
pub fn find_execution_id<'e>(executions: &'e [ExecutionInfo], subflow_id: &str) -> Option<&'e str> {
    if subflow_id.is_empty() {
        return None;
    }
    executions
        .iter()
        .find(|execution| execution.flow_id.as_deref() == Some(subflow_id))
        .map(|execution| execution.id.as_str())
}
