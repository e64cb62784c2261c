use crate::error::ApiError;
use crate::keycloak::{AuthenticationApi, Requirement, RequirementUpdate};

/// Pushes sub-flow level requirement and ordering onto its execution.
///
/// Every method takes the *execution* id resolved by
/// [`super::ExecutionLocator`], never the sub-flow id.
pub struct RequirementSync<'a, A: ?Sized> {
    api: &'a A,
}

impl<'a, A: AuthenticationApi + ?Sized> RequirementSync<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    pub async fn sync_requirement(
        &self,
        realm_id: &str,
        parent_flow_alias: &str,
        execution_id: &str,
        requirement: Requirement,
        priority: i32,
    ) -> Result<(), ApiError> {
        let update = RequirementUpdate {
            id: execution_id.to_string(),
            requirement,
            priority,
        };
        self.api
            .update_execution_requirement(realm_id, parent_flow_alias, &update)
            .await
    }

    /// Swap with the preceding sibling.
    pub async fn raise_priority(&self, realm_id: &str, execution_id: &str) -> Result<(), ApiError> {
        self.api.raise_execution_priority(realm_id, execution_id).await
    }

    /// Swap with the following sibling.
    pub async fn lower_priority(&self, realm_id: &str, execution_id: &str) -> Result<(), ApiError> {
        self.api.lower_execution_priority(realm_id, execution_id).await
    }
}
