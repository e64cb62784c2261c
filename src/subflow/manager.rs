//! Create, read, update, delete and reorder sub-flows as one entity.
//!
//! Each operation is a fixed sequence of remote calls; later calls need ids
//! produced by earlier ones, so nothing runs in parallel and nothing is
//! retried. Keycloak offers no transaction across the flow and its execution:
//! when a later step fails the earlier ones stay applied and the error names
//! the step that failed.
//!
//! | operation | calls, in order |
//! |-----------|-----------------|
//! | create    | create flow execution, then everything `update` does |
//! | read      | get flow, locate execution, get execution |
//! | update    | put flow, locate execution, sync requirement/priority |
//! | delete    | locate execution, delete execution (Keycloak removes the flow) |
//! | raise/lower | locate execution, raise/lower execution priority |
//!
//! Callers must serialize operations on the same sub-flow themselves.

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::locator::ExecutionLocator;
use super::requirement::RequirementSync;
use super::types::SubFlow;
use crate::error::{ApiError, Step, SubFlowError};
use crate::keycloak::AuthenticationApi;

/// Coordinates the flow half and the execution half of sub-flows.
pub struct SubFlowManager<A: ?Sized> {
    api: Arc<A>,
    cancel: CancellationToken,
}

impl<A: AuthenticationApi + ?Sized> SubFlowManager<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop issuing remote calls once `token` is cancelled.
    ///
    /// An in-flight call is abandoned; an operation interrupted between calls
    /// leaves the remote state as far as it got.
    ///
    /// A create abandoned in flight may still have succeeded on the server,
    /// leaving a flow and execution whose id the error cannot carry
    /// (`subflow_id` is `None`). Look such a sub-flow up by alias before
    /// creating it again.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    fn locator(&self) -> ExecutionLocator<'_, A> {
        ExecutionLocator::new(&*self.api)
    }

    fn requirements(&self) -> RequirementSync<'_, A> {
        RequirementSync::new(&*self.api)
    }

    /// Run one remote call, tagging failure with `step` and the sub-flow id.
    async fn step<T, F>(&self, step: Step, subflow_id: Option<&str>, call: F) -> Result<T, SubFlowError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        let cancelled = || SubFlowError::Cancelled {
            step,
            subflow_id: subflow_id.map(str::to_string),
        };

        if self.cancel.is_cancelled() {
            return Err(cancelled());
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(cancelled()),
            result = call => result.map_err(|source| {
                tracing::warn!(%step, subflow_id, error = %source, "Sub-flow step failed");
                SubFlowError::Failed {
                    step,
                    subflow_id: subflow_id.map(str::to_string),
                    source,
                }
            }),
        }
    }

    /// Create the flow and its execution, then push the fields the create
    /// call cannot carry (requirement, priority, description).
    ///
    /// On success `subflow.id` holds the new id. If the follow-up update
    /// fails the pair already exists: the error carries the id and the caller
    /// should retry [`Self::update`], not create again.
    pub async fn create(&self, subflow: &mut SubFlow) -> Result<(), SubFlowError> {
        if !subflow.id.is_empty() {
            return Err(SubFlowError::Invalid(format!(
                "sub-flow already has id {}; update it instead",
                subflow.id
            )));
        }
        require(&subflow.realm_id, "realm id")?;
        require(&subflow.parent_flow_alias, "parent flow alias")?;
        require(&subflow.alias, "alias")?;
        require(&subflow.provider_id, "provider id")?;

        subflow.top_level = false;
        subflow.built_in = false;

        let body = subflow.to_create_body();
        let id = self
            .step(
                Step::CreateFlow,
                None,
                self.api
                    .create_subflow_execution(&subflow.realm_id, &subflow.parent_flow_alias, &body),
            )
            .await?;
        tracing::debug!(
            realm = %subflow.realm_id,
            parent = %subflow.parent_flow_alias,
            subflow_id = %id,
            "Created sub-flow execution"
        );
        subflow.id = id;

        self.update(subflow).await?;

        tracing::info!(
            realm = %subflow.realm_id,
            parent = %subflow.parent_flow_alias,
            subflow_id = %subflow.id,
            alias = %subflow.alias,
            "Sub-flow created"
        );
        Ok(())
    }

    /// Fetch the flow and copy authenticator, requirement and priority from
    /// its execution.
    pub async fn read(
        &self,
        realm_id: &str,
        parent_flow_alias: &str,
        id: &str,
    ) -> Result<SubFlow, SubFlowError> {
        require_address(realm_id, parent_flow_alias, id)?;
        let subflow_id = Some(id);

        let flow = self
            .step(Step::GetFlow, subflow_id, self.api.get_flow(realm_id, id))
            .await?;
        let execution_id = self
            .step(
                Step::LocateExecution,
                subflow_id,
                self.locator().locate(realm_id, parent_flow_alias, id),
            )
            .await?;
        let execution = self
            .step(
                Step::GetExecution,
                subflow_id,
                self.api.get_execution(realm_id, &execution_id),
            )
            .await?;

        Ok(SubFlow::from_parts(realm_id, parent_flow_alias, flow, &execution))
    }

    /// Write the flow half, then requirement and priority on the execution.
    ///
    /// A failed sync leaves the flow half updated; nothing is rolled back.
    pub async fn update(&self, subflow: &mut SubFlow) -> Result<(), SubFlowError> {
        require_address(&subflow.realm_id, &subflow.parent_flow_alias, &subflow.id)?;
        require(&subflow.alias, "alias")?;
        require(&subflow.provider_id, "provider id")?;

        subflow.top_level = false;
        subflow.built_in = false;

        let subflow = &*subflow;
        let realm_id = subflow.realm_id.as_str();
        let parent_flow_alias = subflow.parent_flow_alias.as_str();
        let subflow_id = Some(subflow.id.as_str());

        self.step(
            Step::PutFlow,
            subflow_id,
            self.api.put_flow(realm_id, &subflow.to_flow()),
        )
        .await?;

        let execution_id = self
            .step(
                Step::LocateExecution,
                subflow_id,
                self.locator().locate(realm_id, parent_flow_alias, &subflow.id),
            )
            .await?;

        self.step(
            Step::SyncRequirement,
            subflow_id,
            self.requirements().sync_requirement(
                realm_id,
                parent_flow_alias,
                &execution_id,
                subflow.requirement,
                subflow.priority,
            ),
        )
        .await?;

        tracing::debug!(
            realm = realm_id,
            parent = parent_flow_alias,
            subflow_id = %subflow.id,
            execution_id = %execution_id,
            requirement = %subflow.requirement,
            priority = subflow.priority,
            "Sub-flow updated"
        );
        Ok(())
    }

    /// Delete the execution; Keycloak removes the flow it embeds.
    ///
    /// A sub-flow without an execution is inconsistent, so a failed lookup is
    /// reported as `LocateExecution` not-found rather than treated as done.
    pub async fn delete(
        &self,
        realm_id: &str,
        parent_flow_alias: &str,
        id: &str,
    ) -> Result<(), SubFlowError> {
        require_address(realm_id, parent_flow_alias, id)?;

        let execution_id = self
            .step(
                Step::LocateExecution,
                Some(id),
                self.locator().locate(realm_id, parent_flow_alias, id),
            )
            .await?;
        self.step(
            Step::DeleteExecution,
            Some(id),
            self.api.delete_execution(realm_id, &execution_id),
        )
        .await?;

        tracing::info!(
            realm = realm_id,
            parent = parent_flow_alias,
            subflow_id = id,
            execution_id = %execution_id,
            "Sub-flow deleted"
        );
        Ok(())
    }

    /// Swap the sub-flow's execution with the sibling before it.
    pub async fn raise_priority(
        &self,
        realm_id: &str,
        parent_flow_alias: &str,
        id: &str,
    ) -> Result<(), SubFlowError> {
        require_address(realm_id, parent_flow_alias, id)?;

        let execution_id = self
            .step(
                Step::LocateExecution,
                Some(id),
                self.locator().locate(realm_id, parent_flow_alias, id),
            )
            .await?;
        self.step(
            Step::RaisePriority,
            Some(id),
            self.requirements().raise_priority(realm_id, &execution_id),
        )
        .await
    }

    /// Swap the sub-flow's execution with the sibling after it.
    pub async fn lower_priority(
        &self,
        realm_id: &str,
        parent_flow_alias: &str,
        id: &str,
    ) -> Result<(), SubFlowError> {
        require_address(realm_id, parent_flow_alias, id)?;

        let execution_id = self
            .step(
                Step::LocateExecution,
                Some(id),
                self.locator().locate(realm_id, parent_flow_alias, id),
            )
            .await?;
        self.step(
            Step::LowerPriority,
            Some(id),
            self.requirements().lower_priority(realm_id, &execution_id),
        )
        .await
    }
}

fn require(value: &str, what: &str) -> Result<(), SubFlowError> {
    if value.trim().is_empty() {
        return Err(SubFlowError::Invalid(format!("{what} must not be empty")));
    }
    Ok(())
}

fn require_address(realm_id: &str, parent_flow_alias: &str, id: &str) -> Result<(), SubFlowError> {
    require(realm_id, "realm id")?;
    require(parent_flow_alias, "parent flow alias")?;
    require(id, "sub-flow id")
}
