//! In-memory stand-in for the Keycloak authentication admin API.
//!
//! Mirrors the server behaviour the sub-flow protocol depends on: creating a
//! sub-flow also creates its execution, deleting that execution removes the
//! flow, and raise/lower swap an execution with its neighbour. Any call can
//! be made to fail with a chosen error.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use kc_subflow::error::ApiError;
use kc_subflow::keycloak::{
    AuthenticationApi, AuthenticationFlow, Execution, ExecutionInfo, NewSubFlowExecution,
    Requirement, RequirementUpdate,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    CreateSubFlowExecution,
    GetFlow,
    PutFlow,
    ListExecutions,
    GetExecution,
    UpdateRequirement,
    DeleteExecution,
    RaisePriority,
    LowerPriority,
}

#[derive(Debug, Clone)]
struct ExecutionRecord {
    id: String,
    flow_id: Option<String>,
    authenticator: Option<String>,
    requirement: Requirement,
    priority: i32,
}

#[derive(Default)]
struct State {
    /// (realm, flow id) -> flow
    flows: HashMap<(String, String), AuthenticationFlow>,
    /// (realm, parent alias) -> executions in list order
    executions: HashMap<(String, String), Vec<ExecutionRecord>>,
    failures: HashMap<Call, ApiError>,
    calls: Vec<Call>,
    requirement_updates: Vec<RequirementUpdate>,
}

impl State {
    fn find_execution_mut(&mut self, realm_id: &str, id: &str) -> Option<(&mut Vec<ExecutionRecord>, usize)> {
        self.executions
            .iter_mut()
            .filter(|((realm, _), _)| realm == realm_id)
            .find_map(|(_, list)| {
                let index = list.iter().position(|e| e.id == id)?;
                Some((list, index))
            })
    }
}

#[derive(Default)]
pub struct FakeKeycloak {
    state: Mutex<State>,
}

impl FakeKeycloak {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a top-level flow that sub-flows can be created in.
    pub fn add_parent_flow(&self, realm_id: &str, alias: &str) {
        let mut state = self.state.lock().unwrap();
        let id = uuid::Uuid::new_v4().to_string();
        state.flows.insert(
            (realm_id.to_string(), id.clone()),
            AuthenticationFlow {
                id,
                alias: alias.to_string(),
                provider_id: "basic-flow".into(),
                top_level: true,
                built_in: false,
                description: None,
            },
        );
        state
            .executions
            .entry((realm_id.to_string(), alias.to_string()))
            .or_default();
    }

    /// Append a plain authenticator execution to a parent flow.
    pub fn add_authenticator_execution(&self, realm_id: &str, parent: &str, authenticator: &str) -> String {
        let mut state = self.state.lock().unwrap();
        let list = state
            .executions
            .entry((realm_id.to_string(), parent.to_string()))
            .or_default();
        let id = uuid::Uuid::new_v4().to_string();
        let priority = next_priority(list);
        list.push(ExecutionRecord {
            id: id.clone(),
            flow_id: None,
            authenticator: Some(authenticator.to_string()),
            requirement: Requirement::Alternative,
            priority,
        });
        id
    }

    /// Insert a sub-flow execution with fixed ids.
    pub fn insert_subflow(&self, realm_id: &str, parent: &str, execution_id: &str, flow_id: &str) {
        let mut state = self.state.lock().unwrap();
        state.flows.insert(
            (realm_id.to_string(), flow_id.to_string()),
            AuthenticationFlow {
                id: flow_id.to_string(),
                alias: format!("flow {flow_id}"),
                provider_id: "basic-flow".into(),
                ..Default::default()
            },
        );
        let list = state
            .executions
            .entry((realm_id.to_string(), parent.to_string()))
            .or_default();
        let priority = next_priority(list);
        list.push(ExecutionRecord {
            id: execution_id.to_string(),
            flow_id: Some(flow_id.to_string()),
            authenticator: None,
            requirement: Requirement::Disabled,
            priority,
        });
    }

    /// A flow no execution points at.
    pub fn insert_orphan_flow(&self, realm_id: &str, flow_id: &str) {
        let mut state = self.state.lock().unwrap();
        state.flows.insert(
            (realm_id.to_string(), flow_id.to_string()),
            AuthenticationFlow {
                id: flow_id.to_string(),
                alias: format!("orphan {flow_id}"),
                provider_id: "basic-flow".into(),
                ..Default::default()
            },
        );
    }

    /// Make every later `call` fail with `error` until cleared.
    pub fn fail(&self, call: Call, error: ApiError) {
        self.state.lock().unwrap().failures.insert(call, error);
    }

    pub fn clear_failures(&self) {
        self.state.lock().unwrap().failures.clear();
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn requirement_updates(&self) -> Vec<RequirementUpdate> {
        self.state.lock().unwrap().requirement_updates.clone()
    }

    pub fn stored_flow(&self, realm_id: &str, id: &str) -> Option<AuthenticationFlow> {
        self.state
            .lock()
            .unwrap()
            .flows
            .get(&(realm_id.to_string(), id.to_string()))
            .cloned()
    }

    /// Ids of the parent's executions in list order.
    pub fn execution_order(&self, realm_id: &str, parent: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .executions
            .get(&(realm_id.to_string(), parent.to_string()))
            .map(|list| list.iter().map(|e| e.id.clone()).collect())
            .unwrap_or_default()
    }

    fn enter(&self, call: Call) -> Result<std::sync::MutexGuard<'_, State>, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if let Some(error) = state.failures.get(&call).cloned() {
            return Err(error);
        }
        Ok(state)
    }
}

fn next_priority(list: &[ExecutionRecord]) -> i32 {
    list.last().map(|e| e.priority + 10).unwrap_or(0)
}

#[async_trait]
impl AuthenticationApi for FakeKeycloak {
    async fn create_subflow_execution(
        &self,
        realm_id: &str,
        parent_flow_alias: &str,
        body: &NewSubFlowExecution,
    ) -> Result<String, ApiError> {
        let mut state = self.enter(Call::CreateSubFlowExecution)?;
        let parent_key = (realm_id.to_string(), parent_flow_alias.to_string());
        if !state.executions.contains_key(&parent_key) {
            return Err(ApiError::not_found(format!("flow {parent_flow_alias}")));
        }
        let alias_taken = state
            .flows
            .iter()
            .any(|((realm, _), flow)| realm == realm_id && flow.alias == body.alias);
        if alias_taken {
            return Err(ApiError::Remote {
                status: 409,
                message: "New flow alias name already exists".into(),
            });
        }

        let flow_id = uuid::Uuid::new_v4().to_string();
        state.flows.insert(
            (realm_id.to_string(), flow_id.clone()),
            AuthenticationFlow {
                id: flow_id.clone(),
                alias: body.alias.clone(),
                provider_id: body.flow_type.clone(),
                top_level: false,
                built_in: false,
                description: Some(body.description.clone()),
            },
        );

        let list = state.executions.get_mut(&parent_key).expect("parent checked above");
        let priority = next_priority(list);
        list.push(ExecutionRecord {
            id: uuid::Uuid::new_v4().to_string(),
            flow_id: Some(flow_id.clone()),
            authenticator: Some(body.provider.clone()).filter(|p| !p.is_empty()),
            requirement: Requirement::Disabled,
            priority,
        });
        Ok(flow_id)
    }

    async fn get_flow(&self, realm_id: &str, id: &str) -> Result<AuthenticationFlow, ApiError> {
        let state = self.enter(Call::GetFlow)?;
        state
            .flows
            .get(&(realm_id.to_string(), id.to_string()))
            .cloned()
            .ok_or_else(|| ApiError::not_found(format!("flow {id}")))
    }

    async fn put_flow(&self, realm_id: &str, flow: &AuthenticationFlow) -> Result<(), ApiError> {
        let mut state = self.enter(Call::PutFlow)?;
        match state.flows.get_mut(&(realm_id.to_string(), flow.id.clone())) {
            Some(stored) => {
                *stored = flow.clone();
                Ok(())
            }
            None => Err(ApiError::not_found(format!("flow {}", flow.id))),
        }
    }

    async fn list_executions(
        &self,
        realm_id: &str,
        parent_flow_alias: &str,
    ) -> Result<Vec<ExecutionInfo>, ApiError> {
        let state = self.enter(Call::ListExecutions)?;
        let list = state
            .executions
            .get(&(realm_id.to_string(), parent_flow_alias.to_string()))
            .ok_or_else(|| ApiError::not_found(format!("flow {parent_flow_alias}")))?;
        Ok(list
            .iter()
            .enumerate()
            .map(|(index, e)| ExecutionInfo {
                id: e.id.clone(),
                flow_id: e.flow_id.clone(),
                requirement: Some(e.requirement.to_string()),
                priority: e.priority,
                display_name: e.authenticator.clone(),
                provider_id: e.authenticator.clone(),
                level: 0,
                index: index as i32,
            })
            .collect())
    }

    async fn get_execution(&self, realm_id: &str, id: &str) -> Result<Execution, ApiError> {
        let mut state = self.enter(Call::GetExecution)?;
        let (list, index) = state
            .find_execution_mut(realm_id, id)
            .ok_or_else(|| ApiError::not_found(format!("execution {id}")))?;
        let e = &list[index];
        Ok(Execution {
            id: e.id.clone(),
            authenticator: e.authenticator.clone(),
            authenticator_flow: e.flow_id.is_some(),
            requirement: e.requirement,
            priority: e.priority,
            parent_flow: None,
            flow_id: e.flow_id.clone(),
        })
    }

    async fn update_execution_requirement(
        &self,
        realm_id: &str,
        parent_flow_alias: &str,
        update: &RequirementUpdate,
    ) -> Result<(), ApiError> {
        let mut state = self.enter(Call::UpdateRequirement)?;
        state.requirement_updates.push(update.clone());
        let list = state
            .executions
            .get_mut(&(realm_id.to_string(), parent_flow_alias.to_string()))
            .ok_or_else(|| ApiError::not_found(format!("flow {parent_flow_alias}")))?;
        let execution = list
            .iter_mut()
            .find(|e| e.id == update.id)
            .ok_or_else(|| ApiError::not_found(format!("execution {}", update.id)))?;
        execution.requirement = update.requirement;
        execution.priority = update.priority;
        list.sort_by_key(|e| e.priority);
        Ok(())
    }

    async fn delete_execution(&self, realm_id: &str, id: &str) -> Result<(), ApiError> {
        let mut state = self.enter(Call::DeleteExecution)?;
        let (list, index) = state
            .find_execution_mut(realm_id, id)
            .ok_or_else(|| ApiError::not_found(format!("execution {id}")))?;
        let removed = list.remove(index);
        if let Some(flow_id) = removed.flow_id {
            state.flows.remove(&(realm_id.to_string(), flow_id));
        }
        Ok(())
    }

    async fn raise_execution_priority(&self, realm_id: &str, id: &str) -> Result<(), ApiError> {
        let mut state = self.enter(Call::RaisePriority)?;
        let (list, index) = state
            .find_execution_mut(realm_id, id)
            .ok_or_else(|| ApiError::not_found(format!("execution {id}")))?;
        if index > 0 {
            swap_neighbours(list, index - 1, index);
        }
        Ok(())
    }

    async fn lower_execution_priority(&self, realm_id: &str, id: &str) -> Result<(), ApiError> {
        let mut state = self.enter(Call::LowerPriority)?;
        let (list, index) = state
            .find_execution_mut(realm_id, id)
            .ok_or_else(|| ApiError::not_found(format!("execution {id}")))?;
        if index + 1 < list.len() {
            swap_neighbours(list, index, index + 1);
        }
        Ok(())
    }
}

/// Swap positions and priorities so the list stays sorted by priority.
fn swap_neighbours(list: &mut [ExecutionRecord], a: usize, b: usize) {
    let priority_a = list[a].priority;
    list[a].priority = list[b].priority;
    list[b].priority = priority_a;
    list.swap(a, b);
}
