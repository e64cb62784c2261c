use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::SubFlowError;
use crate::keycloak::{AuthenticationFlow, Execution, NewSubFlowExecution, Requirement};

/// An authentication flow embedded as one execution of a parent flow.
///
/// Keycloak stores it as two resources: the flow itself (`id`, `alias`,
/// `provider_id`, `top_level`, `built_in`, `description`) and the execution
/// in the parent flow that points at it (`authenticator`, `priority`,
/// `requirement`). `realm_id` and `parent_flow_alias` only address the pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubFlow {
    /// Assigned by Keycloak on creation; empty before.
    pub id: String,
    pub alias: String,
    pub realm_id: String,
    pub parent_flow_alias: String,
    /// "basic-flow", "client-flow" or "form-flow".
    pub provider_id: String,
    /// Always false for sub-flows.
    pub top_level: bool,
    /// Always false when written through the manager.
    pub built_in: bool,
    pub description: String,
    pub authenticator: String,
    pub priority: i32,
    pub requirement: Requirement,
}

impl SubFlow {
    pub fn new(
        realm_id: impl Into<String>,
        parent_flow_alias: impl Into<String>,
        alias: impl Into<String>,
        provider_id: impl Into<String>,
    ) -> Self {
        Self {
            realm_id: realm_id.into(),
            parent_flow_alias: parent_flow_alias.into(),
            alias: alias.into(),
            provider_id: provider_id.into(),
            ..Default::default()
        }
    }

    /// Join a fetched flow and its execution into one sub-flow.
    pub fn from_parts(
        realm_id: &str,
        parent_flow_alias: &str,
        flow: AuthenticationFlow,
        execution: &Execution,
    ) -> Self {
        Self {
            id: flow.id,
            alias: flow.alias,
            realm_id: realm_id.to_string(),
            parent_flow_alias: parent_flow_alias.to_string(),
            provider_id: flow.provider_id,
            top_level: flow.top_level,
            built_in: flow.built_in,
            description: flow.description.unwrap_or_default(),
            authenticator: execution.authenticator.clone().unwrap_or_default(),
            priority: execution.priority,
            requirement: execution.requirement,
        }
    }

    /// The flow half. Execution fields never travel on this payload.
    pub fn to_flow(&self) -> AuthenticationFlow {
        AuthenticationFlow {
            id: self.id.clone(),
            alias: self.alias.clone(),
            provider_id: self.provider_id.clone(),
            top_level: self.top_level,
            built_in: self.built_in,
            description: Some(self.description.clone()),
        }
    }

    pub fn to_create_body(&self) -> NewSubFlowExecution {
        NewSubFlowExecution {
            alias: self.alias.clone(),
            flow_type: self.provider_id.clone(),
            provider: self.authenticator.clone(),
            description: self.description.clone(),
        }
    }

    pub fn key(&self) -> SubFlowKey {
        SubFlowKey {
            realm_id: self.realm_id.clone(),
            parent_flow_alias: self.parent_flow_alias.clone(),
            id: self.id.clone(),
        }
    }
}

/// Address of an existing sub-flow, written `realm/parentFlowAlias/id`.
///
/// The parent alias may itself contain `/`; realm and id may not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubFlowKey {
    pub realm_id: String,
    pub parent_flow_alias: String,
    pub id: String,
}

impl FromStr for SubFlowKey {
    type Err = SubFlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            SubFlowError::Invalid(format!(
                "`{s}` is not of the form realm/parentFlowAlias/subFlowId"
            ))
        };

        let (realm_id, rest) = s.split_once('/').ok_or_else(invalid)?;
        let (parent_flow_alias, id) = rest.rsplit_once('/').ok_or_else(invalid)?;
        if realm_id.is_empty() || parent_flow_alias.is_empty() || id.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            realm_id: realm_id.to_string(),
            parent_flow_alias: parent_flow_alias.to_string(),
            id: id.to_string(),
        })
    }
}

impl fmt::Display for SubFlowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.realm_id, self.parent_flow_alias, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_parses_three_segments() {
        let key: SubFlowKey = "acme/browser/0c2f".parse().unwrap();
        assert_eq!(key.realm_id, "acme");
        assert_eq!(key.parent_flow_alias, "browser");
        assert_eq!(key.id, "0c2f");
        assert_eq!(key.to_string(), "acme/browser/0c2f");
    }

    #[test]
    fn key_keeps_slashes_in_parent_alias() {
        let key: SubFlowKey = "acme/login / forms/0c2f".parse().unwrap();
        assert_eq!(key.parent_flow_alias, "login / forms");
        assert_eq!(key.id, "0c2f");
    }

    #[test]
    fn key_rejects_missing_segments() {
        assert!("acme/0c2f".parse::<SubFlowKey>().is_err());
        assert!("acme//0c2f".parse::<SubFlowKey>().is_err());
        assert!("/browser/0c2f".parse::<SubFlowKey>().is_err());
        assert!("acme/browser/".parse::<SubFlowKey>().is_err());
    }

    #[test]
    fn flow_half_carries_no_execution_fields() {
        let mut subflow = SubFlow::new("acme", "browser", "forms", "basic-flow");
        subflow.authenticator = "auth-cookie".into();
        subflow.priority = 20;
        let json = serde_json::to_value(subflow.to_flow()).unwrap();
        assert!(json.get("authenticator").is_none());
        assert!(json.get("priority").is_none());
        assert!(json.get("requirement").is_none());
        assert!(json.get("realmId").is_none());
    }

    #[test]
    fn from_parts_copies_execution_half() {
        let flow = AuthenticationFlow {
            id: "f1".into(),
            alias: "forms".into(),
            provider_id: "form-flow".into(),
            description: None,
            ..Default::default()
        };
        let execution = Execution {
            id: "e1".into(),
            authenticator: Some("registration-page-form".into()),
            requirement: Requirement::Required,
            priority: 30,
            ..Default::default()
        };
        let subflow = SubFlow::from_parts("acme", "registration", flow, &execution);
        assert_eq!(subflow.id, "f1");
        assert_eq!(subflow.parent_flow_alias, "registration");
        assert_eq!(subflow.authenticator, "registration-page-form");
        assert_eq!(subflow.requirement, Requirement::Required);
        assert_eq!(subflow.priority, 30);
        assert_eq!(subflow.description, "");
    }
}
