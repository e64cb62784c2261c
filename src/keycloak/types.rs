//! Wire representations of the Keycloak authentication admin API.
//!
//! Field names follow Keycloak's camelCase JSON. Unknown fields returned by the
//! server are ignored so newer server versions keep deserializing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SubFlowError;

/// Whether an execution must pass for authentication to succeed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Requirement {
    Required,
    Alternative,
    #[default]
    Disabled,
    Conditional,
    Optional,
}

impl Requirement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Requirement::Required => "REQUIRED",
            Requirement::Alternative => "ALTERNATIVE",
            Requirement::Disabled => "DISABLED",
            Requirement::Conditional => "CONDITIONAL",
            Requirement::Optional => "OPTIONAL",
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Requirement {
    type Err = SubFlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "REQUIRED" => Ok(Requirement::Required),
            "ALTERNATIVE" => Ok(Requirement::Alternative),
            "DISABLED" => Ok(Requirement::Disabled),
            "CONDITIONAL" => Ok(Requirement::Conditional),
            "OPTIONAL" => Ok(Requirement::Optional),
            other => Err(SubFlowError::Invalid(format!(
                "unknown requirement `{other}`, expected one of REQUIRED, ALTERNATIVE, DISABLED, CONDITIONAL, OPTIONAL"
            ))),
        }
    }
}

/// `AuthenticationFlowRepresentation`, restricted to the fields a sub-flow owns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationFlow {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub alias: String,
    pub provider_id: String,
    #[serde(default)]
    pub top_level: bool,
    #[serde(default)]
    pub built_in: bool,
    #[serde(default)]
    pub description: Option<String>,
}

/// Body of `POST .../flows/{parent}/executions/flow`.
///
/// Keycloak creates the flow and the execution that embeds it in one call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewSubFlowExecution {
    pub alias: String,
    /// Flow provider id ("basic-flow", "client-flow", "form-flow").
    #[serde(rename = "type")]
    pub flow_type: String,
    /// Authenticator of the execution; may be empty.
    pub provider: String,
    pub description: String,
}

/// One entry of `GET .../flows/{parent}/executions`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionInfo {
    pub id: String,
    /// Set when the execution embeds a sub-flow.
    #[serde(default)]
    pub flow_id: Option<String>,
    #[serde(default)]
    pub requirement: Option<String>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub provider_id: Option<String>,
    #[serde(default)]
    pub level: i32,
    #[serde(default)]
    pub index: i32,
}

/// `AuthenticationExecutionRepresentation` from `GET .../executions/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    pub id: String,
    #[serde(default)]
    pub authenticator: Option<String>,
    #[serde(default)]
    pub authenticator_flow: bool,
    #[serde(default)]
    pub requirement: Requirement,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub parent_flow: Option<String>,
    #[serde(default)]
    pub flow_id: Option<String>,
}

/// Body of `PUT .../flows/{parent}/executions`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequirementUpdate {
    pub id: String,
    pub requirement: Requirement,
    pub priority: i32,
}
