use std::fmt;
use std::path::PathBuf;

/// Errors related to configuration loading and parsing.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config at {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Missing setting: {0}")]
    MissingSetting(&'static str),

    #[error("Invalid Keycloak URL `{url}`: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Errors returned by the Keycloak admin API collaborator.
///
/// `Clone` so fakes and wrappers can hand the same failure out more than once.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("Keycloak returned HTTP {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("Keycloak unavailable: {0}")]
    Unavailable(String),
}

impl ApiError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        ApiError::NotFound {
            resource: resource.into(),
        }
    }
}

/// The remote call of a sub-flow operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    CreateFlow,
    GetFlow,
    PutFlow,
    LocateExecution,
    GetExecution,
    SyncRequirement,
    DeleteExecution,
    RaisePriority,
    LowerPriority,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::CreateFlow => "create flow execution",
            Step::GetFlow => "get flow",
            Step::PutFlow => "update flow",
            Step::LocateExecution => "locate execution",
            Step::GetExecution => "get execution",
            Step::SyncRequirement => "sync execution requirement",
            Step::DeleteExecution => "delete execution",
            Step::RaisePriority => "raise execution priority",
            Step::LowerPriority => "lower execution priority",
        };
        f.write_str(name)
    }
}

/// Errors surfaced by [`crate::subflow::SubFlowManager`].
///
/// Remote failures carry the step that failed and, once the remote system has
/// assigned one, the sub-flow id, so a caller can retry only what is missing.
#[derive(Debug, thiserror::Error)]
pub enum SubFlowError {
    #[error("Invalid sub-flow: {0}")]
    Invalid(String),

    #[error("Sub-flow step `{step}` failed{}: {source}", fmt_id(.subflow_id))]
    Failed {
        step: Step,
        subflow_id: Option<String>,
        #[source]
        source: ApiError,
    },

    #[error("Sub-flow operation cancelled before `{step}`{}", fmt_id(.subflow_id))]
    Cancelled {
        step: Step,
        subflow_id: Option<String>,
    },
}

fn fmt_id(id: &Option<String>) -> String {
    match id {
        Some(id) => format!(" (sub-flow id {id})"),
        None => String::new(),
    }
}

impl SubFlowError {
    /// The step that failed, if the error came from a remote call.
    pub fn step(&self) -> Option<Step> {
        match self {
            SubFlowError::Invalid(_) => None,
            SubFlowError::Failed { step, .. } | SubFlowError::Cancelled { step, .. } => Some(*step),
        }
    }

    /// The id already assigned to the sub-flow when the failure happened.
    pub fn subflow_id(&self) -> Option<&str> {
        match self {
            SubFlowError::Invalid(_) => None,
            SubFlowError::Failed { subflow_id, .. } | SubFlowError::Cancelled { subflow_id, .. } => {
                subflow_id.as_deref()
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SubFlowError::Failed {
                source: ApiError::NotFound { .. },
                ..
            }
        )
    }
}
