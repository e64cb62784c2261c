use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::subflow::{Requirement, SubFlowKey};

#[derive(Parser, Debug)]
#[command(name = "kc-subflow", version, about = "Manage Keycloak authentication sub-flows")]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Connection settings. Each one falls back to config files when unset.
#[derive(Args, Debug, Default)]
pub struct ConnectionArgs {
    /// Path to config file (overrides ./kc-subflow.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Keycloak server URL, e.g. "https://sso.example.com"
    #[arg(long, env = "KEYCLOAK_URL", global = true)]
    pub url: Option<String>,

    /// Context path in front of the API (legacy servers use "/auth")
    #[arg(long, env = "KEYCLOAK_BASE_PATH", global = true)]
    pub base_path: Option<String>,

    /// Realm the admin client authenticates against
    #[arg(long, env = "KEYCLOAK_ADMIN_REALM", global = true)]
    pub admin_realm: Option<String>,

    #[arg(long, env = "KEYCLOAK_CLIENT_ID", global = true)]
    pub client_id: Option<String>,

    #[arg(long, env = "KEYCLOAK_CLIENT_SECRET", hide_env_values = true, global = true)]
    pub client_secret: Option<String>,

    #[arg(long, env = "KEYCLOAK_USER", global = true)]
    pub username: Option<String>,

    #[arg(long, env = "KEYCLOAK_PASSWORD", hide_env_values = true, global = true)]
    pub password: Option<String>,

    /// HTTP request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Accept invalid TLS certificates
    #[arg(long, global = true)]
    pub tls_insecure: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a sub-flow inside a parent flow
    Create {
        /// Realm that owns the parent flow
        #[arg(long)]
        realm: String,

        /// Alias of the parent flow
        #[arg(long)]
        parent: String,

        #[arg(long)]
        alias: String,

        /// Flow type: "basic-flow", "client-flow" or "form-flow"
        #[arg(long, default_value = "basic-flow")]
        provider_id: String,

        #[arg(long)]
        description: Option<String>,

        /// Provider backing the execution, e.g. "registration-page-form"
        #[arg(long)]
        authenticator: Option<String>,

        #[arg(long)]
        requirement: Option<Requirement>,

        #[arg(long)]
        priority: Option<i32>,
    },
    /// Show a sub-flow together with its execution
    Get {
        /// realm/parentFlowAlias/subFlowId
        key: SubFlowKey,
    },
    /// Change a sub-flow; unset flags keep their current value
    Update {
        /// realm/parentFlowAlias/subFlowId
        key: SubFlowKey,

        #[arg(long)]
        alias: Option<String>,

        #[arg(long)]
        provider_id: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        requirement: Option<Requirement>,
    },
    /// Delete a sub-flow and its execution
    Delete {
        /// realm/parentFlowAlias/subFlowId
        key: SubFlowKey,
    },
    /// Move a sub-flow one position up among its siblings
    RaisePriority {
        /// realm/parentFlowAlias/subFlowId
        key: SubFlowKey,
    },
    /// Move a sub-flow one position down among its siblings
    LowerPriority {
        /// realm/parentFlowAlias/subFlowId
        key: SubFlowKey,
    },
}
