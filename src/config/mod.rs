pub mod merge;
pub mod schema;

pub use schema::*;

use crate::cli::ConnectionArgs;
use crate::error::ConfigError;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "kc-subflow.toml";

/// Load configuration by merging global, local, and CLI sources.
/// Precedence: CLI (and KEYCLOAK_* env) > explicit or local config > global config > defaults.
///
/// Missing default-location files are handled gracefully (defaults apply).
/// A file named with `--config` must exist and parse.
pub fn load_config(args: &ConnectionArgs) -> Result<AppConfig, ConfigError> {
    // Layer 1: Global config (~/.config/kc-subflow/kc-subflow.toml or platform equivalent)
    let global = load_global_config();

    // Layer 2: Explicit --config file, or ./kc-subflow.toml
    let local = match &args.config {
        Some(path) => read_config_file(path)?.to_partial(),
        None => load_optional(Path::new(CONFIG_FILE_NAME)).unwrap_or_default(),
    };

    // Layer 3: CLI args
    let cli_partial = cli_to_partial(args);

    Ok(cli_partial
        .with_fallback(local)
        .with_fallback(global)
        .finalize())
}

/// Read and parse a config file, failing on any error.
pub fn read_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let config = toml::from_str::<ConfigFile>(&contents).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    tracing::info!("Loaded config from {}", path.display());
    Ok(config)
}

fn load_global_config() -> PartialConfig {
    match global_config_path() {
        Some(p) => load_optional(&p).unwrap_or_default(),
        None => {
            tracing::debug!("Could not determine global config directory");
            PartialConfig::default()
        }
    }
}

/// Load a config file that may legitimately be absent.
/// Parse and read failures are logged and the layer is skipped.
pub fn load_optional(path: &Path) -> Option<PartialConfig> {
    match read_config_file(path) {
        Ok(config_file) => Some(config_file.to_partial()),
        Err(ConfigError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file at {}, using defaults", path.display());
            None
        }
        Err(e) => {
            tracing::warn!("Skipping config at {}: {}", path.display(), e);
            None
        }
    }
}

/// Linux: ~/.config/kc-subflow/kc-subflow.toml
/// macOS: ~/Library/Application Support/kc-subflow/kc-subflow.toml
fn global_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "kc-subflow")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

fn cli_to_partial(args: &ConnectionArgs) -> PartialConfig {
    PartialConfig {
        url: args.url.clone(),
        base_path: args.base_path.clone(),
        admin_realm: args.admin_realm.clone(),
        client_id: args.client_id.clone(),
        client_secret: args.client_secret.clone(),
        username: args.username.clone(),
        password: args.password.clone(),
        timeout_secs: args.timeout,
        // A bare flag can only switch the setting on.
        tls_insecure: args.tls_insecure.then_some(true),
        user_agent: None,
    }
}
