use super::schema::{AppConfig, Credentials, PartialConfig};
use crate::error::ConfigError;

pub const DEFAULT_URL: &str = "http://localhost:8080";
pub const DEFAULT_ADMIN_REALM: &str = "master";
pub const DEFAULT_CLIENT_ID: &str = "admin-cli";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

impl PartialConfig {
    /// Merge self with a lower-priority fallback.
    /// Self's non-None values take precedence.
    pub fn with_fallback(self, fallback: PartialConfig) -> PartialConfig {
        PartialConfig {
            url: self.url.or(fallback.url),
            base_path: self.base_path.or(fallback.base_path),
            admin_realm: self.admin_realm.or(fallback.admin_realm),
            client_id: self.client_id.or(fallback.client_id),
            client_secret: self.client_secret.or(fallback.client_secret),
            username: self.username.or(fallback.username),
            password: self.password.or(fallback.password),
            timeout_secs: self.timeout_secs.or(fallback.timeout_secs),
            tls_insecure: self.tls_insecure.or(fallback.tls_insecure),
            user_agent: self.user_agent.or(fallback.user_agent),
        }
    }

    /// Convert to AppConfig, filling any remaining gaps with defaults.
    pub fn finalize(self) -> AppConfig {
        AppConfig {
            url: self.url.unwrap_or_else(|| DEFAULT_URL.to_string()),
            base_path: self.base_path.unwrap_or_default(),
            admin_realm: self
                .admin_realm
                .unwrap_or_else(|| DEFAULT_ADMIN_REALM.to_string()),
            client_id: self.client_id.unwrap_or_else(|| DEFAULT_CLIENT_ID.to_string()),
            client_secret: self.client_secret.filter(|s| !s.is_empty()),
            username: self.username.filter(|s| !s.is_empty()),
            password: self.password,
            timeout_secs: self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            tls_insecure: self.tls_insecure.unwrap_or(false),
            user_agent: self
                .user_agent
                .unwrap_or_else(|| format!("kc-subflow/{}", env!("CARGO_PKG_VERSION"))),
        }
    }
}

impl AppConfig {
    /// Pick the token grant: a client secret wins over username/password.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        if let Some(secret) = &self.client_secret {
            return Ok(Credentials::ClientCredentials {
                client_id: self.client_id.clone(),
                client_secret: secret.clone(),
            });
        }
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Ok(Credentials::Password {
                client_id: self.client_id.clone(),
                username: username.clone(),
                password: password.clone(),
            }),
            (Some(_), None) => Err(ConfigError::MissingSetting("password")),
            _ => Err(ConfigError::MissingSetting(
                "client_secret or username/password",
            )),
        }
    }
}
