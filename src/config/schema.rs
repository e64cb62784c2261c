use serde::Deserialize;

/// The TOML file structure for kc-subflow.toml.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    pub keycloak: Option<KeycloakSection>,
    pub http: Option<HttpSection>,
}

#[derive(Debug, Deserialize)]
pub struct KeycloakSection {
    pub url: Option<String>,
    /// Context path in front of the API, e.g. "/auth" on legacy servers.
    pub base_path: Option<String>,
    pub admin_realm: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HttpSection {
    pub timeout_secs: Option<u64>,
    pub tls_insecure: Option<bool>,
    pub user_agent: Option<String>,
}

/// Fully-resolved runtime configuration. All fields have values except the
/// secrets, which are validated by [`AppConfig::credentials`].
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub url: String,
    pub base_path: String,
    pub admin_realm: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_secs: u64,
    pub tls_insecure: bool,
    pub user_agent: String,
}

/// How the client obtains its admin access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    ClientCredentials {
        client_id: String,
        client_secret: String,
    },
    Password {
        client_id: String,
        username: String,
        password: String,
    },
}

/// Partial config used during merge. All fields are Option so that
/// missing fields don't override lower-priority values.
#[derive(Debug, Clone, Default)]
pub struct PartialConfig {
    pub url: Option<String>,
    pub base_path: Option<String>,
    pub admin_realm: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_secs: Option<u64>,
    pub tls_insecure: Option<bool>,
    pub user_agent: Option<String>,
}

impl ConfigFile {
    pub fn to_partial(self) -> PartialConfig {
        let keycloak = self.keycloak;
        let http = self.http;
        let (url, base_path, admin_realm, client_id, client_secret, username, password) =
            match keycloak {
                Some(k) => (
                    k.url,
                    k.base_path,
                    k.admin_realm,
                    k.client_id,
                    k.client_secret,
                    k.username,
                    k.password,
                ),
                None => Default::default(),
            };
        let (timeout_secs, tls_insecure, user_agent) = match http {
            Some(h) => (h.timeout_secs, h.tls_insecure, h.user_agent),
            None => Default::default(),
        };

        PartialConfig {
            url,
            base_path,
            admin_realm,
            client_id,
            client_secret,
            username,
            password,
            timeout_secs,
            tls_insecure,
            user_agent,
        }
    }
}
