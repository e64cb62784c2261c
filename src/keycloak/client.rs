//! HTTP transport for the Keycloak admin REST API.
//!
//! [`KeycloakClient`] owns the `reqwest` client and the admin session. It
//! obtains an access token from the admin realm's OpenID Connect token
//! endpoint, caches it until shortly before expiry, and re-authenticates once
//! when the server rejects a token with `401`. That single replay is the only
//! retry anywhere in the crate.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::api::AuthenticationApi;
use super::types::{AuthenticationFlow, Execution, ExecutionInfo, NewSubFlowExecution, RequirementUpdate};
use crate::config::{AppConfig, Credentials};
use crate::error::{ApiError, ConfigError};

/// Tokens are refreshed this many seconds before the server says they expire.
const TOKEN_EXPIRY_SKEW_SECS: i64 = 10;

/// Used when the token response carries no `expires_in`.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 60;

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Keycloak admin API client.
pub struct KeycloakClient {
    http: reqwest::Client,
    /// Server root including any context path, e.g. `https://sso/auth`.
    base_url: Url,
    admin_realm: String,
    credentials: Credentials,
    token: Mutex<Option<AccessToken>>,
}

impl KeycloakClient {
    /// Build a client from the resolved configuration.
    ///
    /// No request is sent until the first API call.
    pub fn new(config: &AppConfig) -> Result<Self, ConfigError> {
        let credentials = config.credentials()?;
        let base_url = parse_base_url(&config.url, &config.base_path)?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .danger_accept_invalid_certs(config.tls_insecure)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            admin_realm: config.admin_realm.clone(),
            credentials,
            token: Mutex::new(None),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Append percent-encoded segments to the server root.
    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Unavailable(format!("{} cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// `{base}/admin/realms/{realm}/{segments...}`
    fn admin_url(&self, realm_id: &str, segments: &[&str]) -> Result<Url, ApiError> {
        let mut all = vec!["admin", "realms", realm_id];
        all.extend_from_slice(segments);
        self.url(&all)
    }

    async fn access_token(&self) -> Result<String, ApiError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Utc::now() {
                return Ok(token.value.clone());
            }
            tracing::debug!("Access token expired, re-authenticating");
        }

        let token = self.fetch_token().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn fetch_token(&self) -> Result<AccessToken, ApiError> {
        let url = self.url(&[
            "realms",
            self.admin_realm.as_str(),
            "protocol",
            "openid-connect",
            "token",
        ])?;

        let form: Vec<(&str, &str)> = match &self.credentials {
            Credentials::ClientCredentials {
                client_id,
                client_secret,
            } => vec![
                ("grant_type", "client_credentials"),
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
            ],
            Credentials::Password {
                client_id,
                username,
                password,
            } => vec![
                ("grant_type", "password"),
                ("client_id", client_id.as_str()),
                ("username", username.as_str()),
                ("password", password.as_str()),
            ],
        };

        let response = self
            .http
            .post(url)
            .form(&form)
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response, "token endpoint").await?;
        let body: TokenResponse = decode(response).await?;

        let lifetime = body.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        let expires_at =
            Utc::now() + chrono::Duration::seconds((lifetime - TOKEN_EXPIRY_SKEW_SECS).max(0));
        tracing::debug!(realm = %self.admin_realm, %expires_at, "Obtained admin access token");

        Ok(AccessToken {
            value: body.access_token,
            expires_at,
        })
    }

    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    /// Send an authorized request, replaying it once after a `401`.
    async fn send<B>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
        resource: &str,
    ) -> Result<Response, ApiError>
    where
        B: Serialize + ?Sized + Sync,
    {
        let mut replayed = false;
        loop {
            let token = self.access_token().await?;
            let mut request = self
                .http
                .request(method.clone(), url.clone())
                .bearer_auth(&token);
            if let Some(body) = body {
                request = request.json(body);
            }

            tracing::trace!(%method, %url, "Keycloak request");
            let response = request.send().await.map_err(transport_error)?;

            if response.status() == StatusCode::UNAUTHORIZED && !replayed {
                tracing::debug!(%url, "Access token rejected, re-authenticating");
                self.invalidate_token().await;
                replayed = true;
                continue;
            }
            return check_status(response, resource).await;
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, resource: &str) -> Result<T, ApiError> {
        let response = self.send::<()>(Method::GET, url, None, resource).await?;
        decode(response).await
    }
}

#[async_trait]
impl AuthenticationApi for KeycloakClient {
    async fn create_subflow_execution(
        &self,
        realm_id: &str,
        parent_flow_alias: &str,
        body: &NewSubFlowExecution,
    ) -> Result<String, ApiError> {
        let url = self.admin_url(
            realm_id,
            &["authentication", "flows", parent_flow_alias, "executions", "flow"],
        )?;
        let resource = format!("flow {parent_flow_alias}");
        let response = self.send(Method::POST, url, Some(body), &resource).await?;

        let status = response.status().as_u16();
        response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .and_then(id_from_location)
            .ok_or_else(|| ApiError::Remote {
                status,
                message: "response carries no Location header with the new flow id".into(),
            })
    }

    async fn get_flow(&self, realm_id: &str, id: &str) -> Result<AuthenticationFlow, ApiError> {
        let url = self.admin_url(realm_id, &["authentication", "flows", id])?;
        self.get_json(url, &format!("flow {id}")).await
    }

    async fn put_flow(&self, realm_id: &str, flow: &AuthenticationFlow) -> Result<(), ApiError> {
        let url = self.admin_url(realm_id, &["authentication", "flows", flow.id.as_str()])?;
        self.send(Method::PUT, url, Some(flow), &format!("flow {}", flow.id))
            .await?;
        Ok(())
    }

    async fn list_executions(
        &self,
        realm_id: &str,
        parent_flow_alias: &str,
    ) -> Result<Vec<ExecutionInfo>, ApiError> {
        let url = self.admin_url(
            realm_id,
            &["authentication", "flows", parent_flow_alias, "executions"],
        )?;
        self.get_json(url, &format!("flow {parent_flow_alias}")).await
    }

    async fn get_execution(&self, realm_id: &str, id: &str) -> Result<Execution, ApiError> {
        let url = self.admin_url(realm_id, &["authentication", "executions", id])?;
        self.get_json(url, &format!("execution {id}")).await
    }

    async fn update_execution_requirement(
        &self,
        realm_id: &str,
        parent_flow_alias: &str,
        update: &RequirementUpdate,
    ) -> Result<(), ApiError> {
        let url = self.admin_url(
            realm_id,
            &["authentication", "flows", parent_flow_alias, "executions"],
        )?;
        self.send(Method::PUT, url, Some(update), &format!("execution {}", update.id))
            .await?;
        Ok(())
    }

    async fn delete_execution(&self, realm_id: &str, id: &str) -> Result<(), ApiError> {
        let url = self.admin_url(realm_id, &["authentication", "executions", id])?;
        self.send::<()>(Method::DELETE, url, None, &format!("execution {id}"))
            .await?;
        Ok(())
    }

    async fn raise_execution_priority(&self, realm_id: &str, id: &str) -> Result<(), ApiError> {
        let url = self.admin_url(
            realm_id,
            &["authentication", "executions", id, "raise-priority"],
        )?;
        self.send::<()>(Method::POST, url, None, &format!("execution {id}"))
            .await?;
        Ok(())
    }

    async fn lower_execution_priority(&self, realm_id: &str, id: &str) -> Result<(), ApiError> {
        let url = self.admin_url(
            realm_id,
            &["authentication", "executions", id, "lower-priority"],
        )?;
        self.send::<()>(Method::POST, url, None, &format!("execution {id}"))
            .await?;
        Ok(())
    }
}

/// Parse the server URL and append the optional context path.
pub fn parse_base_url(url: &str, base_path: &str) -> Result<Url, ConfigError> {
    let invalid = |message: String| ConfigError::InvalidUrl {
        url: url.to_string(),
        message,
    };

    let mut parsed = Url::parse(url).map_err(|e| invalid(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme `{}`", parsed.scheme())));
    }
    {
        let mut segments = parsed
            .path_segments_mut()
            .map_err(|_| invalid("URL cannot carry a path".into()))?;
        segments.pop_if_empty();
        segments.extend(base_path.split('/').filter(|s| !s.is_empty()));
    }
    Ok(parsed)
}

/// The created resource id is the last segment of the `Location` header.
pub fn id_from_location(location: &str) -> Option<String> {
    location
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty() && !id.contains(':'))
        .map(str::to_string)
}

fn transport_error(e: reqwest::Error) -> ApiError {
    ApiError::Unavailable(e.to_string())
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status().as_u16();
    response.json::<T>().await.map_err(|e| {
        if e.is_decode() {
            ApiError::Remote {
                status,
                message: format!("unexpected response body: {e}"),
            }
        } else {
            transport_error(e)
        }
    })
}

async fn check_status(response: Response, resource: &str) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(ApiError::not_found(resource));
    }

    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Remote {
        status: status.as_u16(),
        message: error_message(&body, status),
    })
}

/// Keycloak reports errors as `errorMessage` (admin API) or
/// `error`/`error_description` (OIDC endpoints).
fn error_message(body: &str, status: StatusCode) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            ["errorMessage", "error_description", "error"]
                .iter()
                .find_map(|key| v.get(key).and_then(|m| m.as_str()).map(str::to_string))
        });

    match from_json {
        Some(message) => message,
        None if body.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
        None => body.trim().to_string(),
    }
}
