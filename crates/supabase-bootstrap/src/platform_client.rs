//! Supabase platform API client.
//!
//! Covers the three management endpoints the setup flow needs:
//! - the CLI device-login poll
//! - the project listing
//! - the per-project API key listing

use crate::error::{SetupError, SetupResult};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use setup_config_and_utils::Config;
use setup_storage::BearerToken;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::time::Duration;
use url::Url;

fn summarize_response_body(body: &str) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("len={},digest={:016x}", body.len(), hasher.finish())
}

fn server_unavailable(status: reqwest::StatusCode, body: &str) -> SetupError {
    let body_summary = summarize_response_body(body);
    tracing::warn!(status = %status, body_summary = %body_summary, "platform server error");
    SetupError::ServerUnavailable {
        status: status.as_u16(),
        body_summary,
    }
}

/// Response to a device-login poll.
///
/// `access_token` is absent until the user approves the session.
#[derive(Clone, Default, Deserialize)]
pub struct DeviceLoginResponse {
    /// Hex ciphertext with the 16-byte tag appended
    #[serde(default)]
    pub access_token: Option<String>,
    /// Server ephemeral P-256 public key, hex SEC1
    #[serde(default)]
    pub public_key: Option<String>,
    /// 12-byte nonce, hex
    #[serde(default)]
    pub nonce: Option<String>,
}

impl fmt::Debug for DeviceLoginResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceLoginResponse")
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("public_key", &self.public_key)
            .field("nonce", &self.nonce)
            .finish()
    }
}

/// A project visible to the bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, serde::Serialize)]
pub struct Project {
    /// Project reference (also the subdomain of its API URL)
    #[serde(default)]
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
}

/// One API key of a project.
#[derive(Clone, Default, Deserialize)]
pub struct ApiKey {
    #[serde(default)]
    pub name: String,
    /// `publishable` / `secret` for new-style keys, absent for legacy JWT keys
    #[serde(default, rename = "type")]
    pub key_type: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKey")
            .field("name", &self.name)
            .field("key_type", &self.key_type)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Outcome of a list endpoint call.
#[derive(Debug, Clone)]
pub enum ApiListing<T> {
    /// The endpoint returned a JSON array.
    Items(Vec<T>),
    /// A 4xx status or a body that is not an array.
    Rejected { status: u16, body_summary: String },
}

/// Supabase platform API client.
#[derive(Clone)]
pub struct PlatformClient {
    http_client: reqwest::Client,
    api_url: Url,
}

impl PlatformClient {
    /// Create a new client.
    ///
    /// # Arguments
    /// * `api_url` - Management API base URL (e.g., `https://api.supabase.com`)
    /// * `timeout` - Bound applied to every request
    pub fn new(api_url: Url, timeout: Duration) -> SetupResult<Self> {
        if api_url.cannot_be_a_base() {
            return Err(SetupError::Config(format!(
                "API URL cannot be used as a base: {api_url}"
            )));
        }
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("gateflow-setup/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http_client,
            api_url,
        })
    }

    /// Create a client from the loaded configuration.
    pub fn from_config(config: &Config) -> SetupResult<Self> {
        Self::new(config.api_url()?, config.http_timeout())
    }

    /// Build an endpoint URL from path segments. Segments are percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.api_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Poll the device-login endpoint once.
    ///
    /// A 5xx status is a server fault. Any other non-success status or an
    /// undecodable body means the platform will not hand out a token for this
    /// session and code.
    pub async fn poll_device_login(
        &self,
        session_id: &str,
        device_code: &str,
    ) -> SetupResult<DeviceLoginResponse> {
        let mut url = self.endpoint(&["platform", "cli", "login", session_id]);
        url.query_pairs_mut().append_pair("device_code", device_code);

        tracing::debug!(session_id = %session_id, "polling device login");

        let response = self
            .http_client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_server_error() {
            return Err(server_unavailable(status, &body));
        }

        if !status.is_success() {
            let body_summary = summarize_response_body(&body);
            tracing::warn!(status = %status, body_summary = %body_summary, "device login poll rejected");
            return Err(SetupError::CodeInvalidOrExpired(format!(
                "status {} ({})",
                status.as_u16(),
                body_summary
            )));
        }

        serde_json::from_str(&body).map_err(|_| {
            let body_summary = summarize_response_body(&body);
            tracing::warn!(body_summary = %body_summary, "device login poll returned an undecodable body");
            SetupError::CodeInvalidOrExpired(format!("undecodable response ({body_summary})"))
        })
    }

    /// List projects visible to the token.
    pub async fn list_projects(&self, token: &BearerToken) -> SetupResult<ApiListing<Project>> {
        let url = self.endpoint(&["v1", "projects"]);
        self.get_listing(url, token).await
    }

    /// List a project's API keys with their secret values revealed.
    pub async fn list_api_keys(
        &self,
        token: &BearerToken,
        project_ref: &str,
    ) -> SetupResult<ApiListing<ApiKey>> {
        let mut url = self.endpoint(&["v1", "projects", project_ref, "api-keys"]);
        url.query_pairs_mut().append_pair("reveal", "true");
        self.get_listing(url, token).await
    }

    async fn get_listing<T: DeserializeOwned>(
        &self,
        url: Url,
        token: &BearerToken,
    ) -> SetupResult<ApiListing<T>> {
        let path = url.path().to_string();
        let response = self
            .http_client
            .get(url)
            .bearer_auth(token.expose())
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_server_error() {
            return Err(server_unavailable(status, &body));
        }

        if !status.is_success() {
            let body_summary = summarize_response_body(&body);
            tracing::warn!(path = %path, status = %status, body_summary = %body_summary, "listing request rejected");
            return Ok(ApiListing::Rejected {
                status: status.as_u16(),
                body_summary,
            });
        }

        match serde_json::from_str::<Vec<T>>(&body) {
            Ok(items) => {
                tracing::debug!(path = %path, count = items.len(), "listing fetched");
                Ok(ApiListing::Items(items))
            }
            Err(_) => {
                let body_summary = summarize_response_body(&body);
                tracing::warn!(path = %path, body_summary = %body_summary, "listing response is not an array");
                Ok(ApiListing::Rejected {
                    status: status.as_u16(),
                    body_summary,
                })
            }
        }
    }
}
