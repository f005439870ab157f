//! Step 3: write the deploy configuration.
//!
//! Fetches the project's API keys, picks the publishable and secret roles and
//! writes `deploy-config.env`. Nothing is written unless both keys exist.

use crate::error::{SetupError, SetupResult};
use crate::platform_client::{ApiKey, ApiListing, PlatformClient};
use serde::Serialize;
use setup_storage::{write_owner_only, BearerToken};
use std::fmt;
use std::path::PathBuf;
use zeroize::Zeroizing;

/// Domain placeholder: the deploy target assigns one.
pub const DEFAULT_DOMAIN: &str = "-";

/// Domain provider used when none is configured.
pub const DEFAULT_DOMAIN_TYPE: &str = "cytrus";

/// Contents of the deploy configuration file.
#[derive(Clone)]
pub struct DeployConfig {
    pub supabase_url: String,
    pub project_ref: String,
    anon_key: Zeroizing<String>,
    service_key: Zeroizing<String>,
    pub domain: String,
    pub domain_type: String,
}

impl DeployConfig {
    pub fn new(project_ref: &str, anon_key: &str, service_key: &str) -> Self {
        Self {
            supabase_url: project_url(project_ref),
            project_ref: project_ref.to_string(),
            anon_key: Zeroizing::new(anon_key.to_string()),
            service_key: Zeroizing::new(service_key.to_string()),
            domain: DEFAULT_DOMAIN.to_string(),
            domain_type: DEFAULT_DOMAIN_TYPE.to_string(),
        }
    }

    /// Render as `KEY="value"` lines.
    pub fn render(&self) -> Zeroizing<String> {
        Zeroizing::new(format!(
            "# GateFlow Deploy Configuration\n\
             # Generated by gateflow-setup\n\
             \n\
             SUPABASE_URL=\"{}\"\n\
             PROJECT_REF=\"{}\"\n\
             SUPABASE_ANON_KEY=\"{}\"\n\
             SUPABASE_SERVICE_KEY=\"{}\"\n\
             \n\
             # Domain (auto = Cytrus subdomain)\n\
             DOMAIN=\"{}\"\n\
             DOMAIN_TYPE=\"{}\"\n",
            self.supabase_url,
            self.project_ref,
            self.anon_key.as_str(),
            self.service_key.as_str(),
            self.domain,
            self.domain_type,
        ))
    }
}

impl fmt::Debug for DeployConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeployConfig")
            .field("supabase_url", &self.supabase_url)
            .field("project_ref", &self.project_ref)
            .field("anon_key", &"[REDACTED]")
            .field("service_key", &"[REDACTED]")
            .field("domain", &self.domain)
            .field("domain_type", &self.domain_type)
            .finish()
    }
}

/// Public summary of a written deploy config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaterializedConfig {
    pub project_ref: String,
    pub supabase_url: String,
    pub config_path: PathBuf,
}

/// `https://{ref}.supabase.co`
pub fn project_url(project_ref: &str) -> String {
    format!("https://{project_ref}.supabase.co")
}

/// Reject references that could not be a project subdomain.
pub fn validate_project_ref(project_ref: &str) -> SetupResult<()> {
    let valid = !project_ref.is_empty()
        && project_ref
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(SetupError::InvalidArgument(format!(
            "'{project_ref}' is not a valid project reference"
        )))
    }
}

/// Pick the publishable and secret keys from a project's key listing.
///
/// Publishable: legacy `anon`, or `type == publishable` named `default`.
/// Secret: legacy `service_role`, or `type == secret` named `default`.
/// The listing is scanned in order and later matches win.
pub fn select_project_keys(keys: &[ApiKey]) -> (Option<&str>, Option<&str>) {
    let mut publishable = None;
    let mut secret = None;

    for key in keys {
        let Some(value) = key.api_key.as_deref().filter(|v| !v.is_empty()) else {
            continue;
        };
        let key_type = key.key_type.as_deref();

        if key.name == "anon" || (key_type == Some("publishable") && key.name == "default") {
            publishable = Some(value);
        }
        if key.name == "service_role" || (key_type == Some("secret") && key.name == "default") {
            secret = Some(value);
        }
    }

    (publishable, secret)
}

/// Writes deploy configuration files.
#[derive(Clone)]
pub struct ConfigMaterializer {
    client: PlatformClient,
    config_path: PathBuf,
}

impl ConfigMaterializer {
    pub fn new(client: PlatformClient, config_path: PathBuf) -> Self {
        Self {
            client,
            config_path,
        }
    }

    /// Fetch keys for `project_ref` and write the deploy config.
    pub async fn materialize(
        &self,
        token: &BearerToken,
        project_ref: &str,
    ) -> SetupResult<MaterializedConfig> {
        validate_project_ref(project_ref)?;

        let keys = match self.client.list_api_keys(token, project_ref).await? {
            ApiListing::Items(keys) => keys,
            ApiListing::Rejected {
                status,
                body_summary,
            } => {
                return Err(SetupError::ProjectKeysUnavailable {
                    project_ref: project_ref.to_string(),
                    detail: format!("status {status} ({body_summary})"),
                })
            }
        };

        let (anon_key, service_key) = match select_project_keys(&keys) {
            (Some(anon), Some(service)) => (anon, service),
            (anon, service) => {
                let mut missing = Vec::new();
                if anon.is_none() {
                    missing.push("publishable");
                }
                if service.is_none() {
                    missing.push("secret");
                }
                tracing::warn!(project_ref = %project_ref, ?missing, "required API keys missing");
                return Err(SetupError::MissingRequiredKeys {
                    project_ref: project_ref.to_string(),
                    missing,
                });
            }
        };

        let deploy_config = DeployConfig::new(project_ref, anon_key, service_key);
        write_owner_only(&self.config_path, &deploy_config.render())?;

        tracing::info!(
            project_ref = %project_ref,
            path = %self.config_path.display(),
            "deploy config written"
        );

        Ok(MaterializedConfig {
            project_ref: project_ref.to_string(),
            supabase_url: deploy_config.supabase_url.clone(),
            config_path: self.config_path.clone(),
        })
    }
}
