//! Setup error types.

use setup_config_and_utils::CoreError;
use setup_storage::StorageError;
use thiserror::Error;

/// Where a user can mint a personal access token by hand.
pub const ACCESS_TOKENS_PAGE: &str = "https://supabase.com/dashboard/account/tokens";

/// Where a user creates a new project.
pub const NEW_PROJECT_PAGE: &str = "https://supabase.com/dashboard";

/// Setup error type. Every variant ends the current call.
#[derive(Error, Debug)]
pub enum SetupError {
    /// A verification code was supplied but no login is in progress
    #[error("No pending login session")]
    NoPendingSession,

    /// The platform did not hand out a token for this code
    #[error("Verification code was rejected or has expired: {0}")]
    CodeInvalidOrExpired(String),

    /// Connect, timeout or other HTTP transport error
    #[error("Could not reach Supabase: {0}")]
    TransportFailure(#[from] reqwest::Error),

    /// The platform answered with a 5xx status
    #[error("Supabase is unavailable: status {status} ({body_summary})")]
    ServerUnavailable { status: u16, body_summary: String },

    /// A verification code could not be checked and the single-use login
    /// session was discarded
    #[error("Login interrupted: {source}")]
    LoginInterrupted {
        #[source]
        source: Box<SetupError>,
    },

    /// The delivered token could not be decrypted
    #[error("Could not decrypt the access token: {0}")]
    DecryptionFailed(String),

    /// The account has no projects
    #[error("No Supabase projects found for this account")]
    EmptyProjectList,

    /// The project is missing a publishable or secret key
    #[error("Project {project_ref} is missing required API keys: {}", .missing.join(", "))]
    MissingRequiredKeys {
        project_ref: String,
        missing: Vec<&'static str>,
    },

    /// The key listing for a project could not be fetched
    #[error("Failed to fetch API keys for project {project_ref}: {detail}")]
    ProjectKeysUnavailable { project_ref: String, detail: String },

    /// A project reference was supplied but no token is stored
    #[error("No Supabase access token stored")]
    NoStoredToken,

    /// A caller-supplied argument is malformed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The platform answered with something other than what was expected
    #[error("Unexpected response from Supabase: {0}")]
    UnexpectedResponse(String),

    /// Session, token or config file could not be written
    #[error("Storage error: {0}")]
    PersistenceFailure(#[from] StorageError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<CoreError> for SetupError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Crypto(msg) => SetupError::DecryptionFailed(msg),
            CoreError::Io(err) => SetupError::PersistenceFailure(StorageError::Io(err)),
            other => SetupError::Config(other.to_string()),
        }
    }
}

impl SetupError {
    /// Stable machine-readable name for this error.
    pub fn kind(&self) -> &'static str {
        match self {
            SetupError::NoPendingSession => "no_pending_session",
            SetupError::CodeInvalidOrExpired(_) => "code_invalid_or_expired",
            SetupError::TransportFailure(_) => "transport_failure",
            SetupError::ServerUnavailable { .. } => "server_unavailable",
            SetupError::LoginInterrupted { source } => source.kind(),
            SetupError::DecryptionFailed(_) => "decryption_failed",
            SetupError::EmptyProjectList => "empty_project_list",
            SetupError::MissingRequiredKeys { .. } => "missing_required_keys",
            SetupError::ProjectKeysUnavailable { .. } => "project_keys_unavailable",
            SetupError::NoStoredToken => "no_stored_token",
            SetupError::InvalidArgument(_) => "invalid_argument",
            SetupError::UnexpectedResponse(_) => "unexpected_response",
            SetupError::PersistenceFailure(_) => "persistence_failure",
            SetupError::Config(_) => "config",
        }
    }

    /// Concrete next step for the user.
    pub fn guidance(&self) -> String {
        match self {
            SetupError::NoPendingSession => {
                "No login is in progress. Run setup without arguments to start a new Supabase login."
                    .to_string()
            }
            SetupError::CodeInvalidOrExpired(_) => {
                "The login session has been discarded. Run setup without arguments to start over and use the new code."
                    .to_string()
            }
            SetupError::TransportFailure(_) if self.is_retryable() => {
                "Check your network connection, then repeat the same command.".to_string()
            }
            SetupError::TransportFailure(_) => {
                "Check your network connection and run setup again.".to_string()
            }
            SetupError::ServerUnavailable { .. } => {
                "Supabase is temporarily unavailable. Wait a moment, then repeat the same command."
                    .to_string()
            }
            SetupError::LoginInterrupted { .. } => {
                "The login session has been discarded. Once Supabase is reachable again, run setup without arguments to start a new login and use the new code."
                    .to_string()
            }
            SetupError::DecryptionFailed(_) => format!(
                "The login session has been discarded. As a fallback, open {ACCESS_TOKENS_PAGE}, click \"Generate new token\", \
                 save it to ~/.config/supabase/access_token and run setup again."
            ),
            SetupError::EmptyProjectList => format!(
                "Create a project at {NEW_PROJECT_PAGE}, then run setup again."
            ),
            SetupError::MissingRequiredKeys { .. } => {
                "Check Supabase Dashboard → Project Settings → API. The project needs both a publishable (anon) and a secret (service_role) key."
                    .to_string()
            }
            SetupError::ProjectKeysUnavailable { .. } => {
                "Check that the project exists and that your account can access it, then run setup again with --project-ref."
                    .to_string()
            }
            SetupError::NoStoredToken => {
                "Run setup without arguments to log in to Supabase first.".to_string()
            }
            SetupError::InvalidArgument(_) => {
                "Project references contain only letters, digits, '-' and '_'.".to_string()
            }
            SetupError::UnexpectedResponse(_) => {
                "Supabase returned an unexpected response. Try again shortly.".to_string()
            }
            SetupError::PersistenceFailure(_) => {
                "Check that ~/.config/gateflow and ~/.config/supabase are writable.".to_string()
            }
            SetupError::Config(_) => {
                "Check ~/.config/gateflow/setup.json and the GATEFLOW_* environment variables."
                    .to_string()
            }
        }
    }

    /// Returns true if the same call may succeed when repeated unchanged.
    ///
    /// Only requests the platform never settled qualify: connect errors,
    /// timeouts and 5xx responses. Authentication failures are never retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            SetupError::TransportFailure(e) => e.is_connect() || e.is_timeout(),
            SetupError::ServerUnavailable { .. } => true,
            _ => false,
        }
    }
}

/// Result type alias using SetupError.
pub type SetupResult<T> = Result<T, SetupError>;
