//! Supabase credential bootstrap for GateFlow deployments.
//!
//! This crate provides:
//! - Device login against the Supabase dashboard (ephemeral P-256 key
//!   agreement, AES-256-GCM token delivery)
//! - Project resolution for the resulting access token
//! - Deploy config materialization (`deploy-config.env`)
//! - A stateless orchestrator that picks the step from its inputs

mod browser;
mod error;
mod key_exchange;
mod materializer;
mod orchestrator;
mod outcome;
mod platform_client;
mod projects;
mod token_exchange;

pub use browser::{BrowserOpener, NoBrowser, SystemBrowser};
pub use error::{SetupError, SetupResult, ACCESS_TOKENS_PAGE, NEW_PROJECT_PAGE};
pub use key_exchange::{authorization_url, KeyExchangeInitiator, LoginStarted};
pub use materializer::{
    project_url, select_project_keys, validate_project_ref, ConfigMaterializer, DeployConfig,
    MaterializedConfig,
};
pub use orchestrator::{SetupArgs, SetupBackends, SetupOrchestrator};
pub use outcome::{SetupFailure, SetupOutcome};
pub use platform_client::{ApiKey, ApiListing, DeviceLoginResponse, PlatformClient, Project};
pub use projects::{resolve_projects, ProjectResolution, ProjectResolver};
pub use token_exchange::TokenExchanger;
