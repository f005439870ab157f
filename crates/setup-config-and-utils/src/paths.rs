//! File system paths for the setup flow.

use crate::{CoreError, CoreResult};
use std::path::PathBuf;

/// Deploy configuration filename under the GateFlow config directory.
const DEPLOY_CONFIG_NAME: &str = "deploy-config.env";
/// Pending device-login session filename under the GateFlow config directory.
const SESSION_STATE_NAME: &str = ".setup-state.json";
/// Bearer token filename under the Supabase config directory.
const ACCESS_TOKEN_NAME: &str = "access_token";

/// Manages file system paths for the setup flow.
#[derive(Debug, Clone)]
pub struct Paths {
    /// GateFlow config directory (~/.config/gateflow)
    base_dir: PathBuf,
    /// Supabase CLI config directory (~/.config/supabase), shared with the Supabase CLI
    supabase_dir: PathBuf,
}

impl Paths {
    /// Create a new Paths instance rooted at the user's home directory.
    pub fn new() -> CoreResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| CoreError::Path("Could not determine home directory".to_string()))?;

        let config_root = home.join(".config");

        Ok(Self {
            base_dir: config_root.join("gateflow"),
            supabase_dir: config_root.join("supabase"),
        })
    }

    /// Create a new Paths instance with a custom base directory.
    ///
    /// The Supabase directory is nested under it so tests stay isolated.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self {
            supabase_dir: base_dir.join("supabase"),
            base_dir,
        }
    }

    /// Get the base directory (~/.config/gateflow).
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the Supabase config directory (~/.config/supabase).
    pub fn supabase_dir(&self) -> &PathBuf {
        &self.supabase_dir
    }

    /// Get the tool settings file (~/.config/gateflow/setup.json).
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("setup.json")
    }

    /// Get the deploy configuration artifact (~/.config/gateflow/deploy-config.env).
    pub fn deploy_config_file(&self) -> PathBuf {
        self.base_dir.join(DEPLOY_CONFIG_NAME)
    }

    /// Get the pending session state file (~/.config/gateflow/.setup-state.json).
    pub fn session_state_file(&self) -> PathBuf {
        self.base_dir.join(SESSION_STATE_NAME)
    }

    /// Get the bearer token file (~/.config/supabase/access_token).
    pub fn access_token_file(&self) -> PathBuf {
        self.supabase_dir.join(ACCESS_TOKEN_NAME)
    }

    /// Get the logs directory (~/.config/gateflow/logs).
    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// Get the setup log file (~/.config/gateflow/logs/setup.jsonl).
    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join("setup.jsonl")
    }

    /// Ensure all required directories exist.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(&self.supabase_dir)?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}
