//! Report what the setup flow has on disk, without revealing any secret.

use super::Context;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use serde::Serialize;
use setup_storage::{FileSessionStore, FileTokenStore, SessionStateStore, TokenStore};
use std::fmt;
use std::path::PathBuf;

/// Presence of each artifact the setup flow manages.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub deploy_config: bool,
    pub deploy_config_path: PathBuf,
    pub access_token: bool,
    pub access_token_path: PathBuf,
    pub pending_login: bool,
}

impl StatusReport {
    pub fn collect(ctx: &Context) -> Result<Self> {
        let tokens = FileTokenStore::from_paths(&ctx.paths);
        let sessions = FileSessionStore::from_paths(&ctx.paths);

        Ok(Self {
            deploy_config: ctx.paths.deploy_config_file().exists(),
            deploy_config_path: ctx.paths.deploy_config_file(),
            access_token: tokens.load()?.is_some(),
            access_token_path: tokens.path().clone(),
            pending_login: sessions.exists()?,
        })
    }

    fn next_step(&self) -> &'static str {
        if self.deploy_config {
            "Configured. Delete the deploy config to reconfigure."
        } else if self.pending_login {
            "Finish login with --verification-code <CODE>."
        } else if self.access_token {
            "Run setup to pick a project."
        } else {
            "Run setup to log in to Supabase."
        }
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let yes_no = |present: bool| if present { "present" } else { "missing" };
        writeln!(
            f,
            "Deploy config:  {} ({})",
            yes_no(self.deploy_config),
            self.deploy_config_path.display()
        )?;
        writeln!(
            f,
            "Access token:   {} ({})",
            yes_no(self.access_token),
            self.access_token_path.display()
        )?;
        writeln!(
            f,
            "Pending login:  {}",
            if self.pending_login { "yes" } else { "no" }
        )?;
        writeln!(f, "Next step:      {}", self.next_step())
    }
}

/// Print the status report.
pub async fn status(ctx: &Context, format: &OutputFormat) -> Result<()> {
    let report = StatusReport::collect(ctx)?;
    output::print(&report, format);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use setup_config_and_utils::{Config, Paths};
    use setup_storage::BearerToken;
    use tempfile::tempdir;

    #[test]
    fn test_status_never_prints_the_token() {
        let dir = tempdir().unwrap();
        let ctx = Context {
            paths: Paths::with_base_dir(dir.path().to_path_buf()),
            config: Config::default(),
        };
        FileTokenStore::from_paths(&ctx.paths)
            .save(&BearerToken::new("sbp_very_secret"))
            .unwrap();

        let report = StatusReport::collect(&ctx).unwrap();
        assert!(report.access_token);
        assert!(!report.deploy_config);
        assert!(!report.pending_login);

        let text = report.to_string();
        let json = serde_json::to_string(&report).unwrap();
        assert!(!text.contains("sbp_very_secret"));
        assert!(!json.contains("sbp_very_secret"));
        assert!(text.contains("Run setup to pick a project."));
    }
}
