//! What a setup call returns to its caller.
//!
//! Outcomes carry only public values: ids, labels, URLs and paths. Tokens,
//! private keys and project API keys never reach this type.

use crate::error::SetupError;
use crate::key_exchange::LoginStarted;
use crate::materializer::MaterializedConfig;
use crate::platform_client::Project;
use serde::Serialize;
use std::fmt::Write;
use std::path::PathBuf;

/// Serializable view of a failed call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetupFailure {
    pub kind: String,
    pub message: String,
    pub guidance: String,
    pub retryable: bool,
}

impl From<&SetupError> for SetupFailure {
    fn from(err: &SetupError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
            guidance: err.guidance(),
            retryable: err.is_retryable(),
        }
    }
}

/// Result of one setup call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SetupOutcome {
    /// A deploy config already exists; nothing was done.
    AlreadyConfigured { config_path: PathBuf },
    /// Login started; the user must approve and come back with a code.
    LoginStarted(LoginStarted),
    /// Several projects are available; the user must pick one.
    ChooseProject { projects: Vec<Project> },
    /// The deploy config was written.
    Configured(MaterializedConfig),
    /// The call failed.
    Failed(SetupFailure),
}

impl From<SetupError> for SetupOutcome {
    fn from(err: SetupError) -> Self {
        SetupOutcome::Failed(SetupFailure::from(&err))
    }
}

impl SetupOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, SetupOutcome::Failed(_))
    }

    /// Human-readable rendering with the next step spelled out.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        match self {
            SetupOutcome::AlreadyConfigured { config_path } => {
                let _ = writeln!(out, "GateFlow is already configured.");
                let _ = writeln!(out, "Config: {}", config_path.display());
                let _ = writeln!(
                    out,
                    "To reconfigure, delete this file and run setup again."
                );
            }
            SetupOutcome::LoginStarted(started) => {
                let _ = writeln!(out, "Supabase login started.");
                let _ = writeln!(out);
                if started.browser_opened {
                    let _ = writeln!(out, "1. A browser window was opened. If it did not appear, open:");
                } else {
                    let _ = writeln!(out, "1. Open this URL in your browser:");
                }
                let _ = writeln!(out, "   {}", started.authorization_url);
                let _ = writeln!(
                    out,
                    "2. Sign in and authorize the token \"{}\".",
                    started.token_label
                );
                let _ = writeln!(out, "3. Copy the verification code shown after approval.");
                let _ = writeln!(
                    out,
                    "4. Run setup again with --verification-code <CODE>."
                );
            }
            SetupOutcome::ChooseProject { projects } => {
                let _ = writeln!(out, "Found {} Supabase projects:", projects.len());
                let _ = writeln!(out);
                for (index, project) in projects.iter().enumerate() {
                    let _ = writeln!(out, "  {}. {} ({})", index + 1, project.name, project.id);
                }
                let _ = writeln!(out);
                let _ = writeln!(
                    out,
                    "Run setup again with --project-ref <ID> to pick one."
                );
            }
            SetupOutcome::Configured(config) => {
                let _ = writeln!(out, "GateFlow deploy config written.");
                let _ = writeln!(out, "Project: {}", config.project_ref);
                let _ = writeln!(out, "Supabase URL: {}", config.supabase_url);
                let _ = writeln!(out, "Config: {}", config.config_path.display());
            }
            SetupOutcome::Failed(failure) => {
                let _ = writeln!(out, "Error: {}", failure.message);
                let _ = writeln!(out, "{}", failure.guidance);
                if failure.retryable {
                    let _ = writeln!(out, "This looks temporary; retrying may help.");
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_is_error() {
        let outcome: SetupOutcome = SetupError::NoPendingSession.into();
        assert!(outcome.is_error());
        assert!(outcome.render_text().starts_with("Error: No pending login session"));
    }

    #[test]
    fn test_choose_project_lists_in_order() {
        let outcome = SetupOutcome::ChooseProject {
            projects: vec![
                Project {
                    id: "b-ref".into(),
                    name: "Beta".into(),
                },
                Project {
                    id: "a-ref".into(),
                    name: "Alpha".into(),
                },
            ],
        };
        let text = outcome.render_text();

        assert!(!outcome.is_error());
        assert!(text.contains("  1. Beta (b-ref)\n  2. Alpha (a-ref)\n"));
        assert!(text.contains("--project-ref"));
    }

    #[test]
    fn test_login_started_names_follow_up() {
        let outcome = SetupOutcome::LoginStarted(LoginStarted {
            session_id: "sess".into(),
            token_label: "gateflow_setup_1".into(),
            public_key_hex: "04ab".into(),
            authorization_url: "https://supabase.com/dashboard/cli/login?session_id=sess".into(),
            browser_opened: false,
        });
        let text = outcome.render_text();

        assert!(text.contains("https://supabase.com/dashboard/cli/login?session_id=sess"));
        assert!(text.contains("--verification-code"));
    }

    #[test]
    fn test_json_is_tagged() {
        let outcome = SetupOutcome::AlreadyConfigured {
            config_path: PathBuf::from("/tmp/deploy-config.env"),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "already_configured");
        assert_eq!(json["config_path"], "/tmp/deploy-config.env");
    }
}
