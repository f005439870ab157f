//! Dispatches a setup call to the right step.
//!
//! No step counter is stored. Each call looks at its arguments, the deploy
//! config, the stored token and the pending session, and picks:
//! - verification code given: exchange it, then resolve projects
//! - project reference given: write the deploy config
//! - deploy config present: report it
//! - otherwise: reuse a valid stored token, or start a new login

use crate::browser::{BrowserOpener, NoBrowser, SystemBrowser};
use crate::error::{SetupError, SetupResult};
use crate::key_exchange::KeyExchangeInitiator;
use crate::materializer::ConfigMaterializer;
use crate::outcome::SetupOutcome;
use crate::platform_client::{ApiListing, PlatformClient, Project};
use crate::projects::{resolve_projects, ProjectResolution, ProjectResolver};
use crate::token_exchange::TokenExchanger;
use setup_config_and_utils::{Config, Paths};
use setup_storage::{BearerToken, FileSessionStore, FileTokenStore, SessionStateStore, TokenStore};
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments of one setup call. Blank values count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetupArgs {
    pub verification_code: Option<String>,
    pub project_ref: Option<String>,
}

impl SetupArgs {
    pub fn new(verification_code: Option<String>, project_ref: Option<String>) -> Self {
        Self {
            verification_code: non_blank(verification_code),
            project_ref: non_blank(project_ref),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Storage and browser backends the orchestrator runs against.
pub struct SetupBackends {
    pub sessions: Arc<dyn SessionStateStore>,
    pub tokens: Arc<dyn TokenStore>,
    pub browser: Arc<dyn BrowserOpener>,
}

impl SetupBackends {
    /// File stores at the standard paths and the system browser (unless
    /// disabled in config).
    pub fn from_paths(config: &Config, paths: &Paths) -> Self {
        let browser: Arc<dyn BrowserOpener> = if config.open_browser {
            Arc::new(SystemBrowser)
        } else {
            Arc::new(NoBrowser)
        };
        Self {
            sessions: Arc::new(FileSessionStore::from_paths(paths)),
            tokens: Arc::new(FileTokenStore::from_paths(paths)),
            browser,
        }
    }
}

/// Top-level entry point for the setup flow.
pub struct SetupOrchestrator {
    sessions: Arc<dyn SessionStateStore>,
    tokens: Arc<dyn TokenStore>,
    client: PlatformClient,
    initiator: KeyExchangeInitiator,
    exchanger: TokenExchanger,
    resolver: ProjectResolver,
    materializer: ConfigMaterializer,
    deploy_config_path: PathBuf,
}

impl SetupOrchestrator {
    /// Orchestrator over the standard file locations.
    pub fn new(config: &Config, paths: &Paths) -> SetupResult<Self> {
        Self::with_backends(config, paths, SetupBackends::from_paths(config, paths))
    }

    /// Orchestrator over caller-provided backends.
    pub fn with_backends(
        config: &Config,
        paths: &Paths,
        backends: SetupBackends,
    ) -> SetupResult<Self> {
        let client = PlatformClient::from_config(config)?;
        let deploy_config_path = paths.deploy_config_file();

        Ok(Self {
            initiator: KeyExchangeInitiator::new(
                backends.sessions.clone(),
                backends.browser,
                config.dashboard_url()?,
                config.token_label_prefix.clone(),
            ),
            exchanger: TokenExchanger::new(
                client.clone(),
                backends.sessions.clone(),
                backends.tokens.clone(),
            ),
            resolver: ProjectResolver::new(client.clone()),
            materializer: ConfigMaterializer::new(client.clone(), deploy_config_path.clone()),
            sessions: backends.sessions,
            tokens: backends.tokens,
            client,
            deploy_config_path,
        })
    }

    /// Run one setup call. Errors are folded into `SetupOutcome::Failed`.
    pub async fn run(&self, args: SetupArgs) -> SetupOutcome {
        match self.dispatch(args).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(kind = err.kind(), error = %err, "setup call failed");
                err.into()
            }
        }
    }

    /// Run one setup call, returning errors as `Err`.
    pub async fn dispatch(&self, args: SetupArgs) -> SetupResult<SetupOutcome> {
        let args = SetupArgs::new(args.verification_code, args.project_ref);

        if let Some(code) = args.verification_code.as_deref() {
            tracing::info!("dispatch: exchange verification code");
            let token = self.exchanger.exchange(code).await?;
            return self.continue_with_token(&token).await;
        }

        if let Some(project_ref) = args.project_ref.as_deref() {
            tracing::info!(project_ref = %project_ref, "dispatch: materialize deploy config");
            let token = self.tokens.load()?.ok_or(SetupError::NoStoredToken)?;
            return self.materialize(&token, project_ref).await;
        }

        if self.deploy_config_path.exists() {
            tracing::info!("dispatch: deploy config already present");
            return Ok(SetupOutcome::AlreadyConfigured {
                config_path: self.deploy_config_path.clone(),
            });
        }

        tracing::info!("dispatch: start");
        self.start().await
    }

    /// Step 1. Reuse a stored token the platform still accepts, otherwise
    /// start a new device login.
    pub async fn start(&self) -> SetupResult<SetupOutcome> {
        if let Some(token) = self.tokens.load()? {
            match self.client.list_projects(&token).await? {
                ApiListing::Items(projects) => {
                    tracing::info!("stored access token is valid, skipping login");
                    return self.continue_with_projects(&token, projects).await;
                }
                ApiListing::Rejected { status, .. } => {
                    tracing::info!(status, "stored access token rejected, starting login");
                }
            }
        }

        Ok(SetupOutcome::LoginStarted(self.initiator.begin()?))
    }

    async fn continue_with_token(&self, token: &BearerToken) -> SetupResult<SetupOutcome> {
        match self.resolver.resolve(token).await? {
            ProjectResolution::Selected(project) => self.materialize(token, &project.id).await,
            ProjectResolution::Choose(projects) => Ok(SetupOutcome::ChooseProject { projects }),
        }
    }

    async fn continue_with_projects(
        &self,
        token: &BearerToken,
        projects: Vec<Project>,
    ) -> SetupResult<SetupOutcome> {
        match resolve_projects(projects)? {
            ProjectResolution::Selected(project) => self.materialize(token, &project.id).await,
            ProjectResolution::Choose(projects) => Ok(SetupOutcome::ChooseProject { projects }),
        }
    }

    async fn materialize(
        &self,
        token: &BearerToken,
        project_ref: &str,
    ) -> SetupResult<SetupOutcome> {
        let config = self.materializer.materialize(token, project_ref).await?;
        if let Err(err) = self.sessions.clear() {
            tracing::warn!(error = %err, "failed to clear leftover pending session");
        }
        Ok(SetupOutcome::Configured(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use setup_storage::{MemoryStorage, PendingSession, SecureSessionStore, SecureTokenStore};
    use tempfile::TempDir;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };
    use zeroize::Zeroizing;

    struct TestContext {
        mock_server: MockServer,
        paths: Paths,
        sessions: Arc<dyn SessionStateStore>,
        tokens: Arc<dyn TokenStore>,
        orchestrator: SetupOrchestrator,
        _temp_dir: TempDir,
    }

    impl TestContext {
        async fn new() -> Self {
            let mock_server = MockServer::start().await;
            let temp_dir = TempDir::new().unwrap();
            let paths = Paths::with_base_dir(temp_dir.path().to_path_buf());
            let config = Config {
                api_url: mock_server.uri(),
                open_browser: false,
                ..Config::default()
            };
            let sessions: Arc<dyn SessionStateStore> =
                Arc::new(SecureSessionStore::new(Box::new(MemoryStorage::new())));
            let tokens: Arc<dyn TokenStore> =
                Arc::new(SecureTokenStore::new(Box::new(MemoryStorage::new())));
            let orchestrator = SetupOrchestrator::with_backends(
                &config,
                &paths,
                SetupBackends {
                    sessions: sessions.clone(),
                    tokens: tokens.clone(),
                    browser: Arc::new(NoBrowser),
                },
            )
            .unwrap();

            Self {
                mock_server,
                paths,
                sessions,
                tokens,
                orchestrator,
                _temp_dir: temp_dir,
            }
        }

        async fn mount_projects(&self, status: u16, body: serde_json::Value) {
            Mock::given(method("GET"))
                .and(path("/v1/projects"))
                .respond_with(ResponseTemplate::new(status).set_body_json(body))
                .mount(&self.mock_server)
                .await;
        }

        async fn mount_keys(&self, project_ref: &str) {
            Mock::given(method("GET"))
                .and(path(format!("/v1/projects/{project_ref}/api-keys")))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                    {"name": "anon", "api_key": "anon-key"},
                    {"name": "service_role", "api_key": "service-key"}
                ])))
                .mount(&self.mock_server)
                .await;
        }
    }

    #[test]
    fn test_blank_args_are_absent() {
        let args = SetupArgs::new(Some("  ".into()), Some("".into()));
        assert_eq!(args, SetupArgs::default());

        let args = SetupArgs::new(Some(" CODE ".into()), None);
        assert_eq!(args.verification_code.as_deref(), Some("CODE"));
    }

    #[tokio::test]
    async fn no_args_without_token_starts_login() {
        let ctx = TestContext::new().await;

        let outcome = ctx.orchestrator.run(SetupArgs::default()).await;

        assert!(matches!(outcome, SetupOutcome::LoginStarted(_)));
        assert!(ctx.sessions.load().unwrap().is_some());
    }

    #[tokio::test]
    async fn existing_config_short_circuits() {
        let ctx = TestContext::new().await;
        std::fs::write(ctx.paths.deploy_config_file(), "PROJECT_REF=\"x\"\n").unwrap();

        let outcome = ctx.orchestrator.run(SetupArgs::default()).await;

        assert_eq!(
            outcome,
            SetupOutcome::AlreadyConfigured {
                config_path: ctx.paths.deploy_config_file()
            }
        );
        assert!(ctx.sessions.load().unwrap().is_none());
    }

    #[tokio::test]
    async fn valid_stored_token_skips_login() {
        let ctx = TestContext::new().await;
        ctx.tokens.save(&BearerToken::new("sbp_valid")).unwrap();
        ctx.mount_projects(200, serde_json::json!([{"id": "solo", "name": "Solo"}]))
            .await;
        ctx.mount_keys("solo").await;

        let outcome = ctx.orchestrator.run(SetupArgs::default()).await;

        match outcome {
            SetupOutcome::Configured(config) => assert_eq!(config.project_ref, "solo"),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(ctx.sessions.load().unwrap().is_none());
        assert!(ctx.paths.deploy_config_file().exists());
    }

    #[tokio::test]
    async fn rejected_stored_token_falls_back_to_login() {
        let ctx = TestContext::new().await;
        ctx.tokens.save(&BearerToken::new("sbp_expired")).unwrap();
        ctx.mount_projects(401, serde_json::json!({"message": "Unauthorized"}))
            .await;

        let outcome = ctx.orchestrator.run(SetupArgs::default()).await;

        assert!(matches!(outcome, SetupOutcome::LoginStarted(_)));
    }

    #[tokio::test]
    async fn unavailable_platform_keeps_stored_token() {
        let ctx = TestContext::new().await;
        ctx.tokens.save(&BearerToken::new("sbp_valid")).unwrap();
        ctx.mount_projects(503, serde_json::json!({"message": "maintenance"}))
            .await;

        let outcome = ctx.orchestrator.run(SetupArgs::default()).await;

        match outcome {
            SetupOutcome::Failed(failure) => {
                assert_eq!(failure.kind, "server_unavailable");
                assert!(failure.retryable);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(ctx.sessions.load().unwrap().is_none());
        assert!(ctx.tokens.load().unwrap().is_some());
    }

    #[tokio::test]
    async fn valid_token_with_many_projects_asks_to_choose() {
        let ctx = TestContext::new().await;
        ctx.tokens.save(&BearerToken::new("sbp_valid")).unwrap();
        ctx.mount_projects(
            200,
            serde_json::json!([
                {"id": "one", "name": "One"},
                {"id": "two", "name": "Two"}
            ]),
        )
        .await;

        let outcome = ctx.orchestrator.run(SetupArgs::default()).await;

        match outcome {
            SetupOutcome::ChooseProject { projects } => {
                let ids: Vec<_> = projects.iter().map(|p| p.id.as_str()).collect();
                assert_eq!(ids, vec!["one", "two"]);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn valid_token_with_no_projects_fails() {
        let ctx = TestContext::new().await;
        ctx.tokens.save(&BearerToken::new("sbp_valid")).unwrap();
        ctx.mount_projects(200, serde_json::json!([])).await;

        let outcome = ctx.orchestrator.run(SetupArgs::default()).await;

        match outcome {
            SetupOutcome::Failed(failure) => {
                assert_eq!(failure.kind, "empty_project_list");
                assert!(failure.guidance.contains("https://supabase.com/dashboard"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn project_ref_without_token_fails() {
        let ctx = TestContext::new().await;

        let outcome = ctx
            .orchestrator
            .run(SetupArgs::new(None, Some("proj-1".into())))
            .await;

        assert!(outcome.is_error());
        match outcome {
            SetupOutcome::Failed(failure) => assert_eq!(failure.kind, "no_stored_token"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn project_ref_clears_leftover_session() {
        let ctx = TestContext::new().await;
        ctx.tokens.save(&BearerToken::new("sbp_valid")).unwrap();
        ctx.sessions
            .save(&PendingSession {
                session_id: "stale".into(),
                private_key_hex: Zeroizing::new("1f".repeat(32)),
                public_key_hex: "04".into(),
                token_label: "gateflow_setup_0".into(),
            })
            .unwrap();
        ctx.mount_keys("proj-1").await;

        let outcome = ctx
            .orchestrator
            .run(SetupArgs::new(None, Some("proj-1".into())))
            .await;

        assert!(matches!(outcome, SetupOutcome::Configured(_)));
        assert!(ctx.sessions.load().unwrap().is_none());
    }

    #[tokio::test]
    async fn verification_code_without_session_fails() {
        let ctx = TestContext::new().await;

        let outcome = ctx
            .orchestrator
            .run(SetupArgs::new(Some("ABCD1234".into()), None))
            .await;

        match outcome {
            SetupOutcome::Failed(failure) => {
                assert_eq!(failure.kind, "no_pending_session");
                assert!(!failure.retryable);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn start_never_returns_private_key() {
        let ctx = TestContext::new().await;

        let outcome = ctx.orchestrator.run(SetupArgs::default()).await;
        let private_key = ctx.sessions.load().unwrap().unwrap().private_key_hex;

        assert!(!outcome.render_text().contains(private_key.as_str()));
        assert!(!format!("{outcome:?}").contains(private_key.as_str()));
        assert!(!serde_json::to_string(&outcome)
            .unwrap()
            .contains(private_key.as_str()));
    }
}
