//! Step 1: start a device login.
//!
//! Generates a fresh ephemeral keypair and session id, persists them as the
//! single pending session and builds the dashboard URL the user approves.

use crate::browser::BrowserOpener;
use crate::error::SetupResult;
use serde::Serialize;
use setup_config_and_utils::EphemeralKeyPair;
use setup_storage::{PendingSession, SessionStateStore};
use std::sync::Arc;
use url::Url;
use uuid::Uuid;

/// Result of starting a login. Contains only public values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginStarted {
    pub session_id: String,
    pub token_label: String,
    pub public_key_hex: String,
    pub authorization_url: String,
    pub browser_opened: bool,
}

/// Starts device logins.
pub struct KeyExchangeInitiator {
    sessions: Arc<dyn SessionStateStore>,
    browser: Arc<dyn BrowserOpener>,
    dashboard_url: Url,
    token_label_prefix: String,
}

impl KeyExchangeInitiator {
    pub fn new(
        sessions: Arc<dyn SessionStateStore>,
        browser: Arc<dyn BrowserOpener>,
        dashboard_url: Url,
        token_label_prefix: impl Into<String>,
    ) -> Self {
        Self {
            sessions,
            browser,
            dashboard_url,
            token_label_prefix: token_label_prefix.into(),
        }
    }

    /// Begin a new login, replacing any pending session.
    pub fn begin(&self) -> SetupResult<LoginStarted> {
        let keypair = EphemeralKeyPair::generate();
        let session_id = Uuid::new_v4().to_string();
        let token_label = format!(
            "{}_{}",
            self.token_label_prefix,
            chrono::Utc::now().timestamp_millis()
        );
        let public_key_hex = keypair.public_key_hex();

        self.sessions.save(&PendingSession {
            session_id: session_id.clone(),
            private_key_hex: keypair.private_key_hex(),
            public_key_hex: public_key_hex.clone(),
            token_label: token_label.clone(),
        })?;

        let authorization_url =
            authorization_url(&self.dashboard_url, &session_id, &token_label, &public_key_hex);
        let browser_opened = self.browser.open(authorization_url.as_str());

        tracing::info!(
            session_id = %session_id,
            token_label = %token_label,
            browser_opened,
            "device login started"
        );

        Ok(LoginStarted {
            session_id,
            token_label,
            public_key_hex,
            authorization_url: authorization_url.to_string(),
            browser_opened,
        })
    }
}

/// `{dashboard}/dashboard/cli/login?session_id=..&token_name=..&public_key=..`
pub fn authorization_url(
    dashboard_url: &Url,
    session_id: &str,
    token_label: &str,
    public_key_hex: &str,
) -> Url {
    let mut url = dashboard_url.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(["dashboard", "cli", "login"]);
    }
    url.query_pairs_mut()
        .clear()
        .append_pair("session_id", session_id)
        .append_pair("token_name", token_label)
        .append_pair("public_key", public_key_hex);
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::NoBrowser;
    use setup_storage::{MemoryStorage, SecureSessionStore};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingBrowser {
        opened: AtomicUsize,
    }

    impl BrowserOpener for CountingBrowser {
        fn open(&self, _url: &str) -> bool {
            self.opened.fetch_add(1, Ordering::SeqCst);
            true
        }
    }

    fn initiator(
        sessions: Arc<dyn SessionStateStore>,
        browser: Arc<dyn BrowserOpener>,
    ) -> KeyExchangeInitiator {
        KeyExchangeInitiator::new(
            sessions,
            browser,
            Url::parse("https://supabase.com").unwrap(),
            "gateflow_setup",
        )
    }

    fn memory_sessions() -> Arc<dyn SessionStateStore> {
        Arc::new(SecureSessionStore::new(Box::new(MemoryStorage::new())))
    }

    #[test]
    fn test_authorization_url_shape() {
        let url = authorization_url(
            &Url::parse("https://supabase.com").unwrap(),
            "3f2b8c1e-0000-4000-8000-000000000000",
            "gateflow_setup_1700000000000",
            "04abcd",
        );
        assert_eq!(
            url.as_str(),
            "https://supabase.com/dashboard/cli/login?session_id=3f2b8c1e-0000-4000-8000-000000000000&token_name=gateflow_setup_1700000000000&public_key=04abcd"
        );
    }

    #[test]
    fn test_begin_persists_session_and_returns_public_values() {
        let sessions = memory_sessions();
        let started = initiator(sessions.clone(), Arc::new(NoBrowser)).begin().unwrap();

        let saved = sessions.load().unwrap().unwrap();
        assert_eq!(saved.session_id, started.session_id);
        assert_eq!(saved.public_key_hex, started.public_key_hex);
        assert_eq!(saved.token_label, started.token_label);

        assert!(Uuid::parse_str(&started.session_id).is_ok());
        assert_eq!(started.public_key_hex.len(), 130);
        assert!(started.public_key_hex.starts_with("04"));
        assert!(started.token_label.starts_with("gateflow_setup_"));
        assert!(!started.browser_opened);

        let rendered = format!("{:?}", started);
        assert!(!rendered.contains(saved.private_key_hex.as_str()));
        assert!(!started.authorization_url.contains(saved.private_key_hex.as_str()));
    }

    #[test]
    fn test_url_carries_session_label_and_key() {
        let started = initiator(memory_sessions(), Arc::new(NoBrowser)).begin().unwrap();
        let url = Url::parse(&started.authorization_url).unwrap();
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(url.path(), "/dashboard/cli/login");
        assert_eq!(pairs["session_id"], started.session_id);
        assert_eq!(pairs["token_name"], started.token_label);
        assert_eq!(pairs["public_key"], started.public_key_hex);
    }

    #[test]
    fn test_begin_twice_replaces_session() {
        let sessions = memory_sessions();
        let initiator = initiator(sessions.clone(), Arc::new(NoBrowser));

        let first = initiator.begin().unwrap();
        let second = initiator.begin().unwrap();

        assert_ne!(first.session_id, second.session_id);
        assert_ne!(first.public_key_hex, second.public_key_hex);
        assert_eq!(sessions.load().unwrap().unwrap().session_id, second.session_id);
    }

    #[test]
    fn test_begin_opens_browser() {
        let browser = Arc::new(CountingBrowser::default());
        let started = initiator(memory_sessions(), browser.clone()).begin().unwrap();

        assert!(started.browser_opened);
        assert_eq!(browser.opened.load(Ordering::SeqCst), 1);
    }
}
