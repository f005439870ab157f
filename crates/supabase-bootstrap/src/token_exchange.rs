//! Step 2: trade a verification code for the bearer token.
//!
//! The pending session is single-use. Whatever happens after it is loaded,
//! it is cleared before this step returns, so a poll that never got an answer
//! is reported as an interrupted login rather than a retryable fault.

use crate::error::{SetupError, SetupResult};
use crate::platform_client::PlatformClient;
use setup_config_and_utils::{decrypt_device_token, EphemeralKeyPair};
use setup_storage::{BearerToken, PendingSession, SessionStateStore, TokenStore};
use std::sync::Arc;

/// Completes device logins.
pub struct TokenExchanger {
    client: PlatformClient,
    sessions: Arc<dyn SessionStateStore>,
    tokens: Arc<dyn TokenStore>,
}

impl TokenExchanger {
    pub fn new(
        client: PlatformClient,
        sessions: Arc<dyn SessionStateStore>,
        tokens: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            client,
            sessions,
            tokens,
        }
    }

    /// Exchange a verification code for the bearer token and store it.
    ///
    /// Without a pending session this fails with `NoPendingSession` before
    /// any network traffic.
    pub async fn exchange(&self, verification_code: &str) -> SetupResult<BearerToken> {
        let session = match self.sessions.load() {
            Ok(Some(session)) => session,
            Ok(None) => return Err(SetupError::NoPendingSession),
            Err(err) => {
                tracing::warn!(error = %err, "pending session is unreadable, discarding it");
                self.clear_session();
                return Err(err.into());
            }
        };

        let result = self
            .complete(&session, verification_code.trim())
            .await
            .map_err(|err| {
                if err.is_retryable() {
                    SetupError::LoginInterrupted {
                        source: Box::new(err),
                    }
                } else {
                    err
                }
            });
        self.clear_session();

        match &result {
            Ok(_) => tracing::info!(session_id = %session.session_id, "device login completed"),
            Err(err) => tracing::warn!(
                session_id = %session.session_id,
                kind = err.kind(),
                "device login failed"
            ),
        }
        result
    }

    async fn complete(
        &self,
        session: &PendingSession,
        verification_code: &str,
    ) -> SetupResult<BearerToken> {
        let keypair = EphemeralKeyPair::from_private_key_hex(&session.private_key_hex)?;

        let response = self
            .client
            .poll_device_login(&session.session_id, verification_code)
            .await?;

        let ciphertext = response.access_token.ok_or_else(|| {
            SetupError::CodeInvalidOrExpired("no access token in response".to_string())
        })?;
        let server_public_key = response.public_key.ok_or_else(|| {
            SetupError::DecryptionFailed("response is missing the server public key".to_string())
        })?;
        let nonce = response
            .nonce
            .ok_or_else(|| SetupError::DecryptionFailed("response is missing the nonce".to_string()))?;

        let plaintext = decrypt_device_token(&keypair, &server_public_key, &nonce, &ciphertext)?;
        let token = BearerToken::new(plaintext);
        if token.is_empty() {
            return Err(SetupError::DecryptionFailed(
                "decrypted token is empty".to_string(),
            ));
        }

        self.tokens.save(&token)?;
        Ok(token)
    }

    fn clear_session(&self) {
        if let Err(err) = self.sessions.clear() {
            tracing::warn!(error = %err, "failed to clear pending session");
        }
    }
}
