//! OAuth 1.0a protocol server: request verification on top of the token store.

use std::time::Duration;

use super::request::{OAuthRequest, unix_now};
use super::signature::{self, SignatureMethod};
use super::store::TokenStore;
use super::types::{Consumer, Token, TokenKind};
use crate::config::MockConfig;
use crate::error::{OAuthError, OAuthResult};

/// Verifies signed requests and drives the token store.
#[derive(Debug)]
pub struct OAuthServer {
    store: TokenStore,
    timestamp_threshold: Duration,
}

impl OAuthServer {
    #[must_use]
    pub fn new(config: &MockConfig) -> Self {
        Self { store: TokenStore::new(config), timestamp_threshold: config.timestamp_threshold }
    }

    #[must_use]
    pub const fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Issue the request token.
    ///
    /// A request that names a known token (the browser hitting the
    /// authorize page) only needs the token looked up. Anything else,
    /// including a stale `oauth_token`, goes through the consumer
    /// signature check and records the callback.
    pub async fn fetch_request_token(&self, request: &OAuthRequest) -> OAuthResult<Token> {
        if request.get("oauth_token").is_some() {
            match self.get_token(request, TokenKind::Request).await {
                Ok(token) => return Ok(token),
                Err(err) => tracing::debug!(error = %err, "Token lookup failed"),
            }
        }

        check_version(request)?;
        let consumer = self.get_consumer(request)?;
        let callback = request.get("oauth_callback");
        self.check_signature(request, &consumer, None).await?;

        self.store.fetch_request_token(&consumer, callback).await.ok_or(OAuthError::UnknownConsumer)
    }

    /// Exchange a verified request token for the access token.
    pub async fn fetch_access_token(&self, request: &OAuthRequest) -> OAuthResult<Token> {
        check_version(request)?;
        let consumer = self.get_consumer(request)?;
        let verifier = request.require("oauth_verifier")?;
        let token = self.get_token(request, TokenKind::Request).await?;
        self.check_signature(request, &consumer, Some(&token)).await?;

        self.store
            .fetch_access_token(&consumer, &token, verifier)
            .await
            .ok_or(OAuthError::InvalidVerifier)
    }

    /// Record that `user` approved `token`.
    pub async fn authorize_token(&self, token: &Token, user: &str) -> OAuthResult<Token> {
        let kind = TokenKind::Request;
        self.store
            .authorize_request_token(token, user)
            .await
            .ok_or_else(|| OAuthError::unknown_token(kind.as_str(), &token.key))
    }

    fn get_consumer(&self, request: &OAuthRequest) -> OAuthResult<Consumer> {
        let key = request.require("oauth_consumer_key")?;
        self.store.lookup_consumer(key).ok_or(OAuthError::UnknownConsumer)
    }

    async fn get_token(&self, request: &OAuthRequest, kind: TokenKind) -> OAuthResult<Token> {
        let key = request.require("oauth_token")?;
        self.store
            .lookup_token(kind, key)
            .await
            .ok_or_else(|| OAuthError::unknown_token(kind.as_str(), key))
    }

    async fn check_signature(
        &self,
        request: &OAuthRequest,
        consumer: &Consumer,
        token: Option<&Token>,
    ) -> OAuthResult<()> {
        let method = SignatureMethod::from_name(request.require("oauth_signature_method")?)?;
        self.check_timestamp(request.require("oauth_timestamp")?)?;

        let nonce = request.require("oauth_nonce")?;
        if self.store.lookup_nonce(consumer, token, nonce).await {
            return Err(OAuthError::NonceReused(nonce.to_owned()));
        }

        let presented = request.require("oauth_signature")?;
        let input = request.signing_input(consumer, token);
        if !signature::verify(method, &input, presented) {
            tracing::debug!(
                method = method.name(),
                base = %signature::base_string(input.http_method, input.url, input.params),
                "Signature mismatch"
            );
            return Err(OAuthError::InvalidSignature);
        }
        Ok(())
    }

    fn check_timestamp(&self, raw: &str) -> OAuthResult<()> {
        let given: u64 = raw.parse().map_err(|_| OAuthError::InvalidTimestamp(raw.to_owned()))?;
        let now = unix_now();
        if now.abs_diff(given) > self.timestamp_threshold.as_secs() {
            return Err(OAuthError::ExpiredTimestamp {
                given,
                now,
                threshold: self.timestamp_threshold,
            });
        }
        Ok(())
    }
}

fn check_version(request: &OAuthRequest) -> OAuthResult<()> {
    match request.get("oauth_version") {
        None | Some("1.0") => Ok(()),
        Some(other) => Err(OAuthError::UnsupportedVersion(other.to_owned())),
    }
}
