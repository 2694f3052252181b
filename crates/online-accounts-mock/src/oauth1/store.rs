//! In-memory token store backing the OAuth 1.0a mock.
//!
//! Holds exactly one consumer, one request token and one access token.
//! Lookups return clones; mutations happen in place under the lock.

use tokio::sync::RwLock;

use super::types::{Consumer, Token, TokenKind};
use crate::config::MockConfig;

struct Tokens {
    request: Token,
    access: Token,
}

impl Tokens {
    fn get_mut(&mut self, kind: TokenKind) -> &mut Token {
        match kind {
            TokenKind::Request => &mut self.request,
            TokenKind::Access => &mut self.access,
        }
    }
}

/// Fixed-identity OAuth 1.0a data store.
pub struct TokenStore {
    consumer: Consumer,
    nonce: String,
    verifier: String,
    callback_url: String,
    tokens: RwLock<Tokens>,
}

impl TokenStore {
    #[must_use]
    pub fn new(config: &MockConfig) -> Self {
        Self {
            consumer: Consumer::new(&config.consumer_key, &config.consumer_secret),
            nonce: config.nonce.clone(),
            verifier: config.verifier.clone(),
            callback_url: config.callback_url.clone(),
            tokens: RwLock::new(Tokens {
                request: Token::new(&config.request_token_key, &config.request_token_secret),
                access: Token::new(&config.access_token_key, &config.access_token_secret),
            }),
        }
    }

    /// The verifier `fetch_access_token` accepts.
    #[must_use]
    pub fn verifier(&self) -> &str {
        &self.verifier
    }

    /// Look up the consumer by key.
    #[must_use]
    pub fn lookup_consumer(&self, key: &str) -> Option<Consumer> {
        (key == self.consumer.key).then(|| self.consumer.clone())
    }

    /// Look up a token by kind and key.
    ///
    /// A hit also points the token's callback at the configured success
    /// URL, standing in for a real callback registration step.
    pub async fn lookup_token(&self, kind: TokenKind, key: &str) -> Option<Token> {
        let mut tokens = self.tokens.write().await;
        let token = tokens.get_mut(kind);
        if token.key != key {
            return None;
        }
        token.set_callback(self.callback_url.clone());
        Some(token.clone())
    }

    /// Check a nonce against the single known (consumer, token, nonce) triple.
    ///
    /// Returns true only when the consumer key matches, the token is one
    /// of the two stored tokens, and the nonce is the fixed nonce.
    pub async fn lookup_nonce(
        &self,
        consumer: &Consumer,
        token: Option<&Token>,
        nonce: &str,
    ) -> bool {
        let Some(token) = token else {
            return false;
        };
        let tokens = self.tokens.read().await;
        consumer.key == self.consumer.key
            && (token.key == tokens.request.key || token.key == tokens.access.key)
            && nonce == self.nonce
    }

    /// Hand out the request token to a known consumer.
    ///
    /// The callback is stored as given; it is not validated.
    pub async fn fetch_request_token(
        &self,
        consumer: &Consumer,
        callback: Option<&str>,
    ) -> Option<Token> {
        if consumer.key != self.consumer.key {
            return None;
        }
        let mut tokens = self.tokens.write().await;
        if let Some(callback) = callback {
            tokens.request.set_callback(callback);
        }
        Some(tokens.request.clone())
    }

    /// Exchange the request token for the access token.
    pub async fn fetch_access_token(
        &self,
        consumer: &Consumer,
        token: &Token,
        verifier: &str,
    ) -> Option<Token> {
        let tokens = self.tokens.read().await;
        if consumer.key == self.consumer.key
            && token.key == tokens.request.key
            && verifier == self.verifier
        {
            return Some(tokens.access.clone());
        }
        None
    }

    /// Authorize the request token on behalf of `user`.
    ///
    /// The user is recorded on the *access* token, which is what
    /// `fetch_access_token` later returns as the screen name. Request
    /// and access identity are not kept apart.
    pub async fn authorize_request_token(&self, token: &Token, user: &str) -> Option<Token> {
        let mut tokens = self.tokens.write().await;
        if token.key != tokens.request.key {
            return None;
        }
        tokens.access.username = Some(user.to_owned());
        Some(tokens.request.clone())
    }

    /// Attach the configured verifier to the request token.
    pub async fn attach_verifier(&self, kind: TokenKind) -> Token {
        let mut tokens = self.tokens.write().await;
        let token = tokens.get_mut(kind);
        token.set_verifier(self.verifier.clone());
        token.clone()
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore").field("consumer", &self.consumer.key).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> TokenStore {
        TokenStore::new(&MockConfig::for_testing())
    }

    fn consumer() -> Consumer {
        Consumer::new("C0nsum3rKey", "C0nsum3rS3cr3t")
    }

    #[test]
    fn test_lookup_consumer() {
        let store = store();
        assert_eq!(store.lookup_consumer("C0nsum3rKey"), Some(consumer()));
        assert!(store.lookup_consumer("someoneelse").is_none());
        assert_eq!(store.verifier(), "verifier");
    }

    #[tokio::test]
    async fn test_lookup_token_sets_callback() {
        let store = store();
        let token = store.lookup_token(TokenKind::Request, "requestkey").await;
        assert_eq!(
            token.and_then(|t| t.callback).as_deref(),
            Some("http://localhost:5121/success.html")
        );

        let by_kind = store.lookup_token(TokenKind::Request, "accesskey").await;
        assert!(by_kind.is_none());
        let access = store.lookup_token(TokenKind::Access, "accesskey").await;
        assert!(access.is_some());
    }

    #[tokio::test]
    async fn test_lookup_nonce() {
        let store = store();
        let request = Token::new("requestkey", "");
        let access = Token::new("accesskey", "");
        let other = Token::new("other", "");
        let alien = Consumer::new("x", "y");
        let consumer = consumer();

        assert!(store.lookup_nonce(&consumer, Some(&request), "nonce").await);
        assert!(store.lookup_nonce(&consumer, Some(&access), "nonce").await);
        assert!(!store.lookup_nonce(&consumer, Some(&other), "nonce").await);
        assert!(!store.lookup_nonce(&consumer, Some(&request), "new").await);
        assert!(!store.lookup_nonce(&consumer, None, "nonce").await);
        assert!(!store.lookup_nonce(&alien, Some(&request), "nonce").await);
    }

    #[tokio::test]
    async fn test_fetch_request_token_stores_callback() {
        let store = store();
        let token = store.fetch_request_token(&consumer(), Some("oob")).await;
        let token = token.unwrap();
        assert_eq!(token.key, "requestkey");
        assert_eq!(token.callback.as_deref(), Some("oob"));

        let stranger = Consumer::new("x", "y");
        assert!(store.fetch_request_token(&stranger, None).await.is_none());
    }

    #[tokio::test]
    async fn test_authorize_then_exchange() {
        let store = store();
        let request = store.fetch_request_token(&consumer(), None).await.unwrap();

        let authorized = store.authorize_request_token(&request, "funnyguy").await;
        assert_eq!(authorized.unwrap().key, "requestkey");

        let access = store.fetch_access_token(&consumer(), &request, "verifier").await.unwrap();
        assert_eq!(access.key, "accesskey");
        assert_eq!(access.username.as_deref(), Some("funnyguy"));
    }

    #[tokio::test]
    async fn test_authorize_unrelated_token() {
        let store = store();
        let stranger = Token::new("unrelated", "secret");
        let authorized = store.authorize_request_token(&stranger, "funnyguy").await;
        assert!(authorized.is_none());
    }

    #[tokio::test]
    async fn test_fetch_access_token_requires_verifier() {
        let store = store();
        let request = Token::new("requestkey", "requestsecret");
        let access = Token::new("accesskey", "");

        let consumer = consumer();

        let wrong = store.fetch_access_token(&consumer, &request, "wrong").await;
        assert!(wrong.is_none());
        let not_request = store.fetch_access_token(&consumer, &access, "verifier").await;
        assert!(not_request.is_none());
    }
}
