//! Error types for the mock servers.

use std::path::PathBuf;
use std::time::Duration;

/// Errors from OAuth 1.0a request verification.
///
/// The mock does not distinguish malformed input from a legitimate
/// rejection; both end up here and become a 401.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OAuthError {
    /// Consumer key not registered
    #[error("Invalid consumer")]
    UnknownConsumer,

    /// Token key does not match the stored token
    #[error("Invalid {kind} token: {key}")]
    UnknownToken {
        /// `request` or `access`
        kind: &'static str,
        /// Presented token key
        key: String,
    },

    /// Nonce already known to the store
    #[error("Nonce already used: {0}")]
    NonceReused(String),

    /// Verifier does not match, or access token exchange refused
    #[error("Invalid verifier")]
    InvalidVerifier,

    /// Required OAuth parameter absent
    #[error("Missing OAuth parameter: {0}")]
    MissingParameter(&'static str),

    /// Signature method not registered with the server
    #[error("Signature method {0} not supported, try one of: PLAINTEXT, HMAC-SHA1")]
    UnsupportedSignatureMethod(String),

    /// `oauth_version` other than 1.0
    #[error("OAuth version {0} not supported")]
    UnsupportedVersion(String),

    /// `oauth_timestamp` outside the accepted window
    #[error("Expired timestamp: given {given}, current {now}, threshold {threshold:?}")]
    ExpiredTimestamp {
        /// Client timestamp
        given: u64,
        /// Server clock
        now: u64,
        /// Accepted skew
        threshold: Duration,
    },

    /// `oauth_timestamp` not an integer
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Signature mismatch
    #[error("Invalid signature")]
    InvalidSignature,

    /// Malformed `Authorization` header or body
    #[error("Malformed request: {0}")]
    Malformed(String),
}

impl OAuthError {
    /// Create an unknown-token error.
    #[must_use]
    pub fn unknown_token(kind: &'static str, key: impl Into<String>) -> Self {
        Self::UnknownToken { kind, key: key.into() }
    }

    /// Create a malformed-request error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }
}

/// Errors from binding, serving and stopping a mock server.
#[derive(thiserror::Error, Debug)]
pub enum ServerError {
    /// Socket I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Certificate file could not be read
    #[error("Failed to read certificate {}: {source}", path.display())]
    Certificate {
        /// Path that was opened
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Certificate file holds no certificates
    #[error("No certificates found in {}", .0.display())]
    EmptyCertChain(PathBuf),

    /// Certificate file holds no private key
    #[error("No private key found in {}", .0.display())]
    MissingPrivateKey(PathBuf),

    /// rustls rejected the configuration
    #[error("TLS configuration error: {0}")]
    Tls(#[from] rustls::Error),

    /// Serve task panicked or was aborted
    #[error("Server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl ServerError {
    /// Create a certificate read error.
    #[must_use]
    pub fn certificate(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Certificate { path: path.into(), source }
    }
}

/// Fault raised by the signond model, carrying a D-Bus error name.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{name}: {message}")]
pub struct SignonError {
    /// Fully qualified D-Bus error name
    pub name: String,
    /// Human-readable message
    pub message: String,
}

impl SignonError {
    /// Error name prefix of the single-sign-on service.
    pub const PREFIX: &'static str = "com.google.code.AccountsSSO.SingleSignOn.Error.";

    pub const IDENTITY_NOT_FOUND: &'static str =
        "com.google.code.AccountsSSO.SingleSignOn.Error.IdentityNotFound";
    pub const PERMISSION_DENIED: &'static str =
        "com.google.code.AccountsSSO.SingleSignOn.Error.PermissionDenied";
    pub const USER_INTERACTION: &'static str =
        "com.google.code.AccountsSSO.SingleSignOn.Error.UserInteraction";
    pub const UNKNOWN_METHOD: &'static str = "org.freedesktop.DBus.Error.UnknownMethod";
    pub const INVALID_ARGS: &'static str = "org.freedesktop.DBus.Error.InvalidArgs";

    #[must_use]
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self { name: name.into(), message: message.into() }
    }

    /// Create an identity-not-found fault.
    #[must_use]
    pub fn identity_not_found() -> Self {
        Self::new(Self::IDENTITY_NOT_FOUND, "Identity not found")
    }

    /// Create a permission-denied fault.
    #[must_use]
    pub fn permission_denied() -> Self {
        Self::new(Self::PERMISSION_DENIED, "Permission denied")
    }

    /// Create a user-interaction fault.
    #[must_use]
    pub fn user_interaction() -> Self {
        Self::new(Self::USER_INTERACTION, "User interaction required")
    }

    /// Create an unknown-method fault.
    #[must_use]
    pub fn unknown_method(path: &str, interface: &str, method: &str) -> Self {
        Self::new(Self::UNKNOWN_METHOD, format!("No method {interface}.{method} on {path}"))
    }

    /// Create an invalid-arguments fault.
    #[must_use]
    pub fn invalid_args(message: impl Into<String>) -> Self {
        Self::new(Self::INVALID_ARGS, message)
    }

    /// Returns true if this fault belongs to the single-sign-on namespace.
    #[must_use]
    pub fn is_signon_error(&self) -> bool {
        self.name.starts_with(Self::PREFIX)
    }
}

/// Result type alias for OAuth verification.
pub type OAuthResult<T> = Result<T, OAuthError>;

/// Result type alias for server lifecycle operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Result type alias for signond method calls.
pub type SignonResult<T> = Result<T, SignonError>;
