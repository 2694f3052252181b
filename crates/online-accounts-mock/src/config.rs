//! Configuration for the mock login servers.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Fixed credentials and endpoints shared by every mock instance.
pub mod defaults {
    use std::time::Duration;

    /// Port of the plain-HTTP OAuth 1.0a mock.
    pub const OAUTH1_PORT: u16 = 5121;

    /// Port of the TLS OAuth 2.0 mock.
    pub const OAUTH2_PORT: u16 = 5120;

    /// Consumer key registered with the OAuth 1.0a mock.
    pub const CONSUMER_KEY: &str = "C0nsum3rKey";

    /// Consumer secret registered with the OAuth 1.0a mock.
    pub const CONSUMER_SECRET: &str = "C0nsum3rS3cr3t";

    pub const REQUEST_TOKEN_KEY: &str = "requestkey";
    pub const REQUEST_TOKEN_SECRET: &str = "requestsecret";
    pub const ACCESS_TOKEN_KEY: &str = "accesskey";
    pub const ACCESS_TOKEN_SECRET: &str = "accesssecret";

    /// The only nonce the token store knows about.
    pub const NONCE: &str = "nonce";

    /// Verifier attached to the request token after login.
    pub const VERIFIER: &str = "verifier";

    /// Callback every looked-up token is redirected to.
    pub const CALLBACK_URL: &str = "http://localhost:5121/success.html";

    /// Realm announced in `WWW-Authenticate` challenges.
    pub const REALM: &str = "http://photos.example.net/";

    /// Certificate (and key) served by the OAuth 2.0 mock.
    pub const CERT_PATH: &str = "/etc/ssl/certs/uoa-test-server.pem";

    /// How long the test driver waits on a login signal.
    pub const SIGNAL_TIMEOUT: Duration = Duration::from_secs(30);

    /// Accepted clock skew for `oauth_timestamp`.
    pub const TIMESTAMP_THRESHOLD: Duration = Duration::from_secs(300);

    /// Token lifetime reported in OAuth 2.0 redirect fragments.
    pub const OAUTH2_EXPIRES_IN: u64 = 3600;
}

/// Mock server configuration.
///
/// Each server instance owns an independent copy, so parallel tests
/// never share credentials or ports.
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Address the listeners bind to.
    pub bind_addr: IpAddr,

    /// Port of the OAuth 1.0a mock (0 picks an ephemeral port).
    pub oauth1_port: u16,

    /// Port of the OAuth 2.0 mock (0 picks an ephemeral port).
    pub oauth2_port: u16,

    /// Host (and optional port) used in login form actions and redirects.
    ///
    /// `None` means `localhost:<bound port>`.
    pub public_host: Option<String>,

    pub consumer_key: String,
    pub consumer_secret: String,
    pub request_token_key: String,
    pub request_token_secret: String,
    pub access_token_key: String,
    pub access_token_secret: String,
    pub nonce: String,
    pub verifier: String,
    pub callback_url: String,
    pub realm: String,

    /// PEM file holding the certificate chain and private key.
    ///
    /// `None` serves the OAuth 2.0 mock without TLS.
    pub cert_path: Option<PathBuf>,

    /// Default timeout for `LoginSignals` waits.
    pub signal_timeout: Duration,

    /// Accepted clock skew for signed requests.
    pub timestamp_threshold: Duration,
}

impl MockConfig {
    /// Configuration matching the fixed ports and credentials the
    /// Online Accounts test providers are set up with.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            oauth1_port: defaults::OAUTH1_PORT,
            oauth2_port: defaults::OAUTH2_PORT,
            public_host: None,
            consumer_key: defaults::CONSUMER_KEY.to_string(),
            consumer_secret: defaults::CONSUMER_SECRET.to_string(),
            request_token_key: defaults::REQUEST_TOKEN_KEY.to_string(),
            request_token_secret: defaults::REQUEST_TOKEN_SECRET.to_string(),
            access_token_key: defaults::ACCESS_TOKEN_KEY.to_string(),
            access_token_secret: defaults::ACCESS_TOKEN_SECRET.to_string(),
            nonce: defaults::NONCE.to_string(),
            verifier: defaults::VERIFIER.to_string(),
            callback_url: defaults::CALLBACK_URL.to_string(),
            realm: defaults::REALM.to_string(),
            cert_path: Some(PathBuf::from(defaults::CERT_PATH)),
            signal_timeout: defaults::SIGNAL_TIMEOUT,
            timestamp_threshold: defaults::TIMESTAMP_THRESHOLD,
        }
    }

    /// Create a test configuration: ephemeral ports, no TLS, short waits.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            oauth1_port: 0,
            oauth2_port: 0,
            cert_path: None,
            signal_timeout: Duration::from_secs(5),
            ..Self::new()
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Recognised variables: `OAM_BIND_ADDR`, `OAM_OAUTH1_PORT`,
    /// `OAM_OAUTH2_PORT`, `OAM_PUBLIC_HOST`, `OAM_CERT_PATH` and
    /// `OAM_SIGNAL_TIMEOUT_SECS`. Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns error if environment variables are invalid.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::new();

        if let Ok(addr) = std::env::var("OAM_BIND_ADDR") {
            config.bind_addr = addr.parse()?;
        }
        if let Ok(port) = std::env::var("OAM_OAUTH1_PORT") {
            config.oauth1_port = port.parse()?;
        }
        if let Ok(port) = std::env::var("OAM_OAUTH2_PORT") {
            config.oauth2_port = port.parse()?;
        }
        if let Ok(host) = std::env::var("OAM_PUBLIC_HOST") {
            config.public_host = Some(host);
        }
        if let Ok(path) = std::env::var("OAM_CERT_PATH") {
            config.cert_path = if path.is_empty() { None } else { Some(PathBuf::from(path)) };
        }
        if let Ok(secs) = std::env::var("OAM_SIGNAL_TIMEOUT_SECS") {
            config.signal_timeout = Duration::from_secs(secs.parse()?);
        }

        Ok(config)
    }

    /// Socket address for the OAuth 1.0a listener.
    #[must_use]
    pub const fn oauth1_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.oauth1_port)
    }

    /// Socket address for the OAuth 2.0 listener.
    #[must_use]
    pub const fn oauth2_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.oauth2_port)
    }

    /// Check if the OAuth 2.0 mock will be served over TLS.
    #[must_use]
    pub const fn has_tls(&self) -> bool {
        self.cert_path.is_some()
    }

    /// Host used in absolute URLs handed to the browser.
    #[must_use]
    pub fn public_host_for(&self, bound_port: u16) -> String {
        self.public_host.clone().unwrap_or_else(|| format!("localhost:{bound_port}"))
    }
}

impl Default for MockConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = MockConfig::default();
        assert_eq!(config.oauth1_port, 5121);
        assert_eq!(config.oauth2_port, 5120);
        assert_eq!(config.consumer_key, "C0nsum3rKey");
        assert!(config.has_tls());
    }

    #[test]
    fn test_config_for_testing() {
        let config = MockConfig::for_testing();
        assert_eq!(config.oauth1_port, 0);
        assert!(!config.has_tls());
        assert_eq!(config.verifier, defaults::VERIFIER);
    }

    #[test]
    fn test_public_host() {
        let mut config = MockConfig::for_testing();
        assert_eq!(config.public_host_for(4242), "localhost:4242");

        config.public_host = Some("example.test:8080".into());
        assert_eq!(config.public_host_for(4242), "example.test:8080");
    }
}
