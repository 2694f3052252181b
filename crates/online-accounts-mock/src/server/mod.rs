//! Mock server lifecycle.
//!
//! `MockServer::bind` claims the socket, `run` moves the serve loop onto
//! a background task, and `RunningServer::shutdown` stops it through a
//! cancellation token. A server is never restarted; bind a new one per
//! test.

pub mod tls;
pub mod transport;

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::MockConfig;
use crate::error::ServerResult;
use crate::oauth1::OAuth1State;
use crate::oauth2::OAuth2State;
use crate::sync::LoginSignals;
use tls::TlsListener;

/// Which mock a server instance plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockKind {
    /// Three-legged OAuth 1.0a over plain HTTP.
    OAuth1,
    /// Implicit-grant OAuth 2.0 login, over TLS when a certificate is configured.
    OAuth2,
}

enum Bound {
    Plain(TcpListener),
    Tls(TlsListener),
}

/// A mock server that has bound its socket but is not serving yet.
pub struct MockServer {
    kind: MockKind,
    listener: Bound,
    router: Router,
    signals: LoginSignals,
    local_addr: SocketAddr,
    scheme: &'static str,
}

impl MockServer {
    /// Bind the listening socket for `kind`.
    ///
    /// # Errors
    ///
    /// Returns error if the port is taken or the certificate cannot be loaded.
    pub async fn bind(kind: MockKind, config: &MockConfig) -> ServerResult<Self> {
        let addr = match kind {
            MockKind::OAuth1 => config.oauth1_addr(),
            MockKind::OAuth2 => config.oauth2_addr(),
        };
        let tcp = TcpListener::bind(addr).await?;
        let local_addr = tcp.local_addr()?;
        let signals = LoginSignals::with_timeout(config.signal_timeout);

        let (listener, router, scheme) = match kind {
            MockKind::OAuth1 => {
                let state = Arc::new(OAuth1State::new(config, signals.clone(), local_addr.port()));
                (Bound::Plain(tcp), transport::create_oauth1_router(state), "http")
            }
            MockKind::OAuth2 => {
                let state = Arc::new(OAuth2State::new(config, signals.clone(), local_addr.port()));
                let router = transport::create_oauth2_router(state);
                match config.cert_path.as_deref() {
                    Some(path) => {
                        let tls_config = tls::load_server_config(path)?;
                        (Bound::Tls(TlsListener::new(tcp, tls_config)), router, "https")
                    }
                    None => (Bound::Plain(tcp), router, "http"),
                }
            }
        };

        tracing::info!(kind = ?kind, addr = %local_addr, scheme, "Mock server bound");

        Ok(Self { kind, listener, router, signals, local_addr, scheme })
    }

    #[must_use]
    pub const fn kind(&self) -> MockKind {
        self.kind
    }

    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Login signals, shared with the handlers.
    #[must_use]
    pub const fn signals(&self) -> &LoginSignals {
        &self.signals
    }

    /// `scheme://ip:port` of the bound socket.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme, self.local_addr)
    }

    /// Start serving on a background task.
    #[must_use]
    pub fn run(self) -> RunningServer {
        let cancel = CancellationToken::new();
        let shutdown = {
            let cancel = cancel.clone();
            async move { cancel.cancelled().await }
        };

        let task = match self.listener {
            Bound::Plain(listener) => {
                let serve = axum::serve(listener, self.router).with_graceful_shutdown(shutdown);
                tokio::spawn(serve.into_future())
            }
            Bound::Tls(listener) => {
                let serve = axum::serve(listener, self.router).with_graceful_shutdown(shutdown);
                tokio::spawn(serve.into_future())
            }
        };

        tracing::info!(
            kind = ?self.kind,
            "Mock server running on {}://{}",
            self.scheme,
            self.local_addr
        );

        RunningServer {
            kind: self.kind,
            local_addr: self.local_addr,
            scheme: self.scheme,
            signals: self.signals,
            cancel,
            task: Some(task),
        }
    }

    /// Bind and run in one step.
    ///
    /// # Errors
    ///
    /// Returns error if binding fails.
    pub async fn start(kind: MockKind, config: &MockConfig) -> ServerResult<RunningServer> {
        Ok(Self::bind(kind, config).await?.run())
    }
}

impl std::fmt::Debug for MockServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockServer")
            .field("kind", &self.kind)
            .field("local_addr", &self.local_addr)
            .finish_non_exhaustive()
    }
}

/// Handle to a serving mock. Dropping it cancels the server.
pub struct RunningServer {
    kind: MockKind,
    local_addr: SocketAddr,
    scheme: &'static str,
    signals: LoginSignals,
    cancel: CancellationToken,
    task: Option<JoinHandle<std::io::Result<()>>>,
}

impl RunningServer {
    #[must_use]
    pub const fn kind(&self) -> MockKind {
        self.kind
    }

    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    #[must_use]
    pub const fn signals(&self) -> &LoginSignals {
        &self.signals
    }

    #[must_use]
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme, self.local_addr)
    }

    /// Token that stops the server when cancelled.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop accepting, drain open connections and wait for the task.
    ///
    /// # Errors
    ///
    /// Returns error if the serve loop failed or panicked.
    pub async fn shutdown(mut self) -> ServerResult<()> {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.await??;
        }
        tracing::info!(kind = ?self.kind, "Mock server shut down");
        Ok(())
    }
}

impl Drop for RunningServer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for RunningServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunningServer")
            .field("kind", &self.kind)
            .field("local_addr", &self.local_addr)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}
