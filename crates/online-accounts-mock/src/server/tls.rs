//! TLS termination for the OAuth 2.0 mock.
//!
//! The certificate file holds both the certificate chain and the private
//! key, PEM encoded.

use std::io::BufReader;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use rustls::ServerConfig;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls_pemfile::{certs, private_key};
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsAcceptor;
use tokio_rustls::server::TlsStream;

use crate::error::{ServerError, ServerResult};

fn open(path: &Path) -> ServerResult<BufReader<std::fs::File>> {
    std::fs::File::open(path).map(BufReader::new).map_err(|e| ServerError::certificate(path, e))
}

fn load_cert_chain(path: &Path) -> ServerResult<Vec<CertificateDer<'static>>> {
    let chain = certs(&mut open(path)?)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ServerError::certificate(path, e))?;
    if chain.is_empty() {
        return Err(ServerError::EmptyCertChain(path.to_path_buf()));
    }
    Ok(chain)
}

fn load_private_key(path: &Path) -> ServerResult<PrivateKeyDer<'static>> {
    private_key(&mut open(path)?)
        .map_err(|e| ServerError::certificate(path, e))?
        .ok_or_else(|| ServerError::MissingPrivateKey(path.to_path_buf()))
}

/// Build a server config from a combined certificate + key PEM file.
pub fn load_server_config(path: &Path) -> ServerResult<Arc<ServerConfig>> {
    let chain = load_cert_chain(path)?;
    let key = load_private_key(path)?;

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut config = ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .with_no_client_auth()
        .with_single_cert(chain, key)?;
    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    Ok(Arc::new(config))
}

/// A TCP listener that completes the TLS handshake before handing the
/// connection to axum.
///
/// Handshakes run inline in `accept`, so connections are admitted one
/// at a time. Failed handshakes are logged and skipped.
pub struct TlsListener {
    inner: TcpListener,
    acceptor: TlsAcceptor,
}

impl TlsListener {
    #[must_use]
    pub fn new(inner: TcpListener, config: Arc<ServerConfig>) -> Self {
        Self { inner, acceptor: TlsAcceptor::from(config) }
    }
}

impl axum::serve::Listener for TlsListener {
    type Io = TlsStream<TcpStream>;
    type Addr = SocketAddr;

    async fn accept(&mut self) -> (Self::Io, Self::Addr) {
        loop {
            let (stream, addr) = match self.inner.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::warn!(error = %e, "Accept failed");
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    continue;
                }
            };

            match self.acceptor.accept(stream).await {
                Ok(tls) => return (tls, addr),
                Err(e) => tracing::debug!(peer = %addr, error = %e, "TLS handshake failed"),
            }
        }
    }

    fn local_addr(&self) -> std::io::Result<Self::Addr> {
        self.inner.local_addr()
    }
}

impl std::fmt::Debug for TlsListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsListener").field("local_addr", &self.inner.local_addr().ok()).finish()
    }
}
