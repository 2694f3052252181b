//! End-to-end tests for the OAuth 2.0 mock, over plain HTTP and over TLS.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use rustls::pki_types::ServerName;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tower::ServiceExt;

use online_accounts_mock::oauth2::OAuth2State;
use online_accounts_mock::server::transport::create_oauth2_router;
use online_accounts_mock::{LoginSignals, MockConfig, MockKind, MockServer, ServerError};

const WAIT: Duration = Duration::from_secs(5);

fn setup_router() -> (axum::Router, LoginSignals) {
    let signals = LoginSignals::new();
    let state = Arc::new(OAuth2State::new(&MockConfig::for_testing(), signals.clone(), 5120));
    (create_oauth2_router(state), signals)
}

fn login_request(path: &str, body: &'static str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

// =============================================================================
// Router tests
// =============================================================================

#[tokio::test]
async fn test_any_path_serves_login_page() {
    let (router, signals) = setup_router();

    for path in ["/", "/o/oauth2/auth?client_id=x", "/deeply/nested/page.html"] {
        let request = Request::builder().uri(path).body(Body::empty()).unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{path}");

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("name=\"password\""));
        assert!(html.contains("action=\"http://localhost:5120/login.html\""));
    }
    assert!(signals.show_login.is_set());
}

#[tokio::test]
async fn test_login_redirects_with_token() {
    let (router, signals) = setup_router();

    let request = login_request("/login.html", "username=john&password=loser");
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert_eq!(
        location,
        "http://localhost:5120/success.html#access_token=johnloser&expires_in=3600"
    );
    assert!(signals.login_done.is_set());
}

#[tokio::test]
async fn test_login_missing_password() {
    let (router, signals) = setup_router();

    let response = router.oneshot(login_request("/login.html", "username=john")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(!signals.login_done.is_set());
}

#[tokio::test]
async fn test_head_request() {
    let (router, _) = setup_router();

    let request = Request::builder().method("HEAD").uri("/").body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/html");
}

// =============================================================================
// Socket tests
// =============================================================================

#[tokio::test]
async fn test_login_over_http() {
    let server = MockServer::start(MockKind::OAuth2, &MockConfig::for_testing()).await.unwrap();
    assert!(server.base_url().starts_with("http://"));
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    let show_login = server.signals().show_login.clone();
    let waiter = tokio::spawn(async move { show_login.wait(WAIT).await });

    let response = client.get(format!("{}/", server.base_url())).send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert!(waiter.await.unwrap());

    let response = client
        .post(format!("{}/login.html", server.base_url()))
        .header(reqwest::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body("username=john&password=loser")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::MOVED_PERMANENTLY);
    let location = response.headers()[reqwest::header::LOCATION].to_str().unwrap();
    assert!(location.contains("access_token=johnloser&expires_in=3600"));
    assert!(server.signals().login_done.wait(WAIT).await);

    server.shutdown().await.unwrap();
}

/// Self-signed certificate for `localhost`, written as one combined PEM.
fn write_cert() -> (tempfile::NamedTempFile, rustls::pki_types::CertificateDer<'static>) {
    let cert = rcgen::generate_simple_self_signed(vec!["localhost".into()]).unwrap();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(cert.cert.pem().as_bytes()).unwrap();
    file.write_all(cert.key_pair.serialize_pem().as_bytes()).unwrap();
    (file, cert.cert.der().clone())
}

fn tls_connector(root: rustls::pki_types::CertificateDer<'static>) -> TlsConnector {
    let mut roots = rustls::RootCertStore::empty();
    roots.add(root).unwrap();
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_root_certificates(roots)
        .with_no_client_auth();
    TlsConnector::from(Arc::new(config))
}

/// Send one HTTP/1.1 request over TLS and return the raw response.
async fn https_exchange(
    connector: &TlsConnector,
    server: &online_accounts_mock::RunningServer,
    request: &str,
) -> String {
    let tcp = TcpStream::connect(server.local_addr()).await.unwrap();
    let domain = ServerName::try_from("localhost").unwrap();
    let mut stream = connector.connect(domain, tcp).await.unwrap();

    stream.write_all(request.as_bytes()).await.unwrap();
    stream.flush().await.unwrap();

    let mut buf = Vec::new();
    // Peers may drop the connection without close_notify; keep what arrived.
    let _ = stream.read_to_end(&mut buf).await;
    String::from_utf8_lossy(&buf).into_owned()
}

#[tokio::test]
async fn test_login_over_https() {
    let (cert_file, root) = write_cert();
    let mut config = MockConfig::for_testing();
    config.cert_path = Some(cert_file.path().to_path_buf());

    let server = MockServer::start(MockKind::OAuth2, &config).await.unwrap();
    assert!(server.base_url().starts_with("https://"));
    let connector = tls_connector(root);

    let page = https_exchange(
        &connector,
        &server,
        "GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    )
    .await;
    assert!(page.starts_with("HTTP/1.1 200"));
    assert!(page.contains("Login here"));
    assert!(server.signals().show_login.wait(WAIT).await);

    let body = "username=john&password=loser";
    let login = format!(
        "POST /login.html HTTP/1.1\r\nHost: localhost\r\n\
         Content-Type: application/x-www-form-urlencoded\r\n\
         Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let response = https_exchange(&connector, &server, &login).await;
    assert!(response.starts_with("HTTP/1.1 301"));

    let port = server.local_addr().port();
    let expected =
        format!("https://localhost:{port}/success.html#access_token=johnloser&expires_in=3600");
    assert!(response.contains(&expected), "{response}");
    assert!(server.signals().login_done.is_set());

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_bind_fails_without_certificate() {
    let mut config = MockConfig::for_testing();
    config.cert_path = Some("/nonexistent/uoa-test-server.pem".into());

    let err = MockServer::bind(MockKind::OAuth2, &config).await.unwrap_err();
    assert!(matches!(err, ServerError::Certificate { .. }));
}
