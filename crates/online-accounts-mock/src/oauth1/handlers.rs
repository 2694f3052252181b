//! OAuth 1.0a endpoint handlers.
//!
//! Implements the three legs of the handshake:
//! - `POST /oauth1/request_token`: temporary credentials
//! - `GET /oauth1/authorize` + `POST /login.html`: user authorization
//! - `POST /oauth1/access_token`: token credentials

use std::sync::Arc;

use axum::{
    Form,
    extract::State,
    http::{HeaderMap, HeaderValue, Method, StatusCode, Uri, header},
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;
use tokio::sync::RwLock;
use url::Url;

use super::request::OAuthRequest;
use super::server::OAuthServer;
use super::types::{Token, TokenKind};
use crate::config::MockConfig;
use crate::error::OAuthError;
use crate::login;
use crate::sync::LoginSignals;

/// Shared state of one OAuth 1.0a mock instance.
pub struct OAuth1State {
    pub server: OAuthServer,
    /// Token handed out by the last authorize page, consumed by the login post.
    pub pending: RwLock<Option<Token>>,
    pub signals: LoginSignals,
    /// `host[:port]` used when the request carries no `Host` header.
    pub public_host: String,
    pub realm: String,
}

impl OAuth1State {
    #[must_use]
    pub fn new(config: &MockConfig, signals: LoginSignals, bound_port: u16) -> Self {
        Self {
            server: OAuthServer::new(config),
            pending: RwLock::new(None),
            signals,
            public_host: config.public_host_for(bound_port),
            realm: config.realm.clone(),
        }
    }

    /// Rebuild the absolute URL the client signed.
    fn request_url(&self, headers: &HeaderMap, uri: &Uri) -> Result<Url, OAuthError> {
        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(&self.public_host);
        let path = uri.path_and_query().map_or("/", |p| p.as_str());
        Url::parse(&format!("http://{host}{path}"))
            .map_err(|e| OAuthError::malformed(e.to_string()))
    }

    fn parse_request(
        &self,
        method: &Method,
        uri: &Uri,
        headers: &HeaderMap,
        body: Option<&str>,
    ) -> Result<OAuthRequest, OAuthError> {
        let url = self.request_url(headers, uri)?;
        let authorization = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok());
        OAuthRequest::from_parts(method.as_str(), url, authorization, body)
    }

    fn unauthorized(&self, err: &OAuthError) -> Response {
        tracing::warn!(error = %err, "Rejected OAuth request");
        let challenge = format!("OAuth realm=\"{}\"", self.realm);
        let mut response = (StatusCode::UNAUTHORIZED, err.to_string()).into_response();
        if let Ok(value) = HeaderValue::from_str(&challenge) {
            response.headers_mut().insert(header::WWW_AUTHENTICATE, value);
        }
        response
    }
}

impl std::fmt::Debug for OAuth1State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth1State")
            .field("public_host", &self.public_host)
            .finish_non_exhaustive()
    }
}

// ─── Authorization ───────────────────────────────────────────────────────────

/// `GET /oauth1/authorize`
///
/// Look up the request token named in the query and serve the login page.
pub async fn handle_authorize(
    State(state): State<Arc<OAuth1State>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let token = match state.parse_request(&method, &uri, &headers, None) {
        Ok(request) => state.server.fetch_request_token(&request).await,
        Err(err) => Err(err),
    };
    let token = match token {
        Ok(token) => token,
        Err(err) => return state.unauthorized(&err),
    };

    tracing::info!(token = %token.key, "Serving OAuth 1.0a login page");
    *state.pending.write().await = Some(token);

    let action = format!("http://{}/login.html", state.public_host);
    let response = html_response(login::render_oauth1_login_page(&action));
    state.signals.show_login.set();
    response
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: Option<String>,
}

/// `POST /login.html`
///
/// Authorize the pending token for the submitted user and bounce the
/// browser to the callback with the verifier.
pub async fn handle_login(
    State(state): State<Arc<OAuth1State>>,
    Form(form): Form<LoginForm>,
) -> Response {
    let Some(username) = form.username.filter(|u| !u.is_empty()) else {
        return (StatusCode::BAD_REQUEST, "Missing username").into_response();
    };
    let Some(pending) = state.pending.read().await.clone() else {
        return (StatusCode::BAD_REQUEST, "No authorization in progress").into_response();
    };

    if let Err(err) = state.server.authorize_token(&pending, &username).await {
        return state.unauthorized(&err);
    }
    let token = state.server.store().attach_verifier(TokenKind::Request).await;

    let Some(location) = token.callback_url() else {
        return (StatusCode::BAD_REQUEST, "Token has no callback").into_response();
    };

    tracing::info!(user = %username, location = %location, "Login accepted");

    let response = redirect(&location);
    state.signals.login_done.set();
    response
}

// ─── Token Endpoints ─────────────────────────────────────────────────────────

/// `POST /oauth1/request_token`
pub async fn handle_request_token(
    State(state): State<Arc<OAuth1State>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let result = match state.parse_request(&method, &uri, &headers, Some(&body)) {
        Ok(request) => state.server.fetch_request_token(&request).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(token) => {
            tracing::info!(token = %token.key, "Issued request token");
            form_response(token.to_form_string())
        }
        Err(err) => state.unauthorized(&err),
    }
}

/// `POST /oauth1/access_token`
///
/// Responds with the access token plus the authorized user's `ScreenName`.
pub async fn handle_access_token(
    State(state): State<Arc<OAuth1State>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let result = match state.parse_request(&method, &uri, &headers, Some(&body)) {
        Ok(request) => state.server.fetch_access_token(&request).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(token) => {
            let screen_name = token.username.as_deref().unwrap_or_default();
            tracing::info!(
                token = %token.key,
                screen_name = %screen_name,
                "Issued access token"
            );
            let screen_name =
                serde_urlencoded::to_string([("ScreenName", screen_name)]).unwrap_or_default();
            form_response(format!("{}&{}", token.to_form_string(), screen_name))
        }
        Err(err) => state.unauthorized(&err),
    }
}

// ─── Responses ───────────────────────────────────────────────────────────────

pub(crate) fn html_response(body: String) -> Response {
    let mut response = Html(body).into_response();
    response.headers_mut().insert(header::CONTENT_ENCODING, HeaderValue::from_static("utf-8"));
    response
}

fn form_response(body: String) -> Response {
    ([(header::CONTENT_TYPE, "application/x-www-form-urlencoded")], body).into_response()
}

/// Permanent redirect, as the login forms expect.
pub(crate) fn redirect(location: &str) -> Response {
    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location.to_owned())]).into_response()
}
