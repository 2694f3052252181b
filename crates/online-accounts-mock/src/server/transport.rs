//! HTTP routers for the two mocks.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::oauth1::OAuth1State;
use crate::oauth1::handlers::{
    handle_access_token, handle_authorize, handle_login, handle_request_token,
};
use crate::oauth2::{self, OAuth2State};

const AUTHORIZE_PREFIX: &str = "/oauth1/authorize";

/// Create the router for the OAuth 1.0a mock.
///
/// Any `GET` whose path starts with `/oauth1/authorize` serves the login
/// page, so `/oauth1/authorize.html` works as well.
pub fn create_oauth1_router(state: Arc<OAuth1State>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(AUTHORIZE_PREFIX, get(handle_authorize).head(handle_head))
        .route("/oauth1/request_token", post(handle_request_token))
        .route("/oauth1/access_token", post(handle_access_token))
        .route("/login.html", post(handle_login))
        .fallback(handle_fallback)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Create the router for the OAuth 2.0 mock.
///
/// Every path serves the login page on `GET` and accepts the form on `POST`.
pub fn create_oauth2_router(state: Arc<OAuth2State>) -> Router {
    Router::new()
        .route("/", get(oauth2::handle_login_page).post(oauth2::handle_login).head(handle_head))
        .route(
            "/{*path}",
            get(oauth2::handle_login_page).post(oauth2::handle_login).head(handle_head),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "online-accounts-mock",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn handle_head() -> Response {
    (StatusCode::OK, [(header::CONTENT_TYPE, "text/html")]).into_response()
}

async fn handle_fallback(
    state: State<Arc<OAuth1State>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    if method == Method::HEAD {
        return handle_head().await;
    }
    if method == Method::GET && uri.path().starts_with(AUTHORIZE_PREFIX) {
        return handle_authorize(state, method, uri, headers).await;
    }
    StatusCode::NOT_FOUND.into_response()
}
