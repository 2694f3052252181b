//! OAuth 2.0 implicit-grant login mock.
//!
//! Every `GET` serves the login form; every `POST` redirects to the
//! success page with a fake access token in the fragment. The token is
//! the submitted username and password glued together, nothing more.

use std::sync::Arc;

use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::config::{MockConfig, defaults};
use crate::login;
use crate::oauth1::handlers::{html_response, redirect};
use crate::oauth1::signature::encode;
use crate::sync::LoginSignals;

/// Shared state of one OAuth 2.0 mock instance.
#[derive(Debug)]
pub struct OAuth2State {
    pub signals: LoginSignals,
    /// `https` when served over TLS, `http` otherwise.
    pub scheme: &'static str,
    pub public_host: String,
    pub expires_in: u64,
}

impl OAuth2State {
    #[must_use]
    pub fn new(config: &MockConfig, signals: LoginSignals, bound_port: u16) -> Self {
        Self {
            signals,
            scheme: if config.has_tls() { "https" } else { "http" },
            public_host: config.public_host_for(bound_port),
            expires_in: defaults::OAUTH2_EXPIRES_IN,
        }
    }

    /// Success URL carrying the synthetic token in its fragment.
    ///
    /// Username and password are percent-encoded before being joined, so
    /// a value containing `&`, `#` or spaces cannot break the fragment.
    /// Plain alphanumeric credentials come out unchanged (`john` and
    /// `loser` give `access_token=johnloser`).
    #[must_use]
    pub fn success_url(&self, username: &str, password: &str) -> String {
        format!(
            "{}://{}/success.html#access_token={}{}&expires_in={}",
            self.scheme,
            self.public_host,
            encode(username),
            encode(password),
            self.expires_in
        )
    }
}

/// `GET /*`
pub async fn handle_login_page(State(state): State<Arc<OAuth2State>>) -> Response {
    let action = format!("{}://{}/login.html", state.scheme, state.public_host);
    tracing::info!("Serving OAuth 2.0 login page");

    let response = html_response(login::render_oauth2_login_page(&action));
    state.signals.show_login.set();
    response
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// `POST /*`
pub async fn handle_login(
    State(state): State<Arc<OAuth2State>>,
    Form(form): Form<LoginForm>,
) -> Response {
    let (Some(username), Some(password)) = (form.username, form.password) else {
        return (StatusCode::BAD_REQUEST, "Missing username or password").into_response();
    };

    let location = state.success_url(&username, &password);
    tracing::info!(user = %username, "Login accepted");

    let response = redirect(&location);
    state.signals.login_done.set();
    response
}
