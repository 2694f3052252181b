//! OAuth 1.0a data types.

use serde::Serialize;

/// The registered client application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consumer {
    pub key: String,
    pub secret: String,
}

impl Consumer {
    #[must_use]
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self { key: key.into(), secret: secret.into() }
    }
}

/// Which of the two stored tokens a lookup targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Request,
    Access,
}

impl TokenKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Access => "access",
        }
    }
}

/// A request or access token.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Token {
    pub key: String,
    pub secret: String,
    pub callback: Option<String>,
    pub callback_confirmed: bool,
    pub verifier: Option<String>,
    /// Set once a user authorized the handshake.
    pub username: Option<String>,
}

#[derive(Serialize)]
struct TokenForm<'a> {
    oauth_token: &'a str,
    oauth_token_secret: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    oauth_callback_confirmed: Option<&'static str>,
}

impl Token {
    #[must_use]
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self { key: key.into(), secret: secret.into(), ..Self::default() }
    }

    /// Register the callback and mark it confirmed.
    pub fn set_callback(&mut self, callback: impl Into<String>) {
        self.callback = Some(callback.into());
        self.callback_confirmed = true;
    }

    pub fn set_verifier(&mut self, verifier: impl Into<String>) {
        self.verifier = Some(verifier.into());
    }

    /// Callback URL with `oauth_verifier` appended to its query.
    ///
    /// Without a verifier the callback is returned as registered. A
    /// callback that does not parse as a URL gets the parameter appended
    /// textually.
    #[must_use]
    pub fn callback_url(&self) -> Option<String> {
        let callback = self.callback.as_deref()?;
        let Some(verifier) = self.verifier.as_deref() else {
            return Some(callback.to_owned());
        };

        match url::Url::parse(callback) {
            Ok(mut url) => {
                url.query_pairs_mut().append_pair("oauth_verifier", verifier);
                Some(url.into())
            }
            Err(_) => {
                let sep = if callback.contains('?') { '&' } else { '?' };
                Some(format!("{callback}{sep}oauth_verifier={verifier}"))
            }
        }
    }

    /// Serialize as an `application/x-www-form-urlencoded` token response.
    #[must_use]
    pub fn to_form_string(&self) -> String {
        let form = TokenForm {
            oauth_token: &self.key,
            oauth_token_secret: &self.secret,
            oauth_callback_confirmed: self.callback_confirmed.then_some("true"),
        };
        // Serializing a flat struct of strings cannot fail.
        serde_urlencoded::to_string(form).unwrap_or_default()
    }
}
