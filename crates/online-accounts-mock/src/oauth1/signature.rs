//! OAuth 1.0a request signatures (RFC 5849 §3.4).
//!
//! Only PLAINTEXT and HMAC-SHA1 are registered; anything else is
//! rejected before a signature is ever computed.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use sha1::Sha1;
use url::Url;

use crate::error::{OAuthError, OAuthResult};

type HmacSha1 = Hmac<Sha1>;

/// Everything except the RFC 3986 unreserved set.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Signature methods the mock server accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureMethod {
    Plaintext,
    HmacSha1,
}

impl SignatureMethod {
    /// Methods registered with the server, in preference order.
    pub const SUPPORTED: [Self; 2] = [Self::Plaintext, Self::HmacSha1];

    /// Resolve an `oauth_signature_method` value.
    pub fn from_name(name: &str) -> OAuthResult<Self> {
        Self::SUPPORTED
            .into_iter()
            .find(|m| m.name() == name)
            .ok_or_else(|| OAuthError::UnsupportedSignatureMethod(name.to_owned()))
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Plaintext => "PLAINTEXT",
            Self::HmacSha1 => "HMAC-SHA1",
        }
    }
}

/// Percent-encode per RFC 5849 §3.6.
#[must_use]
pub fn encode(s: &str) -> String {
    utf8_percent_encode(s, OAUTH_ENCODE_SET).to_string()
}

/// Base string URI: lowercase scheme and host, default port dropped,
/// no query or fragment.
#[must_use]
pub fn normalize_url(url: &Url) -> String {
    let scheme = url.scheme().to_ascii_lowercase();
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    let mut normalized = format!("{scheme}://{host}");
    // `Url::port` already omits the scheme's default port.
    if let Some(port) = url.port() {
        normalized.push_str(&format!(":{port}"));
    }
    normalized.push_str(url.path());
    normalized
}

/// Sorted, encoded parameter string, excluding `oauth_signature`.
#[must_use]
pub fn normalize_parameters(params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .filter(|(k, _)| k != "oauth_signature")
        .map(|(k, v)| (encode(k), encode(v)))
        .collect();
    encoded.sort();
    encoded.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join("&")
}

/// Signature base string: `METHOD&url&params`.
#[must_use]
pub fn base_string(http_method: &str, url: &Url, params: &[(String, String)]) -> String {
    format!(
        "{}&{}&{}",
        encode(&http_method.to_ascii_uppercase()),
        encode(&normalize_url(url)),
        encode(&normalize_parameters(params))
    )
}

/// Signing key: `consumer_secret&token_secret`, each encoded.
#[must_use]
pub fn signing_key(consumer_secret: &str, token_secret: Option<&str>) -> String {
    format!("{}&{}", encode(consumer_secret), encode(token_secret.unwrap_or_default()))
}

/// Request material a signature covers.
#[derive(Debug, Clone, Copy)]
pub struct SigningInput<'a> {
    pub http_method: &'a str,
    pub url: &'a Url,
    pub params: &'a [(String, String)],
    pub consumer_secret: &'a str,
    pub token_secret: Option<&'a str>,
}

impl SigningInput<'_> {
    fn key(&self) -> String {
        signing_key(self.consumer_secret, self.token_secret)
    }

    fn hmac(&self) -> HmacSha1 {
        let mut mac = HmacSha1::new_from_slice(self.key().as_bytes())
            .expect("HMAC accepts any key length");
        let base = base_string(self.http_method, self.url, self.params);
        mac.update(base.as_bytes());
        mac
    }
}

/// Compute the `oauth_signature` value for `input`.
#[must_use]
pub fn sign(method: SignatureMethod, input: &SigningInput<'_>) -> String {
    match method {
        SignatureMethod::Plaintext => input.key(),
        SignatureMethod::HmacSha1 => STANDARD.encode(input.hmac().finalize().into_bytes()),
    }
}

/// Check a presented signature against `input`.
#[must_use]
pub fn verify(method: SignatureMethod, input: &SigningInput<'_>, signature: &str) -> bool {
    match method {
        SignatureMethod::Plaintext => signature == input.key(),
        SignatureMethod::HmacSha1 => {
            let Ok(raw) = STANDARD.decode(signature) else {
                return false;
            };
            input.hmac().verify_slice(&raw).is_ok()
        }
    }
}
