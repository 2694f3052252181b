//! Parsing and building OAuth 1.0a requests.
//!
//! Parameters are collected from the `Authorization: OAuth ...` header,
//! the URL query and a form-encoded body, in that order.

use std::time::{SystemTime, UNIX_EPOCH};

use percent_encoding::percent_decode_str;
use url::Url;

use super::signature::{self, SignatureMethod, SigningInput, encode};
use super::types::{Consumer, Token};
use crate::error::{OAuthError, OAuthResult};

/// A request as seen by the OAuth layer.
#[derive(Debug, Clone)]
pub struct OAuthRequest {
    pub http_method: String,
    pub url: Url,
    pub params: Vec<(String, String)>,
}

impl OAuthRequest {
    /// Assemble a request from its HTTP parts.
    pub fn from_parts(
        http_method: &str,
        url: Url,
        authorization: Option<&str>,
        form_body: Option<&str>,
    ) -> OAuthResult<Self> {
        let mut params = Vec::new();

        if let Some(header) = authorization {
            if let Some(rest) = strip_scheme(header) {
                params.extend(parse_authorization(rest)?);
            }
        }

        params.extend(url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())));

        if let Some(body) = form_body.filter(|b| !b.is_empty()) {
            let pairs: Vec<(String, String)> = serde_urlencoded::from_str(body)
                .map_err(|e| OAuthError::malformed(e.to_string()))?;
            params.extend(pairs);
        }

        Ok(Self { http_method: http_method.to_ascii_uppercase(), url, params })
    }

    /// First value of a parameter.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    /// First value of a required parameter.
    pub fn require(&self, name: &'static str) -> OAuthResult<&str> {
        self.get(name).ok_or(OAuthError::MissingParameter(name))
    }

    /// Signature material for this request.
    #[must_use]
    pub fn signing_input<'a>(
        &'a self,
        consumer: &'a Consumer,
        token: Option<&'a Token>,
    ) -> SigningInput<'a> {
        SigningInput {
            http_method: &self.http_method,
            url: &self.url,
            params: &self.params,
            consumer_secret: &consumer.secret,
            token_secret: token.map(|t| t.secret.as_str()),
        }
    }

    /// Build a signed request the way an OAuth 1.0a client would.
    ///
    /// `extra` carries non-protocol parameters (or `oauth_callback` /
    /// `oauth_verifier`) that take part in the signature.
    #[must_use]
    pub fn signed(
        http_method: &str,
        url: Url,
        consumer: &Consumer,
        token: Option<&Token>,
        method: SignatureMethod,
        nonce: &str,
        extra: &[(&str, &str)],
    ) -> Self {
        let timestamp = unix_now().to_string();
        let mut params: Vec<(String, String)> = vec![
            ("oauth_consumer_key".into(), consumer.key.clone()),
            ("oauth_signature_method".into(), method.name().into()),
            ("oauth_timestamp".into(), timestamp),
            ("oauth_nonce".into(), nonce.into()),
            ("oauth_version".into(), "1.0".into()),
        ];
        if let Some(token) = token {
            params.push(("oauth_token".into(), token.key.clone()));
        }
        params.extend(extra.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())));

        let mut request = Self { http_method: http_method.to_ascii_uppercase(), url, params };
        let sig = signature::sign(method, &request.signing_input(consumer, token));
        request.params.push(("oauth_signature".into(), sig));
        request
    }

    /// Render the `oauth_*` parameters as an `Authorization` header value.
    #[must_use]
    pub fn authorization_header(&self, realm: Option<&str>) -> String {
        let mut parts = Vec::new();
        if let Some(realm) = realm {
            parts.push(format!("realm=\"{realm}\""));
        }
        parts.extend(
            self.params
                .iter()
                .filter(|(k, _)| k.starts_with("oauth_"))
                .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v))),
        );
        format!("OAuth {}", parts.join(", "))
    }

    /// Non-`oauth_*` parameters, form-encoded, for use as a request body.
    #[must_use]
    pub fn non_oauth_form(&self) -> String {
        let pairs: Vec<(&str, &str)> = self
            .params
            .iter()
            .filter(|(k, _)| !k.starts_with("oauth_"))
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        serde_urlencoded::to_string(pairs).unwrap_or_default()
    }
}

fn strip_scheme(header: &str) -> Option<&str> {
    let header = header.trim_start();
    let (scheme, rest) = header.split_at_checked(5)?;
    scheme.eq_ignore_ascii_case("OAuth").then_some(rest)
}

/// Parse the comma-separated `key="value"` list of an OAuth header.
///
/// `realm` is dropped; it never takes part in the signature.
fn parse_authorization(list: &str) -> OAuthResult<Vec<(String, String)>> {
    let mut params = Vec::new();
    for item in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (key, value) = item
            .split_once('=')
            .ok_or_else(|| OAuthError::malformed(format!("bad parameter {item}")))?;
        let key = key.trim();
        if key.eq_ignore_ascii_case("realm") {
            continue;
        }
        let value = value.trim().trim_matches('"');
        params.push((decode(key)?, decode(value)?));
    }
    Ok(params)
}

fn decode(s: &str) -> OAuthResult<String> {
    percent_decode_str(s)
        .decode_utf8()
        .map(|c| c.into_owned())
        .map_err(|e| OAuthError::malformed(e.to_string()))
}

/// Seconds since the Unix epoch.
#[must_use]
pub fn unix_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header_query_and_body() {
        let url = Url::parse("http://localhost:5121/oauth1/access_token?x=1").unwrap();
        let header = concat!(
            r#"OAuth realm="http://photos.example.net/", "#,
            r#"oauth_consumer_key="C0nsum3rKey", oauth_signature="a%26b""#,
        );
        let req = OAuthRequest::from_parts("post", url, Some(header), Some("y=2"));
        let req = req.unwrap();

        assert_eq!(req.http_method, "POST");
        assert_eq!(req.get("oauth_consumer_key"), Some("C0nsum3rKey"));
        assert_eq!(req.get("oauth_signature"), Some("a&b"));
        assert_eq!(req.get("x"), Some("1"));
        assert_eq!(req.get("y"), Some("2"));
        assert_eq!(req.get("realm"), None);
    }

    #[test]
    fn test_non_oauth_header_ignored() {
        let url = Url::parse("http://localhost/").unwrap();
        let req = OAuthRequest::from_parts("GET", url, Some("Bearer abc"), None);
        let req = req.unwrap();
        assert!(req.params.is_empty());
    }

    #[test]
    fn test_malformed_header() {
        let url = Url::parse("http://localhost/").unwrap();
        let err = OAuthRequest::from_parts("GET", url, Some("OAuth garbage"), None);
        assert!(matches!(err, Err(OAuthError::Malformed(_))));
    }

    #[test]
    fn test_require_missing() {
        let url = Url::parse("http://localhost/").unwrap();
        let req = OAuthRequest::from_parts("GET", url, None, None).unwrap();
        assert_eq!(
            req.require("oauth_verifier").unwrap_err(),
            OAuthError::MissingParameter("oauth_verifier")
        );
    }

    #[test]
    fn test_signed_header_roundtrips_through_parser() {
        let consumer = Consumer::new("C0nsum3rKey", "C0nsum3rS3cr3t");
        let url = Url::parse("http://localhost:5121/oauth1/request_token").unwrap();
        let signed = OAuthRequest::signed(
            "POST",
            url.clone(),
            &consumer,
            None,
            SignatureMethod::HmacSha1,
            "abc",
            &[("oauth_callback", "http://localhost/cb")],
        );

        let header = signed.authorization_header(Some("http://photos.example.net/"));
        let parsed = OAuthRequest::from_parts("POST", url, Some(&header), None);
        let parsed = parsed.unwrap();

        assert_eq!(parsed.get("oauth_callback"), Some("http://localhost/cb"));
        let sig = parsed.get("oauth_signature").unwrap();
        let input = parsed.signing_input(&consumer, None);
        assert!(signature::verify(SignatureMethod::HmacSha1, &input, sig));
    }
}
