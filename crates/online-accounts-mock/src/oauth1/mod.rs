//! OAuth 1.0a authorization server mock.
//!
//! A self-contained three-legged handshake against one fixed consumer
//! and one fixed request/access token pair.
//!
//! ## Supported Standards
//! - RFC 5849: OAuth 1.0 (PLAINTEXT and HMAC-SHA1 signatures)

pub mod handlers;
pub mod request;
pub mod server;
pub mod signature;
pub mod store;
mod types;

pub use handlers::OAuth1State;
pub use request::OAuthRequest;
pub use server::OAuthServer;
pub use signature::SignatureMethod;
pub use store::TokenStore;
pub use types::{Consumer, Token, TokenKind};
