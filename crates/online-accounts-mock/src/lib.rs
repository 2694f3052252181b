//! Online Accounts Mock
//!
//! Mock authorization servers for driving online-accounts login flows in
//! end-to-end tests. A test starts a mock, points the account plugin at
//! it, waits for the login page to be shown, submits the form and checks
//! what the plugin ends up with.
//!
//! # Features
//!
//! - **OAuth 1.0a**: request token, authorize page and access token
//!   exchange with PLAINTEXT and HMAC-SHA1 signature checking
//! - **OAuth 2.0**: implicit-grant login page served over HTTPS
//! - **Login signals**: awaitable flags set when the login page is shown
//!   and when the login form is submitted
//! - **signond**: in-process model of the single-sign-on daemon
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use online_accounts_mock::{MockConfig, MockKind, MockServer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = MockConfig::from_env()?;
//!     let server = MockServer::start(MockKind::OAuth1, &config).await?;
//!
//!     // Drive the client under test, then:
//!     assert!(server.signals().show_login.wait(Duration::from_secs(30)).await);
//!     server.shutdown().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod login;
pub mod oauth1;
pub mod oauth2;
pub mod server;
pub mod signond;
pub mod sync;

pub use config::MockConfig;
pub use error::{OAuthError, ServerError, SignonError};
pub use server::{MockKind, MockServer, RunningServer};
pub use signond::SignonMock;
pub use sync::{EventFlag, LoginSignals};
