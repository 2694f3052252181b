//! Login progress signals shared between a mock server and the test driver.
//!
//! A handler calls [`EventFlag::set`] when the browser under test reaches
//! a step of the handshake; the driver blocks in [`EventFlag::wait`]
//! before injecting the next piece of simulated input.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::config::defaults;

/// A binary flag that can be awaited with a timeout.
///
/// `set` is idempotent and stays set until `clear`. Clones observe the
/// same flag.
#[derive(Clone)]
pub struct EventFlag {
    tx: Arc<watch::Sender<bool>>,
}

impl EventFlag {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Set the flag, waking every waiter.
    pub fn set(&self) {
        self.tx.send_if_modified(|state| {
            let changed = !*state;
            *state = true;
            changed
        });
    }

    /// Reset the flag to unset.
    pub fn clear(&self) {
        self.tx.send_if_modified(|state| std::mem::replace(state, false));
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        *self.tx.borrow()
    }

    /// Wait until the flag is set or `timeout` elapses.
    ///
    /// Returns the state observed when the wait ended, so `false` means
    /// the timeout fired.
    pub async fn wait(&self, timeout: Duration) -> bool {
        let mut rx = self.tx.subscribe();
        let observed = async move { rx.wait_for(|state| *state).await.is_ok() };

        match tokio::time::timeout(timeout, observed).await {
            Ok(true) => true,
            // The sender lives in `self`, so the channel cannot close here.
            Ok(false) => self.is_set(),
            Err(_) => {
                tracing::debug!(?timeout, "Timed out waiting for event flag");
                self.is_set()
            }
        }
    }
}

impl Default for EventFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventFlag").field("set", &self.is_set()).finish()
    }
}

/// The two checkpoints of a browser login.
#[derive(Debug, Clone)]
pub struct LoginSignals {
    /// Set once the login page has been served.
    pub show_login: EventFlag,
    /// Set once the login form has been posted.
    pub login_done: EventFlag,
    timeout: Duration,
}

impl LoginSignals {
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeout(defaults::SIGNAL_TIMEOUT)
    }

    /// Signals whose `wait_*` helpers give up after `timeout`.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { show_login: EventFlag::new(), login_done: EventFlag::new(), timeout }
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Wait for the login page, up to the default timeout.
    pub async fn wait_show_login(&self) -> bool {
        self.show_login.wait(self.timeout).await
    }

    /// Wait for the login form post, up to the default timeout.
    pub async fn wait_login_done(&self) -> bool {
        self.login_done.wait(self.timeout).await
    }

    /// Clear both flags.
    pub fn reset(&self) {
        self.show_login.clear();
        self.login_done.clear();
    }
}

impl Default for LoginSignals {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_is_idempotent() {
        let flag = EventFlag::new();
        assert!(!flag.is_set());
        flag.set();
        flag.set();
        assert!(flag.is_set());
        assert!(flag.wait(Duration::from_millis(1)).await);
    }

    #[tokio::test]
    async fn test_clear_resets() {
        let flag = EventFlag::new();
        flag.set();
        flag.clear();
        assert!(!flag.is_set());
    }

    #[tokio::test]
    async fn test_wait_times_out() {
        let flag = EventFlag::new();
        assert!(!flag.wait(Duration::from_millis(20)).await);
    }

    #[tokio::test]
    async fn test_concurrent_waiter_observes_set() {
        let flag = EventFlag::new();
        let waiter = {
            let flag = flag.clone();
            tokio::spawn(async move { flag.wait(Duration::from_secs(5)).await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        flag.set();

        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn test_signals_reset() {
        let signals = LoginSignals::new();
        signals.show_login.set();
        signals.login_done.set();
        signals.reset();
        assert!(!signals.show_login.is_set());
        assert!(!signals.login_done.is_set());
    }

    #[tokio::test]
    async fn test_signals_default_timeout() {
        assert_eq!(LoginSignals::new().timeout(), Duration::from_secs(30));

        let signals = LoginSignals::with_timeout(Duration::from_millis(10));
        assert!(!signals.wait_login_done().await);
        signals.login_done.set();
        assert!(signals.wait_login_done().await);
        assert!(!signals.wait_show_login().await);
    }
}
