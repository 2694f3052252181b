//! In-process model of the single-sign-on daemon.
//!
//! Objects live at D-Bus style paths and expose one interface each, except
//! the main object which carries both the auth service and the mock
//! control interface. Calls are resolved through a static method table
//! keyed by interface and method name; arguments and replies are plain
//! JSON values standing in for D-Bus variants.

mod methods;

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::{SignonError, SignonResult};
pub use methods::{METHODS, MethodEntry};

/// `a{sv}` dictionary.
pub type VariantMap = BTreeMap<String, Value>;

pub const BUS_NAME: &str = "com.google.code.AccountsSSO.SingleSignOn";
pub const MAIN_OBJECT: &str = "/com/google/code/AccountsSSO/SingleSignOn";
pub const AUTH_SERVICE_IFACE: &str = "com.google.code.AccountsSSO.SingleSignOn.AuthService";
pub const IDENTITY_IFACE: &str = "com.google.code.AccountsSSO.SingleSignOn.Identity";
pub const AUTH_SESSION_IFACE: &str = "com.google.code.AccountsSSO.SingleSignOn.AuthSession";
pub const MOCK_IFACE: &str = "org.freedesktop.DBus.Mock";

/// An auth session created by `getAuthSessionObjectPath`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    /// Identity id, 0 for a session without a stored identity.
    pub identity: u32,
    /// Authentication method name.
    pub method: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum MockObject {
    Service,
    Identity(u32),
    AuthSession(AuthSession),
}

impl MockObject {
    fn exposes(&self, interface: &str) -> bool {
        match self {
            Self::Service => interface == AUTH_SERVICE_IFACE || interface == MOCK_IFACE,
            Self::Identity(_) => interface == IDENTITY_IFACE,
            Self::AuthSession(_) => interface == AUTH_SESSION_IFACE,
        }
    }
}

/// Result of a dispatched method. `delay` is served before the reply is
/// returned.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub value: Value,
    pub delay: Option<Duration>,
}

impl Reply {
    #[must_use]
    pub const fn new(value: Value) -> Self {
        Self { value, delay: None }
    }

    #[must_use]
    pub const fn unit() -> Self {
        Self::new(Value::Null)
    }
}

/// Mutable daemon state, handed to method handlers.
#[derive(Debug)]
pub struct SignonState {
    identities: BTreeMap<u32, VariantMap>,
    sessions_counter: u32,
    objects: BTreeMap<String, MockObject>,
}

impl SignonState {
    fn new() -> Self {
        let mut objects = BTreeMap::new();
        objects.insert(MAIN_OBJECT.to_owned(), MockObject::Service);
        Self { identities: BTreeMap::new(), sessions_counter: 1, objects }
    }

    pub(crate) fn add_identity(&mut self, id: u32, info: VariantMap) {
        self.identities.insert(id, info);
    }

    pub(crate) fn get_identity(&mut self, id: u32) -> SignonResult<(String, VariantMap)> {
        let info = self.identities.get(&id).cloned().ok_or_else(SignonError::identity_not_found)?;
        let path = format!("/Identity{id}");
        self.objects.entry(path.clone()).or_insert(MockObject::Identity(id));
        Ok((path, info))
    }

    pub(crate) fn get_auth_session_object_path(
        &mut self,
        id: u32,
        method: &str,
    ) -> SignonResult<String> {
        if id != 0 && !self.identities.contains_key(&id) {
            return Err(SignonError::identity_not_found());
        }
        let path = format!("/AuthSession{}", self.sessions_counter);
        self.sessions_counter += 1;
        self.objects.insert(
            path.clone(),
            MockObject::AuthSession(AuthSession { identity: id, method: method.to_owned() }),
        );
        Ok(path)
    }

    fn identity_at(&self, path: &str) -> SignonResult<u32> {
        match self.objects.get(path) {
            Some(MockObject::Identity(id)) => Ok(*id),
            _ => {
                Err(SignonError::new(SignonError::UNKNOWN_METHOD, format!("No identity at {path}")))
            }
        }
    }

    pub(crate) fn identity_info(&self, path: &str) -> SignonResult<VariantMap> {
        let id = self.identity_at(path)?;
        self.identities.get(&id).cloned().ok_or_else(SignonError::identity_not_found)
    }

    /// Merge `new_info` into the identity and return its `Id` entry.
    pub(crate) fn identity_store(
        &mut self,
        path: &str,
        new_info: VariantMap,
    ) -> SignonResult<Value> {
        let id = self.identity_at(path)?;
        let info = self.identities.get_mut(&id).ok_or_else(SignonError::identity_not_found)?;
        info.extend(new_info);
        info.get("Id")
            .cloned()
            .ok_or_else(|| SignonError::invalid_args(format!("Identity {id} has no Id")))
    }

    fn auth_session(&self, path: &str) -> Option<&AuthSession> {
        match self.objects.get(path) {
            Some(MockObject::AuthSession(session)) => Some(session),
            _ => None,
        }
    }
}

/// Process an auth session request: fail with `errorName` if present,
/// otherwise echo the parameters after the optional `delay` (seconds).
pub(crate) fn process_params(params: VariantMap) -> SignonResult<Reply> {
    if let Some(name) = params.get("errorName") {
        let name = name.as_str().map_or_else(|| name.to_string(), str::to_owned);
        return Err(SignonError::new(name, "Authentication error"));
    }
    let delay = match params.get("delay") {
        Some(value) => {
            let secs =
                value.as_f64().ok_or_else(|| SignonError::invalid_args("delay must be a number"))?;
            let delay = Duration::try_from_secs_f64(secs)
                .map_err(|e| SignonError::invalid_args(e.to_string()))?;
            Some(delay)
        }
        None => None,
    };
    Ok(Reply { value: Value::Object(params.into_iter().collect()), delay })
}

/// The single-sign-on daemon mock.
#[derive(Debug)]
pub struct SignonMock {
    state: Mutex<SignonState>,
}

impl SignonMock {
    #[must_use]
    pub fn new() -> Self {
        Self { state: Mutex::new(SignonState::new()) }
    }

    /// Dispatch a method call on the object at `path`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownMethod` for unknown objects or methods, `InvalidArgs`
    /// for arguments that do not match the method signature, or the fault
    /// raised by the method itself.
    pub async fn call(
        &self,
        path: &str,
        interface: &str,
        method: &str,
        args: &[Value],
    ) -> SignonResult<Value> {
        let reply = {
            let mut state = self.state.lock().await;
            let object = state
                .objects
                .get(path)
                .ok_or_else(|| SignonError::unknown_method(path, interface, method))?;
            if !object.exposes(interface) {
                return Err(SignonError::unknown_method(path, interface, method));
            }
            let entry = methods::lookup(interface, method)
                .ok_or_else(|| SignonError::unknown_method(path, interface, method))?;
            tracing::debug!(path, interface, method, "signond call");
            (entry.handler)(&mut *state, path, args)?
        };

        if let Some(delay) = reply.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(reply.value)
    }

    /// `org.freedesktop.DBus.Mock.AddIdentity`
    pub async fn add_identity(&self, id: u32, info: VariantMap) {
        self.state.lock().await.add_identity(id, info);
    }

    /// `AuthService.getIdentity`
    ///
    /// # Errors
    ///
    /// Returns `IdentityNotFound` if the id was never added.
    pub async fn get_identity(&self, id: u32) -> SignonResult<(String, VariantMap)> {
        self.state.lock().await.get_identity(id)
    }

    /// `AuthService.getAuthSessionObjectPath`
    ///
    /// # Errors
    ///
    /// Returns `IdentityNotFound` unless `id` is 0 or a known identity.
    pub async fn get_auth_session_object_path(
        &self,
        id: u32,
        method: &str,
    ) -> SignonResult<String> {
        self.state.lock().await.get_auth_session_object_path(id, method)
    }

    /// Session registered at `path`, if any.
    pub async fn auth_session(&self, path: &str) -> Option<AuthSession> {
        self.state.lock().await.auth_session(path).cloned()
    }

    /// Registered object paths, sorted.
    pub async fn object_paths(&self) -> Vec<String> {
        self.state.lock().await.objects.keys().cloned().collect()
    }
}

impl Default for SignonMock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn info(id: u32, user: &str) -> VariantMap {
        let mut map = VariantMap::new();
        map.insert("Id".into(), json!(id));
        map.insert("UserName".into(), json!(user));
        map
    }

    #[tokio::test]
    async fn test_unknown_identity() {
        let mock = SignonMock::new();
        let err = mock.get_identity(7).await.unwrap_err();
        assert_eq!(err.name, SignonError::IDENTITY_NOT_FOUND);
        assert!(err.is_signon_error());
    }

    #[tokio::test]
    async fn test_get_identity_registers_object() {
        let mock = SignonMock::new();
        mock.add_identity(4, info(4, "alice")).await;

        let (path, data) = mock.get_identity(4).await.unwrap();
        assert_eq!(path, "/Identity4");
        assert_eq!(data["UserName"], json!("alice"));
        assert!(mock.object_paths().await.contains(&"/Identity4".to_owned()));
    }

    #[tokio::test]
    async fn test_session_paths_increment() {
        let mock = SignonMock::new();
        mock.add_identity(2, info(2, "bob")).await;

        assert_eq!(mock.get_auth_session_object_path(0, "oauth2").await.unwrap(), "/AuthSession1");
        let second = mock.get_auth_session_object_path(2, "password").await.unwrap();
        assert_eq!(second, "/AuthSession2");

        let session = mock.auth_session("/AuthSession2").await.unwrap();
        assert_eq!(session, AuthSession { identity: 2, method: "password".into() });
    }

    #[tokio::test]
    async fn test_session_for_unknown_identity() {
        let mock = SignonMock::new();
        let err = mock.get_auth_session_object_path(9, "oauth2").await.unwrap_err();
        assert_eq!(err.name, SignonError::IDENTITY_NOT_FOUND);
        // Counter untouched on failure
        assert_eq!(mock.get_auth_session_object_path(0, "oauth2").await.unwrap(), "/AuthSession1");
    }

    #[test]
    fn test_process_echoes() {
        let mut params = VariantMap::new();
        params.insert("ClientId".into(), json!("abc"));
        let reply = process_params(params).unwrap();
        assert_eq!(reply.value, json!({"ClientId": "abc"}));
        assert_eq!(reply.delay, None);
    }

    #[test]
    fn test_process_error_name() {
        let mut params = VariantMap::new();
        params.insert("errorName".into(), json!(SignonError::USER_INTERACTION));
        let err = process_params(params).unwrap_err();
        assert_eq!(err, SignonError::new(SignonError::USER_INTERACTION, "Authentication error"));
    }

    #[test]
    fn test_process_delay() {
        let mut params = VariantMap::new();
        params.insert("delay".into(), json!(0.25));
        assert_eq!(process_params(params).unwrap().delay, Some(Duration::from_millis(250)));

        let mut params = VariantMap::new();
        params.insert("delay".into(), json!(-1));
        assert_eq!(process_params(params).unwrap_err().name, SignonError::INVALID_ARGS);
    }
}
