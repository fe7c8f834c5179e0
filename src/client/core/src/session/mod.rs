//! Session Store
//!
//! The one piece of shared mutable state in the client: the current token and
//! identity. Every outbound request reads it to attach credentials and the
//! booking gate reads it to decide whether a protected action may run.
//!
//! Writes (login, refresh, logout, expiry) replace the whole session at once
//! and are persisted before they become visible, so readers never observe a
//! token without its identity.

mod storage;

pub use storage::{
    FileStorage, MemoryStorage, SessionStorage, CONSUMED_INTENTS_KEY, PENDING_INTENT_KEY, TOKEN_KEY,
    USER_KEY,
};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{ErrorCode, Result, VoyageError};
use crate::telemetry::fingerprint;

// ═══════════════════════════════════════════════════════════════════════════════
// Identity
// ═══════════════════════════════════════════════════════════════════════════════

/// Which dashboard a user lands on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    #[serde(alias = "CUSTOMER", alias = "user", alias = "USER")]
    Customer,
    #[serde(alias = "AGENT", alias = "travel_agent", alias = "TRAVEL_AGENT")]
    Agent,
    #[serde(alias = "ADMIN")]
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Customer => write!(f, "customer"),
            Self::Agent => write!(f, "agent"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

/// The authenticated user's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    #[serde(alias = "id", deserialize_with = "string_or_number")]
    pub user_id: String,
    #[serde(default, alias = "name")]
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
}

/// User ids arrive as strings from some services and as numbers from others.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// Session
// ═══════════════════════════════════════════════════════════════════════════════

/// Durable proof of authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub identity: UserIdentity,
    pub expires_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &format_args!("<{}>", self.fingerprint()))
            .field("identity", &self.identity)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl Session {
    /// Create a session; the expiry is read from the token's `exp` claim
    /// when the token is a JWT.
    pub fn new(token: impl Into<String>, identity: UserIdentity) -> Self {
        let token = token.into();
        let expires_at = jwt_expiry(&token);
        Self {
            token,
            identity,
            expires_at,
        }
    }

    /// Override the expiry (e.g. from an explicit `expiresAt` in the login response).
    pub fn with_expiry(mut self, expires_at: Option<DateTime<Utc>>) -> Self {
        if expires_at.is_some() {
            self.expires_at = expires_at;
        }
        self
    }

    /// Whether the session has expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }

    /// Check that the session is well-formed and not expired.
    pub fn validate(&self) -> Result<()> {
        self.validate_at(Utc::now())
    }

    pub fn validate_at(&self, now: DateTime<Utc>) -> Result<()> {
        let token = self.token.trim();
        if token.is_empty() {
            return Err(VoyageError::invalid_session("token is empty"));
        }
        if token.len() != self.token.len() || token.chars().any(char::is_whitespace) {
            return Err(VoyageError::invalid_session("token contains whitespace"));
        }
        if self.identity.user_id.trim().is_empty() {
            return Err(VoyageError::invalid_session("identity has no user id"));
        }
        if !self.identity.email.contains('@') {
            return Err(VoyageError::invalid_session("identity has no valid email"));
        }
        if self.is_expired_at(now) {
            return Err(VoyageError::new(
                ErrorCode::SessionExpired,
                "Your session has expired, please log in again",
            ));
        }
        Ok(())
    }

    /// Value of the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// Log-safe token fingerprint.
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.token)
    }
}

#[derive(Deserialize)]
struct ExpiryClaim {
    exp: Option<i64>,
}

/// Read the `exp` claim of a JWT without verifying it; verification is the
/// server's job, the client only needs to know when to stop sending it.
fn jwt_expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut parts = token.split('.');
    let (_, payload, _) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claim: ExpiryClaim = serde_json::from_slice(&bytes).ok()?;
    DateTime::from_timestamp(claim.exp?, 0)
}

/// Persisted form of the identity, stored under [`USER_KEY`].
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedUser {
    #[serde(flatten)]
    identity: UserIdentity,
    is_authenticated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Store
// ═══════════════════════════════════════════════════════════════════════════════

/// Process-wide holder of the current session.
pub struct SessionStore {
    current: RwLock<Option<Session>>,
    storage: Arc<dyn SessionStorage>,
    changes: watch::Sender<Option<Session>>,
}

impl SessionStore {
    /// Create an empty store over `storage` without reading it.
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        let (changes, _) = watch::channel(None);
        Self {
            current: RwLock::new(None),
            storage,
            changes,
        }
    }

    /// Create an empty store backed by process memory.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Restore the session persisted in `storage`.
    ///
    /// A missing, malformed or expired persisted session yields an empty
    /// store and the stale keys are cleared. Only storage I/O failures are
    /// returned as errors.
    pub fn restore(storage: Arc<dyn SessionStorage>) -> Result<Self> {
        let store = Self::new(storage);

        let token = store.storage.get(TOKEN_KEY)?;
        let user = store.storage.get(USER_KEY)?;

        let restored = match (token, user) {
            (Some(token), Some(user)) => match serde_json::from_str::<PersistedUser>(&user) {
                Ok(persisted) if persisted.is_authenticated => {
                    let session = Session::new(token, persisted.identity)
                        .with_expiry(persisted.expires_at);
                    match session.validate() {
                        Ok(()) => Some(session),
                        Err(e) => {
                            debug!(reason = %e, "Discarding persisted session");
                            None
                        }
                    }
                }
                Ok(_) => None,
                Err(e) => {
                    warn!(error = %e, "Persisted user profile is unreadable");
                    None
                }
            },
            (None, None) => return Ok(store),
            _ => None,
        };

        match restored {
            Some(session) => {
                info!(
                    user_id = %session.identity.user_id,
                    token = %session.fingerprint(),
                    "Session restored"
                );
                *store.current.write() = Some(session.clone());
                store.changes.send_replace(Some(session));
            }
            None => store.storage.remove_many(&[TOKEN_KEY, USER_KEY])?,
        }

        Ok(store)
    }

    /// The stored session, expired or not.
    pub fn current(&self) -> Option<Session> {
        self.current.read().clone()
    }

    /// The stored session if it is still valid.
    ///
    /// An expired session is cleared as a side effect.
    pub fn valid_session(&self) -> Option<Session> {
        let now = Utc::now();
        let session = self.current.read().clone()?;
        if !session.is_expired_at(now) {
            return Some(session);
        }

        info!(user_id = %session.identity.user_id, "Session expired");
        if let Err(e) = self.clear() {
            warn!(error = %e, "Failed to clear expired session");
        }
        None
    }

    /// Whether a valid session exists.
    pub fn is_authenticated(&self) -> bool {
        self.valid_session().is_some()
    }

    /// Bearer header value for outbound requests, if authenticated.
    pub fn bearer(&self) -> Option<String> {
        self.valid_session().map(|session| session.bearer())
    }

    /// Persist and install a freshly obtained session.
    pub fn login(&self, session: Session) -> Result<()> {
        self.install(session, "login")
    }

    /// Replace the current session with a refreshed one.
    pub fn refresh(&self, session: Session) -> Result<()> {
        if self.current.read().is_none() {
            return Err(VoyageError::new(
                ErrorCode::SessionMissing,
                "There is no session to refresh",
            ));
        }
        self.install(session, "refresh")
    }

    /// Clear the session and its persisted keys together.
    pub fn logout(&self) -> Result<()> {
        let had_session = self.current.read().is_some();
        self.clear()?;
        if had_session {
            info!("Logged out");
        }
        Ok(())
    }

    /// Watch session changes. The receiver starts with the current value.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.changes.subscribe()
    }

    /// Storage shared with other durable client state.
    pub fn storage(&self) -> Arc<dyn SessionStorage> {
        self.storage.clone()
    }

    fn install(&self, session: Session, reason: &'static str) -> Result<()> {
        session.validate()?;

        let persisted = PersistedUser {
            identity: session.identity.clone(),
            is_authenticated: true,
            expires_at: session.expires_at,
        };
        let user_json = serde_json::to_string(&persisted)?;
        self.storage
            .set_many(&[(TOKEN_KEY, session.token.as_str()), (USER_KEY, user_json.as_str())])?;

        info!(
            user_id = %session.identity.user_id,
            role = %session.identity.role,
            token = %session.fingerprint(),
            reason,
            "Session installed"
        );
        *self.current.write() = Some(session.clone());
        self.changes.send_replace(Some(session));
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.storage.remove_many(&[TOKEN_KEY, USER_KEY])?;
        *self.current.write() = None;
        self.changes.send_replace(None);
        Ok(())
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("current", &*self.current.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn identity() -> UserIdentity {
        UserIdentity {
            user_id: "u-1".to_string(),
            full_name: "Ayush Sharma".to_string(),
            email: "ayush@example.com".to_string(),
            role: Role::Customer,
        }
    }

    fn jwt_with_exp(exp: i64) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"u-1","exp":{}}}"#, exp));
        format!("{}.{}.signature", header, payload)
    }

    #[test]
    fn test_jwt_expiry_is_extracted() {
        let exp = Utc::now().timestamp() + 3600;
        let session = Session::new(jwt_with_exp(exp), identity());
        assert_eq!(session.expires_at.map(|t| t.timestamp()), Some(exp));
        assert!(session.validate().is_ok());
    }

    #[test]
    fn test_opaque_token_has_no_expiry() {
        let session = Session::new("opaque-token", identity());
        assert!(session.expires_at.is_none());
        assert!(!session.is_expired_at(Utc::now() + Duration::days(3650)));
    }

    #[test]
    fn test_validate_rejects_malformed_sessions() {
        let empty = Session::new("", identity());
        assert_eq!(empty.validate().unwrap_err().code(), ErrorCode::InvalidSession);

        let spaced = Session::new("abc def", identity());
        assert_eq!(spaced.validate().unwrap_err().code(), ErrorCode::InvalidSession);

        let mut no_email = identity();
        no_email.email = "nobody".to_string();
        let session = Session::new("abc", no_email);
        assert_eq!(session.validate().unwrap_err().code(), ErrorCode::InvalidSession);

        let expired = Session::new(jwt_with_exp(Utc::now().timestamp() - 10), identity());
        assert_eq!(expired.validate().unwrap_err().code(), ErrorCode::SessionExpired);
    }

    #[test]
    fn test_identity_accepts_numeric_id() {
        let identity: UserIdentity = serde_json::from_str(
            r#"{"id":42,"name":"Priya Singh","email":"priya@example.com","role":"AGENT"}"#,
        )
        .unwrap();
        assert_eq!(identity.user_id, "42");
        assert_eq!(identity.full_name, "Priya Singh");
        assert_eq!(identity.role, Role::Agent);
    }

    #[test]
    fn test_debug_does_not_leak_token() {
        let session = Session::new("super-secret-token", identity());
        let debug = format!("{:?}", session);
        assert!(!debug.contains("super-secret-token"));
    }

    #[test]
    fn test_login_persists_both_keys() {
        let storage = Arc::new(MemoryStorage::new());
        let store = SessionStore::new(storage.clone());

        store.login(Session::new("abc", identity())).unwrap();

        assert_eq!(storage.get(TOKEN_KEY).unwrap().as_deref(), Some("abc"));
        let user = storage.get(USER_KEY).unwrap().unwrap();
        assert!(user.contains("\"isAuthenticated\":true"));
        assert!(user.contains("\"fullName\":\"Ayush Sharma\""));
        assert_eq!(store.bearer().as_deref(), Some("Bearer abc"));
    }

    #[test]
    fn test_invalid_login_leaves_store_untouched() {
        let storage = Arc::new(MemoryStorage::new());
        let store = SessionStore::new(storage.clone());

        assert!(store.login(Session::new("", identity())).is_err());
        assert!(store.current().is_none());
        assert!(storage.is_empty());
    }

    #[test]
    fn test_logout_clears_both_keys() {
        let storage = Arc::new(MemoryStorage::new());
        let store = SessionStore::new(storage.clone());
        store.login(Session::new("abc", identity())).unwrap();
        storage.set(PENDING_INTENT_KEY, "keep-me").unwrap();

        store.logout().unwrap();

        assert!(store.current().is_none());
        assert!(storage.get(TOKEN_KEY).unwrap().is_none());
        assert!(storage.get(USER_KEY).unwrap().is_none());
        assert!(storage.get(PENDING_INTENT_KEY).unwrap().is_some());
    }

    #[test]
    fn test_restore_roundtrip() {
        let storage = Arc::new(MemoryStorage::new());
        SessionStore::new(storage.clone())
            .login(Session::new("abc", identity()))
            .unwrap();

        let restored = SessionStore::restore(storage).unwrap();
        let session = restored.current().unwrap();
        assert_eq!(session.token, "abc");
        assert_eq!(session.identity, identity());
    }

    #[test]
    fn test_restore_drops_expired_session() {
        let storage = Arc::new(MemoryStorage::new());
        let user = serde_json::json!({
            "userId": "u-1",
            "email": "ayush@example.com",
            "isAuthenticated": true,
            "expiresAt": (Utc::now() - Duration::minutes(5)).to_rfc3339(),
        });
        storage.set(TOKEN_KEY, "abc").unwrap();
        storage.set(USER_KEY, &user.to_string()).unwrap();

        let store = SessionStore::restore(storage.clone()).unwrap();
        assert!(store.current().is_none());
        assert!(storage.is_empty());
    }

    #[test]
    fn test_restore_drops_token_without_profile() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(TOKEN_KEY, "orphan").unwrap();

        let store = SessionStore::restore(storage.clone()).unwrap();
        assert!(!store.is_authenticated());
        assert!(storage.get(TOKEN_KEY).unwrap().is_none());
    }

    #[test]
    fn test_expired_session_is_unauthenticated_and_cleared() {
        let storage = Arc::new(MemoryStorage::new());
        let store = SessionStore::new(storage.clone());
        let session = Session::new("abc", identity())
            .with_expiry(Some(Utc::now() + Duration::milliseconds(20)));
        store.login(session).unwrap();
        assert!(store.is_authenticated());

        std::thread::sleep(std::time::Duration::from_millis(40));

        assert!(!store.is_authenticated());
        assert!(store.current().is_none());
        assert!(storage.get(TOKEN_KEY).unwrap().is_none());
    }

    #[test]
    fn test_refresh_requires_existing_session() {
        let store = SessionStore::in_memory();
        let err = store.refresh(Session::new("abc", identity())).unwrap_err();
        assert_eq!(err.code(), ErrorCode::SessionMissing);

        store.login(Session::new("abc", identity())).unwrap();
        store.refresh(Session::new("def", identity())).unwrap();
        assert_eq!(store.current().unwrap().token, "def");
    }

    #[test]
    fn test_subscribe_sees_changes() {
        let store = SessionStore::in_memory();
        let rx = store.subscribe();
        assert!(rx.borrow().is_none());

        store.login(Session::new("abc", identity())).unwrap();
        assert_eq!(rx.borrow().as_ref().map(|s| s.token.clone()), Some("abc".to_string()));

        store.logout().unwrap();
        assert!(rx.borrow().is_none());
    }
}
