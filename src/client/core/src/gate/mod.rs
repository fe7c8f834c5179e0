//! Deferred-action authentication gate.
//!
//! Lets a visitor start a protected action (book a package) before logging
//! in. Without a valid session the action is recorded as an
//! [`ActionIntent`], the login surface is asked to open, and the intent is
//! executed exactly once when authentication succeeds.
//!
//! ```text
//!            request_action (no session)
//!   Idle ─────────────────────────────────▶ AwaitingAuth(intent)
//!    ▲  ◀── on_auth_cancelled / expiry ───┘        │
//!    │                                             │ on_auth_success
//!    └──────────── action settled ──── Resumed ◀───┘
//! ```
//!
//! The state lives behind a mutex that is never held across an `.await`;
//! the intent is taken out (and marked consumed) before the action runs.

mod action;
mod intent;

pub use action::{ActionReceipt, BookingAction, ProtectedAction};
pub use intent::{ActionIntent, ActionKind, IntentToken};

use chrono::Utc;
use metrics::counter;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::ApiClient;
use crate::config::GateConfig;
use crate::error::{ErrorCode, Result, VoyageError};
use crate::session::{
    Session, SessionStorage, SessionStore, CONSUMED_INTENTS_KEY, PENDING_INTENT_KEY,
};
use crate::telemetry::metric_names;

/// Resumed intent ids remembered for replay protection.
const CONSUMED_HISTORY: usize = 64;

/// Buffered signals per subscriber.
const SIGNAL_CAPACITY: usize = 32;

// ═══════════════════════════════════════════════════════════════════════════════
// States, signals and outcomes
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum GateState {
    /// Nothing pending
    Idle,
    /// Waiting for the user to log in
    AwaitingAuth(ActionIntent),
    /// The intent has been taken and its action is running
    Resumed,
}

impl GateState {
    fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingAuth(_) => "awaiting_auth",
            Self::Resumed => "resumed",
        }
    }
}

/// What the login surface should do next.
#[derive(Debug, Clone, PartialEq)]
pub enum GateSignal {
    ShowLogin { intent_id: Uuid, kind: ActionKind },
    CloseLogin,
    AuthError { message: String },
    ActionCompleted(ActionReceipt),
    ActionFailed { intent_id: Uuid, kind: ActionKind, message: String },
}

/// Result of [`AuthGate::request_action`].
#[derive(Debug)]
pub enum GateOutcome {
    /// A valid session existed; the action ran immediately.
    Executed(Result<ActionReceipt>),
    /// The intent is waiting for login.
    Deferred,
}

/// Result of [`AuthGate::on_auth_success`].
#[derive(Debug)]
pub enum AuthOutcome {
    /// The pending intent ran.
    Resumed(Result<ActionReceipt>),
    /// The session was stored; no intent was pending.
    NothingPending,
}

/// Result of [`AuthGate::restore`].
#[derive(Debug)]
pub enum RestoreOutcome {
    /// The intent was already resumed or has gone stale.
    Ignored,
    /// The same intent is already waiting.
    AlreadyPending,
    /// A valid session existed; the action ran immediately.
    Executed(Result<ActionReceipt>),
    /// The gate is now waiting for login with this intent.
    Deferred,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Gate
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
struct Inner {
    state: GateState,
    consumed: VecDeque<Uuid>,
}

impl Inner {
    fn is_consumed(&self, id: &Uuid) -> bool {
        self.consumed.contains(id)
    }

    fn consume(&mut self, id: Uuid) {
        if self.is_consumed(&id) {
            return;
        }
        if self.consumed.len() == CONSUMED_HISTORY {
            self.consumed.pop_front();
        }
        self.consumed.push_back(id);
    }
}

/// State machine between "user wants to act" and "user is authenticated".
pub struct AuthGate {
    sessions: Arc<SessionStore>,
    actions: HashMap<ActionKind, Arc<dyn ProtectedAction>>,
    inner: Mutex<Inner>,
    journal: Option<Arc<dyn SessionStorage>>,
    idle_timeout: Option<Duration>,
    signals: broadcast::Sender<GateSignal>,
}

impl AuthGate {
    /// Create a gate with no registered actions and no journal.
    pub fn new(sessions: Arc<SessionStore>, config: &GateConfig) -> Self {
        let (signals, _) = broadcast::channel(SIGNAL_CAPACITY);
        Self {
            sessions,
            actions: HashMap::new(),
            inner: Mutex::new(Inner {
                state: GateState::Idle,
                consumed: VecDeque::new(),
            }),
            journal: None,
            idle_timeout: config.idle_timeout,
            signals,
        }
    }

    /// Gate wired to the booking API, journaling into the session storage.
    pub fn for_client(api: &ApiClient, config: &GateConfig) -> Self {
        let storage = api.sessions().storage();
        Self::new(api.sessions().clone(), config)
            .with_action(Arc::new(BookingAction::new(api.bookings())))
            .with_journal(storage)
    }

    /// Register the executor for one action kind, replacing any previous one.
    pub fn with_action(mut self, action: Arc<dyn ProtectedAction>) -> Self {
        self.actions.insert(action.kind(), action);
        self
    }

    /// Persist pending intents and resumed ids in `storage`.
    pub fn with_journal(mut self, storage: Arc<dyn SessionStorage>) -> Self {
        match load_consumed(storage.as_ref()) {
            Ok(consumed) => self.inner.get_mut().consumed = consumed,
            Err(e) => warn!(error = %e, "Could not read resumed intent history"),
        }
        self.journal = Some(storage);
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn state(&self) -> GateState {
        self.inner.lock().state.clone()
    }

    pub fn pending_intent(&self) -> Option<ActionIntent> {
        match &self.inner.lock().state {
            GateState::AwaitingAuth(intent) => Some(intent.clone()),
            _ => None,
        }
    }

    pub fn is_awaiting_auth(&self) -> bool {
        matches!(self.inner.lock().state, GateState::AwaitingAuth(_))
    }

    /// Receive gate signals sent from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<GateSignal> {
        self.signals.subscribe()
    }

    /// Run `intent` now if a valid session exists, otherwise defer it.
    ///
    /// A deferred intent replaces whatever was pending. Errors are gate
    /// failures (unsupported action, journal I/O); the action's own outcome
    /// is inside [`GateOutcome::Executed`].
    pub async fn request_action(&self, intent: ActionIntent) -> Result<GateOutcome> {
        self.ensure_supported(intent.kind)?;
        self.expire_stale();

        if let Some(session) = self.sessions.valid_session() {
            self.inner.lock().consume(intent.id);
            self.persist_consumed();
            let outcome = self.run_action(intent, &session).await;
            return Ok(GateOutcome::Executed(outcome));
        }

        self.defer(intent)?;
        Ok(GateOutcome::Deferred)
    }

    /// Accept a session from the login surface and resume the pending intent.
    ///
    /// An invalid session is rejected before anything changes: the gate keeps
    /// waiting and an [`GateSignal::AuthError`] is sent.
    pub async fn on_auth_success(&self, session: Session) -> Result<AuthOutcome> {
        if let Err(e) = session.validate().and_then(|()| self.sessions.login(session.clone())) {
            warn!(error_code = %e.code(), "Authentication result rejected");
            self.signal(GateSignal::AuthError {
                message: e.user_message().to_string(),
            });
            return Err(e);
        }

        self.expire_stale();

        let intent = {
            let mut inner = self.inner.lock();
            match std::mem::replace(&mut inner.state, GateState::Idle) {
                GateState::AwaitingAuth(intent) => {
                    inner.state = GateState::Resumed;
                    inner.consume(intent.id);
                    Some(intent)
                }
                other => {
                    inner.state = other;
                    None
                }
            }
        };

        let Some(intent) = intent else {
            self.signal(GateSignal::CloseLogin);
            return Ok(AuthOutcome::NothingPending);
        };

        record_transition("awaiting_auth", "resumed");
        info!(intent_id = %intent.id, kind = %intent.kind, "Resuming deferred action");
        self.persist_consumed();
        self.clear_journal();

        let settled = ResumeGuard { gate: self };
        let outcome = self.run_action(intent, &session).await;
        drop(settled);

        self.signal(GateSignal::CloseLogin);
        Ok(AuthOutcome::Resumed(outcome))
    }

    /// The user dismissed the login surface; drop the pending intent.
    pub fn on_auth_cancelled(&self) -> Option<ActionIntent> {
        let discarded = {
            let mut inner = self.inner.lock();
            match std::mem::replace(&mut inner.state, GateState::Idle) {
                GateState::AwaitingAuth(intent) => Some(intent),
                other => {
                    inner.state = other;
                    None
                }
            }
        };

        if let Some(intent) = &discarded {
            record_transition("awaiting_auth", "idle");
            info!(intent_id = %intent.id, kind = %intent.kind, "Deferred action cancelled");
            self.clear_journal();
        }
        self.signal(GateSignal::CloseLogin);
        discarded
    }

    /// Rebuild the gate from a durable intent token.
    ///
    /// Idempotent: the token of an intent that already ran is ignored, and
    /// restoring the intent that is already pending changes nothing.
    pub async fn restore(&self, token: IntentToken) -> Result<RestoreOutcome> {
        let intent = token.into_intent();
        self.ensure_supported(intent.kind)?;
        self.expire_stale();

        {
            let inner = self.inner.lock();
            if inner.is_consumed(&intent.id) {
                debug!(intent_id = %intent.id, "Intent already resumed, ignoring token");
                return Ok(RestoreOutcome::Ignored);
            }
            if let GateState::AwaitingAuth(pending) = &inner.state {
                if pending.id == intent.id || pending.same_action(&intent) {
                    return Ok(RestoreOutcome::AlreadyPending);
                }
            }
        }

        if self.is_stale(&intent) {
            info!(intent_id = %intent.id, "Restored intent is past the idle timeout");
            self.clear_journal();
            return Ok(RestoreOutcome::Ignored);
        }

        match self.request_action(intent).await? {
            GateOutcome::Executed(outcome) => Ok(RestoreOutcome::Executed(outcome)),
            GateOutcome::Deferred => Ok(RestoreOutcome::Deferred),
        }
    }

    /// Restore the intent left in the journal by an earlier process.
    pub async fn recover(&self) -> Result<Option<RestoreOutcome>> {
        let Some(journal) = &self.journal else {
            return Ok(None);
        };
        let Some(encoded) = journal.get(PENDING_INTENT_KEY)? else {
            return Ok(None);
        };

        match IntentToken::decode(&encoded) {
            Ok(token) => self.restore(token).await.map(Some),
            Err(e) => {
                warn!(error = %e, "Discarding unreadable pending intent");
                journal.remove(PENDING_INTENT_KEY)?;
                Ok(None)
            }
        }
    }

    /// Cancel the pending intent if it is older than the idle timeout.
    pub fn expire_stale(&self) -> Option<ActionIntent> {
        self.idle_timeout?;

        let expired = {
            let mut inner = self.inner.lock();
            let stale = matches!(&inner.state, GateState::AwaitingAuth(intent) if self.is_stale(intent));
            if stale {
                match std::mem::replace(&mut inner.state, GateState::Idle) {
                    GateState::AwaitingAuth(intent) => Some(intent),
                    _ => None,
                }
            } else {
                None
            }
        };

        if let Some(intent) = &expired {
            record_transition("awaiting_auth", "idle");
            info!(intent_id = %intent.id, kind = %intent.kind, "Deferred action expired");
            self.clear_journal();
            self.signal(GateSignal::CloseLogin);
        }
        expired
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    fn ensure_supported(&self, kind: ActionKind) -> Result<()> {
        if self.actions.contains_key(&kind) {
            Ok(())
        } else {
            Err(VoyageError::new(
                ErrorCode::UnsupportedAction,
                format!("No handler registered for {}", kind),
            ))
        }
    }

    fn is_stale(&self, intent: &ActionIntent) -> bool {
        let Some(limit) = self.idle_timeout else {
            return false;
        };
        Utc::now()
            .signed_duration_since(intent.created_at)
            .to_std()
            .map(|age| age >= limit)
            .unwrap_or(false)
    }

    fn defer(&self, intent: ActionIntent) -> Result<()> {
        if let Some(journal) = &self.journal {
            let token = IntentToken::new(intent.clone()).encode()?;
            journal.set(PENDING_INTENT_KEY, &token)?;
        }

        let (intent_id, kind) = (intent.id, intent.kind);
        let previous = {
            let mut inner = self.inner.lock();
            std::mem::replace(&mut inner.state, GateState::AwaitingAuth(intent))
        };

        if let GateState::AwaitingAuth(replaced) = &previous {
            debug!(replaced = %replaced.id, intent_id = %intent_id, "Pending intent replaced");
        }
        record_transition(previous.label(), "awaiting_auth");
        info!(intent_id = %intent_id, kind = %kind, "Action deferred until login");
        self.signal(GateSignal::ShowLogin { intent_id, kind });
        Ok(())
    }

    async fn run_action(&self, intent: ActionIntent, session: &Session) -> Result<ActionReceipt> {
        let action = self
            .actions
            .get(&intent.kind)
            .cloned()
            .ok_or_else(|| VoyageError::new(ErrorCode::UnsupportedAction, "Unsupported action"))?;

        match action.execute(&intent, session).await {
            Ok(detail) => {
                let receipt = ActionReceipt {
                    intent_id: intent.id,
                    kind: intent.kind,
                    detail,
                    completed_at: Utc::now(),
                };
                info!(intent_id = %intent.id, kind = %intent.kind, "Protected action completed");
                self.signal(GateSignal::ActionCompleted(receipt.clone()));
                Ok(receipt)
            }
            Err(cause) => {
                let error = VoyageError::action_failed(intent.kind, cause);
                error.log();
                self.signal(GateSignal::ActionFailed {
                    intent_id: intent.id,
                    kind: intent.kind,
                    message: error.user_message().to_string(),
                });
                Err(error)
            }
        }
    }

    fn clear_journal(&self) {
        if let Some(journal) = &self.journal {
            if let Err(e) = journal.remove(PENDING_INTENT_KEY) {
                warn!(error = %e, "Failed to clear pending intent");
            }
        }
    }

    fn persist_consumed(&self) {
        let Some(journal) = &self.journal else {
            return;
        };
        let ids: Vec<Uuid> = self.inner.lock().consumed.iter().copied().collect();
        let written = serde_json::to_string(&ids)
            .map_err(VoyageError::from)
            .and_then(|json| journal.set(CONSUMED_INTENTS_KEY, &json));
        if let Err(e) = written {
            warn!(error = %e, "Failed to persist resumed intent history");
        }
    }

    fn signal(&self, signal: GateSignal) {
        // No subscriber is fine.
        let _ = self.signals.send(signal);
    }
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate")
            .field("state", &self.inner.lock().state)
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .field("idle_timeout", &self.idle_timeout)
            .finish_non_exhaustive()
    }
}

/// Returns the gate to `Idle` once a resumed action settles, including when
/// the resuming future is dropped mid-action.
struct ResumeGuard<'a> {
    gate: &'a AuthGate,
}

impl Drop for ResumeGuard<'_> {
    fn drop(&mut self) {
        let mut inner = self.gate.inner.lock();
        if inner.state == GateState::Resumed {
            inner.state = GateState::Idle;
            record_transition("resumed", "idle");
        }
    }
}

fn record_transition(from: &'static str, to: &'static str) {
    counter!(metric_names::GATE_TRANSITIONS_TOTAL, "from" => from, "to" => to).increment(1);
}

fn load_consumed(storage: &dyn SessionStorage) -> Result<VecDeque<Uuid>> {
    let Some(json) = storage.get(CONSUMED_INTENTS_KEY)? else {
        return Ok(VecDeque::new());
    };
    let ids: Vec<Uuid> = serde_json::from_str(&json)?;
    let skip = ids.len().saturating_sub(CONSUMED_HISTORY);
    Ok(ids.into_iter().skip(skip).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{MemoryStorage, UserIdentity};
    use async_trait::async_trait;

    #[derive(Default)]
    struct CountingAction {
        runs: Mutex<Vec<i64>>,
    }

    #[async_trait]
    impl ProtectedAction for CountingAction {
        fn kind(&self) -> ActionKind {
            ActionKind::Book
        }

        async fn execute(&self, intent: &ActionIntent, _session: &Session) -> Result<serde_json::Value> {
            let package_id = intent.package_id().unwrap_or_default();
            self.runs.lock().push(package_id);
            Ok(serde_json::json!({ "bookingId": 1, "packageId": package_id }))
        }
    }

    fn session() -> Session {
        Session::new(
            "token-abc",
            UserIdentity {
                user_id: "u-1".into(),
                full_name: "Neha Patel".into(),
                email: "neha@example.com".into(),
                role: Default::default(),
            },
        )
    }

    fn gate() -> (AuthGate, Arc<CountingAction>) {
        let action = Arc::new(CountingAction::default());
        let gate = AuthGate::new(Arc::new(SessionStore::in_memory()), &GateConfig::default())
            .with_action(action.clone());
        (gate, action)
    }

    #[tokio::test]
    async fn test_unsupported_action_is_rejected() {
        let gate = AuthGate::new(Arc::new(SessionStore::in_memory()), &GateConfig::default());
        let err = gate.request_action(ActionIntent::book(1)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnsupportedAction);
        assert_eq!(gate.state(), GateState::Idle);
    }

    #[tokio::test]
    async fn test_cancel_without_pending_is_noop() {
        let (gate, action) = gate();
        assert!(gate.on_auth_cancelled().is_none());
        assert_eq!(gate.state(), GateState::Idle);
        assert!(action.runs.lock().is_empty());
    }

    #[tokio::test]
    async fn test_signals_follow_the_flow() {
        let (gate, _) = gate();
        let mut rx = gate.subscribe();

        gate.request_action(ActionIntent::book(77)).await.unwrap();
        assert!(matches!(rx.recv().await.unwrap(), GateSignal::ShowLogin { kind: ActionKind::Book, .. }));

        gate.on_auth_success(session()).await.unwrap();
        assert!(matches!(rx.recv().await.unwrap(), GateSignal::ActionCompleted(_)));
        assert_eq!(rx.recv().await.unwrap(), GateSignal::CloseLogin);
    }

    #[tokio::test]
    async fn test_login_without_pending_intent_only_stores_session() {
        let (gate, action) = gate();
        let outcome = gate.on_auth_success(session()).await.unwrap();
        assert!(matches!(outcome, AuthOutcome::NothingPending));
        assert!(gate.sessions.is_authenticated());
        assert!(action.runs.lock().is_empty());
    }

    #[tokio::test]
    async fn test_idle_timeout_expires_pending_intent() {
        let (gate, action) = gate();
        let gate = gate.with_idle_timeout(Some(Duration::from_secs(60)));

        let mut old = ActionIntent::book(77);
        old.created_at = Utc::now() - chrono::Duration::minutes(5);
        gate.request_action(old).await.unwrap();

        // Consulting the gate notices the stale intent.
        let outcome = gate.on_auth_success(session()).await.unwrap();
        assert!(matches!(outcome, AuthOutcome::NothingPending));
        assert_eq!(gate.state(), GateState::Idle);
        assert!(action.runs.lock().is_empty());
    }

    #[tokio::test]
    async fn test_consumed_history_survives_restart() {
        let storage: Arc<dyn SessionStorage> = Arc::new(MemoryStorage::new());
        let sessions = Arc::new(SessionStore::new(storage.clone()));
        let action = Arc::new(CountingAction::default());
        let gate = AuthGate::new(sessions.clone(), &GateConfig::default())
            .with_action(action.clone())
            .with_journal(storage.clone());

        let intent = ActionIntent::book(77);
        let token = IntentToken::new(intent.clone());
        gate.request_action(intent).await.unwrap();
        gate.on_auth_success(session()).await.unwrap();

        let restarted = AuthGate::new(sessions, &GateConfig::default())
            .with_action(action.clone())
            .with_journal(storage);
        let outcome = restarted.restore(token).await.unwrap();
        assert!(matches!(outcome, RestoreOutcome::Ignored));
        assert_eq!(*action.runs.lock(), vec![77]);
    }

    #[test]
    fn test_consumed_history_is_bounded() {
        let mut inner = Inner {
            state: GateState::Idle,
            consumed: VecDeque::new(),
        };
        let first = Uuid::new_v4();
        inner.consume(first);
        for _ in 0..CONSUMED_HISTORY {
            inner.consume(Uuid::new_v4());
        }
        assert_eq!(inner.consumed.len(), CONSUMED_HISTORY);
        assert!(!inner.is_consumed(&first));
    }
}
