use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::CallError;
use crate::observer::{CallObserver, ObserverRegistry};
use crate::state::{CallDirection, CallState};

/// Process-local unique identifier for a call.
///
/// Used for equality and local bookkeeping (telephony-UI correlation);
/// never sent to the remote peer.
pub type CallId = Uuid;

/// Point-in-time snapshot of a session, taken under a single lock
/// acquisition. Handed to UI layers and call-history recording, which
/// should not hold the live session longer than they need to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallInfo {
    pub local_id: CallId,
    pub direction: CallDirection,
    pub remote_number: String,
    pub state: CallState,
    pub has_video: bool,
    pub is_muted: bool,
    pub is_speakerphone_enabled: bool,
    pub created_at: DateTime<Utc>,
}

/// Mutable state guarded by the session lock.
struct SessionInner {
    state: CallState,
    has_video: bool,
    muted: bool,
    speakerphone: bool,
    /// Set the first time the call enters [`CallState::Connected`],
    /// cleared on any other state. Monotonic, so duration math is
    /// immune to wall-clock adjustments mid-call.
    connected_at: Option<Instant>,
    last_error: Option<String>,
    observers: ObserverRegistry,
}

/// One call's mutable state, shared between signaling, UI and telephony
/// integration threads. The single source of truth for the call.
///
/// Every mutator acquires the session's exclusive lock, updates the
/// field, and notifies all live observers before returning; observers
/// therefore see transitions in exactly the order they were applied,
/// with no interleaving between two transitions' notification passes.
/// See [`CallObserver`] for the reentrancy obligation this places on
/// callbacks.
///
/// Sessions are created through [`CallSession::outgoing`] or
/// [`CallSession::incoming`] and owned by the call orchestrator, which
/// discards them once a terminal state is reached.
pub struct CallSession {
    local_id: CallId,
    /// 64-bit id shared with the remote peer to correlate signaling
    /// messages for this call. Not a secret, just a correlation value.
    signaling_id: u64,
    direction: CallDirection,
    remote_number: String,
    created_at: DateTime<Utc>,
    inner: Mutex<SessionInner>,
}

impl CallSession {
    /// Create a session for a call the local user is placing.
    ///
    /// Starts in [`CallState::Dialing`] with a freshly generated
    /// signaling id.
    pub fn outgoing(local_id: CallId, remote_number: impl Into<String>) -> Self {
        let session = Self::new(
            local_id,
            rand::random::<u64>(),
            CallDirection::Outgoing,
            remote_number.into(),
            CallState::Dialing,
        );
        tracing::info!(
            "outgoing call {} -> {} (signaling id {})",
            session.local_id,
            session.remote_number,
            session.signaling_id
        );
        session
    }

    /// Create a session for a call received from the network.
    ///
    /// Starts in [`CallState::Answering`]; the signaling id comes from
    /// the incoming offer message.
    pub fn incoming(
        local_id: CallId,
        remote_number: impl Into<String>,
        signaling_id: u64,
    ) -> Self {
        let session = Self::new(
            local_id,
            signaling_id,
            CallDirection::Incoming,
            remote_number.into(),
            CallState::Answering,
        );
        tracing::info!(
            "incoming call {} <- {} (signaling id {})",
            session.local_id,
            session.remote_number,
            session.signaling_id
        );
        session
    }

    fn new(
        local_id: CallId,
        signaling_id: u64,
        direction: CallDirection,
        remote_number: String,
        state: CallState,
    ) -> Self {
        Self {
            local_id,
            signaling_id,
            direction,
            remote_number,
            created_at: Utc::now(),
            inner: Mutex::new(SessionInner {
                state,
                has_video: false,
                muted: false,
                speakerphone: false,
                connected_at: None,
                last_error: None,
                observers: ObserverRegistry::new(),
            }),
        }
    }

    // Immutable metadata. Lock-free, safe to call from observer callbacks.

    pub fn local_id(&self) -> CallId {
        self.local_id
    }

    pub fn signaling_id(&self) -> u64 {
        self.signaling_id
    }

    pub fn direction(&self) -> CallDirection {
        self.direction
    }

    pub fn remote_number(&self) -> &str {
        &self.remote_number
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    // Mutable state. These lock; do not call them from observer callbacks.

    pub fn state(&self) -> CallState {
        self.inner.lock().unwrap().state
    }

    pub fn has_video(&self) -> bool {
        self.inner.lock().unwrap().has_video
    }

    pub fn is_muted(&self) -> bool {
        self.inner.lock().unwrap().muted
    }

    pub fn is_speakerphone_enabled(&self) -> bool {
        self.inner.lock().unwrap().speakerphone
    }

    /// Failure detail recorded by the orchestrator, if any.
    pub fn last_error(&self) -> Option<String> {
        self.inner.lock().unwrap().last_error.clone()
    }

    /// Snapshot of the session under a single lock acquisition.
    pub fn info(&self) -> CallInfo {
        let inner = self.inner.lock().unwrap();
        CallInfo {
            local_id: self.local_id,
            direction: self.direction,
            remote_number: self.remote_number.clone(),
            state: inner.state,
            has_video: inner.has_video,
            is_muted: inner.muted,
            is_speakerphone_enabled: inner.speakerphone,
            created_at: self.created_at,
        }
    }

    /// Transition the call to `new_state` and notify observers.
    ///
    /// Terminal states are immutable: once the call has ended, any
    /// transition to a *different* state is rejected with
    /// [`CallError::InvalidTransition`]. Re-entering the current state
    /// (terminal or not) succeeds and is re-notified, not deduplicated.
    ///
    /// The first transition into [`CallState::Connected`] records the
    /// connected timestamp; repeating it leaves the timestamp untouched,
    /// and any other state clears it.
    pub fn set_state(&self, new_state: CallState) -> Result<(), CallError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.state.is_terminal() && new_state != inner.state {
            tracing::warn!(
                "call {}: rejected transition {} -> {}",
                self.local_id,
                inner.state,
                new_state
            );
            return Err(CallError::InvalidTransition {
                from: inner.state,
                to: new_state,
            });
        }

        tracing::debug!(
            "call {}: {} -> {}",
            self.local_id,
            inner.state,
            new_state
        );
        inner.state = new_state;
        if new_state == CallState::Connected {
            if inner.connected_at.is_none() {
                inner.connected_at = Some(Instant::now());
            }
        } else {
            inner.connected_at = None;
        }

        inner
            .observers
            .for_each_live(|observer| observer.state_did_change(self, new_state));
        Ok(())
    }

    /// Enable or disable local video and notify observers.
    pub fn set_has_video(&self, has_video: bool) {
        let mut inner = self.inner.lock().unwrap();
        inner.has_video = has_video;
        tracing::debug!("call {}: video enabled: {has_video}", self.local_id);
        inner
            .observers
            .for_each_live(|observer| observer.has_video_did_change(self, has_video));
    }

    /// Mute or unmute the microphone and notify observers.
    pub fn set_muted(&self, muted: bool) {
        let mut inner = self.inner.lock().unwrap();
        inner.muted = muted;
        tracing::debug!("call {}: muted: {muted}", self.local_id);
        inner
            .observers
            .for_each_live(|observer| observer.mute_did_change(self, muted));
    }

    /// Enable or disable the speakerphone route and notify observers.
    pub fn set_speakerphone_enabled(&self, enabled: bool) {
        let mut inner = self.inner.lock().unwrap();
        inner.speakerphone = enabled;
        tracing::debug!("call {}: speakerphone: {enabled}", self.local_id);
        inner
            .observers
            .for_each_live(|observer| observer.speakerphone_did_change(self, enabled));
    }

    /// Record a failure detail, typically alongside a transition to
    /// [`CallState::LocalFailure`]. Does not notify observers.
    pub fn set_last_error(&self, detail: impl Into<String>) {
        let detail = detail.into();
        tracing::warn!("call {}: {detail}", self.local_id);
        self.inner.lock().unwrap().last_error = Some(detail);
    }

    /// Elapsed time since the call connected.
    ///
    /// Fails with [`CallError::NotConnected`] unless the call is
    /// currently in [`CallState::Connected`].
    pub fn connection_duration(&self) -> Result<Duration, CallError> {
        let inner = self.inner.lock().unwrap();
        match inner.connected_at {
            Some(connected_at) if inner.state.is_connected() => Ok(connected_at.elapsed()),
            _ => Err(CallError::NotConnected),
        }
    }

    /// Register an observer and immediately deliver a
    /// `state_did_change` for the current state, so a late-joining
    /// observer is never out of sync with history.
    ///
    /// The registry holds the observer weakly: dropping the last `Arc`
    /// elsewhere deregisters it implicitly. Registering the same
    /// observer twice delivers every notification twice until
    /// [`CallSession::remove_observer`] is called.
    pub fn add_observer_and_sync(&self, observer: &Arc<dyn CallObserver>) {
        let mut inner = self.inner.lock().unwrap();
        inner.observers.add(Arc::downgrade(observer));
        observer.state_did_change(self, inner.state);
    }

    /// Remove every registration of `observer` (pointer identity).
    /// Removing an observer that was never registered is a no-op.
    pub fn remove_observer(&self, observer: &Arc<dyn CallObserver>) {
        self.inner.lock().unwrap().observers.remove(observer);
    }

    /// Drop all observer registrations; used by the orchestrator when
    /// tearing the session down.
    pub fn remove_all_observers(&self) {
        self.inner.lock().unwrap().observers.clear();
    }

    /// Number of currently live observers.
    pub fn observer_count(&self) -> usize {
        self.inner.lock().unwrap().observers.live_count()
    }
}

/// Sessions are identified by `local_id` alone. Comparison never takes
/// the session lock, so it is safe even while either side is mid-fanout.
impl PartialEq for CallSession {
    fn eq(&self, other: &Self) -> bool {
        self.local_id == other.local_id
    }
}

impl Eq for CallSession {}

impl std::hash::Hash for CallSession {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.local_id.hash(state);
    }
}

impl fmt::Debug for CallSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallSession")
            .field("local_id", &self.local_id)
            .field("signaling_id", &self.signaling_id)
            .field("direction", &self.direction)
            .field("remote_number", &self.remote_number)
            .finish_non_exhaustive()
    }
}
