use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a single call.
///
/// The four hangup/failure variants are terminal: once a call has
/// entered one of them, [`crate::session::CallSession::set_state`]
/// rejects any transition to a different state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CallState {
    /// No call activity yet.
    Idle,
    /// Outgoing call: offer sent, waiting for the remote device to ring.
    Dialing,
    /// Incoming call: offer received, local user has not yet answered.
    Answering,
    /// Outgoing call: the remote device is ringing.
    RemoteRinging,
    /// Incoming call: this device is ringing.
    LocalRinging,
    /// Media is flowing; the call is live.
    Connected,
    /// The call failed on this device (terminal).
    LocalFailure,
    /// The local user hung up (terminal).
    LocalHangup,
    /// The remote user hung up (terminal).
    RemoteHangup,
    /// The remote user was busy (terminal).
    RemoteBusy,
}

impl CallState {
    /// Whether no further state transition is permitted from here.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CallState::LocalFailure
                | CallState::LocalHangup
                | CallState::RemoteHangup
                | CallState::RemoteBusy
        )
    }

    /// Whether the call is live and media can flow.
    pub fn is_connected(&self) -> bool {
        matches!(self, CallState::Connected)
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallState::Idle => write!(f, "idle"),
            CallState::Dialing => write!(f, "dialing"),
            CallState::Answering => write!(f, "answering"),
            CallState::RemoteRinging => write!(f, "remote ringing"),
            CallState::LocalRinging => write!(f, "local ringing"),
            CallState::Connected => write!(f, "connected"),
            CallState::LocalFailure => write!(f, "local failure"),
            CallState::LocalHangup => write!(f, "local hangup"),
            CallState::RemoteHangup => write!(f, "remote hangup"),
            CallState::RemoteBusy => write!(f, "remote busy"),
        }
    }
}

/// Direction of a call, from this device's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CallDirection {
    /// The local user placed the call.
    Outgoing,
    /// The call was received from the network.
    Incoming,
}
