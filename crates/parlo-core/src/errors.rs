use thiserror::Error;

use crate::state::CallState;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CallError {
    #[error("call already ended in state {from}, cannot transition to {to}")]
    InvalidTransition { from: CallState, to: CallState },
    #[error("call is not connected")]
    NotConnected,
}
