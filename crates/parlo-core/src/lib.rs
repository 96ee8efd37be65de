//! Parlo call session core.
//!
//! Pure Rust crate with no platform dependencies. Owns the state of a
//! single voice/video call and fans every change out, synchronously and
//! in order, to the UI shells, telephony integration and audio routing
//! that observe it. Signaling transport, the media engine and call
//! history live in sibling crates and consume this one.

pub mod errors;
pub mod observer;
pub mod session;
pub mod state;

pub use errors::CallError;
pub use observer::CallObserver;
pub use session::{CallId, CallInfo, CallSession};
pub use state::{CallDirection, CallState};
