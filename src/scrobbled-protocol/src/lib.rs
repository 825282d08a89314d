//! The AudioScrobbler Submissions Protocol 1.2 wire format and the
//! per-service scrobbler state machine.

pub mod form;
pub mod scrobbler;
pub mod wire;

pub use scrobbler::{FileScrobbler, NetworkScrobbler, RunState, ScrobblerError, ScrobblerHandle};
