//! Session lifecycle state machine.
//!
//! The transition table is the single source of truth for which lifecycle
//! events a session accepts; the store validates every status mutation
//! through it inside the same transaction that applies the change.

use crate::domain::{SessionEvent, SessionStatus};
use crate::error::CoreError;

/// Apply a lifecycle event to a session status.
///
/// Returns the next status, or `InvalidTransition` for every `(state,
/// event)` pair outside the table. Terminal states accept nothing.
pub fn apply(from: SessionStatus, event: SessionEvent) -> Result<SessionStatus, CoreError> {
    use SessionEvent::*;
    use SessionStatus::*;

    let next = match (from, event) {
        (Initializing, Start) => Running,
        (Running, Pause) => Paused,
        (Paused, Resume) => Running,
        (Running | Paused, Stop) => Stopped,
        (Running, Complete) => Completed,
        // Fail is accepted from any non-terminal state.
        (Initializing | Running | Paused, Fail) => Error,
        _ => {
            return Err(CoreError::InvalidTransition {
                entity: "session",
                from: from.as_str().to_string(),
                event: event.as_str().to_string(),
            })
        }
    };

    Ok(next)
}

pub fn can_apply(from: SessionStatus, event: SessionEvent) -> bool {
    apply(from, event).is_ok()
}
