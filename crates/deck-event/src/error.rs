//! Event layer errors.
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`EventError::Timeout`] | `EVENT_TIMEOUT` | Yes |
//! | [`EventError::Closed`] | `EVENT_BUS_CLOSED` | No |

use crate::event::EventKind;
use deck_types::ErrorCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Event layer error.
///
/// # Example
///
/// ```
/// use deck_event::{EventError, EventKind};
/// use deck_types::ErrorCode;
///
/// let err = EventError::Timeout(EventKind::SaveCompleted);
/// assert_eq!(err.code(), "EVENT_TIMEOUT");
/// assert!(err.is_recoverable());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum EventError {
    /// No matching occurrence arrived within the wait deadline.
    ///
    /// The emitter may simply be slow; a retry can succeed.
    #[error("timed out waiting for {0} event")]
    Timeout(EventKind),

    /// The bus was dropped while a wait was outstanding.
    #[error("event bus closed")]
    Closed,
}

impl ErrorCode for EventError {
    fn code(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "EVENT_TIMEOUT",
            Self::Closed => "EVENT_BUS_CLOSED",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deck_types::assert_error_codes;

    #[test]
    fn all_error_codes_valid() {
        assert_error_codes(
            &[EventError::Timeout(EventKind::SaveCompleted), EventError::Closed],
            "EVENT_",
        );
    }

    #[test]
    fn timeout_is_recoverable() {
        assert!(EventError::Timeout(EventKind::DocumentReady).is_recoverable());
        assert!(!EventError::Closed.is_recoverable());
    }
}
