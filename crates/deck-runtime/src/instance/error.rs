//! Instance layer errors.
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`InstanceError::NotInitialized`] | `INSTANCE_NOT_INITIALIZED` | No |
//! | [`InstanceError::ExportTimeout`] | `INSTANCE_EXPORT_TIMEOUT` | Yes |
//! | [`InstanceError::Engine`] | `INSTANCE_ENGINE_FAILED` | No |
//! | [`InstanceError::BusClosed`] | `INSTANCE_BUS_CLOSED` | No |
//!
//! Teardown failures have no variant on purpose: destruction must always
//! succeed from the caller's point of view, so those errors are logged at
//! the point of teardown and swallowed.

use crate::engine::EngineCallError;
use deck_types::ErrorCode;
use thiserror::Error;

/// Instance layer error.
///
/// # Example
///
/// ```
/// use deck_runtime::instance::InstanceError;
/// use deck_types::ErrorCode;
///
/// let err = InstanceError::ExportTimeout;
/// assert_eq!(err.code(), "INSTANCE_EXPORT_TIMEOUT");
/// assert!(err.is_recoverable());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstanceError {
    /// The operation needs a bound engine and none is bound.
    #[error("no engine bound to this instance")]
    NotInitialized,

    /// The engine never reported the export within the deadline.
    ///
    /// The previous engine state is untouched; a retry may succeed.
    #[error("timed out waiting for export payload")]
    ExportTimeout,

    /// The engine rejected a call.
    #[error(transparent)]
    Engine(#[from] EngineCallError),

    /// The notification bus disappeared while a wait was outstanding.
    #[error("event bus closed during wait")]
    BusClosed,
}

impl ErrorCode for InstanceError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotInitialized => "INSTANCE_NOT_INITIALIZED",
            Self::ExportTimeout => "INSTANCE_EXPORT_TIMEOUT",
            Self::Engine(_) => "INSTANCE_ENGINE_FAILED",
            Self::BusClosed => "INSTANCE_BUS_CLOSED",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::ExportTimeout)
    }
}
