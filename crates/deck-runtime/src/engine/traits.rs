//! Trait seams for the document engine and the conversion engine.

use super::command::EngineCommand;
use deck_event::EventBus;
use deck_types::{ContainerId, ErrorCode, InstanceId, LoadConfig, MediaMap};
use std::sync::Arc;
use thiserror::Error;

/// A call into the engine failed.
///
/// The engine is opaque; all it can tell us is a message. Callers decide
/// recoverability per operation — a failed directive may be retried, a
/// failed teardown is logged and swallowed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("engine call failed: {0}")]
pub struct EngineCallError(pub String);

impl EngineCallError {
    /// Creates an error from the engine's message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl ErrorCode for EngineCallError {
    fn code(&self) -> &'static str {
        "ENGINE_CALL_FAILED"
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// One live document-editing session.
///
/// The runtime owns an engine exclusively through its
/// [`InstanceHandle`](crate::instance::InstanceHandle); nothing else holds
/// a reference. Directives are fire-and-forget: completion of a save
/// arrives as a save-completed notification on the bus the engine was
/// built with.
pub trait DocumentEngine: Send + Sync {
    /// Hands a directive to the engine.
    ///
    /// # Errors
    ///
    /// [`EngineCallError`] if the engine rejects the directive.
    fn send_command(&self, command: EngineCommand) -> Result<(), EngineCallError>;

    /// Tears the session down and releases its resources.
    ///
    /// Callers treat failures here as non-fatal: the error is logged and
    /// the engine reference is dropped regardless.
    ///
    /// # Errors
    ///
    /// [`EngineCallError`] if the engine's own teardown reported failure.
    fn destroy_editor(&mut self) -> Result<(), EngineCallError>;
}

/// Builds engines for instance identities.
///
/// The factory is where the engine's lifecycle callbacks (save completed,
/// document ready, loading changed) get wired to the [`EventBus`], tagged
/// with the identity they belong to. Rebuilding an instance after a
/// permission transition goes through the same seam.
pub trait EngineFactory: Send + Sync {
    /// Creates an engine bound to `(container_id, instance_id)` loading
    /// `config`, reporting its lifecycle through `bus`.
    ///
    /// # Errors
    ///
    /// [`EngineCallError`] if the engine could not be constructed; the
    /// caller leaves the identity unbound in that case.
    fn create_engine(
        &self,
        instance_id: InstanceId,
        container_id: &ContainerId,
        config: &LoadConfig,
        bus: &Arc<EventBus>,
    ) -> Result<Box<dyn DocumentEngine>, EngineCallError>;
}

/// Output of one format conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Converted {
    /// Output file name, extension adjusted to the target format.
    pub file_name: String,
    /// Converted document bytes.
    pub data: Vec<u8>,
}

/// The format lookup failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    /// No conversion exists from the given source format.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
}

impl ErrorCode for ConvertError {
    fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat(_) => "CONVERT_UNSUPPORTED_FORMAT",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// Pure document-format conversion.
///
/// Implementations are expected to be idempotent and free of side effects
/// beyond their own scratch storage.
pub trait FormatConverter: Send + Sync {
    /// Converts `data` (named `source_name`) into `target_format`.
    ///
    /// # Errors
    ///
    /// [`ConvertError::UnsupportedFormat`] if no conversion path exists
    /// for the source format.
    fn convert(
        &self,
        data: &[u8],
        source_name: &str,
        target_format: &str,
        media: Option<&MediaMap>,
    ) -> Result<Converted, ConvertError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use deck_types::assert_error_code;

    #[test]
    fn engine_call_error_code() {
        let err = EngineCallError::new("session crashed");
        assert_error_code(&err, "ENGINE_");
        assert!(!err.is_recoverable());
        assert_eq!(err.to_string(), "engine call failed: session crashed");
    }

    #[test]
    fn convert_error_code() {
        let err = ConvertError::UnsupportedFormat("xyz".into());
        assert_error_code(&err, "CONVERT_");
        assert!(!err.is_recoverable());
    }
}
