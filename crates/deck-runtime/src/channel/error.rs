//! Channel layer errors.
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`ChannelError::RequestTimeout`] | `CHANNEL_REQUEST_TIMEOUT` | Yes |
//! | [`ChannelError::SendFailed`] | `CHANNEL_SEND_FAILED` | Yes |
//! | [`ChannelError::Closed`] | `CHANNEL_CLOSED` | No |
//! | [`ChannelError::HostFailed`] | `CHANNEL_HOST_FAILED` | No |
//! | [`ChannelError::InvalidPayload`] | `CHANNEL_INVALID_PAYLOAD` | No |

use super::message::MessageKind;
use deck_types::ErrorCode;
use thiserror::Error;

/// Channel layer error.
///
/// # Example
///
/// ```
/// use deck_runtime::channel::{ChannelError, MessageKind};
/// use deck_types::ErrorCode;
///
/// let err = ChannelError::RequestTimeout { kind: MessageKind::Export };
/// assert_eq!(err.code(), "CHANNEL_REQUEST_TIMEOUT");
/// assert!(err.is_recoverable());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// No response arrived within the deadline.
    ///
    /// The pending entry is removed on timeout; a response that arrives
    /// later is silently discarded.
    #[error("request timed out: {kind}")]
    RequestTimeout {
        /// The request kind that timed out.
        kind: MessageKind,
    },

    /// The channel was closed while the operation was outstanding.
    #[error("channel closed")]
    Closed,

    /// The transport refused the message.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// The hosted context reported a failure for this request.
    #[error("host error: {0}")]
    HostFailed(String),

    /// A payload could not be encoded or decoded.
    #[error("payload error: {0}")]
    InvalidPayload(String),
}

impl ErrorCode for ChannelError {
    fn code(&self) -> &'static str {
        match self {
            Self::RequestTimeout { .. } => "CHANNEL_REQUEST_TIMEOUT",
            Self::Closed => "CHANNEL_CLOSED",
            Self::SendFailed(_) => "CHANNEL_SEND_FAILED",
            Self::HostFailed(_) => "CHANNEL_HOST_FAILED",
            Self::InvalidPayload(_) => "CHANNEL_INVALID_PAYLOAD",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::RequestTimeout { .. } | Self::SendFailed(_))
    }
}
