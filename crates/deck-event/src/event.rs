//! Engine notification types.
//!
//! Three notification kinds cross the engine boundary. All of them carry
//! the originating instance id; correlation across concurrently live
//! instances depends on it.

use deck_types::{ContainerId, InstanceId, SaveResult};
use serde::{Deserialize, Serialize};

/// The kind of an engine notification, used as the subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// An export finished and its payload is available.
    SaveCompleted,
    /// The engine finished loading and rendering a document.
    DocumentReady,
    /// The engine's loading state flipped.
    LoadingChange,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::SaveCompleted => "save-completed",
            Self::DocumentReady => "document-ready",
            Self::LoadingChange => "loading-change",
        };
        f.write_str(name)
    }
}

/// A notification emitted by an engine instance.
///
/// # Example
///
/// ```
/// use deck_event::{EngineEvent, EventKind};
/// use deck_types::{ContainerId, InstanceId};
///
/// let instance = InstanceId::new();
/// let event = EngineEvent::document_ready(instance, ContainerId::default());
///
/// assert_eq!(event.kind(), EventKind::DocumentReady);
/// assert_eq!(event.instance_id(), instance);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineEvent {
    /// An export finished; the payload is passed to exactly one consumer.
    SaveCompleted(SaveResult),
    /// A document finished loading in its container.
    DocumentReady {
        /// The instance that became ready.
        instance_id: InstanceId,
        /// The container it is mounted in.
        container_id: ContainerId,
    },
    /// The loading indicator for an instance changed.
    LoadingChange {
        /// The instance whose state changed.
        instance_id: InstanceId,
        /// `true` while the instance is loading.
        loading: bool,
    },
}

impl EngineEvent {
    /// Creates a save-completed notification.
    #[must_use]
    pub fn save_completed(result: SaveResult) -> Self {
        Self::SaveCompleted(result)
    }

    /// Creates a document-ready notification.
    #[must_use]
    pub fn document_ready(instance_id: InstanceId, container_id: ContainerId) -> Self {
        Self::DocumentReady {
            instance_id,
            container_id,
        }
    }

    /// Creates a loading-change notification.
    #[must_use]
    pub fn loading_change(instance_id: InstanceId, loading: bool) -> Self {
        Self::LoadingChange {
            instance_id,
            loading,
        }
    }

    /// Returns the notification kind.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::SaveCompleted(_) => EventKind::SaveCompleted,
            Self::DocumentReady { .. } => EventKind::DocumentReady,
            Self::LoadingChange { .. } => EventKind::LoadingChange,
        }
    }

    /// Returns the instance this notification originated from.
    #[must_use]
    pub fn instance_id(&self) -> InstanceId {
        match self {
            Self::SaveCompleted(result) => result.instance_id,
            Self::DocumentReady { instance_id, .. } => *instance_id,
            Self::LoadingChange { instance_id, .. } => *instance_id,
        }
    }

    /// Extracts the export payload, if this is a save-completed event.
    #[must_use]
    pub fn into_save_result(self) -> Option<SaveResult> {
        match self {
            Self::SaveCompleted(result) => Some(result),
            _ => None,
        }
    }
}
