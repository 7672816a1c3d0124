//! Wire format of the cross-context channel.

use deck_types::{ContainerId, InstanceId, RequestId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message kinds crossing the channel.
///
/// Request kinds expect a correlated response; broadcast kinds carry no
/// request id and are fanned out to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    /// Hosted context finished its setup. Emitted once; duplicates are
    /// ignored.
    ServiceReady,
    /// Create (or rebind) an instance for a container.
    CreateEditor,
    /// Switch an instance's permission mode.
    SetReadOnly,
    /// Export an instance's document.
    Export,
    /// Destroy an instance.
    Destroy,
    /// Broadcast: a document finished loading.
    DocumentReady,
    /// Broadcast: an instance's loading state flipped.
    LoadingChange,
    /// Broadcast: an instance finished a save.
    SaveCompleted,
}

impl MessageKind {
    /// Returns `true` for the broadcast event tags forwarded to
    /// listeners.
    #[must_use]
    pub fn is_event(&self) -> bool {
        matches!(
            self,
            Self::DocumentReady | Self::LoadingChange | Self::SaveCompleted
        )
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::ServiceReady => "SERVICE_READY",
            Self::CreateEditor => "CREATE_EDITOR",
            Self::SetReadOnly => "SET_READ_ONLY",
            Self::Export => "EXPORT",
            Self::Destroy => "DESTROY",
            Self::DocumentReady => "DOCUMENT_READY",
            Self::LoadingChange => "LOADING_CHANGE",
            Self::SaveCompleted => "SAVE_COMPLETED",
        };
        f.write_str(name)
    }
}

/// One message on the wire.
///
/// Requests carry a fresh [`RequestId`]; the response echoes it.
/// Broadcast events and the readiness announcement carry none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMessage {
    /// What this message is.
    pub kind: MessageKind,
    /// Correlation id; `None` for broadcast traffic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,
    /// Payload; shape depends on `kind`.
    #[serde(default)]
    pub data: Value,
    /// Failure description on an error response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChannelMessage {
    /// Builds a request.
    #[must_use]
    pub fn request(kind: MessageKind, request_id: RequestId, data: Value) -> Self {
        Self {
            kind,
            request_id: Some(request_id),
            data,
            error: None,
        }
    }

    /// Builds a successful response echoing `request_id`.
    #[must_use]
    pub fn response(kind: MessageKind, request_id: RequestId, data: Value) -> Self {
        Self {
            kind,
            request_id: Some(request_id),
            data,
            error: None,
        }
    }

    /// Builds an error response echoing `request_id`.
    #[must_use]
    pub fn error_response(kind: MessageKind, request_id: RequestId, error: impl Into<String>) -> Self {
        Self {
            kind,
            request_id: Some(request_id),
            data: Value::Null,
            error: Some(error.into()),
        }
    }

    /// Builds a broadcast event.
    #[must_use]
    pub fn event(kind: MessageKind, data: Value) -> Self {
        Self {
            kind,
            request_id: None,
            data,
            error: None,
        }
    }

    /// Builds the one-shot readiness announcement.
    #[must_use]
    pub fn service_ready() -> Self {
        Self::event(MessageKind::ServiceReady, Value::Null)
    }
}

/// Payload of a [`MessageKind::CreateEditor`] request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateEditorArgs {
    /// User-facing file name, extension included.
    pub file_name: String,
    /// Source document bytes; absent for a new document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_data: Option<Vec<u8>>,
    /// Whether this is a freshly created document.
    #[serde(default)]
    pub is_new: bool,
    /// Whether the instance starts view-only.
    #[serde(default)]
    pub read_only: bool,
    /// UI language tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    /// Target container; the shared default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<ContainerId>,
}

impl CreateEditorArgs {
    /// Creates arguments for an existing document's bytes.
    #[must_use]
    pub fn new(file_name: impl Into<String>, file_data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            file_data: Some(file_data),
            is_new: false,
            read_only: false,
            lang: None,
            container_id: None,
        }
    }

    /// Creates arguments for a fresh, sourceless document.
    #[must_use]
    pub fn new_document(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            file_data: None,
            is_new: true,
            read_only: false,
            lang: None,
            container_id: None,
        }
    }

    /// Sets the target container.
    #[must_use]
    pub fn in_container(mut self, container: ContainerId) -> Self {
        self.container_id = Some(container);
        self
    }

    /// Sets the initial permission mode.
    #[must_use]
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Sets the UI language tag.
    #[must_use]
    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }
}

/// Payload of a [`MessageKind::SetReadOnly`] request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetReadOnlyArgs {
    /// Target instance.
    pub instance_id: InstanceId,
    /// Requested mode.
    pub read_only: bool,
}

/// Payload of requests addressing one instance
/// ([`MessageKind::Export`], [`MessageKind::Destroy`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRef {
    /// Target instance.
    pub instance_id: InstanceId,
}
