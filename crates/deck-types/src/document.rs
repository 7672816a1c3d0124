//! Document data model: load configuration, render configuration, and
//! export payloads.
//!
//! A [`LoadConfig`] is retained by the instance that loaded it so the
//! engine can be rebuilt from scratch after a permission transition the
//! engine cannot perform in place. A [`SaveResult`] is produced exactly
//! once per export and handed to the caller; nothing here retains it.

use crate::id::{ContainerId, InstanceId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Map from embedded-media name to its resolved location or payload ref.
pub type MediaMap = HashMap<String, String>;

/// Permission mode of a live instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineMode {
    /// Document accepts edits.
    Editable,
    /// Document is view-only.
    ReadOnly,
}

impl EngineMode {
    /// Maps the wire-level `read_only` flag to a mode.
    #[must_use]
    pub fn from_flag(read_only: bool) -> Self {
        if read_only {
            Self::ReadOnly
        } else {
            Self::Editable
        }
    }

    /// Returns `true` for [`EngineMode::ReadOnly`].
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::ReadOnly)
    }
}

/// Everything needed to load a document into an engine instance.
///
/// Retained for the lifetime of the instance: switching a read-only
/// instance back to editable rebuilds the engine from this configuration,
/// because the engine cannot relax permissions on a live instance.
///
/// # Example
///
/// ```
/// use deck_types::LoadConfig;
///
/// let config = LoadConfig::new("notes.odt", "odt")
///     .with_data(b"PK".to_vec())
///     .read_only(false);
///
/// assert_eq!(config.file_name, "notes.odt");
/// assert!(!config.mode().is_read_only());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    /// User-facing file name, extension included.
    pub file_name: String,
    /// Source format tag (e.g. `docx`, `odt`).
    pub format: String,
    /// Document bytes in the engine's load format. Empty for a new file.
    #[serde(default)]
    pub data: Vec<u8>,
    /// Embedded media referenced by the document, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaMap>,
    /// Whether the instance starts view-only.
    #[serde(default)]
    pub read_only: bool,
    /// Whether this is a freshly created document with no source bytes.
    #[serde(default)]
    pub is_new: bool,
    /// UI language tag handed through to the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

impl LoadConfig {
    /// Creates a configuration for the given file name and format tag.
    #[must_use]
    pub fn new(file_name: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            format: format.into(),
            data: Vec::new(),
            media: None,
            read_only: false,
            is_new: false,
            lang: None,
        }
    }

    /// Sets the document bytes.
    #[must_use]
    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }

    /// Sets the embedded-media map.
    #[must_use]
    pub fn with_media(mut self, media: MediaMap) -> Self {
        self.media = Some(media);
        self
    }

    /// Sets the initial permission mode.
    #[must_use]
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Marks the configuration as a new, sourceless document.
    #[must_use]
    pub fn new_document(mut self) -> Self {
        self.is_new = true;
        self
    }

    /// Sets the UI language tag.
    #[must_use]
    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    /// Returns the permission mode this configuration loads in.
    #[must_use]
    pub fn mode(&self) -> EngineMode {
        EngineMode::from_flag(self.read_only)
    }
}

/// The renderable subset of a load configuration, kept per tab/session
/// key so a cold tab can be brought back without its live instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// User-facing file name.
    pub file_name: String,
    /// Source format tag.
    pub format: String,
    /// Whether the tab renders view-only.
    #[serde(default)]
    pub read_only: bool,
    /// UI language tag, if one was chosen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

impl RenderConfig {
    /// Creates a render configuration for the given file.
    #[must_use]
    pub fn new(file_name: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            format: format.into(),
            read_only: false,
            lang: None,
        }
    }
}

/// Payload produced by one completed export.
///
/// Carries the originating [`InstanceId`] so concurrent instances sharing
/// one notification bus can tell their own save apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveResult {
    /// Output file name.
    pub file_name: String,
    /// Output format tag.
    pub format: String,
    /// Serialized document bytes.
    pub data: Vec<u8>,
    /// The instance that produced this payload.
    pub instance_id: InstanceId,
    /// Embedded media carried alongside the document, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaMap>,
}

/// Identity echoed back to a cross-context caller after a create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedInstance {
    /// Process-unique id of the new instance.
    pub instance_id: InstanceId,
    /// Container the instance was mounted into.
    pub container_id: ContainerId,
}
