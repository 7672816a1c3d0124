//! Scriptable in-memory engine, factory and converter.
//!
//! Backs the test suites and serves as the smallest possible reference
//! for adapter authors: what the runtime calls, in which order, and which
//! notifications it expects back. The stub loads nothing and renders
//! nothing — it records directives and emits the notifications a real
//! engine would.

use super::command::EngineCommand;
use super::traits::{
    Converted, ConvertError, DocumentEngine, EngineCallError, EngineFactory, FormatConverter,
};
use deck_event::{EngineEvent, EventBus};
use deck_types::{ContainerId, InstanceId, LoadConfig, MediaMap, SaveResult};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Knobs controlling how stub engines behave.
#[derive(Debug, Clone)]
pub struct StubBehavior {
    /// Emit a save-completed notification when a `save` directive lands.
    pub auto_save: bool,
    /// Announce document-ready on the bus as soon as an engine is built.
    pub announce_ready: bool,
    /// Reject every directive.
    pub fail_commands: bool,
    /// Report teardown failure (teardown still counts as performed).
    pub fail_destroy: bool,
    /// Refuse to construct engines.
    pub fail_create: bool,
    /// Bytes returned by auto-saves; defaults to the file name.
    pub save_payload: Option<Vec<u8>>,
}

impl Default for StubBehavior {
    fn default() -> Self {
        Self {
            auto_save: true,
            announce_ready: true,
            fail_commands: false,
            fail_destroy: false,
            fail_create: false,
            save_payload: None,
        }
    }
}

/// In-memory engine that records directives and plays back notifications.
pub struct StubEngine {
    instance_id: InstanceId,
    file_name: String,
    format: String,
    media: Option<MediaMap>,
    bus: Arc<EventBus>,
    behavior: StubBehavior,
    commands: Arc<Mutex<Vec<EngineCommand>>>,
    destroyed: Arc<AtomicUsize>,
}

impl DocumentEngine for StubEngine {
    fn send_command(&self, command: EngineCommand) -> Result<(), EngineCallError> {
        if self.behavior.fail_commands {
            return Err(EngineCallError::new("directive refused"));
        }

        let is_save = command.command == "save";
        self.commands.lock().push(command);

        if is_save && self.behavior.auto_save {
            let data = self
                .behavior
                .save_payload
                .clone()
                .unwrap_or_else(|| self.file_name.as_bytes().to_vec());
            self.bus.emit(EngineEvent::save_completed(SaveResult {
                file_name: self.file_name.clone(),
                format: self.format.clone(),
                data,
                instance_id: self.instance_id,
                media: self.media.clone(),
            }));
        }

        Ok(())
    }

    fn destroy_editor(&mut self) -> Result<(), EngineCallError> {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
        if self.behavior.fail_destroy {
            return Err(EngineCallError::new("teardown refused"));
        }
        Ok(())
    }
}

/// Factory producing [`StubEngine`]s, with shared counters for
/// assertions.
#[derive(Default)]
pub struct StubFactory {
    behavior: Mutex<StubBehavior>,
    built: AtomicUsize,
    destroyed: Arc<AtomicUsize>,
    commands: Arc<Mutex<Vec<EngineCommand>>>,
}

impl StubFactory {
    /// Creates a factory with default behavior.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a factory with the given behavior.
    #[must_use]
    pub fn with_behavior(behavior: StubBehavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            ..Self::default()
        }
    }

    /// Replaces the behavior applied to engines built from now on.
    pub fn set_behavior(&self, behavior: StubBehavior) {
        *self.behavior.lock() = behavior;
    }

    /// Number of engines built so far.
    #[must_use]
    pub fn built(&self) -> usize {
        self.built.load(Ordering::SeqCst)
    }

    /// Number of engine teardowns performed so far.
    #[must_use]
    pub fn destroyed(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Every directive any of this factory's engines received.
    #[must_use]
    pub fn commands(&self) -> Vec<EngineCommand> {
        self.commands.lock().clone()
    }
}

impl EngineFactory for StubFactory {
    fn create_engine(
        &self,
        instance_id: InstanceId,
        container_id: &ContainerId,
        config: &LoadConfig,
        bus: &Arc<EventBus>,
    ) -> Result<Box<dyn DocumentEngine>, EngineCallError> {
        let behavior = self.behavior.lock().clone();
        if behavior.fail_create {
            return Err(EngineCallError::new("engine construction refused"));
        }

        self.built.fetch_add(1, Ordering::SeqCst);
        let announce = behavior.announce_ready;
        let engine = StubEngine {
            instance_id,
            file_name: config.file_name.clone(),
            format: config.format.clone(),
            media: config.media.clone(),
            bus: Arc::clone(bus),
            behavior,
            commands: Arc::clone(&self.commands),
            destroyed: Arc::clone(&self.destroyed),
        };

        if announce {
            bus.emit(EngineEvent::document_ready(instance_id, container_id.clone()));
        }

        Ok(Box::new(engine))
    }
}

/// Converter that copies bytes through for a fixed set of source formats.
pub struct StubConverter {
    supported: Vec<String>,
}

impl StubConverter {
    /// Creates a converter accepting the given source format tags.
    #[must_use]
    pub fn new(supported: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            supported: supported.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for StubConverter {
    fn default() -> Self {
        Self::new(["docx", "odt", "xlsx", "pptx", "txt"])
    }
}

impl FormatConverter for StubConverter {
    fn convert(
        &self,
        data: &[u8],
        source_name: &str,
        target_format: &str,
        _media: Option<&MediaMap>,
    ) -> Result<Converted, ConvertError> {
        let source_tag = source_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();

        if !self.supported.iter().any(|tag| *tag == source_tag) {
            return Err(ConvertError::UnsupportedFormat(source_tag));
        }

        let stem = source_name
            .rsplit_once('.')
            .map_or(source_name, |(stem, _)| stem);
        Ok(Converted {
            file_name: format!("{stem}.{target_format}"),
            data: data.to_vec(),
        })
    }
}
