//! Capability-limited accessor to a bound engine.

use crate::engine::EngineCommand;
use crate::instance::error::InstanceError;
use crate::instance::handle::InstanceHandle;
use serde_json::Value;
use tracing::debug;

/// Engine directives the facade passes through by name.
///
/// Everything else is answered with [`DirectiveOutcome::Ignored`], which
/// keeps the callable surface auditable: widening it is a change to this
/// list, not to call sites.
pub const EDITOR_DIRECTIVES: &[&str] = &["focus", "refresh", "set_zoom", "search"];

/// Result of a pass-through directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveOutcome {
    /// The directive was on the allow-list and was handed to the engine.
    Sent,
    /// The directive is not on the allow-list; nothing happened.
    Ignored,
}

/// Narrow view over a bound engine.
///
/// Obtained from [`InstanceHandle::editor`]; only exists while an engine
/// is bound. All teardown goes back through the handle so instance
/// bookkeeping can never be bypassed.
///
/// # Example
///
/// ```no_run
/// # use deck_runtime::instance::{InstanceRegistry, DirectiveOutcome};
/// # fn demo(registry: &mut InstanceRegistry) {
/// let handle = registry.create_default();
/// if let Some(editor) = handle.editor() {
///     let outcome = editor.directive("focus", serde_json::Value::Null).unwrap();
///     assert_eq!(outcome, DirectiveOutcome::Sent);
///     editor.destroy();
/// }
/// # }
/// ```
pub struct EditorFacade<'a> {
    handle: &'a mut InstanceHandle,
}

impl<'a> EditorFacade<'a> {
    pub(crate) fn new(handle: &'a mut InstanceHandle) -> Self {
        Self { handle }
    }

    /// Hands a command to the engine.
    ///
    /// # Errors
    ///
    /// [`InstanceError::NotInitialized`] if the engine vanished,
    /// [`InstanceError::Engine`] if the engine rejected the command.
    pub fn send_command(&self, command: EngineCommand) -> Result<(), InstanceError> {
        let engine = self
            .handle
            .engine_ref()
            .ok_or(InstanceError::NotInitialized)?;
        engine.send_command(command)?;
        Ok(())
    }

    /// Passes a named directive through, if it is on the allow-list.
    ///
    /// Unknown directives are ignored rather than rejected, so callers
    /// written against a richer engine degrade quietly.
    ///
    /// # Errors
    ///
    /// Same conditions as [`send_command`](Self::send_command), for
    /// allow-listed directives only.
    pub fn directive(&self, name: &str, data: Value) -> Result<DirectiveOutcome, InstanceError> {
        if !EDITOR_DIRECTIVES.contains(&name) {
            debug!(directive = name, "directive not on allow-list, ignored");
            return Ok(DirectiveOutcome::Ignored);
        }
        self.send_command(EngineCommand::new(name, data))?;
        Ok(DirectiveOutcome::Sent)
    }

    /// Destroys the underlying instance through the handle.
    ///
    /// Consumes the facade; the handle's bookkeeping is updated and the
    /// operation never fails.
    pub fn destroy(self) {
        self.handle.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineFactory, StubFactory};
    use deck_event::EventBus;
    use deck_types::{ContainerId, LoadConfig};
    use std::sync::Arc;

    fn bound_handle(factory: &Arc<StubFactory>) -> InstanceHandle {
        let bus = Arc::new(EventBus::new());
        let factory_obj: Arc<dyn EngineFactory> = factory.clone();
        let mut handle = InstanceHandle::new(ContainerId::default(), Arc::clone(&bus), factory_obj);
        let config = LoadConfig::new("doc.docx", "docx");
        let engine = factory
            .create_engine(handle.instance_id(), handle.container_id(), &config, &bus)
            .unwrap();
        handle.create(engine, config);
        handle
    }

    #[test]
    fn unbound_handle_has_no_facade() {
        let factory = Arc::new(StubFactory::new());
        let mut handle =
            InstanceHandle::new(ContainerId::default(), Arc::new(EventBus::new()), factory);
        assert!(handle.editor().is_none());
    }

    #[test]
    fn allow_listed_directive_is_sent() {
        let factory = Arc::new(StubFactory::new());
        let mut handle = bound_handle(&factory);

        let editor = handle.editor().unwrap();
        let outcome = editor.directive("focus", Value::Null).unwrap();

        assert_eq!(outcome, DirectiveOutcome::Sent);
        assert_eq!(factory.commands().last().unwrap().command, "focus");
    }

    #[test]
    fn unknown_directive_is_inert() {
        let factory = Arc::new(StubFactory::new());
        let mut handle = bound_handle(&factory);

        let editor = handle.editor().unwrap();
        let outcome = editor.directive("reformat_disk", Value::Null).unwrap();

        assert_eq!(outcome, DirectiveOutcome::Ignored);
        assert!(factory.commands().is_empty());
    }

    #[test]
    fn facade_destroy_updates_handle() {
        let factory = Arc::new(StubFactory::new());
        let mut handle = bound_handle(&factory);

        handle.editor().unwrap().destroy();

        assert!(!handle.exists());
        assert!(handle.editor().is_none());
        assert_eq!(factory.destroyed(), 1);
    }
}
