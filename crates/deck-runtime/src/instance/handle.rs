//! InstanceHandle — exclusive owner of one live engine.

use crate::engine::{DocumentEngine, EngineCommand, EngineFactory};
use crate::instance::error::InstanceError;
use crate::instance::facade::EditorFacade;
use deck_event::{EventBus, EventError, EventSubscriber};
use deck_types::{ContainerId, EngineMode, InstanceId, LoadConfig, SaveResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default deadline for one export round-trip.
pub const DEFAULT_EXPORT_TIMEOUT: Duration = Duration::from_secs(30);

/// Owns exactly one engine and its identity.
///
/// # Lifecycle
///
/// ```text
/// unbound ──create──► bound ──destroy──► destroyed (inert)
///                      │  ▲
///                      └──┘ set_read_only(false) rebuilds in place
/// ```
///
/// The handle retains the [`LoadConfig`] it was bound with so the engine
/// can be rebuilt after a permission transition the engine cannot perform
/// live. `exists()` reports `true` exactly while an engine is bound.
///
/// Callers invoke `create`, `set_read_only`, `export` and `destroy`
/// sequentially; overlapping calls on one handle are not serialized here
/// and their interleaving is unspecified.
pub struct InstanceHandle {
    container_id: ContainerId,
    instance_id: InstanceId,
    engine: Option<Box<dyn DocumentEngine>>,
    config: Option<LoadConfig>,
    mode: EngineMode,
    export_timeout: Duration,
    bus: Arc<EventBus>,
    factory: Arc<dyn EngineFactory>,
}

impl InstanceHandle {
    pub(crate) fn new(
        container_id: ContainerId,
        bus: Arc<EventBus>,
        factory: Arc<dyn EngineFactory>,
    ) -> Self {
        Self {
            container_id,
            instance_id: InstanceId::new(),
            engine: None,
            config: None,
            mode: EngineMode::Editable,
            export_timeout: DEFAULT_EXPORT_TIMEOUT,
            bus,
            factory,
        }
    }

    /// Returns the container this handle is mounted in.
    #[must_use]
    pub fn container_id(&self) -> &ContainerId {
        &self.container_id
    }

    /// Returns the process-unique instance id.
    #[must_use]
    pub fn instance_id(&self) -> InstanceId {
        self.instance_id
    }

    /// Returns the current permission mode.
    #[must_use]
    pub fn mode(&self) -> EngineMode {
        self.mode
    }

    /// Returns `true` if the instance is view-only.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.mode.is_read_only()
    }

    /// Returns `true` while an engine is bound.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.engine.is_some()
    }

    /// Overrides the export deadline for this handle.
    pub fn set_export_timeout(&mut self, timeout: Duration) {
        self.export_timeout = timeout;
    }

    /// Binds `engine`, retiring any previously bound engine first.
    ///
    /// The previous engine's teardown is best-effort: a failure is logged
    /// and the bind proceeds. The permission mode is taken from `config`.
    pub fn create(&mut self, engine: Box<dyn DocumentEngine>, config: LoadConfig) {
        if let Some(previous) = self.engine.take() {
            debug!(instance = %self.instance_id, "retiring previously bound engine");
            teardown_quietly(previous, self.instance_id);
        }

        self.mode = config.mode();
        self.config = Some(config);
        self.engine = Some(engine);
    }

    /// Returns the capability-limited accessor to the engine, or `None`
    /// while unbound.
    pub fn editor(&mut self) -> Option<EditorFacade<'_>> {
        if self.engine.is_some() {
            Some(EditorFacade::new(self))
        } else {
            None
        }
    }

    pub(crate) fn engine_ref(&self) -> Option<&dyn DocumentEngine> {
        self.engine.as_deref()
    }

    /// Releases the engine. Idempotent; never fails.
    ///
    /// An engine whose own teardown reports failure is still released —
    /// the error is logged and the handle becomes inert.
    pub fn destroy(&mut self) {
        if let Some(engine) = self.engine.take() {
            teardown_quietly(engine, self.instance_id);
            self.config = None;
            debug!(instance = %self.instance_id, "instance destroyed");
        }
    }

    /// Switches the permission mode.
    ///
    /// Restricting (`editable → read-only`) issues an in-place directive
    /// to the live engine. Lifting the restriction (`read-only →
    /// editable`) rebuilds the engine from the retained [`LoadConfig`],
    /// because the engine only honours the restricting direction live.
    /// Either way the stored mode changes only after the underlying step
    /// succeeded; on failure the previous mode and engine stay in effect.
    ///
    /// # Errors
    ///
    /// [`InstanceError::NotInitialized`] while unbound;
    /// [`InstanceError::Engine`] if the directive or the rebuild failed.
    pub fn set_read_only(&mut self, read_only: bool) -> Result<(), InstanceError> {
        let engine = self.engine.as_ref().ok_or(InstanceError::NotInitialized)?;

        match (self.mode, read_only) {
            (EngineMode::Editable, true) => {
                engine.send_command(EngineCommand::restrict_editing(true))?;
                self.mode = EngineMode::ReadOnly;
                if let Some(config) = self.config.as_mut() {
                    config.read_only = true;
                }
                debug!(instance = %self.instance_id, "editing restricted in place");
                Ok(())
            }
            (EngineMode::ReadOnly, false) => {
                let mut config = self
                    .config
                    .clone()
                    .ok_or(InstanceError::NotInitialized)?;
                config.read_only = false;

                let rebuilt = self.factory.create_engine(
                    self.instance_id,
                    &self.container_id,
                    &config,
                    &self.bus,
                )?;

                if let Some(previous) = self.engine.replace(rebuilt) {
                    teardown_quietly(previous, self.instance_id);
                }
                self.config = Some(config);
                self.mode = EngineMode::Editable;
                debug!(instance = %self.instance_id, "engine rebuilt as editable");
                Ok(())
            }
            // Already in the requested mode.
            _ => Ok(()),
        }
    }

    /// Starts an export: subscribes for the completion, then triggers the
    /// engine's save.
    ///
    /// Subscription happens before the trigger, so a completion delivered
    /// synchronously is not missed. If the trigger itself fails the
    /// returned error carries it and the subscription is dropped — no
    /// dangling wait remains.
    ///
    /// # Errors
    ///
    /// [`InstanceError::NotInitialized`] while unbound;
    /// [`InstanceError::Engine`] if the save directive was rejected.
    pub fn begin_export(&self) -> Result<PendingExport, InstanceError> {
        let engine = self.engine.as_ref().ok_or(InstanceError::NotInitialized)?;
        let subscriber = self.bus.subscriber();
        engine.send_command(EngineCommand::save())?;

        Ok(PendingExport {
            subscriber,
            instance_id: self.instance_id,
            timeout: self.export_timeout,
        })
    }

    /// Exports the document and waits for this instance's payload.
    ///
    /// Completions belonging to other instances on the same bus are
    /// ignored; only a save tagged with this handle's instance id
    /// resolves the wait.
    ///
    /// # Errors
    ///
    /// [`InstanceError::ExportTimeout`] if no matching completion arrives
    /// within the export deadline; see [`begin_export`](Self::begin_export)
    /// for trigger-time errors.
    pub async fn export(&self) -> Result<SaveResult, InstanceError> {
        self.begin_export()?.wait().await
    }
}

impl std::fmt::Debug for InstanceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceHandle")
            .field("container_id", &self.container_id)
            .field("instance_id", &self.instance_id)
            .field("bound", &self.engine.is_some())
            .field("mode", &self.mode)
            .finish()
    }
}

/// An export that has been triggered and is awaiting its payload.
///
/// Detached from the handle so the wait can continue while the handle
/// serves other callers.
pub struct PendingExport {
    subscriber: EventSubscriber,
    instance_id: InstanceId,
    timeout: Duration,
}

impl PendingExport {
    /// Returns the instance whose payload is awaited.
    #[must_use]
    pub fn instance_id(&self) -> InstanceId {
        self.instance_id
    }

    /// Waits for the matching save payload.
    ///
    /// # Errors
    ///
    /// [`InstanceError::ExportTimeout`] when the deadline elapses without
    /// a matching completion; [`InstanceError::BusClosed`] if the bus was
    /// dropped mid-wait.
    pub async fn wait(mut self) -> Result<SaveResult, InstanceError> {
        match self
            .subscriber
            .wait_save(self.instance_id, self.timeout)
            .await
        {
            Ok(result) => Ok(result),
            Err(EventError::Timeout(_)) => Err(InstanceError::ExportTimeout),
            Err(EventError::Closed) => Err(InstanceError::BusClosed),
        }
    }
}

fn teardown_quietly(mut engine: Box<dyn DocumentEngine>, instance: InstanceId) {
    if let Err(err) = engine.destroy_editor() {
        warn!(%instance, %err, "engine teardown failed, releasing reference anyway");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{StubBehavior, StubFactory};

    fn handle_with(factory: Arc<StubFactory>) -> InstanceHandle {
        InstanceHandle::new(ContainerId::default(), Arc::new(EventBus::new()), factory)
    }

    fn bind(handle: &mut InstanceHandle, factory: &StubFactory, read_only: bool) {
        let config = LoadConfig::new("doc.docx", "docx").read_only(read_only);
        let bus = Arc::clone(&handle.bus);
        let engine = factory
            .create_engine(handle.instance_id(), handle.container_id(), &config, &bus)
            .unwrap();
        handle.create(engine, config);
    }

    #[test]
    fn starts_unbound() {
        let factory = Arc::new(StubFactory::new());
        let handle = handle_with(factory);
        assert!(!handle.exists());
        assert!(!handle.is_read_only());
    }

    #[test]
    fn create_binds_and_sets_mode() {
        let factory = Arc::new(StubFactory::new());
        let mut handle = handle_with(Arc::clone(&factory));
        bind(&mut handle, &factory, true);

        assert!(handle.exists());
        assert!(handle.is_read_only());
    }

    #[test]
    fn rebind_retires_previous_engine() {
        let factory = Arc::new(StubFactory::new());
        let mut handle = handle_with(Arc::clone(&factory));
        bind(&mut handle, &factory, false);
        bind(&mut handle, &factory, false);

        assert_eq!(factory.built(), 2);
        assert_eq!(factory.destroyed(), 1);
    }

    #[test]
    fn destroy_is_idempotent() {
        let factory = Arc::new(StubFactory::new());
        let mut handle = handle_with(Arc::clone(&factory));
        bind(&mut handle, &factory, false);

        handle.destroy();
        handle.destroy();

        assert!(!handle.exists());
        assert_eq!(factory.destroyed(), 1);
    }

    #[test]
    fn destroy_swallows_teardown_failure() {
        let factory = Arc::new(StubFactory::with_behavior(StubBehavior {
            fail_destroy: true,
            ..StubBehavior::default()
        }));
        let mut handle = handle_with(Arc::clone(&factory));
        bind(&mut handle, &factory, false);

        handle.destroy();

        assert!(!handle.exists());
        assert_eq!(factory.destroyed(), 1);
    }

    #[test]
    fn restrict_in_place_keeps_engine() {
        let factory = Arc::new(StubFactory::new());
        let mut handle = handle_with(Arc::clone(&factory));
        bind(&mut handle, &factory, false);

        handle.set_read_only(true).unwrap();

        assert!(handle.is_read_only());
        assert_eq!(factory.built(), 1);
        let commands = factory.commands();
        assert_eq!(commands.last().unwrap().command, "restrict_editing");
    }

    #[test]
    fn restrict_failure_keeps_previous_mode() {
        let factory = Arc::new(StubFactory::new());
        let mut handle = handle_with(Arc::clone(&factory));
        bind(&mut handle, &factory, false);

        factory.set_behavior(StubBehavior {
            fail_commands: true,
            ..StubBehavior::default()
        });
        // Behavior snapshot lives in the engine, so flip via a rebound one.
        bind(&mut handle, &factory, false);

        assert!(handle.set_read_only(true).is_err());
        assert!(!handle.is_read_only());
    }

    #[test]
    fn lifting_restriction_rebuilds() {
        let factory = Arc::new(StubFactory::new());
        let mut handle = handle_with(Arc::clone(&factory));
        bind(&mut handle, &factory, true);

        handle.set_read_only(false).unwrap();

        assert!(!handle.is_read_only());
        assert_eq!(factory.built(), 2);
        assert_eq!(factory.destroyed(), 1);
    }

    #[test]
    fn failed_rebuild_keeps_old_engine_and_mode() {
        let factory = Arc::new(StubFactory::new());
        let mut handle = handle_with(Arc::clone(&factory));
        bind(&mut handle, &factory, true);

        factory.set_behavior(StubBehavior {
            fail_create: true,
            ..StubBehavior::default()
        });

        assert!(handle.set_read_only(false).is_err());
        assert!(handle.is_read_only());
        assert!(handle.exists());
        assert_eq!(factory.destroyed(), 0);
    }

    #[test]
    fn same_mode_is_noop() {
        let factory = Arc::new(StubFactory::new());
        let mut handle = handle_with(Arc::clone(&factory));
        bind(&mut handle, &factory, false);

        handle.set_read_only(false).unwrap();
        assert_eq!(factory.built(), 1);
        assert!(factory.commands().is_empty());
    }

    #[test]
    fn mode_switch_unbound_fails() {
        let factory = Arc::new(StubFactory::new());
        let mut handle = handle_with(factory);
        assert_eq!(
            handle.set_read_only(true),
            Err(InstanceError::NotInitialized)
        );
    }

    #[tokio::test]
    async fn export_resolves_with_own_payload() {
        let factory = Arc::new(StubFactory::new());
        let mut handle = handle_with(Arc::clone(&factory));
        bind(&mut handle, &factory, false);
        handle.set_export_timeout(Duration::from_millis(100));

        let result = handle.export().await.unwrap();
        assert_eq!(result.instance_id, handle.instance_id());
        assert_eq!(result.file_name, "doc.docx");
    }

    #[tokio::test]
    async fn export_unbound_fails_fast() {
        let factory = Arc::new(StubFactory::new());
        let handle = handle_with(factory);
        assert_eq!(
            handle.export().await.unwrap_err(),
            InstanceError::NotInitialized
        );
    }

    #[tokio::test]
    async fn export_times_out_without_completion() {
        let factory = Arc::new(StubFactory::with_behavior(StubBehavior {
            auto_save: false,
            ..StubBehavior::default()
        }));
        let mut handle = handle_with(Arc::clone(&factory));
        bind(&mut handle, &factory, false);
        handle.set_export_timeout(Duration::from_millis(30));

        assert_eq!(
            handle.export().await.unwrap_err(),
            InstanceError::ExportTimeout
        );
    }

    #[tokio::test]
    async fn export_trigger_failure_propagates_immediately() {
        let factory = Arc::new(StubFactory::with_behavior(StubBehavior {
            fail_commands: true,
            ..StubBehavior::default()
        }));
        let mut handle = handle_with(Arc::clone(&factory));
        bind(&mut handle, &factory, false);

        let err = handle.export().await.unwrap_err();
        assert!(matches!(err, InstanceError::Engine(_)));
    }
}
