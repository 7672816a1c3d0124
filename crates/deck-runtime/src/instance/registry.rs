//! InstanceRegistry — keyed set of instance handles.

use crate::engine::EngineFactory;
use crate::instance::handle::InstanceHandle;
use deck_event::EventBus;
use deck_types::{ContainerId, InstanceId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Keyed set of [`InstanceHandle`]s, at most one per container.
///
/// The registry owns its handles; nothing else holds a reference to a
/// handle's engine, so destroying through the registry is always
/// sufficient to release the engine.
///
/// # Invariant
///
/// The set of containers known to the registry is exactly the set for
/// which [`create`](Self::create) was called and
/// [`destroy`](Self::destroy) was not.
///
/// # Active Slot
///
/// Single-instance embedders predate containers; for them the registry
/// tracks the most recently created container in an explicit `active`
/// slot. The slot is last-writer-wins with no coordination — callers
/// juggling several instances must address handles by container instead.
///
/// # Example
///
/// ```
/// use deck_event::EventBus;
/// use deck_runtime::engine::StubFactory;
/// use deck_runtime::instance::InstanceRegistry;
/// use deck_types::ContainerId;
/// use std::sync::Arc;
///
/// let mut registry = InstanceRegistry::new(
///     Arc::new(EventBus::new()),
///     Arc::new(StubFactory::new()),
/// );
///
/// registry.create(ContainerId::new("sidebar"));
/// registry.create_default();
/// assert_eq!(registry.len(), 2);
///
/// registry.destroy(&ContainerId::new("sidebar"));
/// assert_eq!(registry.len(), 1);
/// ```
pub struct InstanceRegistry {
    bus: Arc<EventBus>,
    factory: Arc<dyn EngineFactory>,
    instances: HashMap<ContainerId, InstanceHandle>,
    active: Option<ContainerId>,
}

impl InstanceRegistry {
    /// Creates an empty registry sharing `bus` and `factory` with every
    /// handle it will create.
    #[must_use]
    pub fn new(bus: Arc<EventBus>, factory: Arc<dyn EngineFactory>) -> Self {
        Self {
            bus,
            factory,
            instances: HashMap::new(),
            active: None,
        }
    }

    /// Returns the notification bus shared by this registry's instances.
    #[must_use]
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Returns the engine factory handles rebuild through.
    #[must_use]
    pub fn factory(&self) -> &Arc<dyn EngineFactory> {
        &self.factory
    }

    /// Returns the handle for `container`, creating an unbound one if the
    /// container is new.
    ///
    /// Create-or-get: an existing handle is returned unchanged, never
    /// implicitly destroyed and recreated. Updates the active slot either
    /// way.
    pub fn create(&mut self, container: ContainerId) -> &mut InstanceHandle {
        self.active = Some(container.clone());
        self.instances.entry(container.clone()).or_insert_with(|| {
            debug!(container = %container, "registering instance handle");
            InstanceHandle::new(container, Arc::clone(&self.bus), Arc::clone(&self.factory))
        })
    }

    /// [`create`](Self::create) for the shared default container.
    pub fn create_default(&mut self) -> &mut InstanceHandle {
        self.create(ContainerId::default())
    }

    /// Returns the handle for `container`, if registered. Never creates.
    #[must_use]
    pub fn get(&self, container: &ContainerId) -> Option<&InstanceHandle> {
        self.instances.get(container)
    }

    /// Mutable [`get`](Self::get).
    pub fn get_mut(&mut self, container: &ContainerId) -> Option<&mut InstanceHandle> {
        self.instances.get_mut(container)
    }

    /// Returns the handle for the shared default container, if registered.
    #[must_use]
    pub fn get_default(&self) -> Option<&InstanceHandle> {
        self.get(&ContainerId::default())
    }

    /// Finds the handle owning `instance`, if any.
    #[must_use]
    pub fn by_instance(&self, instance: InstanceId) -> Option<&InstanceHandle> {
        self.instances
            .values()
            .find(|handle| handle.instance_id() == instance)
    }

    /// Mutable [`by_instance`](Self::by_instance).
    pub fn by_instance_mut(&mut self, instance: InstanceId) -> Option<&mut InstanceHandle> {
        self.instances
            .values_mut()
            .find(|handle| handle.instance_id() == instance)
    }

    /// Returns every registered handle.
    ///
    /// Order is unspecified but stable for an unchanged registry; no
    /// handle is omitted or returned twice.
    #[must_use]
    pub fn get_all(&self) -> Vec<&InstanceHandle> {
        self.instances.values().collect()
    }

    /// Returns the most recently created handle, if it still exists.
    #[must_use]
    pub fn active(&self) -> Option<&InstanceHandle> {
        self.active.as_ref().and_then(|c| self.instances.get(c))
    }

    /// Number of registered containers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Returns `true` if no container is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Destroys and removes the handle for `container`.
    ///
    /// Returns `true` if an entry was removed; no-op on an unknown
    /// container. Never fails: engine teardown errors are logged inside
    /// the handle's own destroy.
    pub fn destroy(&mut self, container: &ContainerId) -> bool {
        match self.instances.remove(container) {
            Some(mut handle) => {
                handle.destroy();
                if self.active.as_ref() == Some(container) {
                    self.active = None;
                }
                debug!(container = %container, "instance handle removed");
                true
            }
            None => false,
        }
    }

    /// Destroys and removes every handle.
    ///
    /// Individual teardown failures never abort the remaining teardowns.
    pub fn destroy_all(&mut self) {
        let count = self.instances.len();
        for (_, mut handle) in self.instances.drain() {
            handle.destroy();
        }
        self.active = None;
        debug!(count, "all instance handles removed");
    }
}

impl std::fmt::Debug for InstanceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceRegistry")
            .field("containers", &self.instances.len())
            .field("active", &self.active)
            .finish()
    }
}
