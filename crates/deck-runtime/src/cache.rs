//! SessionCache — bounded, access-ordered cache of warm instances.
//!
//! Engine instances are expensive to build, so a small number of them are
//! kept warm per tab/session key. When the cache is over capacity the
//! entry with the oldest last access is evicted and its instance is
//! destroyed through the registry, never behind its back.
//!
//! Recency is tracked with a monotonic tick, not wall-clock time, so
//! eviction order is deterministic even when operations land within one
//! clock granule. Only [`get`](SessionCache::get) promotes an entry;
//! inserting stamps the initial recency and further recency comes from
//! reads alone.

use crate::instance::InstanceRegistry;
use deck_types::{ContainerId, RenderConfig};
use std::collections::HashMap;
use tracing::debug;

struct CacheEntry {
    last_access: u64,
    config: RenderConfig,
    container: Option<ContainerId>,
}

/// Pure snapshot of the cache state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cached entries.
    pub len: usize,
    /// Configured capacity.
    pub capacity: usize,
    /// Cached keys, sorted.
    pub keys: Vec<String>,
}

/// Bounded LRU of `(render config, live instance)` per tab/session key.
///
/// Mutating operations take the owning [`InstanceRegistry`] so entry
/// teardown always routes through instance bookkeeping. Teardown
/// failures are logged inside the registry and the entry is removed
/// regardless, so a misbehaving instance can not grow the cache without
/// bound.
///
/// # Example
///
/// ```
/// use deck_event::EventBus;
/// use deck_runtime::cache::SessionCache;
/// use deck_runtime::engine::StubFactory;
/// use deck_runtime::instance::InstanceRegistry;
/// use deck_types::RenderConfig;
/// use std::sync::Arc;
///
/// let mut registry = InstanceRegistry::new(
///     Arc::new(EventBus::new()),
///     Arc::new(StubFactory::new()),
/// );
/// let mut cache = SessionCache::new(2);
///
/// cache.insert("tab-1", RenderConfig::new("a.docx", "docx"), None, &mut registry);
/// cache.insert("tab-2", RenderConfig::new("b.odt", "odt"), None, &mut registry);
/// cache.insert("tab-3", RenderConfig::new("c.xlsx", "xlsx"), None, &mut registry);
///
/// // Oldest entry fell out.
/// assert!(!cache.is_cached("tab-1"));
/// assert_eq!(cache.stats().len, 2);
/// ```
pub struct SessionCache {
    capacity: usize,
    clock: u64,
    entries: HashMap<String, CacheEntry>,
}

impl SessionCache {
    /// Creates a cache holding at most `capacity` entries.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "cache capacity must be at least 1");
        Self {
            capacity,
            clock: 0,
            entries: HashMap::new(),
        }
    }

    /// Configured capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Inserts or overwrites the entry for `key`, stamping its recency.
    ///
    /// `container` names the live instance backing this tab, if one
    /// exists; eviction destroys it through `registry`. After insertion
    /// the coldest entries are evicted until the cache fits its capacity.
    /// The entry just inserted is never the one evicted while any other
    /// candidate exists.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        config: RenderConfig,
        container: Option<ContainerId>,
        registry: &mut InstanceRegistry,
    ) {
        let key = key.into();
        let last_access = self.tick();
        self.entries.insert(
            key,
            CacheEntry {
                last_access,
                config,
                container,
            },
        );
        self.evict_over_capacity(registry);
    }

    /// Returns the render config for `key` and promotes the entry.
    ///
    /// This is the sole promotion mechanism: recency is read-driven.
    pub fn get(&mut self, key: &str) -> Option<&RenderConfig> {
        let stamp = self.tick();
        let entry = self.entries.get_mut(key)?;
        entry.last_access = stamp;
        Some(&entry.config)
    }

    /// Removes `key` outside the LRU policy, destroying its instance.
    ///
    /// Returns `true` if an entry was removed; no-op for unknown keys.
    pub fn remove(&mut self, key: &str, registry: &mut InstanceRegistry) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                destroy_entry(key, &entry, registry);
                true
            }
            None => false,
        }
    }

    /// Destroys every cached instance and empties the table.
    pub fn clear(&mut self, registry: &mut InstanceRegistry) {
        for (key, entry) in self.entries.drain() {
            destroy_entry(&key, &entry, registry);
        }
    }

    /// Returns `true` if `key` is cached. Does not promote.
    #[must_use]
    pub fn is_cached(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Pure snapshot of the cache state.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        keys.sort();
        CacheStats {
            len: self.entries.len(),
            capacity: self.capacity,
            keys,
        }
    }

    fn evict_over_capacity(&mut self, registry: &mut InstanceRegistry) {
        while self.entries.len() > self.capacity {
            // Oldest access wins; ties break to the smallest key.
            let victim = self
                .entries
                .iter()
                .min_by_key(|(key, entry)| (entry.last_access, (*key).clone()))
                .map(|(key, _)| key.clone());

            let Some(key) = victim else { break };
            if let Some(entry) = self.entries.remove(&key) {
                debug!(key = %key, "evicting least-recently-used session");
                destroy_entry(&key, &entry, registry);
            }
        }
    }
}

impl std::fmt::Debug for SessionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCache")
            .field("len", &self.entries.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

fn destroy_entry(key: &str, entry: &CacheEntry, registry: &mut InstanceRegistry) {
    if let Some(container) = &entry.container {
        if !registry.destroy(container) {
            debug!(key, container = %container, "cached instance was already gone");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineFactory, StubBehavior, StubFactory};
    use deck_event::EventBus;
    use deck_types::LoadConfig;
    use std::sync::Arc;

    fn registry_with(factory: Arc<StubFactory>) -> InstanceRegistry {
        InstanceRegistry::new(Arc::new(EventBus::new()), factory)
    }

    fn bind(registry: &mut InstanceRegistry, container: &ContainerId) {
        let bus = Arc::clone(registry.bus());
        let factory = Arc::clone(registry.factory());
        let handle = registry.create(container.clone());
        let config = LoadConfig::new("doc.docx", "docx");
        let engine = factory
            .create_engine(handle.instance_id(), handle.container_id(), &config, &bus)
            .unwrap();
        handle.create(engine, config);
    }

    fn config(tag: &str) -> RenderConfig {
        RenderConfig::new(format!("{tag}.docx"), "docx")
    }

    #[test]
    #[should_panic(expected = "capacity")]
    fn zero_capacity_rejected() {
        let _ = SessionCache::new(0);
    }

    #[test]
    fn capacity_plus_one_evicts_exactly_one() {
        let mut registry = registry_with(Arc::new(StubFactory::new()));
        let mut cache = SessionCache::new(3);

        for tag in ["t1", "t2", "t3", "t4"] {
            cache.insert(tag, config(tag), None, &mut registry);
        }

        let stats = cache.stats();
        assert_eq!(stats.len, 3);
        assert_eq!(stats.keys, vec!["t2", "t3", "t4"]);
    }

    #[test]
    fn get_prevents_eviction() {
        let mut registry = registry_with(Arc::new(StubFactory::new()));
        let mut cache = SessionCache::new(3);

        for tag in ["t1", "t2", "t3"] {
            cache.insert(tag, config(tag), None, &mut registry);
        }
        assert!(cache.get("t1").is_some());
        cache.insert("t4", config("t4"), None, &mut registry);

        assert!(cache.is_cached("t1"));
        assert!(!cache.is_cached("t2"));
        assert_eq!(cache.stats().keys, vec!["t1", "t3", "t4"]);
    }

    #[test]
    fn overwrite_same_key_does_not_evict_others() {
        let mut registry = registry_with(Arc::new(StubFactory::new()));
        let mut cache = SessionCache::new(2);

        cache.insert("a", config("a"), None, &mut registry);
        cache.insert("b", config("b"), None, &mut registry);
        cache.insert("a", config("a2"), None, &mut registry);

        assert_eq!(cache.stats().len, 2);
        assert_eq!(cache.get("a").unwrap().file_name, "a2.docx");
    }

    #[test]
    fn eviction_destroys_instance_through_registry() {
        let factory = Arc::new(StubFactory::new());
        let mut registry = registry_with(Arc::clone(&factory));
        let mut cache = SessionCache::new(1);

        let cold = ContainerId::new("cold-tab");
        bind(&mut registry, &cold);
        cache.insert("cold", config("cold"), Some(cold.clone()), &mut registry);
        cache.insert("hot", config("hot"), None, &mut registry);

        assert!(!cache.is_cached("cold"));
        assert!(registry.get(&cold).is_none());
        assert_eq!(factory.destroyed(), 1);
    }

    #[test]
    fn eviction_with_failing_teardown_still_removes_entry() {
        let factory = Arc::new(StubFactory::with_behavior(StubBehavior {
            fail_destroy: true,
            ..StubBehavior::default()
        }));
        let mut registry = registry_with(Arc::clone(&factory));
        let mut cache = SessionCache::new(1);

        let tab = ContainerId::new("tab");
        bind(&mut registry, &tab);
        cache.insert("a", config("a"), Some(tab), &mut registry);
        cache.insert("b", config("b"), None, &mut registry);

        assert_eq!(cache.stats().len, 1);
        assert!(!cache.is_cached("a"));
    }

    #[test]
    fn remove_is_explicit_eviction() {
        let factory = Arc::new(StubFactory::new());
        let mut registry = registry_with(Arc::clone(&factory));
        let mut cache = SessionCache::new(4);

        let tab = ContainerId::new("tab");
        bind(&mut registry, &tab);
        cache.insert("a", config("a"), Some(tab.clone()), &mut registry);

        assert!(cache.remove("a", &mut registry));
        assert!(!cache.remove("a", &mut registry));
        assert!(registry.get(&tab).is_none());
        assert_eq!(factory.destroyed(), 1);
    }

    #[test]
    fn clear_destroys_everything() {
        let factory = Arc::new(StubFactory::new());
        let mut registry = registry_with(Arc::clone(&factory));
        let mut cache = SessionCache::new(4);

        for tag in ["a", "b"] {
            let container = ContainerId::new(tag);
            bind(&mut registry, &container);
            cache.insert(tag, config(tag), Some(container), &mut registry);
        }
        cache.clear(&mut registry);

        assert_eq!(cache.stats().len, 0);
        assert!(registry.is_empty());
        assert_eq!(factory.destroyed(), 2);
    }

    #[test]
    fn is_cached_does_not_promote() {
        let mut registry = registry_with(Arc::new(StubFactory::new()));
        let mut cache = SessionCache::new(2);

        cache.insert("a", config("a"), None, &mut registry);
        cache.insert("b", config("b"), None, &mut registry);
        assert!(cache.is_cached("a"));
        cache.insert("c", config("c"), None, &mut registry);

        // "a" was only inspected, never promoted, so it was the victim.
        assert!(!cache.is_cached("a"));
    }
}
