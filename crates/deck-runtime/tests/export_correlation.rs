//! Exports from instances sharing one bus must resolve with their own
//! payloads, regardless of completion order.

use deck_event::{EngineEvent, EventBus};
use deck_runtime::engine::{EngineFactory, StubBehavior, StubFactory};
use deck_runtime::instance::{InstanceError, InstanceRegistry};
use deck_types::{ContainerId, InstanceId, LoadConfig, SaveResult};
use std::sync::Arc;
use std::time::Duration;

fn silent_registry() -> InstanceRegistry {
    // Engines that never emit saves on their own; the tests emit.
    let factory = Arc::new(StubFactory::with_behavior(StubBehavior {
        auto_save: false,
        announce_ready: false,
        ..StubBehavior::default()
    }));
    InstanceRegistry::new(Arc::new(EventBus::new()), factory)
}

fn bind(registry: &mut InstanceRegistry, name: &str) -> InstanceId {
    let bus = Arc::clone(registry.bus());
    let factory = Arc::clone(registry.factory());
    let handle = registry.create(ContainerId::new(name));
    let config = LoadConfig::new(format!("{name}.docx"), "docx");
    let engine = factory
        .create_engine(handle.instance_id(), handle.container_id(), &config, &bus)
        .expect("stub engine construction");
    handle.create(engine, config);
    handle.set_export_timeout(Duration::from_millis(300));
    handle.instance_id()
}

fn save_for(instance: InstanceId, tag: &str) -> EngineEvent {
    EngineEvent::save_completed(SaveResult {
        file_name: format!("{tag}.docx"),
        format: "docx".into(),
        data: tag.as_bytes().to_vec(),
        instance_id: instance,
        media: None,
    })
}

#[tokio::test]
async fn payloads_never_swap_between_instances() {
    let mut registry = silent_registry();
    let a = bind(&mut registry, "a");
    let b = bind(&mut registry, "b");
    let bus = Arc::clone(registry.bus());

    let pending_a = registry
        .get(&ContainerId::new("a"))
        .unwrap()
        .begin_export()
        .unwrap();
    let pending_b = registry
        .get(&ContainerId::new("b"))
        .unwrap()
        .begin_export()
        .unwrap();

    // Completions land in the opposite order of the requests.
    bus.emit(save_for(b, "b"));
    bus.emit(save_for(a, "a"));

    let result_a = pending_a.wait().await.unwrap();
    let result_b = pending_b.wait().await.unwrap();

    assert_eq!(result_a.instance_id, a);
    assert_eq!(result_a.data, b"a");
    assert_eq!(result_b.instance_id, b);
    assert_eq!(result_b.data, b"b");
}

#[tokio::test]
async fn foreign_completions_do_not_resolve_a_wait() {
    let mut registry = silent_registry();
    let _a = bind(&mut registry, "a");
    let b = bind(&mut registry, "b");
    let bus = Arc::clone(registry.bus());

    let pending_a = registry
        .get(&ContainerId::new("a"))
        .unwrap()
        .begin_export()
        .unwrap();

    // Only B ever completes.
    bus.emit(save_for(b, "b"));

    assert_eq!(pending_a.wait().await, Err(InstanceError::ExportTimeout));
}

#[tokio::test]
async fn repeated_exports_each_get_one_payload() {
    let mut registry = silent_registry();
    let a = bind(&mut registry, "a");
    let bus = Arc::clone(registry.bus());

    for round in 0..3 {
        let pending = registry
            .get(&ContainerId::new("a"))
            .unwrap()
            .begin_export()
            .unwrap();
        let tag = format!("round-{round}");
        bus.emit(save_for(a, &tag));

        let result = pending.wait().await.unwrap();
        assert_eq!(result.data, tag.as_bytes());
    }
}
