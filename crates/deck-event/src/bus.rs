//! EventBus — typed publish/subscribe with awaitable one-shot waits.
//!
//! The bus has two delivery paths:
//!
//! - **Callbacks** registered with [`EventBus::on`] are invoked
//!   synchronously on every emission of their kind. Emission iterates a
//!   snapshot of the registration list, so a callback may register or
//!   remove listeners (including itself) without corrupting delivery, and
//!   a panicking callback never prevents the remaining ones from running.
//! - **Subscribers** created with [`EventBus::subscriber`] receive every
//!   subsequent emission through a broadcast feed and support bounded
//!   waits. Creating the subscriber *before* triggering the work it waits
//!   on closes the gap in which a synchronously delivered completion
//!   could be missed.
//!
//! ```text
//! emit(event) ──┬─► snapshot of on() callbacks (sync, isolated)
//!               └─► broadcast feed ──► wait_for / wait_for_instance
//! ```

use crate::error::EventError;
use crate::event::{EngineEvent, EventKind};
use deck_types::{InstanceId, SaveResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::warn;

/// Broadcast feed depth. Subscribers that fall further behind than this
/// observe a lag and skip to the oldest retained event.
const FEED_CAPACITY: usize = 64;

/// Callback registered for one event kind.
///
/// Registering the same `Arc` twice invokes it twice per emission;
/// [`EventBus::off`] removes every registration of the given `Arc`.
pub type EventCallback = Arc<dyn Fn(&EngineEvent) + Send + Sync>;

/// Typed notification bus shared by all instances of one registry.
pub struct EventBus {
    listeners: Mutex<HashMap<EventKind, Vec<EventCallback>>>,
    feed: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            listeners: Mutex::new(HashMap::new()),
            feed,
        }
    }

    /// Registers `callback` for `kind`.
    ///
    /// A callback registered multiple times is invoked once per emission
    /// per registration.
    pub fn on(&self, kind: EventKind, callback: EventCallback) {
        self.listeners.lock().entry(kind).or_default().push(callback);
    }

    /// Removes every registration of `callback` for `kind`.
    ///
    /// No-op if the callback was never registered. Identity is the `Arc`
    /// pointer, not the closure body.
    pub fn off(&self, kind: EventKind, callback: &EventCallback) {
        let mut listeners = self.listeners.lock();
        if let Some(registered) = listeners.get_mut(&kind) {
            registered.retain(|cb| !Arc::ptr_eq(cb, callback));
            if registered.is_empty() {
                listeners.remove(&kind);
            }
        }
    }

    /// Emits an event to every registered callback and subscriber.
    ///
    /// Callbacks run synchronously over a snapshot of the current
    /// registrations; one panicking callback is logged and skipped, the
    /// rest still run. Subscribers receive the event through the feed.
    pub fn emit(&self, event: EngineEvent) {
        let snapshot: Vec<EventCallback> = self
            .listeners
            .lock()
            .get(&event.kind())
            .cloned()
            .unwrap_or_default();

        for callback in snapshot {
            if catch_unwind(AssertUnwindSafe(|| callback(&event))).is_err() {
                warn!(kind = %event.kind(), "event callback panicked, continuing delivery");
            }
        }

        // No subscriber is not an error; callbacks may be the only consumers.
        let _ = self.feed.send(event);
    }

    /// Creates a subscriber that sees every emission after this call.
    ///
    /// Subscribe before triggering the operation whose completion you
    /// intend to await.
    #[must_use]
    pub fn subscriber(&self) -> EventSubscriber {
        EventSubscriber {
            feed: self.feed.subscribe(),
        }
    }

    /// Waits for the next emission of `kind`, bounded by `timeout`.
    ///
    /// Resolves with the payload of the first occurrence strictly after
    /// this call. Two concurrent waits on the same kind each resolve on
    /// one emission; neither starves the other.
    ///
    /// # Errors
    ///
    /// [`EventError::Timeout`] if no occurrence arrives in time.
    pub async fn wait_for(
        &self,
        kind: EventKind,
        timeout: Duration,
    ) -> Result<EngineEvent, EventError> {
        self.subscriber().wait_for(kind, timeout).await
    }

    /// Waits for the next emission of `kind` originating from `instance`.
    ///
    /// Occurrences from other instances are skipped, not consumed
    /// destructively: every waiter has its own feed cursor.
    ///
    /// # Errors
    ///
    /// [`EventError::Timeout`] if no matching occurrence arrives in time.
    pub async fn wait_for_instance(
        &self,
        kind: EventKind,
        instance: InstanceId,
        timeout: Duration,
    ) -> Result<EngineEvent, EventError> {
        self.subscriber()
            .wait_for_instance(kind, instance, timeout)
            .await
    }

    /// Returns the number of callback registrations for `kind`.
    #[must_use]
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners.lock().get(&kind).map_or(0, Vec::len)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("kinds", &self.listeners.lock().len())
            .finish()
    }
}

/// A cursor over the bus feed with bounded-wait helpers.
///
/// Created by [`EventBus::subscriber`]; sees every emission after its
/// creation, independent of other subscribers.
pub struct EventSubscriber {
    feed: broadcast::Receiver<EngineEvent>,
}

impl EventSubscriber {
    /// Receives the next emission of any kind.
    ///
    /// # Errors
    ///
    /// [`EventError::Closed`] if the bus was dropped.
    pub async fn next(&mut self) -> Result<EngineEvent, EventError> {
        loop {
            match self.feed.recv().await {
                Ok(event) => return Ok(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event subscriber lagged behind the feed");
                }
                Err(broadcast::error::RecvError::Closed) => return Err(EventError::Closed),
            }
        }
    }

    /// Waits for the next emission of `kind`, bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// [`EventError::Timeout`] if no occurrence arrives in time,
    /// [`EventError::Closed`] if the bus was dropped.
    pub async fn wait_for(
        &mut self,
        kind: EventKind,
        timeout: Duration,
    ) -> Result<EngineEvent, EventError> {
        self.wait_matching(kind, timeout, |_| true).await
    }

    /// Waits for the next emission of `kind` from `instance`.
    ///
    /// Foreign occurrences re-arm the wait; only the overall deadline
    /// bounds it.
    ///
    /// # Errors
    ///
    /// [`EventError::Timeout`] if no matching occurrence arrives in time,
    /// [`EventError::Closed`] if the bus was dropped.
    pub async fn wait_for_instance(
        &mut self,
        kind: EventKind,
        instance: InstanceId,
        timeout: Duration,
    ) -> Result<EngineEvent, EventError> {
        self.wait_matching(kind, timeout, |event| event.instance_id() == instance)
            .await
    }

    /// Waits for `instance`'s next completed save and returns its payload.
    ///
    /// # Errors
    ///
    /// Same conditions as [`wait_for_instance`](Self::wait_for_instance).
    pub async fn wait_save(
        &mut self,
        instance: InstanceId,
        timeout: Duration,
    ) -> Result<SaveResult, EventError> {
        let event = self
            .wait_for_instance(EventKind::SaveCompleted, instance, timeout)
            .await?;
        // The kind filter above only lets SaveCompleted through.
        event
            .into_save_result()
            .ok_or(EventError::Timeout(EventKind::SaveCompleted))
    }

    async fn wait_matching(
        &mut self,
        kind: EventKind,
        timeout: Duration,
        matches: impl Fn(&EngineEvent) -> bool,
    ) -> Result<EngineEvent, EventError> {
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(EventError::Timeout(kind));
            }

            match tokio::time::timeout(remaining, self.feed.recv()).await {
                Ok(Ok(event)) if event.kind() == kind && matches(&event) => return Ok(event),
                Ok(Ok(_)) => continue,
                Ok(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                    warn!(skipped, "event subscriber lagged behind the feed");
                }
                Ok(Err(broadcast::error::RecvError::Closed)) => return Err(EventError::Closed),
                Err(_) => return Err(EventError::Timeout(kind)),
            }
        }
    }
}

impl std::fmt::Debug for EventSubscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSubscriber").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deck_types::ContainerId;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_callback() -> (EventCallback, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let callback: EventCallback = Arc::new(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        (callback, count)
    }

    fn loading(instance: InstanceId) -> EngineEvent {
        EngineEvent::loading_change(instance, true)
    }

    fn save(instance: InstanceId, tag: &str) -> EngineEvent {
        EngineEvent::save_completed(SaveResult {
            file_name: format!("{tag}.docx"),
            format: "docx".into(),
            data: tag.as_bytes().to_vec(),
            instance_id: instance,
            media: None,
        })
    }

    #[test]
    fn callbacks_invoked_per_registration() {
        let bus = EventBus::new();
        let (callback, count) = counting_callback();

        bus.on(EventKind::LoadingChange, Arc::clone(&callback));
        bus.on(EventKind::LoadingChange, Arc::clone(&callback));
        bus.emit(loading(InstanceId::new()));

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn off_removes_all_registrations() {
        let bus = EventBus::new();
        let (callback, count) = counting_callback();

        bus.on(EventKind::LoadingChange, Arc::clone(&callback));
        bus.on(EventKind::LoadingChange, Arc::clone(&callback));
        bus.off(EventKind::LoadingChange, &callback);
        bus.emit(loading(InstanceId::new()));

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(bus.listener_count(EventKind::LoadingChange), 0);
    }

    #[test]
    fn off_unknown_callback_is_noop() {
        let bus = EventBus::new();
        let (registered, _) = counting_callback();
        let (stranger, _) = counting_callback();

        bus.on(EventKind::DocumentReady, registered);
        bus.off(EventKind::DocumentReady, &stranger);

        assert_eq!(bus.listener_count(EventKind::DocumentReady), 1);
    }

    #[test]
    fn callbacks_only_fire_for_their_kind() {
        let bus = EventBus::new();
        let (callback, count) = counting_callback();

        bus.on(EventKind::DocumentReady, callback);
        bus.emit(loading(InstanceId::new()));

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn panicking_callback_does_not_stop_delivery() {
        let bus = EventBus::new();
        let panicking: EventCallback = Arc::new(|_| panic!("listener bug"));
        let (callback, count) = counting_callback();

        bus.on(EventKind::LoadingChange, panicking);
        bus.on(EventKind::LoadingChange, callback);
        bus.emit(loading(InstanceId::new()));

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reentrant_registration_during_emit() {
        let bus = Arc::new(EventBus::new());
        let reentrant = Arc::clone(&bus);
        let (inner, inner_count) = counting_callback();

        let callback: EventCallback = Arc::new(move |_| {
            reentrant.on(EventKind::LoadingChange, Arc::clone(&inner));
        });
        bus.on(EventKind::LoadingChange, callback);

        // First emission registers, does not deliver to, the inner callback.
        bus.emit(loading(InstanceId::new()));
        assert_eq!(inner_count.load(Ordering::SeqCst), 0);

        bus.emit(loading(InstanceId::new()));
        assert_eq!(inner_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn wait_for_resolves_on_emission() {
        let bus = Arc::new(EventBus::new());
        let instance = InstanceId::new();

        let waiter = {
            let bus = Arc::clone(&bus);
            tokio::spawn(async move {
                bus.wait_for(EventKind::DocumentReady, Duration::from_millis(200))
                    .await
            })
        };

        tokio::task::yield_now().await;
        bus.emit(EngineEvent::document_ready(instance, ContainerId::default()));

        let event = waiter.await.unwrap().unwrap();
        assert_eq!(event.instance_id(), instance);
    }

    #[tokio::test]
    async fn wait_for_times_out() {
        let bus = EventBus::new();
        let result = bus
            .wait_for(EventKind::SaveCompleted, Duration::from_millis(20))
            .await;
        assert_eq!(result, Err(EventError::Timeout(EventKind::SaveCompleted)));
    }

    #[tokio::test]
    async fn concurrent_waits_both_resolve() {
        let bus = Arc::new(EventBus::new());
        let instance = InstanceId::new();

        let spawn_wait = |bus: Arc<EventBus>| {
            tokio::spawn(async move {
                bus.wait_for(EventKind::LoadingChange, Duration::from_millis(200))
                    .await
            })
        };
        let first = spawn_wait(Arc::clone(&bus));
        let second = spawn_wait(Arc::clone(&bus));

        tokio::task::yield_now().await;
        bus.emit(loading(instance));

        assert!(first.await.unwrap().is_ok());
        assert!(second.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn wait_for_instance_skips_foreign_saves() {
        let bus = Arc::new(EventBus::new());
        let mine = InstanceId::new();
        let other = InstanceId::new();

        let mut sub = bus.subscriber();
        bus.emit(save(other, "other"));
        bus.emit(save(mine, "mine"));

        let result = sub
            .wait_save(mine, Duration::from_millis(200))
            .await
            .unwrap();
        assert_eq!(result.instance_id, mine);
        assert_eq!(result.file_name, "mine.docx");
    }

    #[tokio::test]
    async fn wait_for_instance_times_out_on_foreign_only() {
        let bus = Arc::new(EventBus::new());
        let mine = InstanceId::new();

        let mut sub = bus.subscriber();
        bus.emit(save(InstanceId::new(), "other"));

        let result = sub.wait_save(mine, Duration::from_millis(30)).await;
        assert_eq!(result, Err(EventError::Timeout(EventKind::SaveCompleted)));
    }

    #[tokio::test]
    async fn subscriber_misses_nothing_after_creation() {
        let bus = EventBus::new();
        let instance = InstanceId::new();

        let mut sub = bus.subscriber();
        // Emitted synchronously before the first poll of the wait.
        bus.emit(save(instance, "early"));

        let result = sub
            .wait_save(instance, Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(result.file_name, "early.docx");
    }
}
