//! Controller side of the cross-context channel.

use super::error::ChannelError;
use super::message::{
    ChannelMessage, CreateEditorArgs, InstanceRef, MessageKind, SetReadOnlyArgs,
};
use super::transport::MessagePort;
use deck_types::{CreatedInstance, InstanceId, RequestId, RequestIdSource, SaveResult};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Default deadline for one request round-trip.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default deadline for the readiness handshake. The hosted context may
/// be loading remote resources during setup.
pub const DEFAULT_INIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Listener for broadcast messages of one kind.
pub type BroadcastListener = Arc<dyn Fn(&ChannelMessage) + Send + Sync>;

type PendingSlot = oneshot::Sender<Result<Value, ChannelError>>;
type PendingTable = Arc<Mutex<HashMap<RequestId, PendingSlot>>>;
type ListenerTable = Arc<Mutex<HashMap<MessageKind, Vec<BroadcastListener>>>>;

/// Drives a hosted engine context over a [`MessagePort`].
///
/// # State Machine
///
/// ```text
/// uninitialized ──connect──► awaiting-ready ──SERVICE_READY──► ready
///                                                                │
///                                              close / peer gone ▼
///                                                              closed
/// ```
///
/// Requests may be issued concurrently; responses correlate solely by
/// [`RequestId`], never by arrival order. A request that times out has
/// its pending entry removed, so a late response is silently discarded.
/// Closing rejects every pending request with
/// [`ChannelError::Closed`] and clears all listener registrations.
///
/// Must be created inside a tokio runtime: a reader task drains the
/// port for the lifetime of the channel.
pub struct ControllerChannel {
    tx: mpsc::Sender<ChannelMessage>,
    pending: PendingTable,
    listeners: ListenerTable,
    ready: watch::Receiver<bool>,
    ids: RequestIdSource,
    request_timeout: Duration,
    closed: Arc<AtomicBool>,
    reader: JoinHandle<()>,
}

impl ControllerChannel {
    /// Attaches to the controller end of a port and starts the reader.
    #[must_use]
    pub fn connect(port: MessagePort) -> Self {
        let (tx, rx) = port.into_split();
        let pending: PendingTable = Arc::new(Mutex::new(HashMap::new()));
        let listeners: ListenerTable = Arc::new(Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready) = watch::channel(false);

        let reader = tokio::spawn(reader_loop(
            rx,
            Arc::clone(&pending),
            Arc::clone(&listeners),
            ready_tx,
            Arc::clone(&closed),
        ));

        Self {
            tx,
            pending,
            listeners,
            ready,
            ids: RequestIdSource::new(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            closed,
            reader,
        }
    }

    /// Overrides the per-request deadline used by the typed wrappers.
    pub fn set_request_timeout(&mut self, timeout: Duration) {
        self.request_timeout = timeout;
    }

    /// Returns `true` once the hosted context announced readiness.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Waits for the hosted context's readiness announcement.
    ///
    /// Resolves immediately if the announcement already arrived;
    /// duplicate announcements are ignored by the reader.
    ///
    /// # Errors
    ///
    /// [`ChannelError::RequestTimeout`] if the deadline elapses first,
    /// [`ChannelError::Closed`] if the channel went away.
    pub async fn init(&self, timeout: Duration) -> Result<(), ChannelError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ChannelError::Closed);
        }
        let mut ready = self.ready.clone();
        let result = match tokio::time::timeout(timeout, ready.wait_for(|ready| *ready)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(_)) => Err(ChannelError::Closed),
            Err(_) => Err(ChannelError::RequestTimeout {
                kind: MessageKind::ServiceReady,
            }),
        };
        result
    }

    /// Sends one request and awaits its correlated response.
    ///
    /// # Errors
    ///
    /// [`ChannelError::RequestTimeout`] when no response arrives within
    /// `timeout` (the pending entry is removed, so a late response has no
    /// effect); [`ChannelError::HostFailed`] when the response carries an
    /// error; [`ChannelError::Closed`]/[`ChannelError::SendFailed`] on a
    /// dead channel.
    pub async fn send_message(
        &self,
        kind: MessageKind,
        data: Value,
        timeout: Duration,
    ) -> Result<Value, ChannelError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ChannelError::Closed);
        }

        let request_id = self.ids.next();
        let (slot_tx, slot_rx) = oneshot::channel();
        self.pending.lock().insert(request_id, slot_tx);

        if self
            .tx
            .send(ChannelMessage::request(kind, request_id, data))
            .await
            .is_err()
        {
            self.pending.lock().remove(&request_id);
            return Err(ChannelError::SendFailed("peer detached".into()));
        }

        match tokio::time::timeout(timeout, slot_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => {
                self.pending.lock().remove(&request_id);
                Err(ChannelError::Closed)
            }
            Err(_) => {
                self.pending.lock().remove(&request_id);
                trace!(%request_id, %kind, "request timed out, pending entry dropped");
                Err(ChannelError::RequestTimeout { kind })
            }
        }
    }

    /// Registers a listener for one broadcast tag.
    pub fn on_event(&self, kind: MessageKind, listener: BroadcastListener) {
        self.listeners.lock().entry(kind).or_default().push(listener);
    }

    /// Removes every registration of `listener` for `kind`.
    pub fn off_event(&self, kind: MessageKind, listener: &BroadcastListener) {
        if let Some(registered) = self.listeners.lock().get_mut(&kind) {
            registered.retain(|l| !Arc::ptr_eq(l, listener));
        }
    }

    /// Creates (or rebinds) an instance in the hosted context.
    ///
    /// # Errors
    ///
    /// See [`send_message`](Self::send_message);
    /// [`ChannelError::InvalidPayload`] if the response cannot be decoded.
    pub async fn create_editor(
        &self,
        args: CreateEditorArgs,
    ) -> Result<CreatedInstance, ChannelError> {
        let data = serde_json::to_value(args).map_err(invalid)?;
        let value = self
            .send_message(MessageKind::CreateEditor, data, self.request_timeout)
            .await?;
        serde_json::from_value(value).map_err(invalid)
    }

    /// Switches an instance's permission mode.
    ///
    /// # Errors
    ///
    /// See [`send_message`](Self::send_message).
    pub async fn set_read_only(
        &self,
        instance_id: InstanceId,
        read_only: bool,
    ) -> Result<(), ChannelError> {
        let data = serde_json::to_value(SetReadOnlyArgs {
            instance_id,
            read_only,
        })
        .map_err(invalid)?;
        self.send_message(MessageKind::SetReadOnly, data, self.request_timeout)
            .await?;
        Ok(())
    }

    /// Exports an instance's document and returns the payload.
    ///
    /// # Errors
    ///
    /// See [`send_message`](Self::send_message);
    /// [`ChannelError::InvalidPayload`] if the response cannot be decoded.
    pub async fn export(&self, instance_id: InstanceId) -> Result<SaveResult, ChannelError> {
        let data = serde_json::to_value(InstanceRef { instance_id }).map_err(invalid)?;
        let value = self
            .send_message(MessageKind::Export, data, self.request_timeout)
            .await?;
        serde_json::from_value(value).map_err(invalid)
    }

    /// Destroys an instance in the hosted context.
    ///
    /// Returns whether the hosted context removed an entry.
    ///
    /// # Errors
    ///
    /// See [`send_message`](Self::send_message).
    pub async fn destroy_instance(&self, instance_id: InstanceId) -> Result<bool, ChannelError> {
        let data = serde_json::to_value(InstanceRef { instance_id }).map_err(invalid)?;
        let value = self
            .send_message(MessageKind::Destroy, data, self.request_timeout)
            .await?;
        Ok(value.get("success").and_then(Value::as_bool).unwrap_or(false))
    }

    /// Closes the channel.
    ///
    /// Every still-pending request is rejected with
    /// [`ChannelError::Closed`], listener registrations are cleared, and
    /// further sends fail fast. Idempotent.
    pub fn close(&self) {
        debug!("channel closed by controller");
        self.shutdown();
    }

    fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.reader.abort();
        fail_all_pending(&self.pending);
        self.listeners.lock().clear();
    }

    #[cfg(test)]
    fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }
}

impl Drop for ControllerChannel {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for ControllerChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerChannel")
            .field("ready", &self.is_ready())
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .field("pending", &self.pending.lock().len())
            .finish()
    }
}

fn invalid(err: serde_json::Error) -> ChannelError {
    ChannelError::InvalidPayload(err.to_string())
}

fn fail_all_pending(pending: &PendingTable) {
    let slots: Vec<(RequestId, PendingSlot)> = pending.lock().drain().collect();
    for (request_id, slot) in slots {
        trace!(%request_id, "rejecting pending request on close");
        let _ = slot.send(Err(ChannelError::Closed));
    }
}

async fn reader_loop(
    mut rx: mpsc::Receiver<ChannelMessage>,
    pending: PendingTable,
    listeners: ListenerTable,
    ready_tx: watch::Sender<bool>,
    closed: Arc<AtomicBool>,
) {
    while let Some(message) = rx.recv().await {
        match message.request_id {
            Some(request_id) => {
                let slot = pending.lock().remove(&request_id);
                match slot {
                    Some(slot) => {
                        let result = match message.error {
                            Some(error) => Err(ChannelError::HostFailed(error)),
                            None => Ok(message.data),
                        };
                        let _ = slot.send(result);
                    }
                    // Already timed out or settled; the response is stale.
                    None => trace!(%request_id, "response for unknown request ignored"),
                }
            }
            None if message.kind == MessageKind::ServiceReady => {
                if *ready_tx.borrow() {
                    trace!("duplicate readiness announcement ignored");
                } else {
                    debug!("hosted context announced readiness");
                    let _ = ready_tx.send(true);
                }
            }
            None if message.kind.is_event() => {
                let snapshot: Vec<BroadcastListener> = listeners
                    .lock()
                    .get(&message.kind)
                    .cloned()
                    .unwrap_or_default();
                for listener in snapshot {
                    if catch_unwind(AssertUnwindSafe(|| listener(&message))).is_err() {
                        warn!(kind = %message.kind, "broadcast listener panicked");
                    }
                }
            }
            None => warn!(kind = %message.kind, "unexpected broadcast message ignored"),
        }
    }

    // Transport gone: nothing outstanding can resolve anymore.
    closed.store(true, Ordering::SeqCst);
    fail_all_pending(&pending);
}
