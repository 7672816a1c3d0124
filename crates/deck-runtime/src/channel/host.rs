//! Hosted side of the cross-context channel.

use super::message::{ChannelMessage, CreateEditorArgs, InstanceRef, MessageKind, SetReadOnlyArgs};
use super::transport::MessagePort;
use crate::engine::FormatConverter;
use crate::instance::{InstanceHandle, InstanceRegistry};
use deck_event::{EngineEvent, EventSubscriber};
use deck_types::{CreatedInstance, LoadConfig, RequestId};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Format tag engines load natively; sources are converted into it.
pub const DEFAULT_NATIVE_FORMAT: &str = "bin";

/// Serves controller requests over the registry it owns.
///
/// The runner performs its setup, announces readiness exactly once, then
/// dispatches requests until the controller detaches. Export waits are
/// spawned off the dispatch loop, so responses to concurrent requests may
/// arrive in any order — correlation is the controller's job.
///
/// Bus events (document-ready, loading-change, save-completed) are
/// forwarded to the controller as broadcast messages, independent of any
/// pending request.
///
/// # Example
///
/// ```no_run
/// use deck_event::EventBus;
/// use deck_runtime::channel::{HostRunner, MessagePort, DEFAULT_PORT_BUFFER};
/// use deck_runtime::engine::{StubConverter, StubFactory};
/// use deck_runtime::instance::InstanceRegistry;
/// use std::sync::Arc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let (controller_port, host_port) = MessagePort::pair(DEFAULT_PORT_BUFFER);
/// let registry = InstanceRegistry::new(
///     Arc::new(EventBus::new()),
///     Arc::new(StubFactory::new()),
/// );
/// let runner = HostRunner::new(registry, Arc::new(StubConverter::default()), host_port);
/// tokio::spawn(runner.run());
/// // controller_port now talks to a live hosted context
/// # }
/// ```
pub struct HostRunner {
    registry: InstanceRegistry,
    converter: Arc<dyn FormatConverter>,
    native_format: String,
    tx: mpsc::Sender<ChannelMessage>,
    rx: mpsc::Receiver<ChannelMessage>,
    events: EventSubscriber,
}

impl HostRunner {
    /// Creates a runner serving `registry` over the host end of a port.
    #[must_use]
    pub fn new(
        registry: InstanceRegistry,
        converter: Arc<dyn FormatConverter>,
        port: MessagePort,
    ) -> Self {
        let events = registry.bus().subscriber();
        let (tx, rx) = port.into_split();
        Self {
            registry,
            converter,
            native_format: DEFAULT_NATIVE_FORMAT.to_string(),
            tx,
            rx,
            events,
        }
    }

    /// Overrides the engine-native format sources are converted into.
    #[must_use]
    pub fn with_native_format(mut self, format: impl Into<String>) -> Self {
        self.native_format = format.into();
        self
    }

    /// Serves the channel until the controller detaches.
    ///
    /// Announces readiness once at start; every instance is destroyed
    /// when the loop ends.
    pub async fn run(mut self) {
        if self.tx.send(ChannelMessage::service_ready()).await.is_err() {
            warn!("controller detached before readiness announcement");
            return;
        }
        info!("hosted engine context ready");

        loop {
            tokio::select! {
                message = self.rx.recv() => match message {
                    Some(message) => self.dispatch(message).await,
                    None => break,
                },
                event = self.events.next() => match event {
                    Ok(event) => self.forward(event).await,
                    Err(_) => break,
                },
            }
        }

        debug!("controller detached, tearing down instances");
        self.registry.destroy_all();
    }

    async fn dispatch(&mut self, message: ChannelMessage) {
        let Some(request_id) = message.request_id else {
            warn!(kind = %message.kind, "broadcast-shaped message on the request path ignored");
            return;
        };
        debug!(%request_id, kind = %message.kind, "handling request");

        match message.kind {
            MessageKind::CreateEditor => {
                let result = self.create_editor(message.data);
                self.reply(MessageKind::CreateEditor, request_id, result).await;
            }
            MessageKind::SetReadOnly => {
                let result = self.set_read_only(message.data);
                self.reply(MessageKind::SetReadOnly, request_id, result).await;
            }
            MessageKind::Destroy => {
                let result = self.destroy(message.data);
                self.reply(MessageKind::Destroy, request_id, result).await;
            }
            MessageKind::Export => self.export(request_id, message.data).await,
            other => {
                self.reply(other, request_id, Err(format!("unsupported request: {other}")))
                    .await;
            }
        }
    }

    async fn reply(&self, kind: MessageKind, request_id: RequestId, result: Result<Value, String>) {
        let message = match result {
            Ok(data) => ChannelMessage::response(kind, request_id, data),
            Err(error) => ChannelMessage::error_response(kind, request_id, error),
        };
        if self.tx.send(message).await.is_err() {
            warn!(%request_id, "controller detached before the reply");
        }
    }

    fn create_editor(&mut self, data: Value) -> Result<Value, String> {
        let args: CreateEditorArgs =
            serde_json::from_value(data).map_err(|err| format!("invalid payload: {err}"))?;
        let container = args.container_id.clone().unwrap_or_default();

        let format = format_tag(&args.file_name).unwrap_or_else(|| self.native_format.clone());
        let mut config = LoadConfig::new(&args.file_name, format);
        config.read_only = args.read_only;
        config.is_new = args.is_new;
        config.lang = args.lang;

        if let Some(bytes) = args.file_data {
            let converted = self
                .converter
                .convert(&bytes, &args.file_name, &self.native_format, None)
                .map_err(|err| err.to_string())?;
            config.data = converted.data;
        }

        let bus = Arc::clone(self.registry.bus());
        let factory = Arc::clone(self.registry.factory());
        let had_engine = self.registry.get(&container).is_some_and(InstanceHandle::exists);
        let instance_id = self.registry.create(container.clone()).instance_id();

        match factory.create_engine(instance_id, &container, &config, &bus) {
            Ok(engine) => {
                let Some(handle) = self.registry.get_mut(&container) else {
                    return Err("container vanished during create".into());
                };
                handle.create(engine, config);
                serde_json::to_value(CreatedInstance {
                    instance_id,
                    container_id: container,
                })
                .map_err(|err| err.to_string())
            }
            Err(err) => {
                // A failed create leaves the identity unbound, not half-registered.
                if !had_engine {
                    self.registry.destroy(&container);
                }
                Err(err.to_string())
            }
        }
    }

    fn set_read_only(&mut self, data: Value) -> Result<Value, String> {
        let args: SetReadOnlyArgs =
            serde_json::from_value(data).map_err(|err| format!("invalid payload: {err}"))?;
        let handle = self
            .registry
            .by_instance_mut(args.instance_id)
            .ok_or_else(|| format!("unknown instance: {}", args.instance_id))?;
        handle
            .set_read_only(args.read_only)
            .map_err(|err| err.to_string())?;
        Ok(json!({ "success": true }))
    }

    fn destroy(&mut self, data: Value) -> Result<Value, String> {
        let args: InstanceRef =
            serde_json::from_value(data).map_err(|err| format!("invalid payload: {err}"))?;
        let container = self
            .registry
            .by_instance(args.instance_id)
            .map(|handle| handle.container_id().clone());
        let removed = container.is_some_and(|container| self.registry.destroy(&container));
        Ok(json!({ "success": removed }))
    }

    async fn export(&mut self, request_id: RequestId, data: Value) {
        let pending = match serde_json::from_value::<InstanceRef>(data) {
            Ok(args) => match self.registry.by_instance(args.instance_id) {
                Some(handle) => handle.begin_export(),
                None => {
                    self.reply(
                        MessageKind::Export,
                        request_id,
                        Err(format!("unknown instance: {}", args.instance_id)),
                    )
                    .await;
                    return;
                }
            },
            Err(err) => {
                self.reply(
                    MessageKind::Export,
                    request_id,
                    Err(format!("invalid payload: {err}")),
                )
                .await;
                return;
            }
        };

        match pending {
            Ok(pending) => {
                // The wait runs off the dispatch loop; responses may
                // overtake other requests' replies.
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let result = match pending.wait().await {
                        Ok(save) => serde_json::to_value(save).map_err(|err| err.to_string()),
                        Err(err) => Err(err.to_string()),
                    };
                    let message = match result {
                        Ok(data) => ChannelMessage::response(MessageKind::Export, request_id, data),
                        Err(error) => {
                            ChannelMessage::error_response(MessageKind::Export, request_id, error)
                        }
                    };
                    if tx.send(message).await.is_err() {
                        warn!(%request_id, "controller detached before the export reply");
                    }
                });
            }
            Err(err) => {
                self.reply(MessageKind::Export, request_id, Err(err.to_string()))
                    .await;
            }
        }
    }

    async fn forward(&self, event: EngineEvent) {
        let message = broadcast_message(&event);
        if self.tx.send(message).await.is_err() {
            debug!("controller detached, broadcast dropped");
        }
    }
}

impl std::fmt::Debug for HostRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostRunner")
            .field("registry", &self.registry)
            .field("native_format", &self.native_format)
            .finish()
    }
}

fn format_tag(file_name: &str) -> Option<String> {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}

fn broadcast_message(event: &EngineEvent) -> ChannelMessage {
    match event {
        EngineEvent::SaveCompleted(result) => ChannelMessage::event(
            MessageKind::SaveCompleted,
            serde_json::to_value(result).unwrap_or(Value::Null),
        ),
        EngineEvent::DocumentReady {
            instance_id,
            container_id,
        } => ChannelMessage::event(
            MessageKind::DocumentReady,
            json!({ "instance_id": instance_id, "container_id": container_id }),
        ),
        EngineEvent::LoadingChange {
            instance_id,
            loading,
        } => ChannelMessage::event(
            MessageKind::LoadingChange,
            json!({ "instance_id": instance_id, "loading": loading }),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deck_event::EventBus;
    use deck_types::{ContainerId, InstanceId};

    #[test]
    fn format_tag_extraction() {
        assert_eq!(format_tag("a.DOCX").as_deref(), Some("docx"));
        assert_eq!(format_tag("archive.tar.gz").as_deref(), Some("gz"));
        assert_eq!(format_tag("no-extension"), None);
        assert_eq!(format_tag("trailing-dot."), None);
    }

    #[test]
    fn broadcast_messages_carry_instance_identity() {
        let instance = InstanceId::new();
        let event = EngineEvent::document_ready(instance, ContainerId::new("pane"));
        let message = broadcast_message(&event);

        assert_eq!(message.kind, MessageKind::DocumentReady);
        assert!(message.request_id.is_none());
        assert_eq!(
            message.data["instance_id"],
            serde_json::to_value(instance).unwrap()
        );
    }

    #[tokio::test]
    async fn run_announces_readiness_first() {
        let (mut controller_port, host_port) = MessagePort::pair(8);
        let registry = InstanceRegistry::new(
            Arc::new(EventBus::new()),
            Arc::new(crate::engine::StubFactory::new()),
        );
        let runner = HostRunner::new(
            registry,
            Arc::new(crate::engine::StubConverter::default()),
            host_port,
        );
        let task = tokio::spawn(runner.run());

        let first = controller_port.recv().await.unwrap();
        assert_eq!(first.kind, MessageKind::ServiceReady);

        drop(controller_port);
        task.await.unwrap();
    }
}
