//! Correlated notification bus for DECK.
//!
//! Document engines report completion of asynchronous work (a finished
//! save, a rendered document, a loading-state change) through
//! fire-and-forget notifications. This crate turns those notifications
//! into something callers can await: a typed publish/subscribe bus with a
//! bounded "wait for the next occurrence" operation, filtered down to the
//! instance that should consume it.
//!
//! # Correlation Problem
//!
//! ```text
//! ┌────────────┐ save done (B) ┌──────────┐   wait_for_instance(B)
//! │ Engine B   │ ─────────────►│          │ ─────────► B.export() resolves
//! └────────────┘               │ EventBus │
//! ┌────────────┐ save done (A) │          │   wait_for_instance(A)
//! │ Engine A   │ ─────────────►│          │ ─────────► A.export() resolves
//! └────────────┘               └──────────┘
//! ```
//!
//! A bare "wait for the next save" would resolve on *any* instance's
//! save. Every [`EngineEvent`] therefore carries its originating
//! [`InstanceId`](deck_types::InstanceId), and
//! [`EventSubscriber::wait_for_instance`] keeps waiting past foreign
//! occurrences until a matching one arrives or the deadline elapses.
//!
//! # Usage
//!
//! ```
//! use deck_event::{EngineEvent, EventBus, EventKind};
//! use deck_types::InstanceId;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let bus = Arc::new(EventBus::new());
//! let instance = InstanceId::new();
//!
//! let mut sub = bus.subscriber();
//! bus.emit(EngineEvent::loading_change(instance, false));
//!
//! let event = sub
//!     .wait_for(EventKind::LoadingChange, std::time::Duration::from_millis(50))
//!     .await
//!     .unwrap();
//! assert_eq!(event.instance_id(), instance);
//! # }
//! ```

mod bus;
mod error;
mod event;

pub use bus::{EventBus, EventCallback, EventSubscriber};
pub use error::EventError;
pub use event::{EngineEvent, EventKind};
