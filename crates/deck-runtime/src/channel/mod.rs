//! Cross-context channel between a controller and a hosted engine
//! context.
//!
//! ```text
//! ┌──────────────────┐   request {kind, request_id, data}   ┌────────────┐
//! │ ControllerChannel│ ────────────────────────────────────►│ HostRunner │
//! │  pending table   │ ◄────────────────────────────────────│  registry  │
//! │  event listeners │   response {request_id, data|error}  │  bus       │
//! └──────────────────┘ ◄──────────────────────────────────  └────────────┘
//!                        broadcast {kind, data}  (no request_id)
//! ```
//!
//! The transport is asynchronous, unordered and at-most-once. Requests
//! and responses correlate solely by [`RequestId`](deck_types::RequestId)
//! — never by arrival order. Messages without a request id are broadcast
//! events and are fanned out to local listeners independent of any
//! pending request.
//!
//! A channel moves `uninitialized → awaiting-ready → ready → closed`;
//! the hosted side announces readiness exactly once and duplicate
//! announcements are ignored.

mod controller;
mod error;
mod host;
mod message;
mod transport;

pub use controller::{
    BroadcastListener, ControllerChannel, DEFAULT_INIT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT,
};
pub use error::ChannelError;
pub use host::{HostRunner, DEFAULT_NATIVE_FORMAT};
pub use message::{ChannelMessage, CreateEditorArgs, InstanceRef, MessageKind, SetReadOnlyArgs};
pub use transport::{MessagePort, DEFAULT_PORT_BUFFER};
