//! DECK Runtime — instance lifecycle, session cache and cross-context
//! channel for document engines.
//!
//! A document engine is an opaque, stateful editing session hosted in an
//! isolated rendering context. This crate coordinates any number of them
//! behind a uniform asynchronous surface: create, export, switch
//! permission mode, destroy — from the same execution context or across
//! a controller/host boundary.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Controller Context                      │
//! │  ControllerChannel ── requests/responses + broadcast events │
//! └─────────────────────────────────────────────────────────────┘
//!                               │ MessagePort
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Hosted Context                        │
//! │  HostRunner                                                 │
//! │    └── InstanceRegistry ── one InstanceHandle per container │
//! │          └── Box<dyn DocumentEngine>  (exclusive ownership) │
//! │                                                             │
//! │  SessionCache ── bounded LRU of warm instances, evicts      │
//! │                  through the registry                       │
//! │                                                             │
//! │  EventBus (deck-event) ── save/ready/loading correlation    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`engine`] — the external collaborator boundary:
//!   [`DocumentEngine`](engine::DocumentEngine),
//!   [`EngineFactory`](engine::EngineFactory),
//!   [`FormatConverter`](engine::FormatConverter), plus a scriptable
//!   [`StubEngine`](engine::StubEngine) for tests and embedding
//!   experiments.
//! - [`instance`] — [`InstanceHandle`](instance::InstanceHandle) owns
//!   exactly one engine; [`InstanceRegistry`](instance::InstanceRegistry)
//!   guarantees at most one live handle per container.
//! - [`cache`] — [`SessionCache`](cache::SessionCache), a bounded
//!   access-ordered cache of warm instances keyed by tab/session.
//! - [`channel`] — the request/response protocol between a controller
//!   context and a hosted engine context, with request correlation,
//!   timeouts and broadcast event forwarding.
//!
//! # Concurrency Model
//!
//! Everything here is asynchronous but non-preemptive: suspension points
//! are engine readiness waits, bus waits and channel request futures, all
//! bounded by timeouts. Operations on one [`InstanceHandle`] are expected
//! to be invoked sequentially by its caller; the runtime does not
//! serialize overlapping calls on the same handle.
//!
//! [`InstanceHandle`]: instance::InstanceHandle

pub mod cache;
pub mod channel;
pub mod engine;
pub mod instance;

pub use cache::{CacheStats, SessionCache};
pub use channel::{
    ChannelError, ChannelMessage, ControllerChannel, HostRunner, MessageKind, MessagePort,
};
pub use engine::{
    DocumentEngine, EngineCallError, EngineCommand, EngineFactory, FormatConverter,
};
pub use instance::{
    DirectiveOutcome, EditorFacade, InstanceError, InstanceHandle, InstanceRegistry,
};
