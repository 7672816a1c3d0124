//! Core types for DECK (Document Engine Coordination Kit).
//!
//! This crate is the bottom layer of the DECK workspace. It carries the
//! identifier types, the document data model, and the unified error-code
//! interface shared by every other crate. It has no runtime dependencies
//! beyond `serde` and `uuid`, so it is safe to depend on from embedders
//! and engine adapters alike.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  deck-types     : InstanceId, ContainerId, RequestId,       │
//! │                   LoadConfig, SaveResult, ErrorCode ◄─ HERE │
//! │  deck-event     : EngineEvent, EventBus                     │
//! │  deck-runtime   : InstanceHandle, InstanceRegistry,         │
//! │                   SessionCache, ControllerChannel/HostRunner│
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Identity Model
//!
//! One live engine instance is named by the pair
//! ([`ContainerId`], [`InstanceId`]):
//!
//! - [`ContainerId`] is a caller-chosen mount-point name, with a fixed
//!   default for single-instance embedders.
//! - [`InstanceId`] is assigned at creation and unique for the process
//!   lifetime.
//! - [`RequestId`] correlates a cross-context request with its response;
//!   it is minted per channel from a counter + timestamp pair.
//!
//! # Usage
//!
//! ```
//! use deck_types::{ContainerId, InstanceId, LoadConfig};
//!
//! let container = ContainerId::new("sidebar");
//! let instance = InstanceId::new();
//!
//! let config = LoadConfig::new("report.docx", "docx")
//!     .with_data(vec![0xd0, 0xcf])
//!     .read_only(true);
//!
//! assert!(config.mode().is_read_only());
//! assert_eq!(container.as_str(), "sidebar");
//! assert_ne!(instance, InstanceId::new());
//! ```

mod document;
mod error;
mod id;

pub use document::{CreatedInstance, EngineMode, LoadConfig, MediaMap, RenderConfig, SaveResult};
pub use error::{assert_error_code, assert_error_codes, ErrorCode};
pub use id::{ContainerId, InstanceId, RequestId, RequestIdSource};
