//! Instance lifecycle: one handle per live engine, one registry per set
//! of containers.
//!
//! ```text
//! InstanceRegistry
//!   ├── "default"  → InstanceHandle ── Box<dyn DocumentEngine>
//!   ├── "sidebar"  → InstanceHandle ── Box<dyn DocumentEngine>
//!   └── active: Option<ContainerId>   (single-instance convenience)
//! ```
//!
//! A handle moves `unbound → bound → destroyed`, with rebinds allowed
//! while bound (a permission transition back to editable rebuilds the
//! engine in place). The registry guarantees at most one live handle per
//! container.

mod error;
mod facade;
mod handle;
mod registry;

pub use error::InstanceError;
pub use facade::{DirectiveOutcome, EditorFacade, EDITOR_DIRECTIVES};
pub use handle::{InstanceHandle, PendingExport, DEFAULT_EXPORT_TIMEOUT};
pub use registry::InstanceRegistry;
