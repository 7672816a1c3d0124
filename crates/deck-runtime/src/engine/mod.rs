//! External collaborator boundary: the document engine and the format
//! conversion engine.
//!
//! Nothing in this module implements document semantics. It defines the
//! seams the runtime drives engines through, so the concrete engine (and
//! the WASM conversion module in front of it) stay replaceable:
//!
//! - [`DocumentEngine`] — one live editing session. Directives are
//!   fire-and-forget; completions come back through the notification bus.
//! - [`EngineFactory`] — builds an engine for an instance identity and
//!   wires its save/ready/loading callbacks to the bus.
//! - [`FormatConverter`] — pure source-format → engine-format conversion.
//! - [`StubEngine`]/[`StubFactory`]/[`StubConverter`] — scriptable
//!   in-memory implementations used by the test suites.

mod command;
mod stub;
mod traits;

pub use command::EngineCommand;
pub use stub::{StubBehavior, StubConverter, StubEngine, StubFactory};
pub use traits::{Converted, ConvertError, DocumentEngine, EngineCallError, EngineFactory, FormatConverter};
