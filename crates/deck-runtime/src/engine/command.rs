//! Fire-and-forget engine directives.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A directive handed to a live engine.
///
/// Commands carry no reply path. Operations that produce a result (a
/// save, a render) report completion through the notification bus
/// instead.
///
/// # Example
///
/// ```
/// use deck_runtime::engine::EngineCommand;
///
/// let save = EngineCommand::save();
/// assert_eq!(save.command, "save");
///
/// let lock = EngineCommand::restrict_editing(true);
/// assert_eq!(lock.data["restrict"], true);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineCommand {
    /// Directive name understood by the engine.
    pub command: String,
    /// Directive arguments; `null` when the directive takes none.
    #[serde(default)]
    pub data: Value,
}

impl EngineCommand {
    /// Creates a directive with arguments.
    #[must_use]
    pub fn new(command: impl Into<String>, data: Value) -> Self {
        Self {
            command: command.into(),
            data,
        }
    }

    /// Creates an argument-less directive.
    #[must_use]
    pub fn bare(command: impl Into<String>) -> Self {
        Self::new(command, Value::Null)
    }

    /// Directive that starts a save; the payload arrives as a
    /// save-completed notification.
    #[must_use]
    pub fn save() -> Self {
        Self::bare("save")
    }

    /// Directive that restricts or lifts editing on the live instance.
    ///
    /// Engines only honour the restricting direction in place; lifting a
    /// restriction requires rebuilding the instance.
    #[must_use]
    pub fn restrict_editing(restrict: bool) -> Self {
        Self::new("restrict_editing", json!({ "restrict": restrict }))
    }
}
