//! The environment a parser evaluates against.

use gcodedrive_core::{Number, Result, Value};

/// Parameter storage and message sinks for the parser.
///
/// The parser owns no state beyond its own position in the source; parameter
/// reads and writes, `(msg,…)`-family output and comment reporting all go
/// through this trait so the engine can centralize storage and alias
/// reserved parameter slots onto its own state.
pub trait ParseHost {
    /// Read a global numeric parameter. `None` when undefined.
    fn num_param(&self, num: i64) -> Option<Number>;

    /// Write a global numeric parameter, default-creating it.
    fn set_num_param(&mut self, num: i64, val: Number) -> Result<()>;

    /// Read a global named parameter. `None` when undefined.
    fn name_param(&self, name: &str) -> Option<Value>;

    /// Write a global named parameter, default-creating it.
    fn set_name_param(&mut self, name: &str, val: Value) -> Result<()>;

    /// True when an OUT sink is attached; `(msg,…)` and `(debug,…)` comments
    /// are inert without one.
    fn has_message_sink(&self) -> bool {
        false
    }

    /// Write one line of `(msg,…)` / `(debug,…)` output to the OUT sink.
    fn message(&mut self, _text: &str) {}

    /// True when an ERR sink is attached; `(print,…)` comments are inert
    /// without one.
    fn has_diagnostic_sink(&self) -> bool {
        false
    }

    /// Write one line of `(print,…)` output to the ERR sink.
    fn diagnostic(&mut self, _text: &str) {}

    /// Report an inert trailing comment (BeagleG only).
    fn line_comment(&mut self, _text: &str) {}
}
