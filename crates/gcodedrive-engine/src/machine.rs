//! The machine collaborator driven by the engine.

use gcodedrive_core::{Code, Position, Result};

/// The abstraction the engine drives: a CNC machine, a simulator, a viewer
/// backend, or a linter sink.
///
/// All methods are synchronous and return before the engine issues the next
/// call; calls arrive in program order. Positions are machine coordinates
/// in millimeters. Any error returned here aborts evaluation and propagates
/// to the caller unchanged.
pub trait Machine {
    /// Set the feed rate, in millimeters per unit time. Called whenever an
    /// `F` word is consumed under linear or arc motion.
    fn set_feed(&mut self, feed: f64) -> Result<()>;

    /// Turn the spindle on at `speed`, in the given direction. Called for
    /// M3/M4 and again when `S` changes while the spindle is on.
    fn set_spindle(&mut self, speed: f64, clockwise: bool) -> Result<()>;

    /// Turn the spindle off. Called for M5 and at end of program if the
    /// spindle is still running.
    fn spindle_off(&mut self) -> Result<()>;

    /// Select a tool. Called for `T`.
    fn select_tool(&mut self, tool: u32) -> Result<()>;

    /// Move in a straight line at rapid traverse rate. Skipped when the
    /// target equals the current position.
    fn rapid_to(&mut self, pos: Position) -> Result<()>;

    /// Move in a straight line at the programmed feed rate. Skipped when
    /// the target equals the current position.
    fn linear_to(&mut self, pos: Position) -> Result<()>;

    /// Fallback for codes the engine does not itself interpret.
    ///
    /// `code` is the unknown code and `rest` the remaining codes on the
    /// line; any prefix of `rest` may be consumed, and the unconsumed tail
    /// is returned for the engine to continue with. `set_cur_pos` informs
    /// the engine of a position change this code caused.
    fn handle_unknown(
        &mut self,
        code: Code,
        rest: Vec<Code>,
        set_cur_pos: &mut dyn FnMut(Position),
    ) -> Result<Vec<Code>>;
}
