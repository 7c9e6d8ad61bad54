//! # gcodedrive Engine
//!
//! The motion and state engine: consumes parsed G-code, maintains the
//! machine's modal state (coordinate systems, work offset, planes, units,
//! spindle and tool state), derives machine-space positions through the
//! reference-frame chain, interpolates arcs, and drives a pluggable
//! [`Machine`] collaborator.

mod arc;
mod params;
mod state;

pub mod engine;
pub mod machine;

pub use engine::Engine;
pub use machine::Machine;
pub use state::MoveMode;
