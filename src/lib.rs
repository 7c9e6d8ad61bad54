//! # gcodedrive
//!
//! A G-code parsing and evaluation library for the BeagleG, LinuxCNC and
//! RepRap dialects. It streams a G-code source, evaluates expressions,
//! parameters, control flow and comment commands as it goes, and drives a
//! pluggable [`Machine`] through rapid, linear and arc moves, coordinate
//! system management, and spindle and tool control.
//!
//! ## Architecture
//!
//! gcodedrive is organized as a workspace with multiple crates:
//!
//! 1. **gcodedrive-core** - Values, codes, positions, units, dialects, errors
//! 2. **gcodedrive-parser** - Byte-level lexer, expressions, actions, parser
//! 3. **gcodedrive-engine** - Modal state, reserved parameters, arcs, dispatch
//! 4. **gcodedrive** - This facade, re-exporting the public surface
//!
//! ## Basic usage
//!
//! Implement [`Machine`] for whatever should receive the motion — a device
//! driver, a simulator, a toolpath collector — then feed the engine a byte
//! source:
//!
//! ```rust,ignore
//! use gcodedrive::{Dialect, Engine, SliceScanner};
//!
//! let mut engine = Engine::new(my_machine, Dialect::ALL)
//!     .with_message_output(std::io::stdout());
//! engine.evaluate(SliceScanner::from(program_text))?;
//! ```
//!
//! Evaluation stops at end of input, at the first error, or at a
//! program-end code (M2/M30).
//!
//! ## Unsupported features
//!
//! LinuxCNC's O-code subroutines and control flow are not implemented; the
//! parser reports them as unexpected keywords.

pub use gcodedrive_core::{
    Code, Dialect, Error, Location, Number, Plane, Position, Result, Units, Value, MINIMUM_DELTA,
    MM_PER_INCH,
};

pub use gcodedrive_parser::{ByteScanner, ParseHost, Parser, SliceScanner};

pub use gcodedrive_engine::{Engine, Machine, MoveMode};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging with the default configuration.
///
/// Sets up structured logging with console output, `RUST_LOG` environment
/// variable support and an INFO default level.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}
