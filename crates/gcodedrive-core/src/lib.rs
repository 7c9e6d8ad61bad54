//! # gcodedrive Core
//!
//! Core types for gcodedrive: the value model used by expressions and
//! command operands, machine positions and units, dialect flags, and the
//! unified error type.

pub mod dialect;
pub mod error;
pub mod position;
pub mod value;

pub use dialect::Dialect;
pub use error::{Error, Location, Result};
pub use position::{Plane, Position, Units, MM_PER_INCH};
pub use value::{Code, Number, Value, MINIMUM_DELTA};
