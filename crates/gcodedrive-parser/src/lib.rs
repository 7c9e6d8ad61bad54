//! # gcodedrive Parser
//!
//! A streaming, dialect-aware G-code parser and expression evaluator.
//!
//! The parser pulls bytes from a [`ByteScanner`] one logical line at a
//! time and yields each line's evaluated [`Code`](gcodedrive_core::Code)
//! list. Everything with a side effect — parameter assignments, comment
//! commands, BeagleG `IF`/`WHILE` control flow — executes against the
//! caller's [`ParseHost`] as the line is consumed, honoring the active
//! dialect's assignment-timing rules.

mod action;
mod expr;

pub mod host;
pub mod parser;
pub mod scanner;

pub use host::ParseHost;
pub use parser::Parser;
pub use scanner::{ByteScanner, SliceScanner};
