//! Error handling for gcodedrive.
//!
//! A single [`Error`] covers the three failure surfaces of the library:
//! parse/evaluation errors (tagged with source coordinates), engine errors
//! (bad code and argument combinations) and errors returned by the machine
//! collaborator (propagated unchanged).
//!
//! End of input is *not* an error anywhere in the API; it is reported as a
//! distinguished `Ok` result by the parser and the engine.

use std::fmt;

use thiserror::Error;

/// Source coordinates of a parse error, 1-based.
///
/// The physical line is the count of lines read from the byte source; the
/// virtual line additionally follows `Nnnn` renumbering directives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    /// 1-based physical line number.
    pub physical_line: u32,
    /// 1-based virtual line number, as tracked by `Nnnn`.
    pub virtual_line: u32,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.physical_line == self.virtual_line {
            write!(f, "{}", self.physical_line)
        } else {
            write!(f, "{}({})", self.physical_line, self.virtual_line)
        }
    }
}

/// Main error type for gcodedrive.
#[derive(Error, Debug)]
pub enum Error {
    /// Lexical, grammatical or evaluation failure in the G-code source.
    #[error("{location}: {message}")]
    Parse {
        /// Where in the source the failure happened.
        location: Location,
        /// What went wrong.
        message: String,
    },

    /// A code or argument combination rejected by the engine.
    #[error("{message}")]
    Engine {
        /// What went wrong.
        message: String,
    },

    /// A failure reported by the machine collaborator, propagated unchanged.
    #[error("{message}")]
    Machine {
        /// The machine's error message.
        message: String,
    },
}

impl Error {
    /// Create an engine error from a message.
    pub fn engine(message: impl Into<String>) -> Self {
        Error::Engine {
            message: message.into(),
        }
    }

    /// Create a machine error from a message.
    pub fn machine(message: impl Into<String>) -> Self {
        Error::Machine {
            message: message.into(),
        }
    }

    /// Check if this is a parse error.
    pub fn is_parse(&self) -> bool {
        matches!(self, Error::Parse { .. })
    }

    /// Check if this is an engine error.
    pub fn is_engine(&self) -> bool {
        matches!(self, Error::Engine { .. })
    }

    /// Check if this is a machine error.
    pub fn is_machine(&self) -> bool {
        matches!(self, Error::Machine { .. })
    }
}

/// Result type using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_display() {
        let loc = Location {
            physical_line: 3,
            virtual_line: 3,
        };
        assert_eq!(loc.to_string(), "3");

        let loc = Location {
            physical_line: 3,
            virtual_line: 10,
        };
        assert_eq!(loc.to_string(), "3(10)");
    }

    #[test]
    fn test_error_display() {
        let err = Error::Parse {
            location: Location {
                physical_line: 2,
                virtual_line: 5,
            },
            message: "expected a number".into(),
        };
        assert_eq!(err.to_string(), "2(5): expected a number");
        assert!(err.is_parse());

        let err = Error::engine("arg not allowed: L0.0000");
        assert_eq!(err.to_string(), "arg not allowed: L0.0000");
        assert!(err.is_engine());
    }
}
