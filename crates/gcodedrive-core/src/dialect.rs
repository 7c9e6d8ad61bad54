//! G-code dialect selection.
//!
//! The dialects differ in syntax (bare `#name` parameters, block keywords)
//! and in semantics (assignment timing, actionable comments). A [`Dialect`]
//! is a set of flags so a permissive "all dialects" configuration is
//! possible alongside strict single-dialect parsing.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// A set of dialect flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialect(u8);

impl Dialect {
    /// BeagleG: bare `#name` parameters, `IF`/`WHILE` block keywords,
    /// immediate assignment, line-end comment reporting.
    pub const BEAGLEG: Dialect = Dialect(1);
    /// LinuxCNC: `#<name>` parameters only, assignments deferred to end of
    /// line, actionable `(msg,…)` / `(debug,…)` / `(print,…)` comments.
    pub const LINUX_CNC: Dialect = Dialect(1 << 1);
    /// RepRap: immediate assignment, no block keywords.
    pub const REP_RAP: Dialect = Dialect(1 << 2);
    /// Every dialect at once; the most permissive configuration.
    pub const ALL: Dialect = Dialect(1 | 1 << 1 | 1 << 2);

    /// True when every flag in `other` is set in `self`.
    pub fn contains(self, other: Dialect) -> bool {
        self.0 & other.0 == other.0
    }

    /// BeagleG syntax and semantics enabled.
    pub fn has_beagleg(self) -> bool {
        self.contains(Dialect::BEAGLEG)
    }

    /// LinuxCNC syntax and semantics enabled.
    pub fn has_linux_cnc(self) -> bool {
        self.contains(Dialect::LINUX_CNC)
    }

    /// RepRap syntax and semantics enabled.
    pub fn has_rep_rap(self) -> bool {
        self.contains(Dialect::REP_RAP)
    }
}

impl BitOr for Dialect {
    type Output = Dialect;

    fn bitor(self, rhs: Dialect) -> Dialect {
        Dialect(self.0 | rhs.0)
    }
}

impl BitOrAssign for Dialect {
    fn bitor_assign(&mut self, rhs: Dialect) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.has_beagleg() {
            names.push("BeagleG");
        }
        if self.has_linux_cnc() {
            names.push("LinuxCNC");
        }
        if self.has_rep_rap() {
            names.push("RepRap");
        }
        f.write_str(&names.join("|"))
    }
}
