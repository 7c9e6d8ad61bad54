//! Machine positions, length units and arc planes.

use std::fmt;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

use crate::value::Number;

/// Millimeters per inch.
pub const MM_PER_INCH: f64 = 25.4;

/// A point in machine space. Millimeters, always.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// X-axis position.
    pub x: f64,
    /// Y-axis position.
    pub y: f64,
    /// Z-axis position.
    pub z: f64,
}

impl Position {
    /// The machine origin.
    pub const ZERO: Position = Position {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Create a position from its components.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Position { x, y, z }
    }

    /// In-plane (XY) distance to another position.
    pub fn plane_distance(&self, other: &Position) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl Add for Position {
    type Output = Position;

    fn add(self, rhs: Position) -> Position {
        Position::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Position {
    type Output = Position;

    fn sub(self, rhs: Position) -> Position {
        Position::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{x: {}, y: {}, z: {}}}",
            Number(self.x),
            Number(self.y),
            Number(self.z)
        )
    }
}

/// Length units selected with G20/G21.
///
/// The engine stores all positions in millimeters; axis literals and
/// position-valued parameters are scaled by [`Units::factor`] on the way in
/// and out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    /// Millimeters (G21), the default.
    #[default]
    Mm,
    /// Inches (G20).
    Inch,
}

impl Units {
    /// Millimeters per user unit.
    pub fn factor(self) -> f64 {
        match self {
            Units::Mm => 1.0,
            Units::Inch => MM_PER_INCH,
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Units::Mm => f.write_str("mm"),
            Units::Inch => f.write_str("in"),
        }
    }
}

/// The plane an arc is interpolated in, selected with G17/G18/G19.
///
/// The third axis advances linearly while the arc is drawn, producing a
/// helix when it moves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Plane {
    /// XY plane (G17), the default.
    #[default]
    Xy,
    /// ZX plane (G18).
    Zx,
    /// YZ plane (G19).
    Yz,
}

impl Plane {
    /// Rotate a position so the arc is drawn in XY with Z as the axis of
    /// rotation.
    pub fn to_plane(self, pos: Position) -> Position {
        match self {
            Plane::Xy => pos,
            Plane::Zx => Position::new(pos.z, pos.x, pos.y),
            Plane::Yz => Position::new(pos.y, pos.z, pos.x),
        }
    }

    /// Invert [`Plane::to_plane`], mapping an interpolated point back to
    /// machine XYZ.
    pub fn from_plane(self, pos: Position) -> Position {
        match self {
            Plane::Xy => pos,
            Plane::Zx => Position::new(pos.y, pos.z, pos.x),
            Plane::Yz => Position::new(pos.z, pos.x, pos.y),
        }
    }
}

impl fmt::Display for Plane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Plane::Xy => f.write_str("XY"),
            Plane::Zx => f.write_str("ZX"),
            Plane::Yz => f.write_str("YZ"),
        }
    }
}
