//! The engine's modal state record.
//!
//! All reference-frame conversions are pure functions of this record plus
//! the axis literal and the absolute/relative flag; nothing here talks to
//! the machine.

use std::collections::HashMap;

use gcodedrive_core::{Number, Plane, Position, Units, Value};

/// The active motion mode, selected by G0-G3 and persisting across lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MoveMode {
    /// G0: rapid traverse.
    Rapid,
    /// G1: linear feed, the default.
    #[default]
    Linear,
    /// G2: clockwise arc.
    ClockwiseArc,
    /// G3: counter-clockwise arc.
    CounterClockwiseArc,
}

impl MoveMode {
    /// True for either arc mode.
    pub fn is_arc(self) -> bool {
        matches!(self, MoveMode::ClockwiseArc | MoveMode::CounterClockwiseArc)
    }
}

/// Modal state plus the parameter store.
#[derive(Debug)]
pub(crate) struct State {
    pub units: Units,
    pub move_mode: MoveMode,
    pub absolute_mode: bool,
    pub absolute_arc_mode: bool,
    pub arc_plane: Plane,
    pub cur_pos: Position,
    pub home_pos: Position,
    pub second_pos: Position,
    pub cur_coord_sys: usize,
    pub coord_sys_pos: [Position; 9],
    pub work_pos: Position,
    pub saved_work_pos: Position,
    pub use_work_pos: bool,
    pub spindle_on: bool,
    pub spindle_speed: f64,
    pub spindle_clockwise: bool,
    pub num_params: HashMap<i64, Number>,
    pub name_params: HashMap<String, Value>,
}

impl Default for State {
    fn default() -> Self {
        State {
            units: Units::Mm,
            move_mode: MoveMode::Linear,
            absolute_mode: true,
            absolute_arc_mode: false,
            arc_plane: Plane::Xy,
            cur_pos: Position::ZERO,
            home_pos: Position::ZERO,
            second_pos: Position::ZERO,
            cur_coord_sys: 0,
            coord_sys_pos: [Position::ZERO; 9],
            work_pos: Position::ZERO,
            saved_work_pos: Position::ZERO,
            use_work_pos: false,
            spindle_on: false,
            spindle_speed: 0.0,
            spindle_clockwise: true,
            num_params: HashMap::new(),
            name_params: HashMap::new(),
        }
    }
}

impl State {
    /// Derive the machine-space X for an axis literal already scaled to
    /// millimeters.
    pub fn to_machine_x(&self, x: f64, absolute: bool) -> f64 {
        if absolute {
            x - self.coord_sys_pos[self.cur_coord_sys].x - self.active_work_pos().x
        } else {
            self.cur_pos.x + x
        }
    }

    /// Derive the machine-space Y for an axis literal already scaled to
    /// millimeters.
    pub fn to_machine_y(&self, y: f64, absolute: bool) -> f64 {
        if absolute {
            y - self.coord_sys_pos[self.cur_coord_sys].y - self.active_work_pos().y
        } else {
            self.cur_pos.y + y
        }
    }

    /// Derive the machine-space Z for an axis literal already scaled to
    /// millimeters.
    pub fn to_machine_z(&self, z: f64, absolute: bool) -> f64 {
        if absolute {
            z - self.coord_sys_pos[self.cur_coord_sys].z - self.active_work_pos().z
        } else {
            self.cur_pos.z + z
        }
    }

    /// The work offset, if enabled.
    fn active_work_pos(&self) -> Position {
        if self.use_work_pos {
            self.work_pos
        } else {
            Position::ZERO
        }
    }
}
