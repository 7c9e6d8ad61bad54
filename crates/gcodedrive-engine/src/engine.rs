//! The stateful interpreter.
//!
//! [`Engine::evaluate`] drives parse→execute until the source is exhausted,
//! a fatal error occurs, or a program-end code is reached. Each parsed line
//! is a code list consumed left to right; motion codes pull their argument
//! words off the front of the list, and anything the engine does not
//! interpret is offered to the [`Machine`] fallback.

use std::collections::VecDeque;
use std::io::Write;
use std::ops::BitOr;

use tracing::{debug, trace};

use gcodedrive_core::{Code, Dialect, Error, Number, Plane, Position, Result, Units, Value};
use gcodedrive_parser::{ByteScanner, ParseHost, Parser};

use crate::arc;
use crate::machine::Machine;
use crate::state::{MoveMode, State};

/// The G-code engine: modal state, parameter store and code dispatch,
/// driving a [`Machine`] collaborator.
pub struct Engine<'w, M> {
    machine: M,
    dialect: Dialect,
    state: State,
    out: Option<Box<dyn Write + 'w>>,
    err: Option<Box<dyn Write + 'w>>,
    comments: Option<Box<dyn FnMut(&str) + 'w>>,
}

impl<'w, M: Machine> Engine<'w, M> {
    /// Create an engine over a machine, with no output sinks attached.
    pub fn new(machine: M, dialect: Dialect) -> Self {
        Engine {
            machine,
            dialect,
            state: State::default(),
            out: None,
            err: None,
            comments: None,
        }
    }

    /// Builder method to attach the OUT sink for `(msg,…)` and `(debug,…)`
    /// comment output.
    pub fn with_message_output(mut self, out: impl Write + 'w) -> Self {
        self.out = Some(Box::new(out));
        self
    }

    /// Builder method to attach the ERR sink for `(print,…)` comment
    /// output.
    pub fn with_diagnostic_output(mut self, err: impl Write + 'w) -> Self {
        self.err = Some(Box::new(err));
        self
    }

    /// Builder method to attach a hook receiving inert trailing comments
    /// (BeagleG).
    pub fn with_comment_hook(mut self, hook: impl FnMut(&str) + 'w) -> Self {
        self.comments = Some(Box::new(hook));
        self
    }

    /// The machine being driven.
    pub fn machine(&self) -> &M {
        &self.machine
    }

    /// The machine being driven, mutably.
    pub fn machine_mut(&mut self) -> &mut M {
        &mut self.machine
    }

    /// The current machine position, in millimeters.
    pub fn current_position(&self) -> Position {
        self.state.cur_pos
    }

    /// Parse and execute G-code from `scanner` until end of input, a fatal
    /// error, or a program-end code (M2/M30).
    pub fn evaluate<S: ByteScanner>(&mut self, scanner: S) -> Result<()> {
        let mut parser = Parser::new(scanner, self.dialect);
        while let Some(codes) = parser.parse(self)? {
            if self.execute(&mut parser, codes)? {
                return Ok(());
            }
        }
        Ok(())
    }

    /// Execute one line's codes. Returns true when the program ended.
    fn execute<S: ByteScanner>(
        &mut self,
        parser: &mut Parser<S>,
        codes: Vec<Code>,
    ) -> Result<bool> {
        let mut codes: VecDeque<Code> = codes.into();
        let mut use_machine = false;

        while let Some(code) = codes.front().cloned() {
            let Some(num) = code.value.as_number() else {
                return Err(Error::engine(format!("expected a number: {}", code)));
            };

            match code.letter {
                'G' => {
                    codes.pop_front();
                    if num.equal(Number(0.0)) {
                        self.state.move_mode = MoveMode::Rapid;
                        self.move_to(&mut codes, use_machine)?;
                    } else if num.equal(Number(1.0)) {
                        self.state.move_mode = MoveMode::Linear;
                        self.move_to(&mut codes, use_machine)?;
                    } else if num.equal(Number(2.0)) {
                        self.state.move_mode = MoveMode::ClockwiseArc;
                        self.arc_to(&mut codes, use_machine)?;
                    } else if num.equal(Number(3.0)) {
                        self.state.move_mode = MoveMode::CounterClockwiseArc;
                        self.arc_to(&mut codes, use_machine)?;
                    } else if num.equal(Number(10.0)) {
                        self.modify_positions(&mut codes)?;
                    } else if num.equal(Number(17.0)) {
                        self.set_plane(Plane::Xy);
                    } else if num.equal(Number(18.0)) {
                        self.set_plane(Plane::Zx);
                    } else if num.equal(Number(19.0)) {
                        self.set_plane(Plane::Yz);
                    } else if num.equal(Number(20.0)) {
                        self.set_units(Units::Inch);
                    } else if num.equal(Number(21.0)) {
                        self.set_units(Units::Mm);
                    } else if num.equal(Number(28.0)) {
                        let home = self.state.home_pos;
                        self.move_to_predefined(&mut codes, home)?;
                    } else if num.equal(Number(28.1)) {
                        self.state.home_pos = self.state.cur_pos;
                        debug!(pos = %self.state.home_pos, "set home position");
                    } else if num.equal(Number(30.0)) {
                        let second = self.state.second_pos;
                        self.move_to_predefined(&mut codes, second)?;
                    } else if num.equal(Number(30.1)) {
                        self.state.second_pos = self.state.cur_pos;
                        debug!(pos = %self.state.second_pos, "set secondary position");
                    } else if num.equal(Number(53.0)) {
                        // Machine coordinates for the rest of the line; a
                        // bare G53 pulls the next line in.
                        use_machine = true;
                        if codes.is_empty() {
                            match parser.parse(self)? {
                                Some(next) => codes = next.into(),
                                None => return Ok(false),
                            }
                        }
                    } else if num.equal(Number(54.0)) {
                        self.select_coord_sys(0);
                    } else if num.equal(Number(55.0)) {
                        self.select_coord_sys(1);
                    } else if num.equal(Number(56.0)) {
                        self.select_coord_sys(2);
                    } else if num.equal(Number(57.0)) {
                        self.select_coord_sys(3);
                    } else if num.equal(Number(58.0)) {
                        self.select_coord_sys(4);
                    } else if num.equal(Number(59.0)) {
                        self.select_coord_sys(5);
                    } else if num.equal(Number(59.1)) {
                        self.select_coord_sys(6);
                    } else if num.equal(Number(59.2)) {
                        self.select_coord_sys(7);
                    } else if num.equal(Number(59.3)) {
                        self.select_coord_sys(8);
                    } else if num.equal(Number(90.0)) {
                        self.state.absolute_mode = true;
                    } else if num.equal(Number(90.1)) {
                        self.state.absolute_arc_mode = true;
                    } else if num.equal(Number(91.0)) {
                        self.state.absolute_mode = false;
                    } else if num.equal(Number(91.1)) {
                        self.state.absolute_arc_mode = false;
                    } else if num.equal(Number(92.0)) {
                        self.set_work_position(&mut codes)?;
                    } else if num.equal(Number(92.1)) {
                        self.state.work_pos = Position::ZERO;
                        self.state.saved_work_pos = Position::ZERO;
                        self.state.use_work_pos = false;
                    } else if num.equal(Number(92.2)) {
                        self.state.saved_work_pos = self.state.work_pos;
                        self.state.work_pos = Position::ZERO;
                        self.state.use_work_pos = false;
                    } else if num.equal(Number(92.3)) {
                        self.state.work_pos = self.state.saved_work_pos;
                        self.state.use_work_pos = true;
                    } else {
                        self.handle_unknown(code, &mut codes)?;
                    }
                }

                'M' => {
                    codes.pop_front();
                    if num.equal(Number(2.0)) || num.equal(Number(30.0)) {
                        self.end_program()?;
                        return Ok(true);
                    } else if num.equal(Number(3.0)) {
                        self.state.spindle_on = true;
                        self.state.spindle_clockwise = true;
                        self.machine
                            .set_spindle(self.state.spindle_speed, self.state.spindle_clockwise)?;
                    } else if num.equal(Number(4.0)) {
                        self.state.spindle_on = true;
                        self.state.spindle_clockwise = false;
                        self.machine
                            .set_spindle(self.state.spindle_speed, self.state.spindle_clockwise)?;
                    } else if num.equal(Number(5.0)) {
                        self.state.spindle_on = false;
                        self.machine.spindle_off()?;
                    } else {
                        self.handle_unknown(code, &mut codes)?;
                    }
                }

                'F' => match self.state.move_mode {
                    MoveMode::Linear => self.move_to(&mut codes, use_machine)?,
                    MoveMode::ClockwiseArc | MoveMode::CounterClockwiseArc => {
                        self.arc_to(&mut codes, use_machine)?
                    }
                    MoveMode::Rapid => {
                        return Err(Error::engine(format!("arg not allowed: {}", code)))
                    }
                },

                'I' | 'J' | 'K' | 'P' | 'R' => {
                    if self.state.move_mode.is_arc() {
                        self.arc_to(&mut codes, use_machine)?;
                    } else {
                        return Err(Error::engine(format!("arg not allowed: {}", code)));
                    }
                }

                'S' => {
                    if num.0 < 0.0 {
                        return Err(Error::engine(format!(
                            "spindle speed must not be negative: {}",
                            num
                        )));
                    }
                    codes.pop_front();
                    self.state.spindle_speed = num.0;
                    if self.state.spindle_on {
                        self.machine
                            .set_spindle(self.state.spindle_speed, self.state.spindle_clockwise)?;
                    }
                }

                'T' => {
                    codes.pop_front();
                    let tool = match num.as_integer() {
                        Some(tool) if tool >= 0 => tool as u32,
                        _ => {
                            return Err(Error::engine(format!(
                                "expected a non-negative integer: T{}",
                                num
                            )))
                        }
                    };
                    self.machine.select_tool(tool)?;
                }

                'X' | 'Y' | 'Z' => match self.state.move_mode {
                    MoveMode::Rapid | MoveMode::Linear => self.move_to(&mut codes, use_machine)?,
                    MoveMode::ClockwiseArc | MoveMode::CounterClockwiseArc => {
                        self.arc_to(&mut codes, use_machine)?
                    }
                },

                _ => {
                    codes.pop_front();
                    self.handle_unknown(code, &mut codes)?;
                }
            }
        }

        Ok(false)
    }

    // -- modal state changes --

    fn set_plane(&mut self, plane: Plane) {
        self.state.arc_plane = plane;
        debug!(%plane, "selected arc plane");
    }

    fn set_units(&mut self, units: Units) {
        self.state.units = units;
        debug!(%units, "selected units");
    }

    fn select_coord_sys(&mut self, sys: usize) {
        self.state.cur_coord_sys = sys;
        debug!(coord_sys = sys + 1, "selected coordinate system");
    }

    /// M2/M30: reset modal state and stop the spindle if it is running.
    fn end_program(&mut self) -> Result<()> {
        debug!("end of program");
        self.state.move_mode = MoveMode::Linear;
        self.state.cur_coord_sys = 0;
        self.state.arc_plane = Plane::Xy;
        self.state.absolute_mode = true;
        if self.state.spindle_on {
            self.state.spindle_on = false;
            return self.machine.spindle_off();
        }
        Ok(())
    }

    // -- motion --

    fn rapid_to(&mut self, pos: Position) -> Result<()> {
        if pos == self.state.cur_pos {
            return Ok(());
        }
        self.machine.rapid_to(pos)?;
        self.state.cur_pos = pos;
        Ok(())
    }

    fn linear_to(&mut self, pos: Position) -> Result<()> {
        if pos == self.state.cur_pos {
            return Ok(());
        }
        self.machine.linear_to(pos)?;
        self.state.cur_pos = pos;
        Ok(())
    }

    /// G0/G1, and bare axis words while in a straight-line mode.
    fn move_to(&mut self, codes: &mut VecDeque<Code>, use_machine: bool) -> Result<()> {
        let args = parse_args(codes, ArgSet::F | ArgSet::X | ArgSet::Y | ArgSet::Z)?;
        let units = self.state.units.factor();

        let mut pos = self.state.cur_pos;
        for arg in &args {
            let value = arg.num.0 * units;
            match arg.letter {
                'F' => self.machine.set_feed(value)?,
                'X' => {
                    pos.x = if use_machine {
                        if self.state.absolute_mode {
                            value
                        } else {
                            self.state.cur_pos.x + value
                        }
                    } else {
                        self.state.to_machine_x(value, self.state.absolute_mode)
                    };
                }
                'Y' => {
                    pos.y = if use_machine {
                        if self.state.absolute_mode {
                            value
                        } else {
                            self.state.cur_pos.y + value
                        }
                    } else {
                        self.state.to_machine_y(value, self.state.absolute_mode)
                    };
                }
                'Z' => {
                    pos.z = if use_machine {
                        if self.state.absolute_mode {
                            value
                        } else {
                            self.state.cur_pos.z + value
                        }
                    } else {
                        self.state.to_machine_z(value, self.state.absolute_mode)
                    };
                }
                _ => {}
            }
        }

        match self.state.move_mode {
            MoveMode::Rapid => self.rapid_to(pos),
            MoveMode::Linear => self.linear_to(pos),
            mode => unreachable!("unexpected move mode: {mode:?}"),
        }
    }

    /// G28/G30: rapid to a predefined position, optionally through an
    /// intermediate waypoint given by axis words.
    fn move_to_predefined(&mut self, codes: &mut VecDeque<Code>, pos: Position) -> Result<()> {
        let args = parse_args(codes, ArgSet::X | ArgSet::Y | ArgSet::Z)?;
        if args.is_empty() {
            return self.rapid_to(pos);
        }

        let units = self.state.units.factor();
        let mut way = self.state.cur_pos;
        let mut along = self.state.cur_pos;
        for arg in &args {
            let value = arg.num.0 * units;
            match arg.letter {
                'X' => {
                    way.x = self.state.to_machine_x(value, self.state.absolute_mode);
                    along.x = pos.x;
                }
                'Y' => {
                    way.y = self.state.to_machine_y(value, self.state.absolute_mode);
                    along.y = pos.y;
                }
                'Z' => {
                    way.z = self.state.to_machine_z(value, self.state.absolute_mode);
                    along.z = pos.z;
                }
                _ => {}
            }
        }

        self.rapid_to(way)?;
        self.rapid_to(along)
    }

    /// G2/G3, and argument words while in an arc mode.
    fn arc_to(&mut self, codes: &mut VecDeque<Code>, use_machine: bool) -> Result<()> {
        if use_machine {
            return Err(Error::engine("G53 not allowed with arcs"));
        }

        let args = parse_args(
            codes,
            ArgSet::F
                | ArgSet::I
                | ArgSet::J
                | ArgSet::K
                | ArgSet::P
                | ArgSet::R
                | ArgSet::X
                | ArgSet::Y
                | ArgSet::Z,
        )?;
        let units = self.state.units.factor();

        let mut end_pos = self.state.cur_pos;
        let mut center_pos = self.state.cur_pos;
        let mut radius = 0.0f64;
        let mut turns = 1u32;
        for arg in &args {
            let value = arg.num.0 * units;
            match arg.letter {
                'F' => self.machine.set_feed(value)?,
                'I' => {
                    if self.state.arc_plane == Plane::Yz && !arg.num.equal(Number(0.0)) {
                        return Err(Error::engine("unexpected I for arc in YZ plane"));
                    }
                    center_pos.x = self.state.to_machine_x(value, self.state.absolute_arc_mode);
                }
                'J' => {
                    if self.state.arc_plane == Plane::Zx && !arg.num.equal(Number(0.0)) {
                        return Err(Error::engine("unexpected J for arc in ZX plane"));
                    }
                    center_pos.y = self.state.to_machine_y(value, self.state.absolute_arc_mode);
                }
                'K' => {
                    if self.state.arc_plane == Plane::Xy && !arg.num.equal(Number(0.0)) {
                        return Err(Error::engine("unexpected K for arc in XY plane"));
                    }
                    center_pos.z = self.state.to_machine_z(value, self.state.absolute_arc_mode);
                }
                'P' => {
                    turns = match arg.num.as_integer() {
                        Some(turns) if turns >= 1 => turns as u32,
                        _ => {
                            return Err(Error::engine(format!(
                                "expected a positive number of turns: P{}",
                                arg.num
                            )))
                        }
                    };
                }
                'R' => {
                    if arg.num.equal(Number(0.0)) {
                        return Err(Error::engine(format!(
                            "expected a nonzero radius: R{}",
                            arg.num
                        )));
                    }
                    radius = value;
                }
                'X' => end_pos.x = self.state.to_machine_x(value, self.state.absolute_mode),
                'Y' => end_pos.y = self.state.to_machine_y(value, self.state.absolute_mode),
                'Z' => end_pos.z = self.state.to_machine_z(value, self.state.absolute_mode),
                _ => {}
            }
        }

        let clockwise = match self.state.move_mode {
            MoveMode::ClockwiseArc => true,
            MoveMode::CounterClockwiseArc => false,
            mode => unreachable!("unexpected move mode: {mode:?}"),
        };

        let plane = self.state.arc_plane;
        trace!(
            cur = %self.state.cur_pos,
            end = %end_pos,
            radius,
            turns,
            clockwise,
            %plane,
            "arc interpolation"
        );
        arc::interpolate(
            plane.to_plane(self.state.cur_pos),
            plane.to_plane(end_pos),
            plane.to_plane(center_pos),
            radius,
            turns,
            clockwise,
            &mut |pos| {
                let machine_pos = plane.from_plane(pos);
                if machine_pos == self.state.cur_pos {
                    return Ok(());
                }
                self.machine.linear_to(machine_pos)?;
                self.state.cur_pos = machine_pos;
                Ok(())
            },
        )
    }

    // -- offsets --

    /// G10: modify a coordinate system's offsets.
    fn modify_positions(&mut self, codes: &mut VecDeque<Code>) -> Result<()> {
        let args = parse_args(
            codes,
            ArgSet::L | ArgSet::P | ArgSet::X | ArgSet::Y | ArgSet::Z,
        )?;
        let l = require_arg(&args, 'L')?;

        if l.equal(Number(2.0)) {
            // G10 L2: offsets in machine coordinates.
            self.set_coordinate_system_position(&args, true)
        } else if l.equal(Number(20.0)) {
            // G10 L20: offsets such that the current position reads as the
            // given values in that system.
            self.set_coordinate_system_position(&args, false)
        } else {
            Err(Error::engine(format!("unexpected L value to G10: L{}", l)))
        }
    }

    fn set_coordinate_system_position(&mut self, args: &[Arg], machine: bool) -> Result<()> {
        let p = require_arg(args, 'P')?;
        let coord_sys = match (0..=9).find(|&sys| p.equal(Number(f64::from(sys)))) {
            Some(0) => self.state.cur_coord_sys,
            Some(sys) => (sys - 1) as usize,
            None => {
                return Err(Error::engine(format!(
                    "expected a coordinate system: P{}",
                    p
                )))
            }
        };

        let units = self.state.units.factor();
        for arg in args {
            let value = arg.num.0 * units;
            match arg.letter {
                'X' => {
                    self.state.coord_sys_pos[coord_sys].x = if machine {
                        value
                    } else {
                        value - self.state.cur_pos.x
                    };
                }
                'Y' => {
                    self.state.coord_sys_pos[coord_sys].y = if machine {
                        value
                    } else {
                        value - self.state.cur_pos.y
                    };
                }
                'Z' => {
                    self.state.coord_sys_pos[coord_sys].z = if machine {
                        value
                    } else {
                        value - self.state.cur_pos.z
                    };
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// G92: set the work offset so the current position reads as the given
    /// values.
    fn set_work_position(&mut self, codes: &mut VecDeque<Code>) -> Result<()> {
        let args = parse_args(codes, ArgSet::X | ArgSet::Y | ArgSet::Z)?;
        if args.is_empty() {
            return Err(Error::engine("expected at least one X, Y, or Z arg"));
        }

        let units = self.state.units.factor();
        for arg in &args {
            let value = arg.num.0 * units;
            match arg.letter {
                'X' => {
                    self.state.work_pos.x +=
                        self.state.to_machine_x(value, true) - self.state.cur_pos.x;
                }
                'Y' => {
                    self.state.work_pos.y +=
                        self.state.to_machine_y(value, true) - self.state.cur_pos.y;
                }
                'Z' => {
                    self.state.work_pos.z +=
                        self.state.to_machine_z(value, true) - self.state.cur_pos.z;
                }
                _ => {}
            }
        }
        self.state.saved_work_pos = self.state.work_pos;
        self.state.use_work_pos = true;
        debug!(offset = %self.state.work_pos, "set work offset");
        Ok(())
    }

    fn handle_unknown(&mut self, code: Code, codes: &mut VecDeque<Code>) -> Result<()> {
        let rest: Vec<Code> = codes.drain(..).collect();
        let machine = &mut self.machine;
        let state = &mut self.state;
        let tail = machine.handle_unknown(code, rest, &mut |pos| state.cur_pos = pos)?;
        *codes = tail.into();
        Ok(())
    }
}

impl<'w, M: Machine> ParseHost for Engine<'w, M> {
    fn num_param(&self, num: i64) -> Option<Number> {
        self.state.num_param(num)
    }

    fn set_num_param(&mut self, num: i64, val: Number) -> Result<()> {
        self.state.set_num_param(num, val)
    }

    fn name_param(&self, name: &str) -> Option<Value> {
        self.state.name_param(name)
    }

    fn set_name_param(&mut self, name: &str, val: Value) -> Result<()> {
        self.state.set_name_param(name, val)
    }

    fn has_message_sink(&self) -> bool {
        self.out.is_some()
    }

    fn message(&mut self, text: &str) {
        if let Some(out) = &mut self.out {
            let _ = writeln!(out, "{}", text);
        }
    }

    fn has_diagnostic_sink(&self) -> bool {
        self.err.is_some()
    }

    fn diagnostic(&mut self, text: &str) {
        if let Some(err) = &mut self.err {
            let _ = writeln!(err, "{}", text);
        }
    }

    fn line_comment(&mut self, text: &str) {
        if let Some(hook) = &mut self.comments {
            hook(text);
        }
    }
}

/// An argument word pulled off a code list.
#[derive(Debug, Clone, Copy)]
struct Arg {
    letter: char,
    num: Number,
}

/// The set of argument letters an operation may consume.
#[derive(Debug, Clone, Copy)]
struct ArgSet(u16);

impl ArgSet {
    const F: ArgSet = ArgSet(1);
    const I: ArgSet = ArgSet(1 << 1);
    const J: ArgSet = ArgSet(1 << 2);
    const K: ArgSet = ArgSet(1 << 3);
    const L: ArgSet = ArgSet(1 << 4);
    const P: ArgSet = ArgSet(1 << 5);
    const R: ArgSet = ArgSet(1 << 6);
    const X: ArgSet = ArgSet(1 << 7);
    const Y: ArgSet = ArgSet(1 << 8);
    const Z: ArgSet = ArgSet(1 << 9);

    /// The set for a letter, or `None` for letters that are never
    /// argument words.
    fn of(letter: char) -> Option<ArgSet> {
        Some(match letter {
            'F' => ArgSet::F,
            'I' => ArgSet::I,
            'J' => ArgSet::J,
            'K' => ArgSet::K,
            'L' => ArgSet::L,
            'P' => ArgSet::P,
            'R' => ArgSet::R,
            'X' => ArgSet::X,
            'Y' => ArgSet::Y,
            'Z' => ArgSet::Z,
            _ => return None,
        })
    }

    fn contains(self, other: ArgSet) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ArgSet {
    type Output = ArgSet;

    fn bitor(self, rhs: ArgSet) -> ArgSet {
        ArgSet(self.0 | rhs.0)
    }
}

/// Pull argument words off the front of the code list until a non-argument
/// letter appears. Rejects letters outside `allowed`, duplicates, and
/// non-numeric operands.
fn parse_args(codes: &mut VecDeque<Code>, allowed: ArgSet) -> Result<Vec<Arg>> {
    let mut args: Vec<Arg> = Vec::new();
    while let Some(code) = codes.front() {
        let Some(set) = ArgSet::of(code.letter) else {
            break;
        };
        if !allowed.contains(set) {
            return Err(Error::engine(format!("arg not allowed: {}", code)));
        }
        if args.iter().any(|arg| arg.letter == code.letter) {
            return Err(Error::engine(format!("duplicate arg specified: {}", code)));
        }
        let Some(num) = code.value.as_number() else {
            return Err(Error::engine(format!("expected a number: {}", code.value)));
        };

        args.push(Arg {
            letter: code.letter,
            num,
        });
        codes.pop_front();
    }
    Ok(args)
}

fn require_arg(args: &[Arg], letter: char) -> Result<Number> {
    args.iter()
        .find(|arg| arg.letter == letter)
        .map(|arg| arg.num)
        .ok_or_else(|| Error::engine(format!("missing required arg: {}", letter)))
}
