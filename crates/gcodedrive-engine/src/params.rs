//! Reserved numeric parameter slots.
//!
//! A block of numeric parameters aliases engine state instead of the
//! general-purpose store, so programs can read and adjust positions and
//! coordinate systems directly:
//!
//! | slots | state |
//! |---|---|
//! | 5161-5163 | home position X/Y/Z |
//! | 5181-5183 | secondary position X/Y/Z |
//! | 5210 | work-offset-enable flag (0 = off) |
//! | 5211-5213 | work offset X/Y/Z |
//! | 5220 | current coordinate system, 1..9 |
//! | 5221 + 20(k-1) + 0/1/2 | coordinate system k offsets X/Y/Z |
//!
//! Position-valued slots are exposed in the active units: a program that
//! switches between G20 and G21 sees the same slot scale accordingly.
//! Every other numeric slot is general-purpose storage.

use gcodedrive_core::{Error, Number, Position, Result, Value};

use crate::state::State;

const HOME_POS_PARAM: i64 = 5161;
const SECOND_POS_PARAM: i64 = 5181;
const WORK_POS_FLAG_PARAM: i64 = 5210;
const WORK_POS_PARAM: i64 = 5211;
const CUR_COORD_SYS_PARAM: i64 = 5220;
const COORD_SYS_PARAM: i64 = 5221;
const COORD_SYS_PARAM_STEP: i64 = 20;
const COORD_SYS_PARAM_END: i64 = COORD_SYS_PARAM + COORD_SYS_PARAM_STEP * 9;

fn axis(pos: Position, idx: i64) -> f64 {
    match idx {
        0 => pos.x,
        1 => pos.y,
        _ => pos.z,
    }
}

fn set_axis(pos: &mut Position, idx: i64, val: f64) {
    match idx {
        0 => pos.x = val,
        1 => pos.y = val,
        _ => pos.z = val,
    }
}

impl State {
    pub(crate) fn num_param(&self, num: i64) -> Option<Number> {
        let units = self.units.factor();
        if (HOME_POS_PARAM..HOME_POS_PARAM + 3).contains(&num) {
            Some(Number(axis(self.home_pos, num - HOME_POS_PARAM) / units))
        } else if (SECOND_POS_PARAM..SECOND_POS_PARAM + 3).contains(&num) {
            Some(Number(axis(self.second_pos, num - SECOND_POS_PARAM) / units))
        } else if num == WORK_POS_FLAG_PARAM {
            Some(Number(if self.use_work_pos { 1.0 } else { 0.0 }))
        } else if (WORK_POS_PARAM..WORK_POS_PARAM + 3).contains(&num) {
            Some(Number(axis(self.work_pos, num - WORK_POS_PARAM) / units))
        } else if num == CUR_COORD_SYS_PARAM {
            Some(Number((self.cur_coord_sys + 1) as f64))
        } else if (COORD_SYS_PARAM..COORD_SYS_PARAM_END).contains(&num) {
            let offset = num - COORD_SYS_PARAM;
            let sys = (offset / COORD_SYS_PARAM_STEP) as usize;
            match offset % COORD_SYS_PARAM_STEP {
                idx @ 0..=2 => Some(Number(axis(self.coord_sys_pos[sys], idx) / units)),
                _ => Some(Number(0.0)),
            }
        } else {
            self.num_params.get(&num).copied()
        }
    }

    pub(crate) fn set_num_param(&mut self, num: i64, val: Number) -> Result<()> {
        let units = self.units.factor();
        if (HOME_POS_PARAM..HOME_POS_PARAM + 3).contains(&num) {
            set_axis(&mut self.home_pos, num - HOME_POS_PARAM, val.0 * units);
        } else if (SECOND_POS_PARAM..SECOND_POS_PARAM + 3).contains(&num) {
            set_axis(&mut self.second_pos, num - SECOND_POS_PARAM, val.0 * units);
        } else if num == WORK_POS_FLAG_PARAM {
            self.use_work_pos = !val.equal(Number(0.0));
        } else if (WORK_POS_PARAM..WORK_POS_PARAM + 3).contains(&num) {
            set_axis(&mut self.work_pos, num - WORK_POS_PARAM, val.0 * units);
        } else if num == CUR_COORD_SYS_PARAM {
            let sys = match val.as_integer() {
                Some(sys) if (1..=9).contains(&sys) => sys,
                _ => {
                    return Err(Error::engine(format!(
                        "#{}: expected an integer between 1 and 9: {}",
                        num, val
                    )))
                }
            };
            self.cur_coord_sys = (sys - 1) as usize;
        } else if (COORD_SYS_PARAM..COORD_SYS_PARAM_END).contains(&num) {
            let offset = num - COORD_SYS_PARAM;
            let sys = (offset / COORD_SYS_PARAM_STEP) as usize;
            if let idx @ 0..=2 = offset % COORD_SYS_PARAM_STEP {
                set_axis(&mut self.coord_sys_pos[sys], idx, val.0 * units);
            }
        } else {
            self.num_params.insert(num, val);
        }
        Ok(())
    }

    pub(crate) fn name_param(&self, name: &str) -> Option<Value> {
        self.name_params.get(name).cloned()
    }

    pub(crate) fn set_name_param(&mut self, name: &str, val: Value) -> Result<()> {
        self.name_params.insert(name.to_owned(), val);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gcodedrive_core::Units;

    #[test]
    fn test_general_purpose_slots() {
        let mut state = State::default();
        assert_eq!(state.num_param(999), None);
        state.set_num_param(999, Number(12.5)).unwrap();
        assert_eq!(state.num_param(999), Some(Number(12.5)));
    }

    #[test]
    fn test_coord_sys_aliases() {
        let mut state = State::default();
        state.set_num_param(5220, Number(3.0)).unwrap();
        assert_eq!(state.cur_coord_sys, 2);
        assert_eq!(state.num_param(5220), Some(Number(3.0)));

        assert!(state.set_num_param(5220, Number(10.0)).is_err());
        assert!(state.set_num_param(5220, Number(2.5)).is_err());

        // System 2 starts at 5241.
        state.set_num_param(5241, Number(7.0)).unwrap();
        assert_eq!(state.coord_sys_pos[1].x, 7.0);
        assert_eq!(state.num_param(5241), Some(Number(7.0)));

        // Gap slots inside the block read zero and drop writes.
        state.set_num_param(5225, Number(3.0)).unwrap();
        assert_eq!(state.num_param(5225), Some(Number(0.0)));
    }

    #[test]
    fn test_position_slots_scale_with_units() {
        let mut state = State::default();
        state.set_num_param(5161, Number(25.4)).unwrap();
        assert_eq!(state.home_pos.x, 25.4);

        state.units = Units::Inch;
        assert_eq!(state.num_param(5161), Some(Number(1.0)));
        state.set_num_param(5162, Number(2.0)).unwrap();
        assert_eq!(state.home_pos.y, 50.8);
    }

    #[test]
    fn test_work_offset_flag() {
        let mut state = State::default();
        assert_eq!(state.num_param(5210), Some(Number(0.0)));
        state.set_num_param(5210, Number(1.0)).unwrap();
        assert!(state.use_work_pos);
        assert_eq!(state.num_param(5210), Some(Number(1.0)));
        state.set_num_param(5210, Number(0.0)).unwrap();
        assert!(!state.use_work_pos);
    }
}
