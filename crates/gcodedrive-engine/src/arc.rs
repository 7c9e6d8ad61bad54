//! Arc interpolation.
//!
//! Works on positions already rotated into the active plane, so the arc is
//! always drawn in XY with Z as the axis of rotation; the caller maps each
//! emitted point back to machine coordinates. Arcs are linearized into
//! chords of at most 0.1 mm of total travel.

use std::f64::consts::{FRAC_PI_2, TAU};

use gcodedrive_core::{Error, Position, Result, MINIMUM_DELTA};

/// Solve for the arc center from the chord and a signed radius.
///
/// The radius sign selects between the two circles through the endpoints:
/// positive takes the arc of at most a half turn in the given direction,
/// negative the longer one.
fn radius_center(cur: Position, end: Position, radius: f64, clockwise: bool) -> Result<Position> {
    if cur.x == end.x && cur.y == end.y {
        return Err(Error::engine(
            "expected endpoint different than current with radius",
        ));
    }

    let mut dist = cur.plane_distance(&end);
    let delta = dist - radius.abs() * 2.0;
    if delta > MINIMUM_DELTA {
        return Err(Error::engine("radius too small"));
    } else if delta > 0.0 {
        dist = radius.abs() * 2.0;
    }

    let mut theta = (end.y - cur.y).atan2(end.x - cur.x);
    if (clockwise && radius > 0.0) || (!clockwise && radius < 0.0) {
        theta -= FRAC_PI_2;
    } else {
        theta += FRAC_PI_2;
    }

    let offset = radius.abs() * (dist / (radius.abs() * 2.0)).asin().cos();
    Ok(Position::new(
        (cur.x + end.x) / 2.0 + offset * theta.cos(),
        (cur.y + end.y) / 2.0 + offset * theta.sin(),
        0.0,
    ))
}

/// Interpolate an arc from `cur` to `end`, feeding each chord endpoint to
/// `linear_to` and finishing exactly at `end`.
///
/// Either `radius` is nonzero and the center is solved from the chord, or
/// `center` differs in-plane from `cur` and the radius is derived from it;
/// anything else is a geometry error. `turns` adds full revolutions; a
/// flat arc (no Z travel) is clamped to at most two.
pub(crate) fn interpolate(
    cur: Position,
    end: Position,
    center: Position,
    radius: f64,
    turns: u32,
    clockwise: bool,
    linear_to: &mut dyn FnMut(Position) -> Result<()>,
) -> Result<()> {
    let mut center = center;
    let mut radius = radius;
    let mut turns = turns;

    if radius != 0.0 {
        if center.x != cur.x || center.y != cur.y {
            return Err(Error::engine("both center point and radius specified for arc"));
        }
        center = radius_center(cur, end, radius, clockwise)?;
        radius = radius.abs();
    } else if center.x != cur.x || center.y != cur.y {
        radius = cur.plane_distance(&center);
    } else {
        return Err(Error::engine("expected center point or radius for arc"));
    }

    let mut normal = end.z - cur.z;
    if normal.abs() < MINIMUM_DELTA {
        normal = 0.0;
        if turns > 2 {
            turns = 2;
        }
    }

    let mut angle = (cur.y - center.y).atan2(cur.x - center.x);
    if angle < 0.0 {
        angle += TAU;
    }
    let mut end_angle = (end.y - center.y).atan2(end.x - center.x);
    if end_angle < 0.0 {
        end_angle += TAU;
    }

    let angle_dir = if clockwise { -1.0 } else { 1.0 };

    let mut angle_total = f64::from(turns - 1) * TAU;
    if angle == end_angle {
        angle_total += TAU;
    } else if angle < end_angle {
        if clockwise {
            angle_total += TAU - (end_angle - angle);
        } else {
            angle_total += end_angle - angle;
        }
    } else if clockwise {
        angle_total += angle - end_angle;
    } else {
        angle_total += TAU - (angle - end_angle);
    }

    let travel_total = (angle_total * radius).hypot(normal.abs());
    let num_steps = (travel_total / 0.1).floor();
    let step_angle = angle_total / num_steps;
    let step_normal = normal / num_steps;

    let mut step = 1.0;
    while step < num_steps {
        linear_to(Position::new(
            center.x + radius * (angle + step * step_angle * angle_dir).cos(),
            center.y + radius * (angle + step * step_angle * angle_dir).sin(),
            cur.z + step * step_normal,
        ))?;
        step += 1.0;
    }

    linear_to(end)
}
