//! Float math helpers for steering and heading interpolation.
//!
//! Positions are [`glam::Vec3`] with movement on the x/y plane; the z
//! component carries terrain height and is left untouched by steering.
//! Headings are radians counter-clockwise from +x, wrapped to (-PI, PI].

pub use glam::{Mat4, Quat, Vec3};

/// Wrap an angle in radians to the (-PI, PI] interval.
#[must_use]
pub fn wrap_angle(angle: f32) -> f32 {
    let mut a = angle % std::f32::consts::TAU;
    if a > std::f32::consts::PI {
        a -= std::f32::consts::TAU;
    } else if a <= -std::f32::consts::PI {
        a += std::f32::consts::TAU;
    }
    a
}

/// Heading (radians) of the direction from `from` to `to` on the x/y plane.
///
/// Returns 0.0 when the two points coincide on the plane.
#[must_use]
pub fn heading_between(from: Vec3, to: Vec3) -> f32 {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    if dx == 0.0 && dy == 0.0 {
        0.0
    } else {
        dy.atan2(dx)
    }
}

/// Unit vector on the x/y plane for a heading in radians.
#[must_use]
pub fn heading_vector(heading: f32) -> Vec3 {
    Vec3::new(heading.cos(), heading.sin(), 0.0)
}

/// Rotate `current` toward `desired` by at most `max_delta` radians,
/// taking the shortest arc.
#[must_use]
pub fn turn_toward(current: f32, desired: f32, max_delta: f32) -> f32 {
    let diff = wrap_angle(desired - current);
    if diff.abs() <= max_delta {
        wrap_angle(desired)
    } else {
        wrap_angle(current + max_delta.copysign(diff))
    }
}

/// Distance between two points on the x/y plane.
#[must_use]
pub fn flat_distance(a: Vec3, b: Vec3) -> f32 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    (dx * dx + dy * dy).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_wrap_angle_range() {
        assert!(approx(wrap_angle(0.0), 0.0));
        assert!(approx(wrap_angle(3.0 * PI), PI));
        assert!(approx(wrap_angle(-3.0 * PI), PI));
        assert!(approx(wrap_angle(PI + 0.1), -PI + 0.1));
    }

    #[test]
    fn test_heading_between_axes() {
        let origin = Vec3::ZERO;
        assert!(approx(heading_between(origin, Vec3::new(5.0, 0.0, 0.0)), 0.0));
        assert!(approx(
            heading_between(origin, Vec3::new(0.0, 3.0, 0.0)),
            FRAC_PI_2
        ));
        assert!(approx(heading_between(origin, Vec3::new(-2.0, 0.0, 0.0)), PI));
    }

    #[test]
    fn test_heading_between_ignores_height() {
        let a = Vec3::new(0.0, 0.0, 10.0);
        let b = Vec3::new(4.0, 0.0, -3.0);
        assert!(approx(heading_between(a, b), 0.0));
    }

    #[test]
    fn test_turn_toward_clamps() {
        // A quarter turn requested, but only 0.1 rad allowed.
        let turned = turn_toward(0.0, FRAC_PI_2, 0.1);
        assert!(approx(turned, 0.1));
    }

    #[test]
    fn test_turn_toward_reaches_goal() {
        let turned = turn_toward(0.0, 0.3, 1.0);
        assert!(approx(turned, 0.3));
    }

    #[test]
    fn test_turn_toward_shortest_arc() {
        // From -3.0 rad to 3.0 rad the short way crosses PI (about 0.283 rad),
        // so a 0.5 rad budget reaches the goal directly.
        assert!(approx(turn_toward(-3.0, 3.0, 0.5), 3.0));
        // With a 0.1 rad budget the step goes further negative, through PI.
        assert!(approx(turn_toward(-3.0, 3.0, 0.1), -3.1));
    }

    #[test]
    fn test_flat_distance() {
        let a = Vec3::new(0.0, 3.0, 7.0);
        let b = Vec3::new(4.0, 0.0, -2.0);
        assert!(approx(flat_distance(a, b), 5.0));
    }
}
