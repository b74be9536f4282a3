//! Scalar helpers shared by the vector type and the steering code.

use std::f64::consts::{PI, TAU};

/// Linear map of `x` from `[start1, end1]` onto `[start2, end2]`.
///
/// Inputs outside the source range extrapolate; nothing is clamped.
#[inline]
pub fn map_range(x: f64, start1: f64, end1: f64, start2: f64, end2: f64) -> f64 {
    start2 + (x - start1) * (end2 - start2) / (end1 - start1)
}

/// Clamp `x` into the range spanned by `a` and `b`, whichever is larger.
#[inline]
pub fn constrain(x: f64, a: f64, b: f64) -> f64 {
    let (lo, hi) = if a > b { (b, a) } else { (a, b) };
    if x < lo {
        lo
    } else if x > hi {
        hi
    } else {
        x
    }
}

/// -1, 0 or 1. NaN maps to 0.
#[inline]
pub fn sign(x: f64) -> i8 {
    if x > 0.0 {
        1
    } else if x < 0.0 {
        -1
    } else {
        0
    }
}

/// Wrap an angle into `(-PI, PI]`
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped == -PI {
        PI
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_range_extrapolates() {
        assert_eq!(map_range(100.0, 0.0, 200.0, 0.0, 5.0), 2.5);
        assert_eq!(map_range(400.0, 0.0, 200.0, 0.0, 5.0), 10.0);
        assert_eq!(map_range(0.5, 0.0, 1.0, 10.0, 20.0), 15.0);
    }

    #[test]
    fn test_constrain() {
        assert_eq!(constrain(5.0, 0.0, 10.0), 5.0);
        assert_eq!(constrain(-1.0, 0.0, 10.0), 0.0);
        assert_eq!(constrain(11.0, 10.0, 0.0), 10.0);
    }

    #[test]
    fn test_sign() {
        assert_eq!(sign(3.2), 1);
        assert_eq!(sign(-0.1), -1);
        assert_eq!(sign(0.0), 0);
        assert_eq!(sign(f64::NAN), 0);
    }

    #[test]
    fn test_wrap_angle() {
        assert!((wrap_angle(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-12);
        assert!((wrap_angle(-3.0 * PI / 2.0) - PI / 2.0).abs() < 1e-12);
        assert_eq!(wrap_angle(-PI), PI);
        assert!((wrap_angle(0.25) - 0.25).abs() < 1e-12);
    }
}
