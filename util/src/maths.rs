//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::{Float, FloatConst};

/// Linearly interpolate between `a` and `b` by the fraction `t`.
pub fn lerp<T>(a: T, b: T, t: T) -> T
where
    T: Float
{
    a + (b - a) * t
}

/// Clamp `value` into the range `[min, max]`.
pub fn clamp<T>(value: T, min: T, max: T) -> T 
where
    T: Float
{
    let mut ret = value;

    if ret > max {
        ret = max
    }
    if ret < min {
        ret = min
    }

    ret
}

/// Limit the magnitude of `value` to `max_abs`, preserving its sign.
pub fn limit_magnitude<T>(value: T, max_abs: T) -> T
where
    T: Float
{
    if value.abs() > max_abs {
        max_abs * value.signum()
    }
    else {
        value
    }
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
/// 
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()`, violating the mathematical definition, if
/// `self` is much smaller than `rhs.abs()` in magnitude and `self < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

/// Wrap `value` into the range `[min, max)`.
///
/// Used for continuous inputs such as angles, where `min` and `max` describe the same point.
pub fn input_modulus<T>(value: T, min: T, max: T) -> T
where
    T: Float
{
    let wrapped = min + rem_euclid(value - min, max - min);

    // Round-off in rem_euclid can land exactly on max
    if wrapped >= max { min } else { wrapped }
}

/// Wrap an angle into the canonical range `[-pi, pi)`.
pub fn wrap_pi<T>(angle: T) -> T
where
    T: Float + FloatConst
{
    input_modulus(angle, -T::PI(), T::PI())
}

/// Get the shortest signed angular distance from `b` to `a`, i.e. `a - b` wrapped into 
/// `[-pi, pi)`.
pub fn get_ang_dist_pi<T>(a: T, b: T) -> T
where
    T: Float + FloatConst
{
    wrap_pi(a - b)
}

#[cfg(test)]
mod test {
    use super::*;

    const PI: f64 = std::f64::consts::PI;
    const TAU: f64 = std::f64::consts::TAU;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_wrap_pi() {
        assert!(approx(wrap_pi(0f64), 0f64));
        assert!(approx(wrap_pi(PI), -PI));
        assert!(approx(wrap_pi(-PI), -PI));
        assert!(approx(wrap_pi(TAU + 1.0), 1.0));
        assert!(approx(wrap_pi(-TAU - 1.0), -1.0));
        assert!(approx(wrap_pi(190f64.to_radians()), (-170f64).to_radians()));
    }

    #[test]
    fn test_get_ang_dist_pi() {
        assert!(approx(get_ang_dist_pi(1f64, 2f64), -1f64));
        assert!(approx(get_ang_dist_pi(2f64, 1f64), 1f64));
        assert!(approx(get_ang_dist_pi(0f64, TAU), 0f64));
        assert!(approx(get_ang_dist_pi(TAU - 1f64, 1f64), -2f64));
        assert!(approx(
            get_ang_dist_pi(179f64.to_radians(), (-179f64).to_radians()), 
            (-2f64).to_radians()
        ));
    }

    #[test]
    fn test_limit_magnitude() {
        assert_eq!(limit_magnitude(5.0, 2.0), 2.0);
        assert_eq!(limit_magnitude(-5.0, 2.0), -2.0);
        assert_eq!(limit_magnitude(1.5, 2.0), 1.5);
        assert_eq!(clamp(3.0, -1.0, 1.0), 1.0);
        assert_eq!(lerp(2.0, 4.0, 0.25), 2.5);
    }
}
