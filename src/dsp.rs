//! Scalar numeric primitives used throughout the hot audio path.
//!
//! Everything here is a pure function over `f32`: no allocation, no I/O,
//! safe to call from the real-time callback thread.

/// Linear interpolation between `a` and `b` at `s` (not clamped to `[0, 1]`).
#[inline]
pub fn lerp(a: f32, b: f32, s: f32) -> f32 {
    a + (b - a) * s
}

/// Clamp `x` into `[lo, hi]`.
#[inline]
pub fn clamp(lo: f32, x: f32, hi: f32) -> f32 {
    x.max(lo).min(hi)
}

/// Applies `gain` to `x` with a smooth ceiling so the result never leaves
/// `[-1, 1]` for `x` in that range and `gain` in `[0, 2]`.
///
/// For `gain <= 1` this is a plain scale. Above 1 it blends the identity
/// with `f(|x|) = |x| * (2 - |x|)`, a curve that maps `[0, 1] -> [0, 1]`
/// monotonically while flattening out near the ceiling instead of
/// hard-clipping.
#[inline]
pub fn soft_limit_gain(x: f32, gain: f32) -> f32 {
    if gain <= 1.0 {
        return gain * x;
    }
    let blend = gain.min(2.0) - 1.0;
    let abs_x = x.abs();
    let folded = abs_x * (2.0 - abs_x);
    let magnitude = lerp(abs_x, folded, blend);
    magnitude.copysign(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_gain_is_identity() {
        for i in 0..=20 {
            let x = -1.0 + i as f32 / 10.0;
            assert_eq!(soft_limit_gain(x, 1.0), x);
        }
    }

    #[test]
    fn below_unity_gain_scales_linearly() {
        assert_eq!(soft_limit_gain(0.5, 0.5), 0.25);
        assert_eq!(soft_limit_gain(-0.5, 0.5), -0.25);
        assert_eq!(soft_limit_gain(0.4, 0.0), 0.0);
    }

    #[test]
    fn endpoints_are_fixed_for_gain_at_least_one() {
        for gain in [1.0, 1.2, 1.5, 1.82, 2.0] {
            assert!((soft_limit_gain(0.0, gain)).abs() < 1e-6);
            assert!((soft_limit_gain(1.0, gain) - 1.0).abs() < 1e-6);
            assert!((soft_limit_gain(-1.0, gain) + 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn never_exceeds_unit_magnitude() {
        let mut x = -1.0;
        while x <= 1.0 {
            let mut gain = 0.0;
            while gain <= 2.0 {
                let y = soft_limit_gain(x, gain);
                assert!(y.abs() <= 1.0 + 1e-6, "x={x} gain={gain} y={y}");
                assert!(!y.is_nan());
                gain += 0.1;
            }
            x += 0.05;
        }
    }

    #[test]
    fn monotone_in_magnitude_over_unit_interval() {
        for gain in [0.5, 1.0, 1.3, 1.82, 2.0] {
            let mut prev = soft_limit_gain(0.0, gain);
            let mut x = 0.01;
            while x <= 1.0 {
                let cur = soft_limit_gain(x, gain);
                assert!(cur > prev, "gain={gain} x={x} prev={prev} cur={cur}");
                prev = cur;
                x += 0.01;
            }
        }
    }

    #[test]
    fn clamp_saturates_both_sides() {
        assert_eq!(clamp(0.0, -1.0, 1.0), 0.0);
        assert_eq!(clamp(0.0, 2.0, 1.0), 1.0);
        assert_eq!(clamp(0.0, 0.5, 1.0), 0.5);
    }

    #[test]
    fn lerp_endpoints() {
        assert_eq!(lerp(1.0, 5.0, 0.0), 1.0);
        assert_eq!(lerp(1.0, 5.0, 1.0), 5.0);
        assert_eq!(lerp(1.0, 5.0, 0.5), 3.0);
    }
}
