//! Distance-field helpers
//!
//! Small pure functions shared by the tile field, impacts and paging.

use glam::Vec2;

/// Euclidean distance between two points
#[inline]
pub fn distance(a: Vec2, b: Vec2) -> f32 {
    (a - b).length()
}

/// Linear interpolation, `(1 - t) * a + t * b`
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    (1.0 - t) * a + t * b
}

/// Linear falloff from 1 at the origin to 0 at `radius`, clamped at 0
#[inline]
pub fn linear_falloff(d: f32, radius: f32) -> f32 {
    if radius <= 0.0 {
        return 0.0;
    }
    (1.0 - d / radius).max(0.0)
}

/// Linear falloff shaped by `exponent`; exponents below 1 lift the mid-range
#[inline]
pub fn smoothed_falloff(d: f32, radius: f32, exponent: f32) -> f32 {
    linear_falloff(d, radius).powf(exponent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance() {
        assert_eq!(distance(Vec2::new(0.0, 0.0), Vec2::new(3.0, 4.0)), 5.0);
    }

    #[test]
    fn test_lerp() {
        assert!((lerp(0.0, 100.0, 0.12) - 12.0).abs() < 1e-4);
        assert!((lerp(5.0, 5.0, 0.7) - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_falloff_bounds() {
        assert_eq!(linear_falloff(0.0, 100.0), 1.0);
        assert_eq!(linear_falloff(100.0, 100.0), 0.0);
        assert_eq!(linear_falloff(250.0, 100.0), 0.0);
        assert_eq!(linear_falloff(10.0, 0.0), 0.0);
    }

    #[test]
    fn test_smoothed_falloff_boosts_midrange() {
        let linear = linear_falloff(50.0, 100.0);
        let smoothed = smoothed_falloff(50.0, 100.0, 0.95);
        assert!(smoothed > linear);
        assert!(smoothed < 1.0);
    }
}
