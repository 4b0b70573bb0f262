//! # Range Mapping
//!
//! Pure conversions from a normalized stick value to actuator units.
//!
//! All functions are total: any input, including values outside `[-1, 1]`,
//! produces a usable output. Out-of-range values saturate to the nearest
//! bound and NaN is treated as a centred stick.
//!
//! ## Usage
//!
//! ```
//! use padcar::control::range::{motor_speed, servo_angle};
//!
//! assert_eq!(servo_angle(-1.5, 90, 80), 10);
//! assert_eq!(servo_angle(0.5, 90, 80), 130);
//! assert_eq!(motor_speed(0.6, true), -0.6);
//! ```

/// Clamps a stick value to `[-1.0, 1.0]`, mapping NaN to 0.0.
#[inline]
#[must_use]
pub fn saturate(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(-1.0, 1.0)
    }
}

/// Converts a stick value into a servo angle in whole degrees.
///
/// `value` is clamped to `[-1, 1]`, scaled by `max_deflection_degrees` and
/// offset by `center_degrees`, then rounded to the nearest degree.
///
/// # Examples
///
/// ```
/// use padcar::control::range::servo_angle;
///
/// assert_eq!(servo_angle(-1.0, 90, 80), 10);
/// assert_eq!(servo_angle(0.0, 90, 80), 90);
/// assert_eq!(servo_angle(2.0, 90, 80), 170);
/// ```
#[must_use]
pub fn servo_angle(value: f32, center_degrees: i32, max_deflection_degrees: i32) -> i32 {
    let deflection = saturate(value) * max_deflection_degrees as f32;
    (center_degrees as f32 + deflection).round() as i32
}

/// Converts a stick value into a motor speed in `[-1.0, 1.0]`.
///
/// The value is clamped first and negated afterwards when `invert` is set.
/// No rounding is applied.
#[must_use]
pub fn motor_speed(value: f32, invert: bool) -> f32 {
    let speed = saturate(value);
    if invert {
        -speed
    } else {
        speed
    }
}

/// Applies a symmetric deadzone around the stick centre.
///
/// Values within `deadzone` of centre become 0.0; the remaining travel is
/// rescaled so full deflection still reaches ±1.0. A deadzone of 0.0 leaves
/// the value unchanged.
#[must_use]
pub fn apply_deadzone(value: f32, deadzone: f32) -> f32 {
    let value = saturate(value);
    let deadzone = deadzone.clamp(0.0, 0.25);
    let magnitude = value.abs();

    if deadzone == 0.0 {
        value
    } else if magnitude <= deadzone {
        0.0
    } else {
        value.signum() * (magnitude - deadzone) / (1.0 - deadzone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_servo_angle_reference_points() {
        assert_eq!(servo_angle(-1.5, 90, 80), 10);
        assert_eq!(servo_angle(-1.0, 90, 80), 10);
        assert_eq!(servo_angle(0.0, 90, 80), 90);
        assert_eq!(servo_angle(1.0, 90, 80), 170);
        assert_eq!(servo_angle(2.0, 90, 80), 170);
    }

    #[test]
    fn test_servo_angle_rounds_to_nearest_degree() {
        // 0.33 * 80 = 26.4
        assert_eq!(servo_angle(0.33, 90, 80), 116);
        // -0.33 * 80 = -26.4
        assert_eq!(servo_angle(-0.33, 90, 80), 64);
        // just over half a degree rounds up
        assert_eq!(servo_angle(0.0063, 90, 80), 91);
    }

    #[test]
    fn test_servo_angle_is_monotonic() {
        let mut previous = i32::MIN;
        for step in -300..=300 {
            let value = step as f32 / 100.0;
            let angle = servo_angle(value, 90, 80);
            assert!(angle >= previous, "servo_angle decreased at {}", value);
            previous = angle;
        }
    }

    #[test]
    fn test_servo_angle_other_geometry() {
        assert_eq!(servo_angle(-1.0, 100, 45), 55);
        assert_eq!(servo_angle(1.0, 100, 45), 145);
        assert_eq!(servo_angle(0.0, 100, 0), 100);
    }

    #[test]
    fn test_servo_angle_nan_is_centre() {
        assert_eq!(servo_angle(f32::NAN, 90, 80), 90);
    }

    #[test]
    fn test_motor_speed_inversion() {
        assert_eq!(motor_speed(0.6, true), -0.6);
        assert_eq!(motor_speed(0.6, false), 0.6);
        assert_eq!(motor_speed(0.0, true), 0.0);
    }

    #[test]
    fn test_motor_speed_clamps_before_inverting() {
        assert_eq!(motor_speed(-2.0, false), -1.0);
        assert_eq!(motor_speed(-2.0, true), 1.0);
        assert_eq!(motor_speed(5.0, true), -1.0);
        assert_eq!(motor_speed(f32::INFINITY, false), 1.0);
    }

    #[test]
    fn test_motor_speed_is_not_rounded() {
        assert_eq!(motor_speed(0.123_456, false), 0.123_456);
    }

    #[test]
    fn test_deadzone_zero_is_identity() {
        for value in [-1.0, -0.5, -0.01, 0.0, 0.01, 0.5, 1.0] {
            assert_eq!(apply_deadzone(value, 0.0), value);
        }
    }

    #[test]
    fn test_deadzone_filters_centre_jitter() {
        assert_eq!(apply_deadzone(0.04, 0.05), 0.0);
        assert_eq!(apply_deadzone(-0.05, 0.05), 0.0);
        assert!((apply_deadzone(1.0, 0.05) - 1.0).abs() < 0.001);
        assert!((apply_deadzone(-1.0, 0.05) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_deadzone_rescales_remaining_travel() {
        // (0.55 - 0.1) / 0.9 = 0.5
        assert!((apply_deadzone(0.55, 0.1) - 0.5).abs() < 0.001);
        assert!((apply_deadzone(-0.55, 0.1) + 0.5).abs() < 0.001);
    }
}
