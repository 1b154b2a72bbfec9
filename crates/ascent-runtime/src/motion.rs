//! Motion math shared by the locomotion states.
//!
//! # Example
//!
//! ```rust
//! use ascent_runtime::motion::{blend_speed, jump_velocity};
//!
//! // Inside the dead-band the target is taken as is.
//! assert_eq!(blend_speed(1.95, 2.0, 1.0, 0.016, 10.0), 2.0);
//! // Jumping 1.2 m under -15 m/s² needs 6 m/s.
//! assert!((jump_velocity(1.2, -15.0) - 6.0).abs() < 1e-5);
//! ```

use ascent_types::delta_angle;

/// Speed difference below which the target speed is adopted directly.
pub const SPEED_DEAD_BAND: f32 = 0.1;

/// Animation blend values below this snap to zero.
pub const BLEND_SNAP: f32 = 0.01;

/// Linear interpolation with `t` clamped to `[0, 1]`.
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t.clamp(0.0, 1.0)
}

/// Round to three decimal places.
pub fn round3(value: f32) -> f32 {
    (value * 1000.0).round() / 1000.0
}

/// Rate-limited approach of `current` toward `target`.
///
/// Outside the dead-band the speed moves toward `target * magnitude` by a
/// fraction `dt * rate` and is rounded to three decimals; inside it the
/// target is adopted.
pub fn blend_speed(current: f32, target: f32, magnitude: f32, dt: f32, rate: f32) -> f32 {
    if current < target - SPEED_DEAD_BAND || current > target + SPEED_DEAD_BAND {
        round3(lerp(current, target * magnitude, dt * rate))
    } else {
        target
    }
}

/// Approach `target` for an animation blend value, snapping tiny values to
/// zero.
pub fn blend_animation(current: f32, target: f32, dt: f32, rate: f32) -> f32 {
    let blended = lerp(current, target, dt * rate);
    if blended < BLEND_SNAP { 0.0 } else { blended }
}

/// Critically damped approach of `current` toward `target`.
///
/// `velocity` carries state between calls.  The result never overshoots the
/// target.
pub fn smooth_damp(current: f32, target: f32, velocity: &mut f32, smooth_time: f32, dt: f32) -> f32 {
    if dt <= 0.0 {
        return current;
    }
    let smooth_time = smooth_time.max(1e-4);
    let omega = 2.0 / smooth_time;
    let x = omega * dt;
    let decay = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);

    let change = current - target;
    let temp = (*velocity + omega * change) * dt;
    *velocity = (*velocity - omega * temp) * decay;
    let mut output = target + (change + temp) * decay;

    if (target - current > 0.0) == (output > target) {
        output = target;
        *velocity = 0.0;
    }
    output
}

/// [`smooth_damp`] for headings in degrees, taking the short way around.
/// The result is wrapped to `[0, 360)`.
pub fn smooth_damp_angle(
    current: f32,
    target: f32,
    velocity: &mut f32,
    smooth_time: f32,
    dt: f32,
) -> f32 {
    let unwrapped_target = current + delta_angle(current, target);
    smooth_damp(current, unwrapped_target, velocity, smooth_time, dt).rem_euclid(360.0)
}

/// Take-off speed needed to reach `height` under `gravity` (negative).
pub fn jump_velocity(height: f32, gravity: f32) -> f32 {
    (height * -2.0 * gravity).max(0.0).sqrt()
}

/// Integrate gravity into a vertical velocity, capping the fall speed at
/// `terminal_velocity`.
pub fn apply_gravity(vertical_velocity: f32, gravity: f32, dt: f32, terminal_velocity: f32) -> f32 {
    (vertical_velocity + gravity * dt).max(-terminal_velocity)
}
