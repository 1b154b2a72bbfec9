//! Tuning for the locomotion state machine.
//!
//! Every field has a named default so that partial TOML tables deserialize
//! cleanly.  All speeds are in m/s, all durations in seconds.

use ascent_types::AscentError;
use serde::{Deserialize, Serialize};

/// Tuning for [`LocomotionStateMachine`][crate::locomotion::LocomotionStateMachine].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocomotionConfig {
    // ── Sensor-driven walking ──────────────────────────────────────────────
    /// Walking speed at the lowest flow that counts as breathing.
    #[serde(default = "default_min_flow_speed")]
    pub min_flow_speed: f32,
    /// Walking speed at full flow.
    #[serde(default = "default_max_flow_speed")]
    pub max_flow_speed: f32,
    /// Seconds without flow on a wall before the climber falls.
    #[serde(default = "default_flow_timeout")]
    pub flow_timeout: f32,

    // ── Manual walking ─────────────────────────────────────────────────────
    #[serde(default = "default_walk_speed")]
    pub walk_speed: f32,
    #[serde(default = "default_sprint_speed")]
    pub sprint_speed: f32,

    // ── Blending ───────────────────────────────────────────────────────────
    #[serde(default = "default_rotation_smooth_time")]
    pub rotation_smooth_time: f32,
    #[serde(default = "default_speed_change_rate")]
    pub speed_change_rate: f32,
    /// Scale manual walking speed by stick deflection instead of treating
    /// any deflection as full input.
    #[serde(default)]
    pub analog_movement: bool,

    // ── Climbing ───────────────────────────────────────────────────────────
    #[serde(default = "default_max_climb_duration")]
    pub max_climb_duration: f32,
    /// Reach of the forward probe that looks for climbable walls.
    #[serde(default = "default_climb_probe_distance")]
    pub climb_probe_distance: f32,
    /// Height above the feet the forward probe starts from.
    #[serde(default = "default_climb_probe_height")]
    pub climb_probe_height: f32,

    // ── Jumping and gravity ────────────────────────────────────────────────
    #[serde(default = "default_jump_height")]
    pub jump_height: f32,
    /// Gravity acceleration, negative is down.
    #[serde(default = "default_gravity")]
    pub gravity: f32,
    /// Cooldown after landing before another jump is accepted.
    #[serde(default = "default_jump_timeout")]
    pub jump_timeout: f32,
    /// Airborne time before the free-fall signal is raised.
    #[serde(default = "default_fall_timeout")]
    pub fall_timeout: f32,
    /// Largest downward speed gravity can build up.
    #[serde(default = "default_terminal_velocity")]
    pub terminal_velocity: f32,

    // ── Terminal sequences ─────────────────────────────────────────────────
    #[serde(default = "default_fall_sequence_duration")]
    pub fall_sequence_duration: f32,
    /// Pause between the end of the fall and the level reset.
    #[serde(default = "default_fall_hold_duration")]
    pub fall_hold_duration: f32,
    #[serde(default = "default_celebrate_trigger_delay")]
    pub celebrate_trigger_delay: f32,
    #[serde(default = "default_celebration_duration")]
    pub celebration_duration: f32,
}

fn default_min_flow_speed() -> f32 {
    0.5
}
fn default_max_flow_speed() -> f32 {
    5.0
}
fn default_flow_timeout() -> f32 {
    2.0
}
fn default_walk_speed() -> f32 {
    2.0
}
fn default_sprint_speed() -> f32 {
    5.335
}
fn default_rotation_smooth_time() -> f32 {
    0.12
}
fn default_speed_change_rate() -> f32 {
    10.0
}
fn default_max_climb_duration() -> f32 {
    10.0
}
fn default_climb_probe_distance() -> f32 {
    1.5
}
fn default_climb_probe_height() -> f32 {
    1.0
}
fn default_jump_height() -> f32 {
    1.2
}
fn default_gravity() -> f32 {
    -15.0
}
fn default_jump_timeout() -> f32 {
    0.5
}
fn default_fall_timeout() -> f32 {
    0.15
}
fn default_terminal_velocity() -> f32 {
    53.0
}
fn default_fall_sequence_duration() -> f32 {
    5.0
}
fn default_fall_hold_duration() -> f32 {
    1.0
}
fn default_celebrate_trigger_delay() -> f32 {
    0.1
}
fn default_celebration_duration() -> f32 {
    5.0
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            min_flow_speed: default_min_flow_speed(),
            max_flow_speed: default_max_flow_speed(),
            flow_timeout: default_flow_timeout(),
            walk_speed: default_walk_speed(),
            sprint_speed: default_sprint_speed(),
            rotation_smooth_time: default_rotation_smooth_time(),
            speed_change_rate: default_speed_change_rate(),
            analog_movement: false,
            max_climb_duration: default_max_climb_duration(),
            climb_probe_distance: default_climb_probe_distance(),
            climb_probe_height: default_climb_probe_height(),
            jump_height: default_jump_height(),
            gravity: default_gravity(),
            jump_timeout: default_jump_timeout(),
            fall_timeout: default_fall_timeout(),
            terminal_velocity: default_terminal_velocity(),
            fall_sequence_duration: default_fall_sequence_duration(),
            fall_hold_duration: default_fall_hold_duration(),
            celebrate_trigger_delay: default_celebrate_trigger_delay(),
            celebration_duration: default_celebration_duration(),
        }
    }
}

impl LocomotionConfig {
    /// Reject values the integrator cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`AscentError::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<(), AscentError> {
        let non_negative = [
            ("min_flow_speed", self.min_flow_speed),
            ("walk_speed", self.walk_speed),
            ("sprint_speed", self.sprint_speed),
            ("flow_timeout", self.flow_timeout),
            ("climb_probe_distance", self.climb_probe_distance),
            ("jump_height", self.jump_height),
            ("jump_timeout", self.jump_timeout),
            ("fall_timeout", self.fall_timeout),
            ("fall_sequence_duration", self.fall_sequence_duration),
            ("fall_hold_duration", self.fall_hold_duration),
            ("celebrate_trigger_delay", self.celebrate_trigger_delay),
            ("celebration_duration", self.celebration_duration),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(AscentError::Config(format!(
                    "{name} must be a finite non-negative number, got {value}"
                )));
            }
        }

        let positive = [
            ("rotation_smooth_time", self.rotation_smooth_time),
            ("speed_change_rate", self.speed_change_rate),
            ("max_climb_duration", self.max_climb_duration),
            ("terminal_velocity", self.terminal_velocity),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(AscentError::Config(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }

        if self.max_flow_speed < self.min_flow_speed {
            return Err(AscentError::Config(format!(
                "max_flow_speed ({}) is below min_flow_speed ({})",
                self.max_flow_speed, self.min_flow_speed
            )));
        }
        if self.gravity.is_nan() || self.gravity >= 0.0 {
            return Err(AscentError::Config(format!(
                "gravity must point down (negative), got {}",
                self.gravity
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(LocomotionConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: LocomotionConfig = serde_json::from_str(r#"{"walk_speed": 3.0}"#).unwrap();
        assert_eq!(cfg.walk_speed, 3.0);
        assert_eq!(cfg.sprint_speed, 5.335);
        assert_eq!(cfg.max_climb_duration, 10.0);
    }

    #[test]
    fn inverted_flow_speeds_rejected() {
        let cfg = LocomotionConfig {
            min_flow_speed: 4.0,
            max_flow_speed: 1.0,
            ..LocomotionConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(AscentError::Config(_))));
    }

    #[test]
    fn upward_gravity_rejected() {
        let cfg = LocomotionConfig {
            gravity: 9.81,
            ..LocomotionConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("gravity"));
    }

    #[test]
    fn zero_smooth_time_rejected() {
        let cfg = LocomotionConfig {
            rotation_smooth_time: 0.0,
            ..LocomotionConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
