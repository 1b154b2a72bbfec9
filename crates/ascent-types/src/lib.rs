use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest raw flow value the device can plausibly report (L/min).
pub const MAX_PLAUSIBLE_FLOW: f32 = 90_000.0;

/// Normalized flow above which the climber is considered to be breathing
/// into the device.
pub const FLOW_PRESENCE_THRESHOLD: f32 = 0.05;

/// Fraction of the configured maximum flow above which the sensor signals
/// a sprint.
pub const SPRINT_FLOW_FRACTION: f32 = 0.7;

/// A 3-D vector in world space (Y up, Z forward).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    pub const UP: Self = Self::new(0.0, 1.0, 0.0);
    pub const FORWARD: Self = Self::new(0.0, 0.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Unit vector pointing along a heading of `yaw_deg` degrees, measured
    /// clockwise from +Z when viewed from above.
    pub fn from_yaw(yaw_deg: f32) -> Self {
        let rad = yaw_deg.to_radians();
        Self::new(rad.sin(), 0.0, rad.cos())
    }

    /// Heading (degrees, `[0, 360)`) of the horizontal part of this vector.
    pub fn yaw_deg(self) -> f32 {
        self.x.atan2(self.z).to_degrees().rem_euclid(360.0)
    }

    pub fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }

    pub fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }

    pub fn scale(self, k: f32) -> Self {
        Self::new(self.x * k, self.y * k, self.z * k)
    }

    pub fn neg(self) -> Self {
        self.scale(-1.0)
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn distance(self, other: Self) -> f32 {
        self.sub(other).length()
    }

    /// Unit-length copy, or [`Vec3::ZERO`] for a (near) zero vector.
    pub fn normalized(self) -> Self {
        let len = self.length();
        if len <= f32::EPSILON {
            Self::ZERO
        } else {
            self.scale(1.0 / len)
        }
    }
}

/// Shortest signed difference `target - current` between two headings, in
/// degrees, within `(-180, 180]`.
pub fn delta_angle(current: f32, target: f32) -> f32 {
    let mut delta = (target - current).rem_euclid(360.0);
    if delta > 180.0 {
        delta -= 360.0;
    }
    delta
}

/// Handle identifying the controllable character a signal is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ActorId(pub u32);

/// The locomotion mode of the character.  Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LocomotionState {
    #[default]
    Walking,
    Climbing,
    /// Terminal success state entered on goal completion.
    Celebrating,
    /// Terminal failure state: falling, then a level reset.
    Frozen,
}

impl LocomotionState {
    /// `true` for the states that can only be left through a level reset.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Celebrating | Self::Frozen)
    }
}

impl std::fmt::Display for LocomotionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Walking => write!(f, "walking"),
            Self::Climbing => write!(f, "climbing"),
            Self::Celebrating => write!(f, "celebrating"),
            Self::Frozen => write!(f, "frozen"),
        }
    }
}

/// Which source produced an [`InputFrame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InputOrigin {
    /// Derived from the breath-flow sensor.
    Sensor,
    /// Passed through from the manual (keyboard / gamepad) fallback.
    #[default]
    Manual,
}

/// Unified motion command for one tick.
///
/// A frame is built from exactly one source; sensor and manual values are
/// never mixed.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct InputFrame {
    /// Strafe axis in `[-1, 1]`.
    pub move_x: f32,
    /// Forward axis in `[-1, 1]`.  For sensor frames this is the normalized
    /// flow in `[0, 1]`.
    pub move_y: f32,
    pub jump: bool,
    pub sprint: bool,
    pub origin: InputOrigin,
}

impl InputFrame {
    /// A frame that requests no motion.
    pub fn neutral(origin: InputOrigin) -> Self {
        Self {
            origin,
            ..Self::default()
        }
    }

    pub fn is_moving(&self) -> bool {
        self.move_x != 0.0 || self.move_y != 0.0
    }

    pub fn move_magnitude(&self) -> f32 {
        (self.move_x * self.move_x + self.move_y * self.move_y).sqrt()
    }

    pub fn from_sensor(&self) -> bool {
        self.origin == InputOrigin::Sensor
    }
}

/// Snapshot of the breath-flow sensor, as seen by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SensorReading {
    /// Last accepted raw flow in L/min.
    pub raw_flow: f32,
    /// Flow mapped to `[0, 1]` between the configured thresholds.
    pub normalized: f32,
    pub connected: bool,
    pub sprint: bool,
    /// Wall-clock time of the last accepted line, if any.
    pub received_at: Option<DateTime<Utc>>,
}

/// Single-character commands understood by the spirometer firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceCommand {
    StartTest,
    PauseTest,
    ResetTest,
}

impl DeviceCommand {
    /// ASCII code sent on the wire.
    pub fn code(self) -> char {
        match self {
            Self::StartTest => 'i',
            Self::PauseTest => 'p',
            Self::ResetTest => 'r',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'i' => Some(Self::StartTest),
            'p' => Some(Self::PauseTest),
            'r' => Some(Self::ResetTest),
            _ => None,
        }
    }
}

impl std::fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Named animation parameters written by the locomotion core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AnimParam {
    Speed,
    Grounded,
    Jump,
    FreeFall,
    MotionSpeed,
    Climbing,
    Celebrate,
}

impl AnimParam {
    /// Parameter name as exposed by the animation rig.
    pub fn name(self) -> &'static str {
        match self {
            Self::Speed => "Speed",
            Self::Grounded => "Grounded",
            Self::Jump => "Jump",
            Self::FreeFall => "FreeFall",
            Self::MotionSpeed => "MotionSpeed",
            Self::Climbing => "Climbing",
            Self::Celebrate => "Celebrate",
        }
    }
}

/// Error type spanning device I/O, input parsing, and locomotion guards.
///
/// None of these is fatal: device errors are folded into connectivity
/// flags and the rest are logged and recovered locally.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AscentError {
    #[error("Device unavailable on {device}: {details}")]
    DeviceUnavailable { device: String, details: String },

    #[error("Malformed reading: {0}")]
    MalformedReading(String),

    #[error("Device read timed out")]
    ReadTimeout,

    #[error("Failed to send command '{command}': {details}")]
    CommandSendFailure {
        command: DeviceCommand,
        details: String,
    },

    #[error("Goal signal already consumed")]
    DuplicateGoalSignal,

    #[error("External drift of {distance:.4} m / {angle_deg:.2} deg during celebration")]
    ExternalDrift { distance: f32, angle_deg: f32 },

    #[error("Configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaw_roundtrips_through_direction() {
        for yaw in [0.0_f32, 45.0, 90.0, 180.0, 270.0] {
            let back = Vec3::from_yaw(yaw).yaw_deg();
            assert!((back - yaw).abs() < 1e-3, "yaw {yaw} came back as {back}");
        }
    }

    #[test]
    fn normalized_zero_vector_stays_zero() {
        assert_eq!(Vec3::ZERO.normalized(), Vec3::ZERO);
        let n = Vec3::new(3.0, 0.0, 4.0).normalized();
        assert!((n.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn delta_angle_wraps_the_short_way() {
        assert_eq!(delta_angle(350.0, 10.0), 20.0);
        assert_eq!(delta_angle(10.0, 350.0), -20.0);
        assert_eq!(delta_angle(0.0, 180.0), 180.0);
        assert_eq!(delta_angle(90.0, 90.0), 0.0);
    }

    #[test]
    fn device_command_codes() {
        assert_eq!(DeviceCommand::StartTest.code(), 'i');
        assert_eq!(DeviceCommand::PauseTest.code(), 'p');
        assert_eq!(DeviceCommand::ResetTest.code(), 'r');
        assert_eq!(DeviceCommand::from_code('r'), Some(DeviceCommand::ResetTest));
        assert_eq!(DeviceCommand::from_code('x'), None);
    }

    #[test]
    fn terminal_states() {
        assert!(!LocomotionState::Walking.is_terminal());
        assert!(!LocomotionState::Climbing.is_terminal());
        assert!(LocomotionState::Celebrating.is_terminal());
        assert!(LocomotionState::Frozen.is_terminal());
    }

    #[test]
    fn input_frame_serializes_with_origin() {
        let frame = InputFrame {
            move_y: 0.5,
            origin: InputOrigin::Sensor,
            ..InputFrame::default()
        };
        let json = serde_json::to_string(&frame).unwrap();
        let back: InputFrame = serde_json::from_str(&json).unwrap();
        assert_eq!(back, frame);
        assert!(back.from_sensor());
    }

    #[test]
    fn ascent_error_display() {
        let err = AscentError::DeviceUnavailable {
            device: "/dev/ttyUSB0".to_string(),
            details: "no such file".to_string(),
        };
        assert!(err.to_string().contains("/dev/ttyUSB0"));

        let err = AscentError::CommandSendFailure {
            command: DeviceCommand::PauseTest,
            details: "broken pipe".to_string(),
        };
        assert!(err.to_string().contains("'p'"));
    }
}
