//! [`InputSource`] – one [`InputFrame`] per tick from exactly one source.
//!
//! When the breath sensor is connected it drives forward motion and sprint
//! and the manual controls are ignored for that tick.  Otherwise the manual
//! controls pass through unchanged, unless the fallback has been switched
//! off, in which case the frame is neutral.

use ascent_types::{InputFrame, InputOrigin, SensorReading};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Discrete keyboard / gamepad state for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ManualInput {
    pub move_x: f32,
    pub move_y: f32,
    pub jump: bool,
    pub sprint: bool,
}

impl ManualInput {
    /// Hold forward.
    pub fn forward() -> Self {
        Self {
            move_y: 1.0,
            ..Self::default()
        }
    }
}

/// Selects and converts the active input source.
#[derive(Debug, Clone)]
pub struct InputSource {
    fallback_enabled: bool,
    last_origin: Option<InputOrigin>,
}

impl Default for InputSource {
    fn default() -> Self {
        Self::new(true)
    }
}

impl InputSource {
    pub fn new(fallback_enabled: bool) -> Self {
        Self {
            fallback_enabled,
            last_origin: None,
        }
    }

    pub fn fallback_enabled(&self) -> bool {
        self.fallback_enabled
    }

    pub fn set_fallback_enabled(&mut self, enabled: bool) {
        self.fallback_enabled = enabled;
    }

    /// Build this tick's frame.
    pub fn sample(&mut self, reading: &SensorReading, manual: &ManualInput) -> InputFrame {
        let frame = if reading.connected {
            InputFrame {
                move_x: 0.0,
                move_y: reading.normalized,
                jump: false,
                sprint: reading.sprint,
                origin: InputOrigin::Sensor,
            }
        } else if self.fallback_enabled {
            InputFrame {
                move_x: manual.move_x,
                move_y: manual.move_y,
                jump: manual.jump,
                sprint: manual.sprint,
                origin: InputOrigin::Manual,
            }
        } else {
            InputFrame::neutral(InputOrigin::Manual)
        };

        if self.last_origin != Some(frame.origin) {
            debug!(origin = ?frame.origin, "input source switched");
            self.last_origin = Some(frame.origin);
        }
        frame
    }
}
