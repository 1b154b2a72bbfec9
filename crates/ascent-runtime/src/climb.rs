//! [`ClimbSession`] – state that exists only while the character is on a
//! wall.

use ascent_perception::zone::{ZoneHandle, ZoneHit};
use ascent_types::{FLOW_PRESENCE_THRESHOLD, Vec3};
use uuid::Uuid;

/// One bounded climb of one zone.
#[derive(Debug, Clone, PartialEq)]
pub struct ClimbSession {
    /// Correlates log lines of one climb.
    pub id: Uuid,
    pub zone: ZoneHandle,
    pub climb_speed: f32,
    /// Points from the climber into the wall.
    pub inward_normal: Vec3,
    /// Tick-clock time the session started.
    pub started_at: f64,
    remaining: f32,
}

impl ClimbSession {
    /// Open a session on the zone described by `hit`.
    pub fn start(hit: &ZoneHit, now: f64, max_duration: f32) -> Self {
        Self {
            id: Uuid::new_v4(),
            zone: hit.zone,
            climb_speed: hit.climb_speed,
            inward_normal: hit.surface_normal.neg(),
            started_at: now,
            remaining: max_duration,
        }
    }

    /// Seconds left before the climber falls.
    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    /// Consume `dt` seconds.  Returns `true` once no time is left.
    pub fn advance(&mut self, dt: f32) -> bool {
        self.remaining = (self.remaining - dt).max(0.0);
        self.remaining <= 0.0
    }

    /// Heading that faces the wall.
    pub fn facing_yaw(&self) -> f32 {
        self.inward_normal.yaw_deg()
    }

    /// Vertical input after the dead zone; never negative.
    pub fn effective_input(vertical_input: f32) -> f32 {
        if vertical_input < FLOW_PRESENCE_THRESHOLD {
            0.0
        } else {
            vertical_input
        }
    }

    /// Upward displacement for one tick.
    pub fn vertical_step(&self, vertical_input: f32, dt: f32) -> f32 {
        Self::effective_input(vertical_input) * self.climb_speed * dt
    }
}
