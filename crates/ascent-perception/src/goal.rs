//! Goal notification.
//!
//! The locomotion core exposes a single idempotent entry point for reaching
//! the goal.  Whatever decides that the goal was reached implements
//! [`GoalNotifier`]; [`SummitZone`] is the dwell-time trigger volume used by
//! the CLI course.

use ascent_types::{ActorId, Vec3};
use tracing::{debug, info};

use crate::shape::Aabb;

/// Default time an actor must stay inside a [`SummitZone`] (seconds).
pub const DEFAULT_ACTIVATION_DELAY: f32 = 0.5;

/// Decides, once per tick, whether an actor has reached the goal.
pub trait GoalNotifier: Send {
    /// Observe `actor` at `position` after `dt` seconds.  Returns the actor
    /// to notify when the goal criterion is met.
    fn poll(&mut self, actor: ActorId, position: Vec3, dt: f32) -> Option<ActorId>;
}

/// Box-shaped goal that fires once an actor has dwelt inside it long enough.
///
/// Leaving the box before the delay elapses resets the dwell timer.  After
/// firing the zone is latched until [`reset`][Self::reset].
#[derive(Debug, Clone)]
pub struct SummitZone {
    bounds: Aabb,
    activation_delay: f32,
    time_in_zone: f32,
    occupant: Option<ActorId>,
    reached: bool,
}

impl SummitZone {
    pub fn new(bounds: Aabb) -> Self {
        Self {
            bounds,
            activation_delay: DEFAULT_ACTIVATION_DELAY,
            time_in_zone: 0.0,
            occupant: None,
            reached: false,
        }
    }

    pub fn with_activation_delay(mut self, seconds: f32) -> Self {
        self.activation_delay = seconds.max(0.0);
        self
    }

    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    pub fn is_reached(&self) -> bool {
        self.reached
    }

    pub fn time_in_zone(&self) -> f32 {
        self.time_in_zone
    }

    pub fn reset(&mut self) {
        self.reached = false;
        self.time_in_zone = 0.0;
        self.occupant = None;
    }
}

impl GoalNotifier for SummitZone {
    fn poll(&mut self, actor: ActorId, position: Vec3, dt: f32) -> Option<ActorId> {
        if self.reached {
            return None;
        }

        if !self.bounds.contains_point(position) {
            if self.occupant.take().is_some() {
                debug!(actor = actor.0, dwell = self.time_in_zone, "actor left summit zone");
            }
            self.time_in_zone = 0.0;
            return None;
        }

        if self.occupant != Some(actor) {
            debug!(actor = actor.0, "actor entered summit zone");
            self.occupant = Some(actor);
            self.time_in_zone = 0.0;
            return None;
        }

        self.time_in_zone += dt;
        if self.time_in_zone >= self.activation_delay {
            self.reached = true;
            info!(actor = actor.0, dwell = self.time_in_zone, "summit reached");
            return Some(actor);
        }
        None
    }
}
