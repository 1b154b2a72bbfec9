//! [`FlowWatchdog`] – sustained-loss-of-flow detector.
//!
//! While the climber is on a wall with the sensor connected, every tick
//! feeds the normalized flow to [`FlowWatchdog::observe`].  Flow above the
//! presence threshold counts as a heartbeat; once no heartbeat has arrived
//! for longer than the timeout the watchdog reports
//! [`ComponentHealth::TimedOut`] and the climb ends in a fall.
//!
//! Silence is accumulated from each tick's delta, so the timeout holds no
//! matter how long the process has been running.

use ascent_types::FLOW_PRESENCE_THRESHOLD;

// ────────────────────────────────────────────────────────────────────────────
// Public types
// ────────────────────────────────────────────────────────────────────────────

/// Health state reported by the watchdog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentHealth {
    /// Flow was present within the timeout, or the watchdog is disarmed.
    Healthy,
    /// No flow for longer than the timeout.
    TimedOut,
}

// ────────────────────────────────────────────────────────────────────────────
// FlowWatchdog
// ────────────────────────────────────────────────────────────────────────────

/// # Example
///
/// ```
/// use ascent_kernel::watchdog::{ComponentHealth, FlowWatchdog};
///
/// let mut wd = FlowWatchdog::new(2.0);
/// wd.arm();
/// assert_eq!(wd.observe(1.0, 0.6), ComponentHealth::Healthy);
/// assert_eq!(wd.observe(1.5, 0.0), ComponentHealth::Healthy);
/// assert_eq!(wd.observe(1.0, 0.0), ComponentHealth::TimedOut);
/// ```
#[derive(Debug, Clone)]
pub struct FlowWatchdog {
    timeout: f32,
    /// Seconds without flow; `None` while disarmed.
    silence: Option<f32>,
}

impl FlowWatchdog {
    /// Create a disarmed watchdog with a `timeout` in seconds.
    pub fn new(timeout: f32) -> Self {
        Self {
            timeout,
            silence: None,
        }
    }

    pub fn timeout(&self) -> f32 {
        self.timeout
    }

    /// Start watching with a fresh heartbeat.
    pub fn arm(&mut self) {
        self.silence = Some(0.0);
    }

    pub fn disarm(&mut self) {
        self.silence = None;
    }

    pub fn is_armed(&self) -> bool {
        self.silence.is_some()
    }

    /// Reset the silence counter.  No-op while disarmed.
    pub fn heartbeat(&mut self) {
        if let Some(silence) = self.silence.as_mut() {
            *silence = 0.0;
        }
    }

    /// Feed one tick of `dt` seconds with its flow sample and return the
    /// resulting health.
    pub fn observe(&mut self, dt: f32, normalized_flow: f32) -> ComponentHealth {
        if normalized_flow > FLOW_PRESENCE_THRESHOLD {
            self.heartbeat();
        } else if let Some(silence) = self.silence.as_mut() {
            *silence += dt.max(0.0);
        }
        self.health()
    }

    pub fn health(&self) -> ComponentHealth {
        match self.silence {
            Some(silence) if silence > self.timeout => ComponentHealth::TimedOut,
            _ => ComponentHealth::Healthy,
        }
    }

    /// Seconds since the last heartbeat, or zero while disarmed.
    pub fn silence(&self) -> f32 {
        self.silence.unwrap_or(0.0)
    }
}
