//! [`AscentLoop`] – the per-frame orchestrator.
//!
//! Owns the sensor front end, the input selector, the locomotion core and
//! the optional goal notifier, and drives them in a fixed order on every
//! tick:
//!
//! 1. **Device** – send device commands that have come due, then read at
//!    most one line from the sensor.
//! 2. **Input** – turn the sensor reading or the manual controls into one
//!    [`InputFrame`][ascent_types::InputFrame].
//! 3. **Locomotion** – run one [`LocomotionStateMachine`] tick.
//! 4. **Goal** – ask the notifier whether the actor has reached the goal and
//!    forward the signal.
//!
//! Each tick returns a serialisable [`TickReport`].
//!
//! # Example
//!
//! ```rust
//! use ascent_hal::camera::FixedHeading;
//! use ascent_hal::sensor::{SensorConfig, SensorStream};
//! use ascent_hal::sim::{SimBody, SimDevice, SimLevel};
//! use ascent_runtime::ascent_loop::AscentLoop;
//! use ascent_runtime::input::ManualInput;
//! use ascent_runtime::locomotion::LocomotionStateMachine;
//! use ascent_types::InputOrigin;
//!
//! let device = SimDevice::offline();
//! let mut sensor = SensorStream::new(SensorConfig::default(), device.connector());
//! assert!(!sensor.connect_configured());
//!
//! let machine = LocomotionStateMachine::builder()
//!     .with_body(SimBody::new("climber"))
//!     .with_camera(Box::new(FixedHeading(0.0)))
//!     .with_level(Box::new(SimLevel::new()))
//!     .build()
//!     .expect("all required collaborators are present");
//!
//! let mut ascent = AscentLoop::new(sensor, machine);
//! let report = ascent.tick(0.02, &ManualInput::forward());
//! assert_eq!(report.input_origin, InputOrigin::Manual);
//! assert!(!report.connected);
//! ```

use ascent_hal::sensor::SensorStream;
use ascent_perception::goal::GoalNotifier;
use ascent_types::{InputOrigin, LocomotionState, Vec3};
use serde::Serialize;
use tracing::{debug_span, info, warn};

use crate::input::{InputSource, ManualInput};
use crate::locomotion::LocomotionStateMachine;

// ─────────────────────────────────────────────────────────────────────────────
// TickReport
// ─────────────────────────────────────────────────────────────────────────────

/// Snapshot of one tick, for status displays and logs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TickReport {
    pub tick: u64,
    /// Simulated seconds since start.
    pub clock: f64,
    pub state: LocomotionState,
    pub position: Vec3,
    pub yaw_deg: f32,
    pub speed: f32,
    pub vertical_velocity: f32,
    pub remaining_climb_time: Option<f32>,
    pub normalized_flow: f32,
    pub connected: bool,
    pub input_origin: InputOrigin,
}

// ─────────────────────────────────────────────────────────────────────────────
// AscentLoop
// ─────────────────────────────────────────────────────────────────────────────

pub struct AscentLoop {
    sensor: SensorStream,
    input: InputSource,
    machine: LocomotionStateMachine,
    goal: Option<Box<dyn GoalNotifier>>,
    ticks: u64,
    last_report: Option<TickReport>,
}

impl AscentLoop {
    /// Wire a sensor front end to a locomotion core.  Keyboard fallback is
    /// enabled.
    pub fn new(sensor: SensorStream, machine: LocomotionStateMachine) -> Self {
        Self {
            sensor,
            input: InputSource::default(),
            machine,
            goal: None,
            ticks: 0,
            last_report: None,
        }
    }

    pub fn with_goal(mut self, goal: Box<dyn GoalNotifier>) -> Self {
        self.goal = Some(goal);
        self
    }

    pub fn with_input(mut self, input: InputSource) -> Self {
        self.input = input;
        self
    }

    /// Run one frame of `dt` seconds.
    ///
    /// `manual` is the current keyboard state; it is only used while the
    /// sensor is disconnected.  Invalid deltas leave everything untouched
    /// and return the previous report.
    pub fn tick(&mut self, dt: f32, manual: &ManualInput) -> TickReport {
        if !dt.is_finite() || dt < 0.0 {
            warn!(dt, "ignoring frame with invalid delta time");
            return self.last_report.unwrap_or_else(|| self.report(InputOrigin::Manual));
        }
        self.ticks += 1;
        let _span = debug_span!("tick", n = self.ticks).entered();

        self.sensor.advance(dt);
        self.sensor.poll();
        let reading = self.sensor.reading();
        let frame = self.input.sample(&reading, manual);

        self.machine.tick(dt, &frame);

        if let Some(goal) = self.goal.as_mut() {
            let actor = self.machine.actor();
            if let Some(reached) = goal.poll(actor, self.machine.position(), dt) {
                self.machine.on_goal_reached(reached);
            }
        }

        let report = self.report(frame.origin);
        self.last_report = Some(report);
        report
    }

    /// Pause and close the device.  Safe to call more than once.
    pub fn shutdown(&mut self) {
        if self.sensor.is_connected() {
            info!("shutting down; closing flow sensor");
        }
        self.sensor.disconnect();
    }

    pub fn machine(&self) -> &LocomotionStateMachine {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut LocomotionStateMachine {
        &mut self.machine
    }

    pub fn sensor(&self) -> &SensorStream {
        &self.sensor
    }

    pub fn sensor_mut(&mut self) -> &mut SensorStream {
        &mut self.sensor
    }

    /// Tear the loop down and hand back the sensor, still connected.
    pub fn into_sensor(self) -> SensorStream {
        self.sensor
    }

    pub fn input_mut(&mut self) -> &mut InputSource {
        &mut self.input
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn last_report(&self) -> Option<&TickReport> {
        self.last_report.as_ref()
    }

    fn report(&self, input_origin: InputOrigin) -> TickReport {
        let k = self.machine.kinematics();
        TickReport {
            tick: self.ticks,
            clock: self.machine.clock(),
            state: self.machine.state(),
            position: k.position,
            yaw_deg: k.yaw_deg,
            speed: k.speed,
            vertical_velocity: k.vertical_velocity,
            remaining_climb_time: self.machine.remaining_climb_time(),
            normalized_flow: self.sensor.normalized_value(),
            connected: self.sensor.is_connected(),
            input_origin,
        }
    }
}
