//! [`LocomotionStateMachine`] – the per-tick locomotion core.
//!
//! The machine owns the character's kinematics and exactly one
//! [`LocomotionState`].  Each call to [`tick`][LocomotionStateMachine::tick]
//! runs, in this order:
//!
//! 1. **Zone detection** – while walking, probe forward for a climbable wall
//!    and enter [`Climbing`][LocomotionState::Climbing] when the input asks
//!    for it.  Entering ends the tick's walking work.
//! 2. **Integration** – per-state motion (walking with gravity and jumps,
//!    vertical climbing, gravity-only falling, or pose holding) and the
//!    timers that drive the terminal sequences.
//! 3. **Animation emission** – the [`AnimationSignals`] block is flushed to
//!    the optional sink.
//!
//! Goal completion arrives out of band through
//! [`on_goal_reached`][LocomotionStateMachine::on_goal_reached], which only
//! has an effect the first time.
//!
//! # Example
//!
//! ```rust
//! use ascent_hal::camera::FixedHeading;
//! use ascent_hal::sim::{SimBody, SimLevel};
//! use ascent_runtime::locomotion::LocomotionStateMachine;
//! use ascent_types::{ActorId, InputFrame, InputOrigin, LocomotionState};
//!
//! let mut machine = LocomotionStateMachine::builder()
//!     .with_body(SimBody::new("climber"))
//!     .with_camera(Box::new(FixedHeading(0.0)))
//!     .with_level(Box::new(SimLevel::new()))
//!     .build()
//!     .expect("all required collaborators are present");
//!
//! let forward = InputFrame {
//!     move_y: 1.0,
//!     ..InputFrame::neutral(InputOrigin::Manual)
//! };
//! for _ in 0..60 {
//!     machine.tick(1.0 / 60.0, &forward);
//! }
//! assert_eq!(machine.state(), LocomotionState::Walking);
//! assert!(machine.kinematics().position.z > 0.0);
//!
//! assert!(machine.on_goal_reached(ActorId::default()));
//! assert!(!machine.on_goal_reached(ActorId::default()));
//! assert_eq!(machine.state(), LocomotionState::Celebrating);
//! ```

use ascent_hal::animation::{AnimationSignals, AnimationSink};
use ascent_hal::body::CharacterBody;
use ascent_hal::camera::CameraRig;
use ascent_hal::level::LevelControl;
use ascent_kernel::pose_lock::{Pose, PoseLock};
use ascent_kernel::watchdog::{ComponentHealth, FlowWatchdog};
use ascent_perception::zone::{ClimbZoneProbe, ZoneHit};
use ascent_types::{
    ActorId, AnimParam, AscentError, FLOW_PRESENCE_THRESHOLD, InputFrame, LocomotionState, Vec3,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::climb::ClimbSession;
use crate::config::LocomotionConfig;
use crate::motion::{
    apply_gravity, blend_animation, blend_speed, jump_velocity, lerp, smooth_damp_angle,
};
use crate::sequence::{CelebrationSequence, CelebrationStep, FallSequence, FallStep};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Manual forward input needed to start a climb.
const MANUAL_CLIMB_THRESHOLD: f32 = 0.1;

/// Vertical velocity held while standing, keeping the body pressed to the
/// ground.
const GROUNDED_BIAS: f32 = -2.0;

/// Lowest animation speed while on a wall, so idle climbing never freezes.
const MIN_CLIMB_BLEND: f32 = 0.5;

// ─────────────────────────────────────────────────────────────────────────────
// Public types
// ─────────────────────────────────────────────────────────────────────────────

/// Motion state of the character.  Mutated only by the machine.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Kinematics {
    pub position: Vec3,
    pub yaw_deg: f32,
    /// Horizontal speed while walking, vertical speed while climbing.
    pub speed: f32,
    pub vertical_velocity: f32,
    pub animation_blend: f32,
    /// Carried state of the heading smoother.
    pub rotation_velocity: f32,
    /// Heading walking moves along.
    pub target_yaw: f32,
}

/// Why a climb ended in a fall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallCause {
    Timeout,
    FlowLost,
}

impl std::fmt::Display for FallCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => write!(f, "climb time exhausted"),
            Self::FlowLost => write!(f, "breath flow lost"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Builder
// ─────────────────────────────────────────────────────────────────────────────

/// Wires collaborators into a [`LocomotionStateMachine`].
///
/// The body, camera and level control are required.  The animation sink and
/// the climb-zone probe are optional: without a sink signals are computed
/// but not sent, and without a probe the character never climbs.
#[derive(Default)]
pub struct LocomotionBuilder {
    config: LocomotionConfig,
    actor: ActorId,
    body: Option<Box<dyn CharacterBody>>,
    camera: Option<Box<dyn CameraRig>>,
    level: Option<Box<dyn LevelControl>>,
    animator: Option<Box<dyn AnimationSink>>,
    zones: Option<Box<dyn ClimbZoneProbe>>,
}

impl LocomotionBuilder {
    pub fn with_config(mut self, config: LocomotionConfig) -> Self {
        self.config = config;
        self
    }

    /// Actor handle goal signals must be addressed to.
    pub fn with_actor(mut self, actor: ActorId) -> Self {
        self.actor = actor;
        self
    }

    pub fn with_body(mut self, body: Box<dyn CharacterBody>) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_camera(mut self, camera: Box<dyn CameraRig>) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn with_level(mut self, level: Box<dyn LevelControl>) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_animator(mut self, animator: Box<dyn AnimationSink>) -> Self {
        self.animator = Some(animator);
        self
    }

    pub fn with_zones(mut self, zones: Box<dyn ClimbZoneProbe>) -> Self {
        self.zones = Some(zones);
        self
    }

    /// Validate the configuration and assemble the machine.
    ///
    /// # Errors
    ///
    /// Returns [`AscentError::Config`] when the configuration is invalid or a
    /// required collaborator is missing.
    pub fn build(self) -> Result<LocomotionStateMachine, AscentError> {
        self.config.validate()?;
        let body = self
            .body
            .ok_or_else(|| AscentError::Config("a character body is required".to_string()))?;
        let camera = self
            .camera
            .ok_or_else(|| AscentError::Config("a camera heading is required".to_string()))?;
        let level = self
            .level
            .ok_or_else(|| AscentError::Config("a level control is required".to_string()))?;

        if self.animator.is_none() {
            debug!("no animation sink; signals are computed but not sent");
        }
        if self.zones.is_none() {
            info!("no climb-zone probe; climbing is unavailable");
        }

        let position = body.position();
        let yaw = body.yaw_deg();
        info!(body = body.id(), actor = self.actor.0, "locomotion ready");

        Ok(LocomotionStateMachine {
            flow_watchdog: FlowWatchdog::new(self.config.flow_timeout),
            jump_timeout_delta: self.config.jump_timeout,
            fall_timeout_delta: self.config.fall_timeout,
            config: self.config,
            actor: self.actor,
            body,
            camera,
            level,
            animator: self.animator,
            zones: self.zones,
            state: LocomotionState::Walking,
            kinematics: Kinematics {
                position,
                yaw_deg: yaw,
                target_yaw: yaw,
                ..Kinematics::default()
            },
            signals: AnimationSignals::new(),
            session: None,
            pose_lock: PoseLock::standard(),
            fall: None,
            celebration: None,
            goal_latched: false,
            input_enabled: true,
            clock: 0.0,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// LocomotionStateMachine
// ─────────────────────────────────────────────────────────────────────────────

pub struct LocomotionStateMachine {
    config: LocomotionConfig,
    actor: ActorId,
    body: Box<dyn CharacterBody>,
    camera: Box<dyn CameraRig>,
    level: Box<dyn LevelControl>,
    animator: Option<Box<dyn AnimationSink>>,
    zones: Option<Box<dyn ClimbZoneProbe>>,
    state: LocomotionState,
    kinematics: Kinematics,
    signals: AnimationSignals,
    // ── Climbing ──────────────────────────────────────────────────────────────
    /// Present iff the state is `Climbing`.
    session: Option<ClimbSession>,
    flow_watchdog: FlowWatchdog,
    // ── Terminal sequences ────────────────────────────────────────────────────
    pose_lock: PoseLock,
    fall: Option<FallSequence>,
    celebration: Option<CelebrationSequence>,
    goal_latched: bool,
    input_enabled: bool,
    // ── Timers ────────────────────────────────────────────────────────────────
    jump_timeout_delta: f32,
    fall_timeout_delta: f32,
    /// Sum of all tick deltas.
    clock: f64,
}

impl LocomotionStateMachine {
    pub fn builder() -> LocomotionBuilder {
        LocomotionBuilder::default()
    }

    /// Advance the machine by `dt` seconds using this tick's input.
    ///
    /// Negative or non-finite deltas are ignored.
    pub fn tick(&mut self, dt: f32, input: &InputFrame) {
        if !dt.is_finite() || dt < 0.0 {
            warn!(dt, "ignoring tick with invalid delta time");
            return;
        }
        self.clock += f64::from(dt);

        match self.state {
            LocomotionState::Walking if self.input_enabled => self.tick_walking(dt, input),
            LocomotionState::Climbing if self.input_enabled => self.tick_climbing(dt, input),
            LocomotionState::Frozen => self.tick_frozen(dt),
            LocomotionState::Celebrating => self.tick_celebrating(dt),
            _ => {}
        }

        self.sync_kinematics();
        self.emit_animation();
    }

    /// Goal entry point.  Returns `true` when the signal was accepted.
    ///
    /// Only the first signal addressed to this machine's actor has an
    /// effect; every later call is logged and ignored.
    pub fn on_goal_reached(&mut self, actor: ActorId) -> bool {
        if actor != self.actor {
            warn!(
                actor = actor.0,
                expected = self.actor.0,
                "goal signal addressed to another actor; ignored"
            );
            return false;
        }
        if self.goal_latched || self.state == LocomotionState::Celebrating {
            warn!(error = %AscentError::DuplicateGoalSignal, "goal already reached; ignored");
            return false;
        }

        let previous = self.state;
        self.goal_latched = true;
        self.state = LocomotionState::Celebrating;
        self.input_enabled = false;

        if let Some(session) = self.session.take() {
            debug!(session = %session.id, "climb session cancelled by goal");
        }
        self.flow_watchdog.disarm();
        self.fall = None;

        let k = &mut self.kinematics;
        k.vertical_velocity = 0.0;
        k.speed = 0.0;
        k.animation_blend = 0.0;
        k.rotation_velocity = 0.0;

        self.signals.climbing = false;
        self.signals.grounded = true;
        self.signals.jump = false;
        self.signals.free_fall = false;
        self.signals.speed = 0.0;
        self.signals.motion_speed = 0.0;

        self.body.set_enabled(false);
        self.pose_lock
            .engage(Pose::new(self.body.position(), self.body.yaw_deg()));
        self.celebration = Some(CelebrationSequence::new(
            self.config.celebrate_trigger_delay,
            self.config.celebration_duration,
        ));

        self.sync_kinematics();
        self.emit_animation();
        info!(from = %previous, "goal reached; celebrating");
        true
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn state(&self) -> LocomotionState {
        self.state
    }

    pub fn kinematics(&self) -> &Kinematics {
        &self.kinematics
    }

    pub fn position(&self) -> Vec3 {
        self.kinematics.position
    }

    pub fn signals(&self) -> &AnimationSignals {
        &self.signals
    }

    pub fn session(&self) -> Option<&ClimbSession> {
        self.session.as_ref()
    }

    /// Seconds left on the active climb, if climbing.
    pub fn remaining_climb_time(&self) -> Option<f32> {
        self.session.as_ref().map(ClimbSession::remaining)
    }

    pub fn is_goal_latched(&self) -> bool {
        self.goal_latched
    }

    pub fn is_input_enabled(&self) -> bool {
        self.input_enabled
    }

    pub fn actor(&self) -> ActorId {
        self.actor
    }

    pub fn config(&self) -> &LocomotionConfig {
        &self.config
    }

    /// Seconds of simulated time since the machine was built.
    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn body(&self) -> &dyn CharacterBody {
        self.body.as_ref()
    }

    /// Direct access to the body, for collaborators that move it outside the
    /// tick.
    pub fn body_mut(&mut self) -> &mut dyn CharacterBody {
        self.body.as_mut()
    }

    // ── Walking ──────────────────────────────────────────────────────────────

    fn tick_walking(&mut self, dt: f32, input: &InputFrame) {
        let grounded = self.body.is_grounded();
        self.signals.grounded = grounded;

        if let Some(hit) = self.detect_climbable(input) {
            self.enter_climbing(&hit);
            return;
        }

        self.jump_and_gravity(dt, input, grounded);
        self.walk(dt, input);
    }

    fn detect_climbable(&self, input: &InputFrame) -> Option<ZoneHit> {
        let zones = self.zones.as_ref()?;
        let origin = self
            .body
            .position()
            .add(Vec3::UP.scale(self.config.climb_probe_height));
        let forward = Vec3::from_yaw(self.body.yaw_deg());
        let hit = zones.probe_forward(origin, forward, self.config.climb_probe_distance)?;

        let wants_to_climb = if input.from_sensor() {
            input.move_y > FLOW_PRESENCE_THRESHOLD
        } else {
            input.move_y > MANUAL_CLIMB_THRESHOLD
        };
        wants_to_climb.then_some(hit)
    }

    fn jump_and_gravity(&mut self, dt: f32, input: &InputFrame, grounded: bool) {
        let k = &mut self.kinematics;
        if grounded {
            self.fall_timeout_delta = self.config.fall_timeout;
            self.signals.jump = false;
            self.signals.free_fall = false;

            if k.vertical_velocity < 0.0 {
                k.vertical_velocity = GROUNDED_BIAS;
            }
            if input.jump && self.jump_timeout_delta <= 0.0 {
                k.vertical_velocity = jump_velocity(self.config.jump_height, self.config.gravity);
                self.signals.jump = true;
                debug!(velocity = k.vertical_velocity, "jump");
            }
            if self.jump_timeout_delta >= 0.0 {
                self.jump_timeout_delta -= dt;
            }
        } else {
            self.jump_timeout_delta = self.config.jump_timeout;
            if self.fall_timeout_delta >= 0.0 {
                self.fall_timeout_delta -= dt;
            } else {
                self.signals.free_fall = true;
            }
        }

        k.vertical_velocity = apply_gravity(
            k.vertical_velocity,
            self.config.gravity,
            dt,
            self.config.terminal_velocity,
        );
    }

    fn walk(&mut self, dt: f32, input: &InputFrame) {
        let cfg = &self.config;
        let using_sensor = input.from_sensor() && input.move_y > FLOW_PRESENCE_THRESHOLD;

        let target_speed = if input.from_sensor() {
            if using_sensor {
                cfg.min_flow_speed + input.move_y * (cfg.max_flow_speed - cfg.min_flow_speed)
            } else {
                0.0
            }
        } else if input.is_moving() {
            if input.sprint { cfg.sprint_speed } else { cfg.walk_speed }
        } else {
            0.0
        };

        let magnitude = if !using_sensor && cfg.analog_movement {
            input.move_magnitude().min(1.0)
        } else {
            1.0
        };

        let k = &mut self.kinematics;
        k.speed = blend_speed(k.speed, target_speed, magnitude, dt, cfg.speed_change_rate);
        k.animation_blend =
            blend_animation(k.animation_blend, target_speed, dt, cfg.speed_change_rate);

        let steering = using_sensor || (!input.from_sensor() && input.move_y != 0.0);
        if steering {
            k.target_yaw = self.camera.yaw_deg();
            let yaw = smooth_damp_angle(
                self.body.yaw_deg(),
                k.target_yaw,
                &mut k.rotation_velocity,
                cfg.rotation_smooth_time,
                dt,
            );
            self.body.set_yaw(yaw);
        }

        let delta = Vec3::from_yaw(k.target_yaw)
            .scale(k.speed * dt)
            .add(Vec3::new(0.0, k.vertical_velocity * dt, 0.0));
        self.body.move_by(delta);

        self.signals.speed = k.animation_blend;
        self.signals.motion_speed = magnitude;
    }

    // ── Climbing ─────────────────────────────────────────────────────────────

    fn enter_climbing(&mut self, hit: &ZoneHit) {
        let session = ClimbSession::start(hit, self.clock, self.config.max_climb_duration);
        let yaw = session.facing_yaw();
        self.body.set_yaw(yaw);
        self.kinematics.target_yaw = yaw;
        self.kinematics.vertical_velocity = 0.0;
        self.flow_watchdog.arm();

        self.signals.climbing = true;
        self.signals.grounded = false;
        self.signals.speed = MIN_CLIMB_BLEND;

        if hit.allow_horizontal {
            debug!(zone = hit.zone.0, "horizontal movement flag ignored while climbing");
        }
        info!(
            session = %session.id,
            zone = hit.zone.0,
            climb_speed = hit.climb_speed,
            max_duration = self.config.max_climb_duration,
            "climbing started"
        );
        self.session = Some(session);
        self.state = LocomotionState::Climbing;
    }

    fn tick_climbing(&mut self, dt: f32, input: &InputFrame) {
        if input.from_sensor()
            && self.flow_watchdog.observe(dt, input.move_y) == ComponentHealth::TimedOut
        {
            debug!(
                silence = self.flow_watchdog.silence(),
                timeout = self.flow_watchdog.timeout(),
                "flow watchdog expired"
            );
            self.begin_fall(FallCause::FlowLost);
            return;
        }

        let Some(session) = self.session.as_mut() else {
            warn!("climbing without a session; returning to walking");
            self.exit_climbing();
            return;
        };
        if session.advance(dt) {
            self.begin_fall(FallCause::Timeout);
            return;
        }
        let zone = session.zone;
        let climb_speed = session.climb_speed;
        let rise = session.vertical_step(input.move_y, dt);

        let position = self.body.position();
        let inside = self
            .zones
            .as_ref()
            .is_some_and(|zones| zones.contains_point(zone, position));
        if !inside {
            self.exit_climbing();
            return;
        }

        // Climbing ignores gravity and any horizontal input.
        let k = &mut self.kinematics;
        k.vertical_velocity = 0.0;
        self.body.move_by(Vec3::new(0.0, rise, 0.0));

        k.speed = ClimbSession::effective_input(input.move_y).abs() * climb_speed;
        let target_blend = k.speed.max(MIN_CLIMB_BLEND);
        k.animation_blend = lerp(
            k.animation_blend,
            target_blend,
            dt * self.config.speed_change_rate,
        );

        self.signals.climbing = true;
        self.signals.speed = k.animation_blend.max(MIN_CLIMB_BLEND);
        self.signals.motion_speed = 1.0;
    }

    fn exit_climbing(&mut self) {
        if let Some(session) = self.session.take() {
            info!(
                session = %session.id,
                remaining = session.remaining(),
                "left climb zone; walking"
            );
        }
        self.flow_watchdog.disarm();
        self.signals.climbing = false;
        self.state = LocomotionState::Walking;
    }

    // ── Frozen ───────────────────────────────────────────────────────────────

    fn begin_fall(&mut self, cause: FallCause) {
        if self.fall.is_some() {
            return;
        }
        let session = self.session.take();
        self.flow_watchdog.disarm();
        self.state = LocomotionState::Frozen;
        self.signals.climbing = false;
        self.signals.free_fall = true;
        self.fall = Some(FallSequence::new(
            self.config.fall_sequence_duration,
            self.config.fall_hold_duration,
        ));
        info!(%cause, session = ?session.map(|s| s.id), "climb failed; falling");
    }

    fn tick_frozen(&mut self, dt: f32) {
        let Some(fall) = self.fall.as_mut() else {
            return;
        };
        match fall.advance(dt) {
            FallStep::Falling => {
                let k = &mut self.kinematics;
                k.vertical_velocity = apply_gravity(
                    k.vertical_velocity,
                    self.config.gravity,
                    dt,
                    self.config.terminal_velocity,
                );
                self.body
                    .move_by(Vec3::new(0.0, k.vertical_velocity * dt, 0.0));
            }
            FallStep::Holding | FallStep::Finished => {}
            FallStep::Reload => {
                info!("fall finished; reloading level");
                self.level.reload_current_level();
            }
        }
    }

    // ── Celebrating ──────────────────────────────────────────────────────────

    fn tick_celebrating(&mut self, dt: f32) {
        let current = Pose::new(self.body.position(), self.body.yaw_deg());
        if let Err(e) = self.pose_lock.verify(&current)
            && let Some(snapshot) = self.pose_lock.snapshot()
        {
            warn!(error = %e, "external motion during celebration; restoring pose");
            self.body.set_pose(snapshot.position, snapshot.yaw_deg);
        }
        if self.body.is_enabled() {
            warn!("body integrator re-enabled during celebration; disabling it");
            self.body.set_enabled(false);
        }

        let Some(celebration) = self.celebration.as_mut() else {
            return;
        };
        match celebration.advance(dt) {
            CelebrationStep::Waiting | CelebrationStep::Finished => {}
            CelebrationStep::Trigger => {
                debug!("celebrate trigger");
                self.signals.trigger(AnimParam::Celebrate);
            }
            CelebrationStep::Countdown { remaining } => {
                if remaining.ceil() < (remaining + dt).ceil() {
                    info!(seconds = remaining.ceil(), "level reset in");
                }
            }
            CelebrationStep::Reload => {
                info!("celebration finished; reloading level");
                self.level.reload_current_level();
            }
        }
    }

    // ── Output ───────────────────────────────────────────────────────────────

    fn sync_kinematics(&mut self) {
        self.kinematics.position = self.body.position();
        self.kinematics.yaw_deg = self.body.yaw_deg();
    }

    fn emit_animation(&mut self) {
        match self.animator.as_mut() {
            Some(sink) => self.signals.flush(sink.as_mut()),
            None => self.signals.discard_triggers(),
        }
    }
}
