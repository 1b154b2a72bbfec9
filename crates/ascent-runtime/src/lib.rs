//! `ascent-runtime` – the locomotion core and its tick loop.
//!
//! A breath-flow sensor (or the keyboard, when the sensor is absent) drives
//! a character that walks, climbs walls for a bounded time, falls when the
//! breath stops, and celebrates when it reaches the summit.
//!
//! # Modules
//!
//! - [`input`] – [`InputSource`][input::InputSource]: picks the sensor or
//!   the manual controls and produces one
//!   [`InputFrame`][ascent_types::InputFrame] per tick.
//! - [`motion`] – speed blending, heading smoothing, jump and gravity math.
//! - [`climb`] – [`ClimbSession`][climb::ClimbSession]: the per-climb
//!   countdown and vertical motion.
//! - [`sequence`] – the multi-tick fall and celebration sequences, each of
//!   which reloads the level exactly once.
//! - [`locomotion`] –
//!   [`LocomotionStateMachine`][locomotion::LocomotionStateMachine]: the
//!   Walking / Climbing / Frozen / Celebrating state machine.
//! - [`ascent_loop`] – [`AscentLoop`][ascent_loop::AscentLoop]: runs device,
//!   input, locomotion and goal detection in order and reports each tick.
//! - [`config`] – [`LocomotionConfig`][config::LocomotionConfig] tuning.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: installs
//!   the `tracing` subscriber with an optional OTLP span exporter.

pub mod ascent_loop;
pub mod climb;
pub mod config;
pub mod input;
pub mod locomotion;
pub mod motion;
pub mod sequence;
pub mod telemetry;

pub use ascent_loop::{AscentLoop, TickReport};
pub use climb::ClimbSession;
pub use config::LocomotionConfig;
pub use input::{InputSource, ManualInput};
pub use locomotion::{FallCause, Kinematics, LocomotionBuilder, LocomotionStateMachine};
pub use telemetry::{LogFormat, TracerProviderGuard, init_tracing};
