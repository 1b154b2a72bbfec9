//! `ascent-kernel` – safety rules for the locomotion core.
//!
//! Neither module moves the character.  They observe and report so that the
//! state machine can act.
//!
//! # Modules
//!
//! - [`watchdog`] – [`FlowWatchdog`][watchdog::FlowWatchdog]: detects a
//!   sustained loss of breath flow while climbing.
//! - [`pose_lock`] – [`PoseLock`][pose_lock::PoseLock]: a rule engine that
//!   checks the live pose against the snapshot taken on goal completion and
//!   reports any external drift.

pub mod pose_lock;
pub mod watchdog;

pub use pose_lock::{DriftRule, HeadingRule, Pose, PoseLock, PoseRule};
pub use watchdog::{ComponentHealth, FlowWatchdog};
