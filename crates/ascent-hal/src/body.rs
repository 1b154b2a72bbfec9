//! `CharacterBody` trait for the external body integrator.
//!
//! The locomotion core computes a displacement every tick and hands it to a
//! body, which owns collision resolution and reports back the authoritative
//! position and whether it is standing on ground.

use ascent_types::Vec3;

/// A collider-backed character body.
///
/// The core only ever talks to this trait, so a game engine, a physics
/// sandbox, or [`SimBody`][crate::sim::SimBody] can drive the same state
/// machine.
pub trait CharacterBody: Send {
    /// Stable identifier for this body, e.g. `"climber"`.
    fn id(&self) -> &str;

    /// Apply a world-space displacement.  Ignored while disabled.
    fn move_by(&mut self, delta: Vec3);

    /// Current world-space position.
    fn position(&self) -> Vec3;

    /// Current heading in degrees.
    fn yaw_deg(&self) -> f32;

    fn set_yaw(&mut self, yaw_deg: f32);

    /// Teleport to `position` with heading `yaw_deg`, bypassing collision.
    fn set_pose(&mut self, position: Vec3, yaw_deg: f32);

    /// `true` when the last move ended in contact with the ground.
    fn is_grounded(&self) -> bool;

    /// Enable or disable the integrator.  A disabled body does not move.
    fn set_enabled(&mut self, enabled: bool);

    fn is_enabled(&self) -> bool;
}
