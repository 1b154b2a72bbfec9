//! Camera heading handle.
//!
//! Walking steers toward the direction the camera faces.  The handle is
//! injected when the state machine is built; the core never looks a camera
//! up on its own.

/// Anything that can report the yaw of the view the player steers by.
pub trait CameraRig: Send {
    /// Heading of the camera in degrees.
    fn yaw_deg(&self) -> f32;
}

/// A camera that never turns.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FixedHeading(pub f32);

impl CameraRig for FixedHeading {
    fn yaw_deg(&self) -> f32 {
        self.0
    }
}
