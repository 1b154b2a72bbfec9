//! [`PoseLock`] – pose snapshot interlock / rule engine.
//!
//! When the character enters its celebration the current pose is captured
//! with [`PoseLock::engage`].  Every later tick passes the live pose through
//! [`PoseLock::verify`]; each registered [`PoseRule`] is evaluated in order
//! and the first violation is returned as [`AscentError::ExternalDrift`].
//! The caller then reasserts [`PoseLock::snapshot`].
//!
//! Two built-in rules are provided:
//! - [`DriftRule`] – rejects positions further than a distance epsilon from
//!   the snapshot.
//! - [`HeadingRule`] – rejects headings rotated beyond an angle epsilon.

use ascent_types::{AscentError, Vec3, delta_angle};
use tracing::debug;

/// Default position tolerance in metres.
pub const DEFAULT_MAX_DRIFT: f32 = 0.01;

/// Default heading tolerance in degrees.
pub const DEFAULT_MAX_ROTATION_DEG: f32 = 0.1;

/// Position and heading of the character.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    pub position: Vec3,
    pub yaw_deg: f32,
}

impl Pose {
    pub fn new(position: Vec3, yaw_deg: f32) -> Self {
        Self { position, yaw_deg }
    }

    /// Distance and absolute heading difference from `other`.
    pub fn deviation_from(&self, other: &Pose) -> (f32, f32) {
        (
            self.position.distance(other.position),
            delta_angle(other.yaw_deg, self.yaw_deg).abs(),
        )
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Rule trait
// ────────────────────────────────────────────────────────────────────────────

/// A single invariant relating the live pose to the locked snapshot.
pub trait PoseRule: Send + Sync {
    /// Human-readable name used in log messages.
    fn name(&self) -> &str;

    /// Return `Ok(())` when `current` is acceptably close to `snapshot`, or
    /// [`AscentError::ExternalDrift`] when it is not.
    fn check(&self, snapshot: &Pose, current: &Pose) -> Result<(), AscentError>;
}

// ────────────────────────────────────────────────────────────────────────────
// PoseLock
// ────────────────────────────────────────────────────────────────────────────

/// # Example
///
/// ```
/// use ascent_kernel::pose_lock::{Pose, PoseLock};
/// use ascent_types::Vec3;
///
/// let mut lock = PoseLock::standard();
/// lock.engage(Pose::new(Vec3::new(0.0, 5.0, 3.0), 180.0));
///
/// assert!(lock.verify(&Pose::new(Vec3::new(0.0, 5.0, 3.005), 180.05)).is_ok());
/// assert!(lock.verify(&Pose::new(Vec3::new(0.0, 5.2, 3.0), 180.0)).is_err());
/// ```
#[derive(Default)]
pub struct PoseLock {
    rules: Vec<Box<dyn PoseRule>>,
    snapshot: Option<Pose>,
}

impl PoseLock {
    /// Create an empty lock with no rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// A lock with [`DriftRule`] and [`HeadingRule`] at their default
    /// tolerances.
    pub fn standard() -> Self {
        let mut lock = Self::new();
        lock.add_rule(Box::new(DriftRule {
            max_distance: DEFAULT_MAX_DRIFT,
        }));
        lock.add_rule(Box::new(HeadingRule {
            max_angle_deg: DEFAULT_MAX_ROTATION_DEG,
        }));
        lock
    }

    /// Register a new [`PoseRule`].  Rules are evaluated in insertion order.
    pub fn add_rule(&mut self, rule: Box<dyn PoseRule>) {
        self.rules.push(rule);
    }

    /// Capture `pose` as the snapshot to hold.
    pub fn engage(&mut self, pose: Pose) {
        debug!(
            x = pose.position.x,
            y = pose.position.y,
            z = pose.position.z,
            yaw = pose.yaw_deg,
            "pose locked"
        );
        self.snapshot = Some(pose);
    }

    pub fn release(&mut self) {
        self.snapshot = None;
    }

    pub fn is_engaged(&self) -> bool {
        self.snapshot.is_some()
    }

    pub fn snapshot(&self) -> Option<Pose> {
        self.snapshot
    }

    /// Validate `current` against every rule.  Always passes while
    /// disengaged.
    pub fn verify(&self, current: &Pose) -> Result<(), AscentError> {
        let Some(snapshot) = self.snapshot.as_ref() else {
            return Ok(());
        };
        for rule in &self.rules {
            rule.check(snapshot, current)?;
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Built-in rules
// ────────────────────────────────────────────────────────────────────────────

/// Rejects poses whose position moved more than `max_distance` metres.
pub struct DriftRule {
    pub max_distance: f32,
}

impl PoseRule for DriftRule {
    fn name(&self) -> &str {
        "drift"
    }

    fn check(&self, snapshot: &Pose, current: &Pose) -> Result<(), AscentError> {
        let (distance, angle_deg) = current.deviation_from(snapshot);
        if distance > self.max_distance {
            return Err(AscentError::ExternalDrift {
                distance,
                angle_deg,
            });
        }
        Ok(())
    }
}

/// Rejects poses whose heading turned more than `max_angle_deg` degrees.
pub struct HeadingRule {
    pub max_angle_deg: f32,
}

impl PoseRule for HeadingRule {
    fn name(&self) -> &str {
        "heading"
    }

    fn check(&self, snapshot: &Pose, current: &Pose) -> Result<(), AscentError> {
        let (distance, angle_deg) = current.deviation_from(snapshot);
        if angle_deg > self.max_angle_deg {
            return Err(AscentError::ExternalDrift {
                distance,
                angle_deg,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locked_at(position: Vec3, yaw: f32) -> PoseLock {
        let mut lock = PoseLock::standard();
        lock.engage(Pose::new(position, yaw));
        lock
    }

    #[test]
    fn disengaged_lock_accepts_anything() {
        let lock = PoseLock::standard();
        assert!(lock.verify(&Pose::new(Vec3::new(100.0, 0.0, 0.0), 45.0)).is_ok());
    }

    #[test]
    fn small_jitter_is_tolerated() {
        let lock = locked_at(Vec3::ZERO, 0.0);
        assert!(lock.verify(&Pose::new(Vec3::new(0.005, 0.0, 0.0), 0.05)).is_ok());
    }

    #[test]
    fn drift_beyond_epsilon_is_reported() {
        let lock = locked_at(Vec3::ZERO, 0.0);
        match lock.verify(&Pose::new(Vec3::new(0.5, 0.0, 0.0), 0.0)) {
            Err(AscentError::ExternalDrift { distance, angle_deg }) => {
                assert!((distance - 0.5).abs() < 1e-6);
                assert_eq!(angle_deg, 0.0);
            }
            other => panic!("expected drift, got {other:?}"),
        }
    }

    #[test]
    fn rotation_beyond_epsilon_is_reported() {
        let lock = locked_at(Vec3::ZERO, 359.95);
        // 0.1 degrees across the wrap is within tolerance.
        assert!(lock.verify(&Pose::new(Vec3::ZERO, 0.04)).is_ok());
        assert!(matches!(
            lock.verify(&Pose::new(Vec3::ZERO, 1.0)),
            Err(AscentError::ExternalDrift { .. })
        ));
    }

    #[test]
    fn release_disengages() {
        let mut lock = locked_at(Vec3::ZERO, 0.0);
        assert!(lock.is_engaged());
        lock.release();
        assert!(lock.snapshot().is_none());
        assert!(lock.verify(&Pose::new(Vec3::new(9.0, 9.0, 9.0), 90.0)).is_ok());
    }

    #[test]
    fn rules_run_in_order() {
        struct AlwaysFails;
        impl PoseRule for AlwaysFails {
            fn name(&self) -> &str {
                "always_fails"
            }
            fn check(&self, _: &Pose, _: &Pose) -> Result<(), AscentError> {
                Err(AscentError::ExternalDrift {
                    distance: -1.0,
                    angle_deg: -1.0,
                })
            }
        }

        let mut lock = PoseLock::new();
        lock.add_rule(Box::new(AlwaysFails));
        lock.add_rule(Box::new(DriftRule { max_distance: 0.01 }));
        lock.engage(Pose::default());
        assert_eq!(
            lock.verify(&Pose::default()),
            Err(AscentError::ExternalDrift {
                distance: -1.0,
                angle_deg: -1.0
            })
        );
    }
}
