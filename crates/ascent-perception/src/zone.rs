//! Climbable zones and the probe the locomotion core queries them through.
//!
//! A [`ClimbZone`] has two boxes:
//!
//! - the **surface**, which forward probes hit and which supplies the wall
//!   normal;
//! - the **volume**, the surface grown by a reach margin, inside which a
//!   climber counts as still on the wall.
//!
//! [`ZoneField`] is the box-based [`ClimbZoneProbe`] used by the CLI and in
//! tests.  Engines with their own physics implement the trait directly.

use ascent_types::Vec3;
use tracing::{debug, info};

use crate::shape::{Aabb, RayHit};

/// Default vertical climb speed (m/s).
pub const DEFAULT_CLIMB_SPEED: f32 = 2.5;

/// Default margin between the wall surface and the edge of its volume (m).
pub const DEFAULT_REACH: f32 = 2.0;

/// Opaque identifier of a climb zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ZoneHandle(pub u32);

/// A climbable wall section.
#[derive(Debug, Clone, PartialEq)]
pub struct ClimbZone {
    pub handle: ZoneHandle,
    pub name: String,
    pub surface: Aabb,
    pub volume: Aabb,
    /// Vertical climb speed in m/s.
    pub climb_speed: f32,
    /// Declared per zone but never applied: horizontal climbing is disabled.
    pub allow_horizontal: bool,
    pub can_jump: bool,
}

impl ClimbZone {
    pub fn new(handle: ZoneHandle, name: impl Into<String>, surface: Aabb) -> Self {
        Self {
            handle,
            name: name.into(),
            surface,
            volume: surface.expanded(DEFAULT_REACH),
            climb_speed: DEFAULT_CLIMB_SPEED,
            allow_horizontal: false,
            can_jump: false,
        }
    }

    pub fn with_climb_speed(mut self, climb_speed: f32) -> Self {
        self.climb_speed = climb_speed;
        self
    }

    /// Replace the containment volume with the surface grown by `reach`.
    pub fn with_reach(mut self, reach: f32) -> Self {
        self.volume = self.surface.expanded(reach);
        self
    }

    pub fn with_allow_horizontal(mut self, allow: bool) -> Self {
        self.allow_horizontal = allow;
        self
    }
}

/// Result of a successful forward probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneHit {
    pub zone: ZoneHandle,
    pub climb_speed: f32,
    /// Outward normal of the surface that was hit.
    pub surface_normal: Vec3,
    pub distance: f32,
    pub allow_horizontal: bool,
}

/// Answers "is there a climbable surface ahead" and "is this point still on
/// the wall" for the locomotion core.
pub trait ClimbZoneProbe: Send {
    /// Cast forward from `origin` and report the nearest climbable surface
    /// within `max_distance`.
    fn probe_forward(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<ZoneHit>;

    /// `true` while `point` lies inside the volume of `zone`.  Unknown
    /// handles are never containing.
    fn contains_point(&self, zone: ZoneHandle, point: Vec3) -> bool;
}

/// A set of box-shaped climb zones.
#[derive(Debug, Default, Clone)]
pub struct ZoneField {
    zones: Vec<ClimbZone>,
}

impl ZoneField {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a zone, replacing any earlier zone with the same handle.
    pub fn with_zone(mut self, zone: ClimbZone) -> Self {
        self.insert(zone);
        self
    }

    pub fn insert(&mut self, zone: ClimbZone) {
        if zone.allow_horizontal {
            info!(
                zone = %zone.name,
                "zone allows horizontal movement; horizontal climbing stays disabled"
            );
        }
        self.zones.retain(|z| z.handle != zone.handle);
        self.zones.push(zone);
    }

    pub fn get(&self, handle: ZoneHandle) -> Option<&ClimbZone> {
        self.zones.iter().find(|z| z.handle == handle)
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

impl ClimbZoneProbe for ZoneField {
    fn probe_forward(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<ZoneHit> {
        let (zone, hit): (&ClimbZone, RayHit) = self
            .zones
            .iter()
            .filter_map(|z| {
                z.surface
                    .raycast(origin, direction, max_distance)
                    .map(|hit| (z, hit))
            })
            .min_by(|a, b| a.1.distance.total_cmp(&b.1.distance))?;

        debug!(zone = %zone.name, distance = hit.distance, "climbable surface ahead");
        Some(ZoneHit {
            zone: zone.handle,
            climb_speed: zone.climb_speed,
            surface_normal: hit.normal,
            distance: hit.distance,
            allow_horizontal: zone.allow_horizontal,
        })
    }

    fn contains_point(&self, zone: ZoneHandle, point: Vec3) -> bool {
        self.get(zone)
            .is_some_and(|z| z.volume.contains_point(point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wall(handle: u32, z: f32) -> ClimbZone {
        ClimbZone::new(
            ZoneHandle(handle),
            format!("wall-{handle}"),
            Aabb::new(Vec3::new(-2.0, 0.0, z), Vec3::new(2.0, 6.0, z + 0.5)),
        )
    }

    #[test]
    fn probe_hits_nearest_zone() {
        let field = ZoneField::new().with_zone(wall(1, 5.0)).with_zone(wall(2, 3.0));
        let hit = field
            .probe_forward(Vec3::new(0.0, 1.0, 2.0), Vec3::FORWARD, 10.0)
            .unwrap();
        assert_eq!(hit.zone, ZoneHandle(2));
        assert_eq!(hit.surface_normal, Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(hit.climb_speed, DEFAULT_CLIMB_SPEED);
    }

    #[test]
    fn probe_misses_beyond_range() {
        let field = ZoneField::new().with_zone(wall(1, 5.0));
        assert!(
            field
                .probe_forward(Vec3::new(0.0, 1.0, 0.0), Vec3::FORWARD, 1.5)
                .is_none()
        );
    }

    #[test]
    fn containment_uses_reach_volume() {
        let field = ZoneField::new().with_zone(wall(1, 3.0).with_reach(1.0));
        assert!(field.contains_point(ZoneHandle(1), Vec3::new(0.0, 1.0, 2.5)));
        assert!(!field.contains_point(ZoneHandle(1), Vec3::new(0.0, 1.0, 1.5)));
        assert!(!field.contains_point(ZoneHandle(1), Vec3::new(0.0, 7.5, 2.5)));
        assert!(!field.contains_point(ZoneHandle(9), Vec3::new(0.0, 1.0, 2.5)));
    }

    #[test]
    fn insert_replaces_same_handle() {
        let mut field = ZoneField::new().with_zone(wall(1, 3.0));
        field.insert(wall(1, 8.0).with_climb_speed(4.0));
        assert_eq!(field.len(), 1);
        assert_eq!(field.get(ZoneHandle(1)).unwrap().climb_speed, 4.0);
    }
}
