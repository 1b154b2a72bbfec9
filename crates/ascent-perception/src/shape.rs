//! Axis-aligned boxes and ray casts against them.
//!
//! # Example
//!
//! ```rust
//! use ascent_perception::shape::Aabb;
//! use ascent_types::Vec3;
//!
//! let wall = Aabb::new(Vec3::new(-2.0, 0.0, 3.0), Vec3::new(2.0, 6.0, 3.5));
//! let hit = wall
//!     .raycast(Vec3::new(0.0, 1.0, 2.0), Vec3::FORWARD, 1.5)
//!     .expect("wall is one metre ahead");
//! assert!((hit.distance - 1.0).abs() < 1e-6);
//! assert_eq!(hit.normal, Vec3::new(0.0, 0.0, -1.0));
//! ```

use ascent_types::Vec3;

/// An axis-aligned bounding box, defined by its minimum and maximum corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

/// Where a ray first enters a box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Distance along the (normalised) ray.
    pub distance: f32,
    pub point: Vec3,
    /// Outward normal of the face that was entered.
    pub normal: Vec3,
}

impl Aabb {
    /// Create a box from two opposite corners, normalising so `min <= max`.
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: Vec3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Vec3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    pub fn from_centre_size(centre: Vec3, size: Vec3) -> Self {
        let half = size.scale(0.5);
        Self::new(centre.sub(half), centre.add(half))
    }

    pub fn centre(&self) -> Vec3 {
        self.min.add(self.max).scale(0.5)
    }

    /// Grow the box by `margin` on every side.
    pub fn expanded(&self, margin: f32) -> Self {
        let m = Vec3::new(margin, margin, margin);
        Self::new(self.min.sub(m), self.max.add(m))
    }

    /// True when the point lies inside or on the boundary of the box.
    pub fn contains_point(&self, p: Vec3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Cast a ray from `origin` along `direction` for at most `max_distance`.
    ///
    /// Slab test.  A ray that starts inside the box does not hit it.
    pub fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RayHit> {
        let dir = direction.normalized();
        if dir == Vec3::ZERO || max_distance < 0.0 {
            return None;
        }

        let axes = [
            (origin.x, dir.x, self.min.x, self.max.x, Vec3::new(1.0, 0.0, 0.0)),
            (origin.y, dir.y, self.min.y, self.max.y, Vec3::new(0.0, 1.0, 0.0)),
            (origin.z, dir.z, self.min.z, self.max.z, Vec3::new(0.0, 0.0, 1.0)),
        ];

        let mut t_enter = f32::NEG_INFINITY;
        let mut t_exit = f32::INFINITY;
        let mut normal = Vec3::ZERO;

        for (o, d, lo, hi, axis) in axes {
            if d.abs() <= f32::EPSILON {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d;
            let (t_near, t_far) = {
                let t1 = (lo - o) * inv;
                let t2 = (hi - o) * inv;
                if t1 <= t2 { (t1, t2) } else { (t2, t1) }
            };
            if t_near > t_enter {
                t_enter = t_near;
                normal = if d > 0.0 { axis.neg() } else { axis };
            }
            t_exit = t_exit.min(t_far);
            if t_enter > t_exit {
                return None;
            }
        }

        if t_enter < 0.0 || t_enter > max_distance {
            return None;
        }
        Some(RayHit {
            distance: t_enter,
            point: origin.add(dir.scale(t_enter)),
            normal,
        })
    }
}
