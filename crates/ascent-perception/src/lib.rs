//! `ascent-perception` – spatial collaborators of the locomotion core.
//!
//! # Modules
//!
//! - [`shape`] – [`Aabb`][shape::Aabb] boxes with containment, overlap and
//!   ray casts that report the entered face's normal.
//! - [`zone`] – [`ClimbZoneProbe`][zone::ClimbZoneProbe]: forward probe and
//!   containment test for climbable walls, with the box-based
//!   [`ZoneField`][zone::ZoneField].
//! - [`goal`] – [`GoalNotifier`][goal::GoalNotifier] and the dwell-time
//!   [`SummitZone`][goal::SummitZone].

pub mod goal;
pub mod shape;
pub mod zone;

pub use goal::{GoalNotifier, SummitZone};
pub use shape::Aabb;
pub use zone::{ClimbZone, ClimbZoneProbe, ZoneField, ZoneHandle, ZoneHit};
