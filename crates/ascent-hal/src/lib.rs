//! Device and body boundary for Ascent.
//!
//! - [`sensor::SensorStream`] reads the breath-flow device and degrades to a
//!   disconnected state on any I/O failure.
//! - [`body::CharacterBody`], [`animation::AnimationSink`],
//!   [`camera::CameraRig`] and [`level::LevelControl`] are the external
//!   collaborators the locomotion core writes to or reads from.
//! - [`sim`] provides in-process stand-ins for all of the above.

pub mod animation;
pub mod body;
pub mod camera;
pub mod channel;
pub mod level;
pub mod protocol;
pub mod sensor;
pub mod serial;
pub mod sim;

pub use animation::{AnimationSignals, AnimationSink};
pub use body::CharacterBody;
pub use camera::{CameraRig, FixedHeading};
pub use channel::{Connector, LineChannel};
pub use level::LevelControl;
pub use sensor::{SensorConfig, SensorStream};
pub use serial::{SerialConnector, available_ports};
