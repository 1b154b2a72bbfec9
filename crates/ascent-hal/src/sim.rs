//! In-process stand-ins for headless runs and tests.
//!
//! Every external collaborator of the locomotion core has a simulated
//! counterpart here, so the whole stack can run without a spirometer, a game
//! engine or an animation rig.  The handles that tests need to inspect after
//! handing them to the core ([`SimDevice`], [`RecordingAnimator`],
//! [`SimLevel`]) are cheap clones sharing one state.
//!
//! # Example
//!
//! ```rust
//! use ascent_hal::body::CharacterBody;
//! use ascent_hal::sim::SimBody;
//! use ascent_types::Vec3;
//!
//! let mut body = SimBody::new("climber");
//! body.move_by(Vec3::new(0.0, -1.0, 2.0));
//! assert_eq!(body.position(), Vec3::new(0.0, 0.0, 2.0));
//! assert!(body.is_grounded());
//! ```

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use ascent_types::{AnimParam, AscentError, DeviceCommand, Vec3};

use crate::animation::AnimationSink;
use crate::body::CharacterBody;
use crate::channel::{Connector, LineChannel};
use crate::level::LevelControl;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ────────────────────────────────────────────────────────────────────────────
// Simulated body
// ────────────────────────────────────────────────────────────────────────────

/// A point body over an infinite flat floor.  Moves that would sink below
/// the floor are clamped onto it and leave the body grounded.
pub struct SimBody {
    id: String,
    position: Vec3,
    yaw: f32,
    floor_height: f32,
    grounded: bool,
    enabled: bool,
}

impl SimBody {
    /// Create a body standing on a floor at `y = 0`, at the origin.
    pub fn new(id: impl Into<String>) -> Box<Self> {
        Box::new(Self {
            id: id.into(),
            position: Vec3::ZERO,
            yaw: 0.0,
            floor_height: 0.0,
            grounded: true,
            enabled: true,
        })
    }

    /// Start at `position` instead of the origin.
    pub fn at(mut self: Box<Self>, position: Vec3) -> Box<Self> {
        self.position = position;
        self.grounded = position.y <= self.floor_height;
        self
    }

    pub fn with_yaw(mut self: Box<Self>, yaw_deg: f32) -> Box<Self> {
        self.yaw = yaw_deg;
        self
    }
}

impl CharacterBody for SimBody {
    fn id(&self) -> &str {
        &self.id
    }

    fn move_by(&mut self, delta: Vec3) {
        if !self.enabled {
            return;
        }
        self.position = self.position.add(delta);
        if self.position.y <= self.floor_height {
            self.position.y = self.floor_height;
            self.grounded = true;
        } else {
            self.grounded = false;
        }
    }

    fn position(&self) -> Vec3 {
        self.position
    }

    fn yaw_deg(&self) -> f32 {
        self.yaw
    }

    fn set_yaw(&mut self, yaw_deg: f32) {
        self.yaw = yaw_deg;
    }

    fn set_pose(&mut self, position: Vec3, yaw_deg: f32) {
        self.position = position;
        self.yaw = yaw_deg;
    }

    fn is_grounded(&self) -> bool {
        self.grounded
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Simulated spirometer
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct DeviceState {
    online: bool,
    lines: VecDeque<String>,
    commands: Vec<DeviceCommand>,
    timeout_pending: bool,
    fail_writes: bool,
}

/// A scripted flow device.
///
/// Lines pushed with [`push_line`][Self::push_line] are delivered one per
/// read; commands written by the host are recorded.  The device can be
/// unplugged mid-session to exercise link loss.
#[derive(Clone, Default)]
pub struct SimDevice {
    state: Arc<Mutex<DeviceState>>,
}

impl SimDevice {
    /// A device that accepts connections.
    pub fn online() -> Self {
        let device = Self::default();
        lock(&device.state).online = true;
        device
    }

    /// A device whose open always fails.
    pub fn offline() -> Self {
        Self::default()
    }

    /// A [`Connector`] that opens channels to this device.
    pub fn connector(&self) -> Box<dyn Connector> {
        Box::new(SimConnector {
            device: self.clone(),
        })
    }

    /// Queue one line of device output.
    pub fn push_line(&self, line: impl Into<String>) {
        lock(&self.state).lines.push_back(line.into());
    }

    /// Make the next read time out.
    pub fn inject_timeout(&self) {
        lock(&self.state).timeout_pending = true;
    }

    /// Make writes fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        lock(&self.state).fail_writes = fail;
    }

    /// Pull the cable: open channels error out and reopening fails.
    pub fn unplug(&self) {
        let mut state = lock(&self.state);
        state.online = false;
        state.lines.clear();
    }

    pub fn plug_in(&self) {
        lock(&self.state).online = true;
    }

    /// Commands received so far, oldest first.
    pub fn commands(&self) -> Vec<DeviceCommand> {
        lock(&self.state).commands.clone()
    }
}

struct SimConnector {
    device: SimDevice,
}

impl Connector for SimConnector {
    fn open(&self, device_id: &str, _baud_rate: u32) -> Result<Box<dyn LineChannel>, AscentError> {
        if !lock(&self.device.state).online {
            return Err(AscentError::DeviceUnavailable {
                device: device_id.to_string(),
                details: "simulated device is offline".to_string(),
            });
        }
        Ok(Box::new(SimChannel {
            device_id: device_id.to_string(),
            device: self.device.clone(),
        }))
    }
}

struct SimChannel {
    device_id: String,
    device: SimDevice,
}

impl LineChannel for SimChannel {
    fn read_line(&mut self) -> Result<Option<String>, AscentError> {
        let mut state = lock(&self.device.state);
        if !state.online {
            return Err(AscentError::DeviceUnavailable {
                device: self.device_id.clone(),
                details: "simulated device unplugged".to_string(),
            });
        }
        if state.timeout_pending {
            state.timeout_pending = false;
            return Err(AscentError::ReadTimeout);
        }
        Ok(state.lines.pop_front())
    }

    fn write_command(&mut self, command: DeviceCommand) -> Result<(), AscentError> {
        let mut state = lock(&self.device.state);
        if !state.online || state.fail_writes {
            return Err(AscentError::CommandSendFailure {
                command,
                details: "simulated write failure".to_string(),
            });
        }
        state.commands.push(command);
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Recording animator
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct AnimatorLog {
    floats: BTreeMap<AnimParam, f32>,
    bools: BTreeMap<AnimParam, bool>,
    triggers: Vec<AnimParam>,
}

/// An [`AnimationSink`] that remembers the last value of every parameter
/// and every trigger fired.
#[derive(Clone, Default)]
pub struct RecordingAnimator {
    log: Arc<Mutex<AnimatorLog>>,
}

impl RecordingAnimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn float(&self, param: AnimParam) -> Option<f32> {
        lock(&self.log).floats.get(&param).copied()
    }

    pub fn flag(&self, param: AnimParam) -> Option<bool> {
        lock(&self.log).bools.get(&param).copied()
    }

    /// Triggers fired so far, oldest first.
    pub fn triggers(&self) -> Vec<AnimParam> {
        lock(&self.log).triggers.clone()
    }
}

impl AnimationSink for RecordingAnimator {
    fn set_float(&mut self, param: AnimParam, value: f32) {
        lock(&self.log).floats.insert(param, value);
    }

    fn set_bool(&mut self, param: AnimParam, value: bool) {
        lock(&self.log).bools.insert(param, value);
    }

    fn fire_trigger(&mut self, param: AnimParam) {
        lock(&self.log).triggers.push(param);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Simulated level
// ────────────────────────────────────────────────────────────────────────────

/// Counts level reloads instead of performing them.
#[derive(Clone, Default)]
pub struct SimLevel {
    reloads: Arc<AtomicUsize>,
}

impl SimLevel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reloads(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }
}

impl LevelControl for SimLevel {
    fn reload_current_level(&mut self) {
        self.reloads.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_body_lands_on_floor() {
        let mut body = SimBody::new("climber").at(Vec3::new(0.0, 3.0, 0.0));
        assert!(!body.is_grounded());
        body.move_by(Vec3::new(0.0, -1.0, 0.0));
        assert!(!body.is_grounded());
        body.move_by(Vec3::new(0.0, -5.0, 0.0));
        assert!(body.is_grounded());
        assert_eq!(body.position().y, 0.0);
    }

    #[test]
    fn sim_body_disabled_ignores_moves_but_accepts_teleport() {
        let mut body = SimBody::new("climber");
        body.move_by(Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(body.position(), Vec3::new(1.0, 0.0, 0.0));

        body.set_enabled(false);
        body.move_by(Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(body.position(), Vec3::new(1.0, 0.0, 0.0));

        body.set_pose(Vec3::new(0.0, 2.0, 0.0), 90.0);
        assert_eq!(body.position(), Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(body.yaw_deg(), 90.0);
        assert!(!body.is_enabled());
    }

    #[test]
    fn sim_device_delivers_lines_in_order() {
        let device = SimDevice::online();
        let mut channel = device.connector().open("sim0", 9600).unwrap();
        device.push_line("a");
        device.push_line("b");
        assert_eq!(channel.read_line().unwrap().as_deref(), Some("a"));
        assert_eq!(channel.read_line().unwrap().as_deref(), Some("b"));
        assert_eq!(channel.read_line().unwrap(), None);
    }

    #[test]
    fn sim_device_offline_refuses_open() {
        let device = SimDevice::offline();
        assert!(matches!(
            device.connector().open("sim0", 9600),
            Err(AscentError::DeviceUnavailable { .. })
        ));
        device.plug_in();
        assert!(device.connector().open("sim0", 9600).is_ok());
    }

    #[test]
    fn unplugged_channel_reports_unavailable() {
        let device = SimDevice::online();
        let mut channel = device.connector().open("sim0", 9600).unwrap();
        device.unplug();
        assert!(matches!(
            channel.read_line(),
            Err(AscentError::DeviceUnavailable { .. })
        ));
        assert!(channel.write_command(DeviceCommand::PauseTest).is_err());
    }

    #[test]
    fn recording_animator_keeps_last_values() {
        let animator = RecordingAnimator::new();
        let mut sink: Box<dyn AnimationSink> = Box::new(animator.clone());
        sink.set_float(AnimParam::Speed, 1.0);
        sink.set_float(AnimParam::Speed, 2.0);
        sink.set_bool(AnimParam::Grounded, false);
        sink.fire_trigger(AnimParam::Celebrate);
        assert_eq!(animator.float(AnimParam::Speed), Some(2.0));
        assert_eq!(animator.flag(AnimParam::Grounded), Some(false));
        assert_eq!(animator.triggers(), vec![AnimParam::Celebrate]);
    }

    #[test]
    fn sim_level_counts_reloads() {
        let level = SimLevel::new();
        let mut handle: Box<dyn LevelControl> = Box::new(level.clone());
        handle.reload_current_level();
        handle.reload_current_level();
        assert_eq!(level.reloads(), 2);
    }
}
