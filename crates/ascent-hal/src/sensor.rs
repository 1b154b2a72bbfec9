//! [`SensorStream`] – breath-flow sensor front end.
//!
//! Owns the connection to the spirometer, turns device lines into a raw flow
//! reading, and exposes the normalized `[0, 1]` signal plus a connectivity
//! flag.  Every device error is caught here and folded into state: a failed
//! open leaves the stream disconnected, a lost link disconnects it, a read
//! timeout changes nothing.  Callers fall back to manual input whenever
//! [`SensorStream::is_connected`] is `false`.
//!
//! Delayed device commands (start after connect, restart after reset) are
//! queued and released by [`SensorStream::advance`], which the tick loop
//! calls once per frame.
//!
//! # Example
//!
//! ```rust
//! use ascent_hal::sensor::{SensorConfig, SensorStream};
//! use ascent_hal::sim::SimDevice;
//!
//! let device = SimDevice::online();
//! let mut stream = SensorStream::new(SensorConfig::default(), device.connector());
//! assert!(stream.connect("sim0", 115_200));
//!
//! device.push_line("52.5 L/min");
//! stream.poll();
//! assert!((stream.normalized_value() - 0.5).abs() < 1e-6);
//! ```

use ascent_types::{AscentError, DeviceCommand, SPRINT_FLOW_FRACTION, SensorReading};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::channel::{Connector, LineChannel};
use crate::protocol::parse_flow_line;

/// Tunables for the flow sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Serial device, e.g. `/dev/ttyUSB0` or `COM4`.
    #[serde(default = "default_device_id")]
    pub device_id: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Flow (L/min) below which the normalized signal is zero.
    #[serde(default = "default_min_flow")]
    pub min_flow: f32,

    /// Flow (L/min) mapped to a normalized signal of one.
    #[serde(default = "default_max_flow")]
    pub max_flow: f32,

    /// Delay between opening the port and sending the start command.
    #[serde(default = "default_init_delay")]
    pub init_delay_secs: f32,

    /// Delay between a reset command and the automatic restart.
    #[serde(default = "default_restart_delay")]
    pub restart_delay_secs: f32,
}

fn default_device_id() -> String {
    "/dev/ttyUSB0".to_string()
}
fn default_baud_rate() -> u32 {
    115_200
}
fn default_min_flow() -> f32 {
    5.0
}
fn default_max_flow() -> f32 {
    100.0
}
fn default_init_delay() -> f32 {
    1.0
}
fn default_restart_delay() -> f32 {
    0.5
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            device_id: default_device_id(),
            baud_rate: default_baud_rate(),
            min_flow: default_min_flow(),
            max_flow: default_max_flow(),
            init_delay_secs: default_init_delay(),
            restart_delay_secs: default_restart_delay(),
        }
    }
}

impl SensorConfig {
    /// Reject settings the sensor cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`AscentError::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<(), AscentError> {
        if self.device_id.trim().is_empty() {
            return Err(AscentError::Config("sensor.device_id must not be empty".into()));
        }
        if self.baud_rate == 0 {
            return Err(AscentError::Config("sensor.baud_rate must be > 0".into()));
        }
        if !self.min_flow.is_finite() || self.min_flow < 0.0 {
            return Err(AscentError::Config(format!(
                "sensor.min_flow must be a finite value >= 0, got {}",
                self.min_flow
            )));
        }
        if !self.max_flow.is_finite() || self.max_flow <= self.min_flow {
            return Err(AscentError::Config(format!(
                "sensor.max_flow ({}) must be greater than sensor.min_flow ({})",
                self.max_flow, self.min_flow
            )));
        }
        for (name, value) in [
            ("init_delay_secs", self.init_delay_secs),
            ("restart_delay_secs", self.restart_delay_secs),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(AscentError::Config(format!(
                    "sensor.{name} must be a finite value >= 0, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Map a raw flow to `[0, 1]`.
///
/// Flows below `min_flow` map to zero; otherwise the flow is scaled linearly
/// between the thresholds and clamped.
pub fn normalize_flow(raw: f32, min_flow: f32, max_flow: f32) -> f32 {
    if raw < min_flow {
        return 0.0;
    }
    let span = max_flow - min_flow;
    if span <= f32::EPSILON {
        return 1.0;
    }
    ((raw - min_flow) / span).clamp(0.0, 1.0)
}

struct ScheduledCommand {
    command: DeviceCommand,
    remaining: f32,
}

/// Front end for the breath-flow device.
pub struct SensorStream {
    config: SensorConfig,
    connector: Box<dyn Connector>,
    channel: Option<Box<dyn LineChannel>>,
    device_id: Option<String>,
    raw_flow: f32,
    received_at: Option<DateTime<Utc>>,
    scheduled: Vec<ScheduledCommand>,
}

impl SensorStream {
    /// Create a disconnected stream that will open devices via `connector`.
    pub fn new(config: SensorConfig, connector: Box<dyn Connector>) -> Self {
        Self {
            config,
            connector,
            channel: None,
            device_id: None,
            raw_flow: 0.0,
            received_at: None,
            scheduled: Vec::new(),
        }
    }

    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    /// Try to open `device_id`.
    ///
    /// On success the start command is queued for
    /// [`init_delay_secs`][SensorConfig::init_delay_secs] later.  On failure
    /// the stream stays disconnected and `false` is returned; the caller is
    /// expected to fall back to manual input.
    pub fn connect(&mut self, device_id: &str, baud_rate: u32) -> bool {
        if self.channel.is_some() {
            self.disconnect();
        }
        info!(device = device_id, baud_rate, "connecting to flow sensor");
        match self.connector.open(device_id, baud_rate) {
            Ok(channel) => {
                self.channel = Some(channel);
                self.device_id = Some(device_id.to_string());
                self.schedule(DeviceCommand::StartTest, self.config.init_delay_secs);
                info!(device = device_id, "flow sensor connected");
                true
            }
            Err(e) => {
                warn!(device = device_id, error = %e, "flow sensor unavailable; using manual input");
                false
            }
        }
    }

    /// Connect using the device and baud rate from the configuration.
    pub fn connect_configured(&mut self) -> bool {
        let device_id = self.config.device_id.clone();
        let baud_rate = self.config.baud_rate;
        self.connect(&device_id, baud_rate)
    }

    /// Read at most one pending line and update the raw flow from it.
    ///
    /// Timeouts and unparseable lines leave the previous reading untouched.
    /// A broken link disconnects the stream.
    pub fn poll(&mut self) {
        let Some(channel) = self.channel.as_mut() else {
            return;
        };
        match channel.read_line() {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    return;
                }
                match parse_flow_line(line) {
                    Some(flow) => {
                        self.raw_flow = flow;
                        self.received_at = Some(Utc::now());
                        trace!(flow, "flow reading accepted");
                    }
                    None => debug!(line, "line carried no flow value"),
                }
            }
            Ok(None) | Err(AscentError::ReadTimeout) => {}
            Err(e) => {
                warn!(error = %e, "flow sensor link lost; falling back to manual input");
                self.channel = None;
                self.scheduled.clear();
            }
        }
    }

    /// Advance queued commands by `dt` seconds and send the ones that are due.
    pub fn advance(&mut self, dt: f32) {
        if self.scheduled.is_empty() {
            return;
        }
        let mut due = Vec::new();
        self.scheduled.retain_mut(|entry| {
            entry.remaining -= dt;
            if entry.remaining <= 0.0 {
                due.push(entry.command);
                false
            } else {
                true
            }
        });
        for command in due {
            self.send_command(command);
        }
    }

    /// Seconds until the next queued command is due, if any is queued.
    pub fn next_scheduled_in(&self) -> Option<f32> {
        self.scheduled
            .iter()
            .map(|entry| entry.remaining.max(0.0))
            .reduce(f32::min)
    }

    /// Last accepted raw flow in L/min.
    pub fn raw_flow(&self) -> f32 {
        self.raw_flow
    }

    /// Flow mapped to `[0, 1]` between the configured thresholds.
    pub fn normalized_value(&self) -> f32 {
        normalize_flow(self.raw_flow, self.config.min_flow, self.config.max_flow)
    }

    /// `true` when the raw flow exceeds 70 % of the configured maximum.
    pub fn is_sprint_signal(&self) -> bool {
        self.raw_flow > SPRINT_FLOW_FRACTION * self.config.max_flow
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_some()
    }

    /// Device identifier of the open channel, if connected.
    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref().filter(|_| self.channel.is_some())
    }

    /// Read-only snapshot for consumers.
    pub fn reading(&self) -> SensorReading {
        SensorReading {
            raw_flow: self.raw_flow,
            normalized: self.normalized_value(),
            connected: self.is_connected(),
            sprint: self.is_sprint_signal(),
            received_at: self.received_at,
        }
    }

    /// Best-effort command write.  Skipped while disconnected; failures are
    /// logged and never propagated.
    pub fn send_command(&mut self, command: DeviceCommand) {
        let Some(channel) = self.channel.as_mut() else {
            debug!(%command, "not connected; command skipped");
            return;
        };
        match channel.write_command(command) {
            Ok(()) => info!(%command, "device command sent"),
            Err(e) => warn!(error = %e, "device command failed"),
        }
    }

    /// Reset the device test and queue an automatic restart.
    pub fn reset_test(&mut self) {
        self.scheduled.retain(|entry| entry.command != DeviceCommand::StartTest);
        self.send_command(DeviceCommand::ResetTest);
        if self.is_connected() {
            self.schedule(DeviceCommand::StartTest, self.config.restart_delay_secs);
        }
    }

    /// Pause the device test, then close the channel.
    ///
    /// Safe to call repeatedly and when never connected.
    pub fn disconnect(&mut self) {
        if self.channel.is_none() {
            return;
        }
        self.send_command(DeviceCommand::PauseTest);
        self.scheduled.clear();
        self.channel = None;
        info!(device = self.device_id.as_deref().unwrap_or("?"), "flow sensor closed");
    }

    fn schedule(&mut self, command: DeviceCommand, delay_secs: f32) {
        self.scheduled.push(ScheduledCommand {
            command,
            remaining: delay_secs.max(0.0),
        });
    }
}

impl Drop for SensorStream {
    fn drop(&mut self) {
        self.disconnect();
    }
}
