//! Serial-port transport for the physical spirometer.
//!
//! The port is opened with a [`READ_TIMEOUT`] read deadline and both the DTR
//! and RTS control lines asserted, which the device firmware needs before it
//! starts streaming.

use std::io::{ErrorKind, Read, Write};

use ascent_types::{AscentError, DeviceCommand};
use serialport::SerialPort;
use tracing::{debug, info};

use crate::channel::{Connector, LineBuffer, LineChannel, READ_TIMEOUT};
use crate::protocol::encode_command;

/// Opens [`SerialChannel`]s through the host's serial-port driver.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialConnector;

impl Connector for SerialConnector {
    fn open(&self, device_id: &str, baud_rate: u32) -> Result<Box<dyn LineChannel>, AscentError> {
        let unavailable = |details: String| AscentError::DeviceUnavailable {
            device: device_id.to_string(),
            details,
        };

        let mut port = serialport::new(device_id, baud_rate)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|e| unavailable(e.to_string()))?;
        port.write_data_terminal_ready(true)
            .map_err(|e| unavailable(format!("cannot assert DTR: {e}")))?;
        port.write_request_to_send(true)
            .map_err(|e| unavailable(format!("cannot assert RTS: {e}")))?;

        info!(device = device_id, baud_rate, "serial port opened");
        Ok(Box::new(SerialChannel {
            device_id: device_id.to_string(),
            port,
            buffer: LineBuffer::new(),
        }))
    }
}

/// A [`LineChannel`] over an open serial port.
pub struct SerialChannel {
    device_id: String,
    port: Box<dyn SerialPort>,
    buffer: LineBuffer,
}

impl LineChannel for SerialChannel {
    fn read_line(&mut self) -> Result<Option<String>, AscentError> {
        if let Some(line) = self.buffer.next_line() {
            return Ok(Some(line));
        }

        let pending = self.port.bytes_to_read().map_err(|e| AscentError::DeviceUnavailable {
            device: self.device_id.clone(),
            details: e.to_string(),
        })?;
        if pending == 0 {
            return Ok(None);
        }

        let mut chunk = [0u8; 128];
        match self.port.read(&mut chunk) {
            Ok(0) => Ok(None),
            Ok(n) => {
                if !self.buffer.extend(&chunk[..n]) {
                    debug!(device = %self.device_id, "discarded over-long line");
                }
                Ok(self.buffer.next_line())
            }
            Err(e) if e.kind() == ErrorKind::TimedOut => Err(AscentError::ReadTimeout),
            Err(e) => Err(AscentError::DeviceUnavailable {
                device: self.device_id.clone(),
                details: e.to_string(),
            }),
        }
    }

    fn write_command(&mut self, command: DeviceCommand) -> Result<(), AscentError> {
        self.port
            .write_all(&encode_command(command))
            .and_then(|()| self.port.flush())
            .map_err(|e| AscentError::CommandSendFailure {
                command,
                details: e.to_string(),
            })
    }
}

/// List the serial device names present on this host.
///
/// Enumeration failures yield an empty list.
pub fn available_ports() -> Vec<String> {
    match serialport::available_ports() {
        Ok(ports) => ports.into_iter().map(|p| p.port_name).collect(),
        Err(e) => {
            debug!(error = %e, "serial port enumeration failed");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opening_missing_device_reports_unavailable() {
        let result = SerialConnector.open("/dev/ascent-does-not-exist", 115_200);
        match result {
            Err(AscentError::DeviceUnavailable { device, .. }) => {
                assert_eq!(device, "/dev/ascent-does-not-exist");
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("a nonexistent device must not open"),
        }
    }
}
