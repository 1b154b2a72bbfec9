//! Transport traits for line-oriented devices.
//!
//! [`SensorStream`][crate::sensor::SensorStream] never talks to a serial port
//! directly.  It asks a [`Connector`] for a [`LineChannel`] and from then on
//! only reads lines and writes commands, so the real serial driver and the
//! simulated device in [`sim`][crate::sim] are interchangeable.

use std::time::Duration;

use ascent_types::{AscentError, DeviceCommand};

/// Upper bound on a single blocking read.
pub const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Longest line accepted before the buffer is discarded as garbage.
pub const MAX_LINE_LENGTH: usize = 256;

/// An open, bidirectional, newline-delimited channel to a device.
pub trait LineChannel: Send {
    /// Return the next complete line, if one is available.
    ///
    /// `Ok(None)` means nothing is pending.  Implementations may block for at
    /// most [`READ_TIMEOUT`].
    ///
    /// # Errors
    ///
    /// - [`AscentError::ReadTimeout`] when the bounded read expired.  This is
    ///   a normal outcome.
    /// - [`AscentError::DeviceUnavailable`] when the link is gone.
    fn read_line(&mut self) -> Result<Option<String>, AscentError>;

    /// Write a single command to the device.
    ///
    /// # Errors
    ///
    /// Returns [`AscentError::CommandSendFailure`] when the write fails.
    fn write_command(&mut self, command: DeviceCommand) -> Result<(), AscentError>;
}

/// Opens [`LineChannel`]s by device identifier.
pub trait Connector: Send {
    /// Open `device_id` at `baud_rate`.
    ///
    /// # Errors
    ///
    /// Returns [`AscentError::DeviceUnavailable`] when the device cannot be
    /// opened.
    fn open(&self, device_id: &str, baud_rate: u32) -> Result<Box<dyn LineChannel>, AscentError>;
}

/// Accumulates raw bytes and hands out complete lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    bytes: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append freshly read bytes.
    ///
    /// Returns `false` when the pending partial line grew past
    /// [`MAX_LINE_LENGTH`] and was dropped.
    pub fn extend(&mut self, chunk: &[u8]) -> bool {
        self.bytes.extend_from_slice(chunk);
        let pending = match self.bytes.iter().rposition(|&b| b == b'\n') {
            Some(last_newline) => self.bytes.len() - last_newline - 1,
            None => self.bytes.len(),
        };
        if pending > MAX_LINE_LENGTH {
            let keep = self.bytes.len() - pending;
            self.bytes.truncate(keep);
            return false;
        }
        true
    }

    /// Pop the oldest complete line, without its terminator (`\n` or
    /// `\r\n`).  Invalid UTF-8 is replaced lossily.
    pub fn next_line(&mut self) -> Option<String> {
        let end = self.bytes.iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = self.bytes.drain(..=end).collect();
        let text = String::from_utf8_lossy(&line[..end]);
        Some(text.trim_end_matches('\r').to_string())
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yields_only_complete_lines() {
        let mut buf = LineBuffer::new();
        assert!(buf.extend(b"12.3 L/"));
        assert_eq!(buf.next_line(), None);
        assert!(buf.extend(b"min\r\n40"));
        assert_eq!(buf.next_line().as_deref(), Some("12.3 L/min"));
        assert_eq!(buf.next_line(), None);
        buf.extend(b"\n");
        assert_eq!(buf.next_line().as_deref(), Some("40"));
    }

    #[test]
    fn multiple_lines_in_one_chunk() {
        let mut buf = LineBuffer::new();
        buf.extend(b"1\n2\n3\n");
        assert_eq!(buf.next_line().as_deref(), Some("1"));
        assert_eq!(buf.next_line().as_deref(), Some("2"));
        assert_eq!(buf.next_line().as_deref(), Some("3"));
        assert_eq!(buf.next_line(), None);
    }

    #[test]
    fn overlong_partial_line_is_dropped() {
        let mut buf = LineBuffer::new();
        buf.extend(b"5\n");
        let garbage = vec![b'x'; MAX_LINE_LENGTH + 1];
        assert!(!buf.extend(&garbage));
        // Complete lines received before the garbage survive.
        assert_eq!(buf.next_line().as_deref(), Some("5"));
        assert_eq!(buf.next_line(), None);
        buf.extend(b"7\n");
        assert_eq!(buf.next_line().as_deref(), Some("7"));
    }
}
