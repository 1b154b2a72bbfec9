//! Spirometer line protocol.
//!
//! The device streams newline-delimited text.  Each line holds whitespace or
//! tab separated tokens, some of which carry a trailing `L/min` unit marker:
//!
//! ```text
//! FLOW\t12.3 L/min\tVOL 0.80
//! ```
//!
//! The consumer scans tokens left to right and keeps the **first** one that
//! parses as a number inside `[0, 90000]`.  Everything else on the line is
//! ignored.  Host-to-device commands are a single ASCII character followed by
//! a newline (see [`DeviceCommand`]).

use ascent_types::{AscentError, DeviceCommand, MAX_PLAUSIBLE_FLOW};
use tracing::debug;

/// Unit marker stripped from tokens before numeric parsing.
pub const FLOW_UNIT_SUFFIX: &str = "L/min";

/// Extract the raw flow value from one device line.
///
/// Returns `None` when no token qualifies; the caller keeps its previous
/// reading in that case.
///
/// # Example
///
/// ```rust
/// use ascent_hal::protocol::parse_flow_line;
///
/// assert_eq!(parse_flow_line("12.3 L/min"), Some(12.3));
/// assert_eq!(parse_flow_line("notanumber foo"), None);
/// ```
pub fn parse_flow_line(line: &str) -> Option<f32> {
    line.split(['\t', ' '])
        .filter(|token| !token.is_empty())
        .find_map(|token| match parse_flow_token(token) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(token, error = %e, "skipping token");
                None
            }
        })
}

/// Parse a single token, stripping the unit marker first.
///
/// # Errors
///
/// Returns [`AscentError::MalformedReading`] when the token is not a number
/// or lies outside the plausible flow range.
pub fn parse_flow_token(token: &str) -> Result<f32, AscentError> {
    let cleaned = token.replace(FLOW_UNIT_SUFFIX, "");
    let cleaned = cleaned.trim();
    let value: f32 = cleaned
        .parse()
        .map_err(|_| AscentError::MalformedReading(format!("'{token}' is not numeric")))?;
    if (0.0..=MAX_PLAUSIBLE_FLOW).contains(&value) {
        Ok(value)
    } else {
        Err(AscentError::MalformedReading(format!(
            "'{token}' outside [0, {MAX_PLAUSIBLE_FLOW}]"
        )))
    }
}

/// Wire bytes for a host-to-device command.
pub fn encode_command(command: DeviceCommand) -> Vec<u8> {
    format!("{}\n", command.code()).into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_with_separate_unit_token() {
        assert_eq!(parse_flow_line("12.3 L/min"), Some(12.3));
    }

    #[test]
    fn value_with_attached_unit() {
        assert_eq!(parse_flow_line("42.5L/min"), Some(42.5));
    }

    #[test]
    fn non_numeric_line_yields_nothing() {
        assert_eq!(parse_flow_line("notanumber foo"), None);
        assert_eq!(parse_flow_line(""), None);
        assert_eq!(parse_flow_line(" \t "), None);
    }

    #[test]
    fn first_valid_token_wins() {
        assert_eq!(parse_flow_line("FLOW\t30.0\t45.0"), Some(30.0));
    }

    #[test]
    fn out_of_range_tokens_are_skipped() {
        assert_eq!(parse_flow_line("-4.0 95000 17"), Some(17.0));
        assert_eq!(parse_flow_line("-1 100000"), None);
    }

    #[test]
    fn range_bounds_are_inclusive() {
        assert_eq!(parse_flow_line("0"), Some(0.0));
        assert_eq!(parse_flow_line("90000"), Some(90_000.0));
    }

    #[test]
    fn nan_and_infinity_are_rejected() {
        assert_eq!(parse_flow_line("NaN inf 3"), Some(3.0));
    }

    #[test]
    fn malformed_token_reports_error() {
        assert!(matches!(
            parse_flow_token("abc"),
            Err(AscentError::MalformedReading(_))
        ));
    }

    #[test]
    fn commands_are_newline_terminated() {
        assert_eq!(encode_command(DeviceCommand::StartTest), b"i\n");
        assert_eq!(encode_command(DeviceCommand::PauseTest), b"p\n");
    }
}
