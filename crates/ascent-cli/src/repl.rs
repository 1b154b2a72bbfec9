//! REPL – the Ascent interactive shell.
//!
//! Supported slash-commands:
//!   /help            – show this list
//!   /settings        – edit `~/.ascent/config.toml`
//!   /ports           – list serial devices
//!   /connect [dev]   – open the flow sensor
//!   /disconnect      – pause and close the flow sensor
//!   /send <i|p|r>    – send a raw device command
//!   /run [seconds]   – headless ascent of the practice course
//!   /status          – sensor state and the last tick report
//!   /quit | /exit    – close the sensor and exit

use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use ascent_hal::channel::Connector;
use ascent_hal::sensor::{SensorConfig, SensorStream};
use ascent_hal::serial::{SerialConnector, available_ports};
use ascent_runtime::ascent_loop::TickReport;
use ascent_types::{DeviceCommand, LocomotionState};

use crate::config::{self, Config};
use crate::course;

/// Default simulated duration of `/run`.
const DEFAULT_RUN_SECONDS: f32 = 20.0;

/// A parsed slash-command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Settings,
    Ports,
    Connect(Option<String>),
    Disconnect,
    Send(DeviceCommand),
    Run(f32),
    Status,
    Quit,
}

/// Parse one input line.
///
/// Returns `Ok(None)` for blank input and `Err` with a user-facing message
/// for anything unrecognised.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();

    let command = match head {
        "/help" => Command::Help,
        "/settings" => Command::Settings,
        "/ports" => Command::Ports,
        "/connect" => Command::Connect(arg.map(str::to_string)),
        "/disconnect" => Command::Disconnect,
        "/send" => {
            let code = arg
                .and_then(|a| {
                    let mut chars = a.chars();
                    match (chars.next(), chars.next()) {
                        (Some(c), None) => Some(c),
                        _ => None,
                    }
                })
                .ok_or_else(|| "usage: /send <i|p|r>".to_string())?;
            let command = DeviceCommand::from_code(code)
                .ok_or_else(|| format!("unknown device command '{code}' (expected i, p or r)"))?;
            Command::Send(command)
        }
        "/run" => {
            let seconds = match arg {
                None => DEFAULT_RUN_SECONDS,
                Some(a) => a
                    .parse::<f32>()
                    .ok()
                    .filter(|s| s.is_finite() && *s > 0.0)
                    .ok_or_else(|| format!("'{a}' is not a positive number of seconds"))?,
            };
            Command::Run(seconds)
        }
        "/status" => Command::Status,
        "/quit" | "/exit" => Command::Quit,
        other => return Err(format!("unknown command '{other}'")),
    };
    Ok(Some(command))
}

/// State carried between commands.
struct Session {
    config: Config,
    sensor: Option<SensorStream>,
    last_report: Option<TickReport>,
}

impl Session {
    fn new(config: Config) -> Self {
        Self {
            config,
            sensor: None,
            last_report: None,
        }
    }

    fn close_sensor(&mut self) {
        if let Some(mut sensor) = self.sensor.take() {
            sensor.disconnect();
            println!("  {} flow sensor paused and closed", "✓".green());
        }
    }
}

/// Entry point for the interactive REPL.
///
/// `shutdown` is polled each iteration and during `/run`; when set the REPL
/// closes the sensor and exits.
pub fn run(config: Config, shutdown: Arc<AtomicBool>) {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("{}: {}", "Cannot start line editor".red(), e);
            return;
        }
    };
    let mut session = Session::new(config);

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        let line = match editor.readline("ascent> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                shutdown.store(true, Ordering::SeqCst);
                break;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        };
        let _ = editor.add_history_entry(line.as_str());

        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                println!(
                    "{} {}. Type {} for available commands.",
                    "Error:".red(),
                    message.yellow(),
                    "/help".bold()
                );
                continue;
            }
        };

        match command {
            Command::Help => cmd_help(),
            Command::Settings => cmd_settings(&mut session),
            Command::Ports => cmd_ports(),
            Command::Connect(device) => cmd_connect(&mut session, device),
            Command::Disconnect => session.close_sensor(),
            Command::Send(command) => cmd_send(&mut session, command),
            Command::Run(seconds) => cmd_run(&mut session, seconds, &shutdown),
            Command::Status => cmd_status(&session),
            Command::Quit => {
                println!("{}", "Goodbye.".green());
                shutdown.store(true, Ordering::SeqCst);
                break;
            }
        }
    }

    session.close_sensor();
}

// ─────────────────────────────────────────────────────────────────────────────
// Command handlers
// ─────────────────────────────────────────────────────────────────────────────

fn cmd_help() {
    println!();
    println!("{}", "Ascent Commands".bold().underline());
    println!("  {}        – edit ~/.ascent/config.toml", "/settings".bold().cyan());
    println!("  {}           – list serial devices", "/ports".bold().cyan());
    println!("  {}   – open the flow sensor", "/connect [dev]".bold().cyan());
    println!("  {}      – pause and close the flow sensor", "/disconnect".bold().cyan());
    println!("  {}    – send start / pause / reset", "/send <i|p|r>".bold().cyan());
    println!("  {}   – simulated ascent of the practice course", "/run [secs]".bold().cyan());
    println!("  {}          – sensor state and last tick report", "/status".bold().cyan());
    println!("  {}     – exit", "/quit  /exit".bold().cyan());
    println!();
}

fn cmd_settings(session: &mut Session) {
    let cfg = &mut session.config;
    println!("{}", "Settings Editor".bold().underline());
    println!("  (press Enter to keep the current value)");

    cfg.sensor.device_id = prompt_str(
        &format!("  Sensor device   [{}]: ", cfg.sensor.device_id),
        &cfg.sensor.device_id,
    );
    cfg.sensor.baud_rate = prompt_parse(
        &format!("  Baud rate       [{}]: ", cfg.sensor.baud_rate),
        cfg.sensor.baud_rate,
    );
    cfg.tick_hz = prompt_parse(&format!("  Tick rate (Hz)  [{}]: ", cfg.tick_hz), cfg.tick_hz).max(1);
    cfg.keyboard_fallback = prompt_parse(
        &format!("  Keyboard fallback (true/false) [{}]: ", cfg.keyboard_fallback),
        cfg.keyboard_fallback,
    );
    cfg.locomotion.max_climb_duration = prompt_parse(
        &format!("  Max climb time  [{}]: ", cfg.locomotion.max_climb_duration),
        cfg.locomotion.max_climb_duration,
    );

    if let Err(e) = cfg.sensor.validate().and_then(|()| cfg.locomotion.validate()) {
        println!("{}: {}", "Invalid settings".red(), e);
        return;
    }
    match config::save(cfg) {
        Ok(()) => println!(
            "{} {}",
            "✓ Settings saved to".green(),
            config::config_path().display().to_string().bold()
        ),
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }
}

fn cmd_ports() {
    let ports = available_ports();
    if ports.is_empty() {
        println!("  {}", "No serial devices found.".dimmed());
        return;
    }
    println!("{}", "Serial devices".bold().underline());
    for port in ports {
        println!("    • {}", port.bold());
    }
}

fn cmd_connect(session: &mut Session, device: Option<String>) {
    session.close_sensor();
    let device = device.unwrap_or_else(|| session.config.sensor.device_id.clone());
    let baud_rate = session.config.sensor.baud_rate;

    match open_sensor(
        &session.config.sensor,
        Box::new(SerialConnector),
        &device,
        std::thread::sleep,
    ) {
        Some(sensor) => {
            println!(
                "  {} {} at {} baud, test started",
                "🟢 connected to".green(),
                device.bold(),
                baud_rate
            );
            session.sensor = Some(sensor);
        }
        None => println!(
            "  {} {} – keyboard input will be used",
            "🔴 could not open".red(),
            device.bold()
        ),
    }
}

fn cmd_send(session: &mut Session, command: DeviceCommand) {
    let Some(sensor) = session.sensor.as_mut().filter(|s| s.is_connected()) else {
        println!("  {} use {} first", "Not connected:".yellow(), "/connect".bold());
        return;
    };
    send_device_command(sensor, command, std::thread::sleep);
    if command == DeviceCommand::ResetTest {
        println!(
            "  {} '{}', restarted with '{}'",
            "✓ sent".green(),
            command,
            DeviceCommand::StartTest
        );
    } else {
        println!("  {} '{}'", "✓ sent".green(), command);
    }
}

fn cmd_run(session: &mut Session, seconds: f32, shutdown: &AtomicBool) {
    let realtime = session.sensor.as_ref().is_some_and(SensorStream::is_connected);
    let sensor = session.sensor.take().unwrap_or_else(|| {
        SensorStream::new(session.config.sensor.clone(), Box::new(SerialConnector))
    });

    let mut course = match course::build(&session.config, sensor) {
        Ok(course) => course,
        Err(e) => {
            println!("{}: {}", "Cannot build course".red(), e);
            return;
        }
    };

    let source = if realtime { "breath sensor" } else { "keyboard script" };
    println!(
        "  Running for up to {}s using the {} …",
        seconds,
        source.bold()
    );

    let summary = course::run(&mut course, &session.config, seconds, realtime, shutdown, |r| {
        println!(
            "  [{:>7.2}s] {} at height {:.2} m",
            r.clock,
            state_label(r.state),
            r.position.y
        );
    });

    if summary.interrupted {
        println!("  {}", "Run interrupted.".yellow());
    }
    println!(
        "  Finished after {} ticks: {} ({} level reload(s))",
        summary.ticks,
        state_label(summary.final_state),
        summary.level_reloads
    );

    session.last_report = summary.last_report;
    let sensor = course.ascent.into_sensor();
    if sensor.is_connected() {
        session.sensor = Some(sensor);
    } else if realtime {
        warn!("flow sensor was lost during the run");
    }
}

fn cmd_status(session: &Session) {
    println!("{}", "Status".bold().underline());
    match session.sensor.as_ref().filter(|s| s.is_connected()) {
        Some(sensor) => {
            let reading = sensor.reading();
            println!(
                "  Sensor  : {} {}",
                "connected".green(),
                sensor.device_id().unwrap_or("?").bold()
            );
            println!(
                "  Flow    : {:.1} L/min (normalized {:.2}{})",
                reading.raw_flow,
                reading.normalized,
                if reading.sprint { ", sprint" } else { "" }
            );
            match reading.received_at {
                Some(at) => {
                    let age = chrono::Utc::now().signed_duration_since(at);
                    println!("  Last    : {} ms ago", age.num_milliseconds());
                }
                None => println!("  Last    : {}", "no reading yet".dimmed()),
            }
        }
        None => println!("  Sensor  : {}", "disconnected".yellow()),
    }

    match session.last_report.as_ref().map(serde_json::to_string_pretty) {
        Some(Ok(json)) => println!("  Last tick report:\n{json}"),
        Some(Err(e)) => println!("{}: {}", "Cannot encode report".red(), e),
        None => println!("  {}", "No run yet. Try /run.".dimmed()),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Open `device` and wait out the start-up delay so the start command
/// reaches the device before the prompt returns.
fn open_sensor(
    config: &SensorConfig,
    connector: Box<dyn Connector>,
    device: &str,
    wait: impl FnMut(Duration),
) -> Option<SensorStream> {
    let mut sensor = SensorStream::new(config.clone(), connector);
    if !sensor.connect(device, config.baud_rate) {
        return None;
    }
    flush_scheduled(&mut sensor, wait);
    Some(sensor)
}

/// Send `command`; a reset also waits for its automatic restart.
fn send_device_command(
    sensor: &mut SensorStream,
    command: DeviceCommand,
    wait: impl FnMut(Duration),
) {
    match command {
        DeviceCommand::ResetTest => sensor.reset_test(),
        other => sensor.send_command(other),
    }
    flush_scheduled(sensor, wait);
}

/// Release every queued device command, waiting until each one is due.
/// Outside `/run` nothing else advances the queue.
fn flush_scheduled(sensor: &mut SensorStream, mut wait: impl FnMut(Duration)) {
    while let Some(delay) = sensor.next_scheduled_in() {
        if delay > 0.0 {
            debug!(delay, "waiting for queued device command");
            wait(Duration::from_secs_f32(delay));
        }
        sensor.advance(delay);
    }
}

fn state_label(state: LocomotionState) -> colored::ColoredString {
    let label = state.to_string().to_uppercase();
    match state {
        LocomotionState::Walking => label.normal(),
        LocomotionState::Climbing => label.cyan().bold(),
        LocomotionState::Celebrating => label.green().bold(),
        LocomotionState::Frozen => label.red().bold(),
    }
}

/// Prompt for a value.  Returns `default` on Enter or on a parse failure.
fn prompt_parse<T: std::str::FromStr + std::fmt::Display>(msg: &str, default: T) -> T {
    let raw = prompt_str(msg, &default.to_string());
    match raw.parse::<T>() {
        Ok(v) => v,
        Err(_) => {
            println!(
                "  {} '{}' is not valid, keeping {}",
                "Warning:".yellow(),
                raw,
                default
            );
            default
        }
    }
}

/// Prompt for a string value.  Returns `default` when the user presses Enter.
pub(crate) fn prompt_str(msg: &str, default: &str) -> String {
    use std::io::{BufRead, Write};
    print!("{}", msg);
    std::io::stdout().flush().ok();

    let mut line = String::new();
    match std::io::stdin().lock().read_line(&mut line) {
        Ok(_) => {
            let trimmed = line.trim().to_string();
            if trimmed.is_empty() {
                default.to_string()
            } else {
                trimmed
            }
        }
        Err(_) => default.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ascent_hal::sim::SimDevice;

    #[test]
    fn blank_line_is_not_a_command() {
        assert_eq!(parse_command("   "), Ok(None));
    }

    #[test]
    fn simple_commands_parse() {
        assert_eq!(parse_command("/help"), Ok(Some(Command::Help)));
        assert_eq!(parse_command("/status"), Ok(Some(Command::Status)));
        assert_eq!(parse_command("/exit"), Ok(Some(Command::Quit)));
        assert_eq!(parse_command("/ports"), Ok(Some(Command::Ports)));
    }

    #[test]
    fn connect_takes_optional_device() {
        assert_eq!(parse_command("/connect"), Ok(Some(Command::Connect(None))));
        assert_eq!(
            parse_command("/connect COM4"),
            Ok(Some(Command::Connect(Some("COM4".to_string()))))
        );
    }

    #[test]
    fn send_maps_device_codes() {
        assert_eq!(
            parse_command("/send i"),
            Ok(Some(Command::Send(DeviceCommand::StartTest)))
        );
        assert_eq!(
            parse_command("/send r"),
            Ok(Some(Command::Send(DeviceCommand::ResetTest)))
        );
        assert!(parse_command("/send").is_err());
        assert!(parse_command("/send x").is_err());
        assert!(parse_command("/send ip").is_err());
    }

    #[test]
    fn run_duration_defaults_and_validates() {
        assert_eq!(
            parse_command("/run"),
            Ok(Some(Command::Run(DEFAULT_RUN_SECONDS)))
        );
        assert_eq!(parse_command("/run 7.5"), Ok(Some(Command::Run(7.5))));
        assert!(parse_command("/run -3").is_err());
        assert!(parse_command("/run soon").is_err());
    }

    #[test]
    fn connect_sends_start_after_init_delay() {
        let device = SimDevice::online();
        let mut waits = Vec::new();
        let sensor = open_sensor(&SensorConfig::default(), device.connector(), "sim0", |d| {
            waits.push(d)
        })
        .expect("sim device opens");

        assert!(sensor.is_connected());
        assert_eq!(sensor.next_scheduled_in(), None);
        assert_eq!(device.commands(), vec![DeviceCommand::StartTest]);
        assert_eq!(waits, vec![Duration::from_secs(1)]);
    }

    #[test]
    fn failed_connect_waits_for_nothing() {
        let device = SimDevice::offline();
        let mut waited = false;
        let sensor = open_sensor(&SensorConfig::default(), device.connector(), "sim0", |_| {
            waited = true
        });
        assert!(sensor.is_none());
        assert!(!waited);
    }

    #[test]
    fn reset_is_followed_by_restart() {
        let device = SimDevice::online();
        let mut sensor =
            open_sensor(&SensorConfig::default(), device.connector(), "sim0", |_| {}).unwrap();

        let mut waits = Vec::new();
        send_device_command(&mut sensor, DeviceCommand::ResetTest, |d| waits.push(d));

        assert_eq!(
            device.commands(),
            vec![
                DeviceCommand::StartTest,
                DeviceCommand::ResetTest,
                DeviceCommand::StartTest
            ]
        );
        assert_eq!(waits, vec![Duration::from_millis(500)]);

        sensor.disconnect();
        assert_eq!(device.commands().last(), Some(&DeviceCommand::PauseTest));
    }

    #[test]
    fn plain_commands_go_out_immediately() {
        let device = SimDevice::online();
        let mut sensor =
            open_sensor(&SensorConfig::default(), device.connector(), "sim0", |_| {}).unwrap();

        let mut waited = false;
        send_device_command(&mut sensor, DeviceCommand::PauseTest, |_| waited = true);
        assert!(!waited);
        assert_eq!(
            device.commands(),
            vec![DeviceCommand::StartTest, DeviceCommand::PauseTest]
        );
    }

    #[test]
    fn unknown_command_is_rejected() {
        assert!(parse_command("/fly").is_err());
    }
}
