//! `ascent-cli` – Ascent command line interface.
//!
//! This binary is the entry point for the breath-driven climbing core.  It:
//!
//! 1. Installs structured logging (and OTLP export when configured).
//! 2. Checks for `~/.ascent/config.toml`; runs a **First-Run Wizard** when
//!    the file is absent.
//! 3. Lists the serial devices it can see.
//! 4. Drops the user into an **interactive REPL** (`/connect`, `/run`,
//!    `/status`, `/help`, …).
//! 5. Intercepts **Ctrl-C**: the current run stops and the sensor is paused
//!    and closed before exit.

mod config;
mod course;
mod repl;

use colored::Colorize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

use ascent_hal::serial::available_ports;

fn main() {
    // Held until exit so pending spans are flushed.
    let _telemetry = ascent_runtime::telemetry::init_tracing("ascent");

    print_banner();

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!(
            "{}",
            "⚠  Ctrl-C received – stopping and closing the sensor …"
                .yellow()
                .bold()
        );
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "failed to install Ctrl-C handler; graceful shutdown on Ctrl-C is unavailable");
    }

    // ── First-Run Wizard ──────────────────────────────────────────────────
    let cfg = match config::load() {
        Ok(None) => run_first_run_wizard(),
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            config::Config::default()
        }
    };

    // ── Port discovery ────────────────────────────────────────────────────
    let ports = available_ports();
    if ports.is_empty() {
        println!(
            "  {}  The keyboard script will drive {}.",
            "No serial devices detected.".dimmed(),
            "/run".bold()
        );
    } else {
        println!("  Serial devices:");
        for port in &ports {
            let marker = if *port == cfg.sensor.device_id { "▶" } else { " " };
            println!("    {} {}", marker.green(), port.bold());
        }
    }

    println!();
    println!("  Type {} for a list of commands.\n", "/help".bold().cyan());

    // ── Interactive REPL ──────────────────────────────────────────────────
    repl::run(cfg, shutdown);
    println!("{}", "  ✓ Exiting Ascent.".green());
}

// ─────────────────────────────────────────────────────────────────────────────
// First-Run Wizard
// ─────────────────────────────────────────────────────────────────────────────

fn run_first_run_wizard() -> config::Config {
    println!();
    println!("{}", "  ╔══════════════════════════════════════╗".bold().cyan());
    println!("{}", "  ║       Ascent First-Run Wizard        ║".bold().cyan());
    println!("{}", "  ╚══════════════════════════════════════╝".bold().cyan());
    println!();
    println!("  No configuration found.  Let's set up Ascent.\n");

    let mut cfg = config::Config::default();

    cfg.sensor.device_id = repl::prompt_str(
        &format!("  Flow sensor serial device [{}]: ", cfg.sensor.device_id),
        &cfg.sensor.device_id,
    );

    let baud = repl::prompt_str(
        &format!("  Baud rate [{}]: ", cfg.sensor.baud_rate),
        &cfg.sensor.baud_rate.to_string(),
    );
    if let Ok(b) = baud.trim().parse::<u32>() {
        cfg.sensor.baud_rate = b;
    }

    let hz = repl::prompt_str(
        &format!("  Simulation tick rate in Hz [{}]: ", cfg.tick_hz),
        &cfg.tick_hz.to_string(),
    );
    if let Ok(h) = hz.trim().parse::<u32>()
        && h > 0
    {
        cfg.tick_hz = h;
    }

    match config::save(&cfg) {
        Ok(()) => println!(
            "\n  {} Config saved to {}\n",
            "✓".green().bold(),
            config::config_path().display().to_string().bold()
        ),
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }
    cfg
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"    ___                        __ "#.bold().cyan());
    println!("{}", r#"   /   |  ______________  ____/ /_"#.bold().cyan());
    println!("{}", r#"  / /| | / ___/ ___/ _ \/ __ \/ __/"#.bold().cyan());
    println!("{}", r#" / ___ |(__  ) /__/  __/ / / / /_  "#.bold().cyan());
    println!("{}", r#"/_/  |_/____/\___/\___/_/ /_/\__/  "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "Ascent".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Breath-driven climbing");
    println!();
}
