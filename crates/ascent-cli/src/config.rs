//! Configuration vault – reads/writes `~/.ascent/config.toml`.

use ascent_hal::sensor::SensorConfig;
use ascent_runtime::config::LocomotionConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Persisted user configuration stored in `~/.ascent/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Simulation frames per second for `/run`.
    #[serde(default = "default_tick_hz")]
    pub tick_hz: u32,

    /// Use the keyboard script when the sensor is disconnected.
    #[serde(default = "default_keyboard_fallback")]
    pub keyboard_fallback: bool,

    /// Actor handle the summit zone reports to.
    #[serde(default)]
    pub actor: u32,

    #[serde(default)]
    pub sensor: SensorConfig,

    #[serde(default)]
    pub locomotion: LocomotionConfig,
}

fn default_tick_hz() -> u32 {
    60
}
fn default_keyboard_fallback() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_hz: default_tick_hz(),
            keyboard_fallback: default_keyboard_fallback(),
            actor: 0,
            sensor: SensorConfig::default(),
            locomotion: LocomotionConfig::default(),
        }
    }
}

impl Config {
    /// Seconds per simulation frame.
    pub fn tick_dt(&self) -> f32 {
        1.0 / self.tick_hz.max(1) as f32
    }
}

/// Return the path to `~/.ascent/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".ascent").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
/// `ASCENT_*` overrides are applied on top of the file.
pub fn load() -> Result<Option<Config>, String> {
    let mut cfg = load_from(&config_path())?;
    if let Some(cfg) = cfg.as_mut() {
        apply_env_overrides(cfg);
        cfg.sensor.validate().map_err(|e| e.to_string())?;
    }
    Ok(cfg)
}

pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    cfg.sensor.validate().map_err(|e| e.to_string())?;
    cfg.locomotion.validate().map_err(|e| e.to_string())?;
    Ok(Some(cfg))
}

/// Apply `ASCENT_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `ASCENT_DEVICE` | `sensor.device_id` |
/// | `ASCENT_BAUD_RATE` | `sensor.baud_rate` |
/// | `ASCENT_TICK_HZ` | `tick_hz` |
///
/// Unparseable numbers are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("ASCENT_DEVICE") {
        cfg.sensor.device_id = v;
    }
    if let Ok(v) = std::env::var("ASCENT_BAUD_RATE")
        && let Ok(baud) = v.parse::<u32>()
    {
        cfg.sensor.baud_rate = baud;
    }
    if let Ok(v) = std::env::var("ASCENT_TICK_HZ")
        && let Ok(hz) = v.parse::<u32>()
        && hz > 0
    {
        cfg.tick_hz = hz;
    }
}

/// Save the config to disk, creating `~/.ascent/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn config_file_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        save_to(&Config::default(), &path).expect("save");

        let file_mode = std::fs::metadata(&path).expect("file metadata").permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600);

        let dir_meta = std::fs::metadata(path.parent().unwrap()).expect("dir metadata");
        assert_eq!(dir_meta.permissions().mode() & 0o777, 0o700);
    }

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        let mut cfg = Config::default();
        cfg.sensor.device_id = "/dev/ttyACM3".to_string();
        cfg.locomotion.max_climb_duration = 12.5;
        save_to(&cfg, &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.sensor.device_id, "/dev/ttyACM3");
        assert_eq!(loaded.locomotion.max_climb_duration, 12.5);
        assert_eq!(loaded.tick_hz, 60);
        assert!(loaded.keyboard_fallback);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "tick_hz = 30\n[sensor]\nmax_flow = 80.0\n").unwrap();

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.tick_hz, 30);
        assert_eq!(loaded.sensor.max_flow, 80.0);
        assert_eq!(loaded.sensor.baud_rate, 115_200);
        assert_eq!(loaded.locomotion, LocomotionConfig::default());
    }

    #[test]
    fn invalid_locomotion_tuning_is_rejected() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[locomotion]\ngravity = 9.81\n").unwrap();

        assert!(load_from(&path).is_err());
    }

    #[test]
    fn inverted_flow_range_is_rejected() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[sensor]\nmin_flow = 100.0\nmax_flow = 100.0\n").unwrap();

        let err = load_from(&path).expect_err("flat flow range must not load");
        assert!(err.contains("max_flow"), "unexpected error: {err}");
    }

    #[test]
    fn config_path_points_to_ascent_dir() {
        let p = config_path_for_home("/home/testuser");
        assert!(p.to_string_lossy().contains(".ascent"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn tick_dt_follows_rate() {
        let cfg = Config {
            tick_hz: 50,
            ..Config::default()
        };
        assert!((cfg.tick_dt() - 0.02).abs() < 1e-7);
        let zero = Config {
            tick_hz: 0,
            ..Config::default()
        };
        assert_eq!(zero.tick_dt(), 1.0);
    }

    // The environment is process-global, so every override is exercised in
    // one test.
    #[test]
    fn apply_env_overrides_reads_ascent_variables() {
        // SAFETY: no other test in this crate touches these variables.
        unsafe {
            std::env::set_var("ASCENT_DEVICE", "COM7");
            std::env::set_var("ASCENT_BAUD_RATE", "9600");
            std::env::set_var("ASCENT_TICK_HZ", "not-a-number");
        }
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.sensor.device_id, "COM7");
        assert_eq!(cfg.sensor.baud_rate, 9600);
        assert_eq!(cfg.tick_hz, 60);

        unsafe { std::env::set_var("ASCENT_TICK_HZ", "120") };
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.tick_hz, 120);

        unsafe {
            std::env::remove_var("ASCENT_DEVICE");
            std::env::remove_var("ASCENT_BAUD_RATE");
            std::env::remove_var("ASCENT_TICK_HZ");
        }
    }
}
