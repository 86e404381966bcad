use std::time::Duration;
use std::{env, fmt, fs, path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::monitoring::types::TimeoutStatus;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to read config file: {0}")]
    ReadFailed(#[source] std::io::Error),
    #[error("Failed to write config file: {0}")]
    WriteFailed(#[source] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    ParseFailed(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeFailed(#[from] toml::ser::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("No config path available: neither XDG_CONFIG_HOME nor HOME is set")]
    ConfigPathUnavailable,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub monitoring: Monitoring,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Monitoring {
    /// Seconds between the start of consecutive ticks
    pub tick_interval_seconds: u64,
    /// Deadline for a single probe
    pub probe_timeout_ms: u64,
    /// Deadline for a single webhook call
    pub webhook_timeout_ms: u64,
    /// Whether probes that ran out of time count as `timeout` or `offline`
    pub timeout_status: TimeoutStatus,
    /// Upper bound on pipelines running at once within a tick, 0 for none
    pub max_concurrent_probes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for Monitoring {
    fn default() -> Self {
        Self {
            tick_interval_seconds: 60,
            probe_timeout_ms: 5_000,
            webhook_timeout_ms: 5_000,
            timeout_status: TimeoutStatus::Timeout,
            max_concurrent_probes: 256,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "uppe_monitor.db".into() }
    }
}

impl Monitoring {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_seconds)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn webhook_timeout(&self) -> Duration {
        Duration::from_millis(self.webhook_timeout_ms)
    }
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/uppe/monitor.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, Error> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Ok(home_dir) = env::var("HOME") {
        path::PathBuf::from(home_dir).join(".config")
    } else {
        return Err(Error::ConfigPathUnavailable);
    };

    Ok(path.join("uppe/monitor.toml"))
}

fn env_override<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|value| value.parse().ok())
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);

        writeln!(f, "Current Internal Configuration State:")?;
        write_title_1(f, "Monitoring")?;
        write_1(f, "Tick Interval (s)", &self.monitoring.tick_interval_seconds)?;
        write_1(f, "Probe Timeout (ms)", &self.monitoring.probe_timeout_ms)?;
        write_1(f, "Webhook Timeout (ms)", &self.monitoring.webhook_timeout_ms)?;
        write_1(f, "Timeout Status", &self.monitoring.timeout_status)?;
        write_1(f, "Max Concurrent Probes", &self.monitoring.max_concurrent_probes)?;
        write_title_1(f, "Database")?;
        write_1(f, "Path", &self.database.path)?;

        Ok(())
    }
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Creates a default config in ~/.config/uppe/monitor.toml
    ///  or the specified path if one does not exist. Environment overrides
    /// are applied afterwards and the result is validated.
    ///
    /// ```ignore
    /// let cfg = config::Config::from_config(None::<&path::Path>)?;
    /// println!("{}", cfg);
    /// ```
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, Error> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        let mut config = if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path).map_err(Error::ReadFailed)?;
            toml::from_str(raw_string.as_str())?
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            config
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &path::Path) -> Result<(), Error> {
        let config_str: String = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(Error::WriteFailed)?;
        }

        fs::write(path, config_str).map_err(Error::WriteFailed)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(seconds) = env_override("UPPE_TICK_INTERVAL_SECONDS") {
            self.monitoring.tick_interval_seconds = seconds;
        }
        if let Some(millis) = env_override("UPPE_PROBE_TIMEOUT_MS") {
            self.monitoring.probe_timeout_ms = millis;
        }
        if let Ok(path) = env::var("UPPE_DATABASE_PATH") {
            self.database.path = path;
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        let monitoring = &self.monitoring;
        if monitoring.tick_interval_seconds == 0 {
            return Err(Error::Invalid("tick_interval_seconds must be at least 1".into()));
        }
        if monitoring.probe_timeout_ms == 0 {
            return Err(Error::Invalid("probe_timeout_ms must be at least 1".into()));
        }
        if monitoring.webhook_timeout_ms == 0 {
            return Err(Error::Invalid("webhook_timeout_ms must be at least 1".into()));
        }
        if monitoring.probe_timeout() >= monitoring.tick_interval() {
            return Err(Error::Invalid("probe_timeout_ms must be shorter than the tick interval".into()));
        }
        if self.database.path.trim().is_empty() {
            return Err(Error::Invalid("database.path cannot be empty".into()));
        }
        Ok(())
    }
}
