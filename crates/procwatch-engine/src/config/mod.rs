use anyhow::{Context, Result};
use procwatch_common::WatchedTarget;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod validation;

/// Directory created next to the executable when no log directory is configured
pub const DEFAULT_LOG_DIRECTORY_NAME: &str = "procwatch-log";

/// Top-level configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchdogConfig {
    pub watchdog: WatchdogSettings,
    #[serde(default)]
    pub hang_detection: HangDetectionConfig,
}

/// Watchdog options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchdogSettings {
    /// Comma-separated absolute executable paths, in supervision order
    #[serde(default)]
    pub process_address: String,

    #[serde(default = "default_poll_interval", with = "duration_serde")]
    pub poll_interval: Duration,

    /// How long to wait for a killed process to disappear before re-spawning
    #[serde(default = "default_kill_timeout", with = "duration_serde")]
    pub kill_timeout: Duration,

    /// Kill supervised processes when the host stops
    #[serde(default)]
    pub terminate_on_stop: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_directory: Option<String>,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Window-based hang detection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HangDetectionConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Class name of the top-level window to inspect
    #[serde(default = "default_window_class")]
    pub window_class: String,

    /// Title fragments the window manager appends to a hung window
    #[serde(default = "default_markers")]
    pub markers: Vec<String>,

    #[serde(default)]
    pub ownership: WindowOwnership,

    /// Hung polls in a row before a restart is triggered
    #[serde(default = "default_consecutive_polls")]
    pub consecutive_polls: u32,

    /// Hang polls are skipped this long after each (re)spawn
    #[serde(default = "default_startup_grace", with = "duration_serde")]
    pub startup_grace: Duration,
}

/// Which windows count as belonging to the watched process
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowOwnership {
    /// Any window of the configured class. Placeholder windows drawn by the
    /// window manager for a hung app are owned by the window manager itself.
    #[default]
    Any,
    /// Only windows whose owning pid is the watched process
    Process,
}

impl Default for HangDetectionConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            window_class: default_window_class(),
            markers: default_markers(),
            ownership: WindowOwnership::default(),
            consecutive_polls: default_consecutive_polls(),
            startup_grace: default_startup_grace(),
        }
    }
}

impl Default for WatchdogSettings {
    fn default() -> Self {
        Self {
            process_address: String::new(),
            poll_interval: default_poll_interval(),
            kill_timeout: default_kill_timeout(),
            terminate_on_stop: false,
            log_directory: None,
            log_level: default_log_level(),
        }
    }
}

impl WatchdogConfig {
    /// Load and validate configuration from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Self::parse_from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate configuration from a YAML string
    pub fn load_from_string(content: &str) -> Result<Self> {
        let config = Self::parse_from_string(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a YAML file without validating it, so command-line overrides can
    /// fill in what the file leaves out. Call [`validate`](Self::validate)
    /// once they are applied.
    pub fn parse_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        Self::parse_from_string(&content)
    }

    pub fn parse_from_string(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse YAML configuration")
    }

    /// Replace the target list and log directory where given.
    pub fn apply_overrides(&mut self, process_address: Option<&str>, log_directory: Option<&str>) {
        if let Some(paths) = process_address {
            self.watchdog.process_address = paths.to_string();
        }
        if let Some(dir) = log_directory {
            self.watchdog.log_directory = Some(dir.to_string());
        }
    }

    /// Build a default configuration around a bare `process_address` value
    pub fn from_process_address(process_address: impl Into<String>) -> Result<Self> {
        let config = WatchdogConfig {
            watchdog: WatchdogSettings {
                process_address: process_address.into(),
                ..WatchdogSettings::default()
            },
            hang_detection: HangDetectionConfig::default(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    /// Configured targets: split on commas, trimmed, blanks dropped, order kept
    pub fn targets(&self) -> Vec<WatchedTarget> {
        self.watchdog
            .process_address
            .split(',')
            .map(WatchedTarget::new)
            .filter(|target| !target.is_blank())
            .collect()
    }

    /// Directory for the daily log files
    pub fn log_directory(&self) -> PathBuf {
        match &self.watchdog.log_directory {
            Some(dir) => PathBuf::from(dir),
            None => default_log_directory(),
        }
    }
}

/// `procwatch-log` next to the running executable
pub fn default_log_directory() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_default()
        .join(DEFAULT_LOG_DIRECTORY_NAME)
}

// Default value functions
fn default_poll_interval() -> Duration {
    Duration::from_secs(3)
}

fn default_kill_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_window_class() -> String {
    "Ghost".to_string()
}

fn default_markers() -> Vec<String> {
    vec!["Not Responding".to_string(), "未响应".to_string()]
}

fn default_consecutive_polls() -> u32 {
    1
}

fn default_startup_grace() -> Duration {
    Duration::from_secs(10)
}

// Custom serialization for Duration
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub(super) fn parse_duration(s: &str) -> Result<Duration, String> {
        let s = s.trim();
        // "ms" before "s" since "ms" ends with 's'
        if let Some(num_str) = s.strip_suffix("ms") {
            let millis: u64 = num_str.parse().map_err(|_| format!("Invalid duration: {}", s))?;
            Ok(Duration::from_millis(millis))
        } else if let Some(num_str) = s.strip_suffix('s') {
            let secs: u64 = num_str.parse().map_err(|_| format!("Invalid duration: {}", s))?;
            Ok(Duration::from_secs(secs))
        } else if let Some(num_str) = s.strip_suffix('m') {
            let mins: u64 = num_str.parse().map_err(|_| format!("Invalid duration: {}", s))?;
            Ok(Duration::from_secs(mins * 60))
        } else {
            Err(format!("Duration must end with 's', 'ms', or 'm': {}", s))
        }
    }
}
