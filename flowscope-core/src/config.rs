use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::error::FlowscopeError;
use crate::timing::{MAX_SPEED, MIN_SPEED};

/// Upper bound of the Kafka consumer lag control.
pub const MAX_KAFKA_LAG_MS: u64 = 5_000;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ConfigLoadError> for FlowscopeError {
    fn from(err: ConfigLoadError) -> Self {
        match err {
            ConfigLoadError::Config(e) => FlowscopeError::ConfigParseError(e.to_string()),
            ConfigLoadError::InvalidValue { key, message } => {
                FlowscopeError::InvalidConfigValue { key, message }
            }
            ConfigLoadError::Io(e) => FlowscopeError::IoError(e),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FlowscopeConfig {
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub tui: TuiConfig,
    #[serde(default)]
    pub patterns: PatternsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    #[serde(default = "default_speed")]
    pub speed: f64,

    /// Start autoplay as soon as a scenario is triggered.
    #[serde(default)]
    pub autoplay_on_load: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json_format: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TuiConfig {
    #[serde(default = "default_theme")]
    pub theme: String,

    #[serde(default = "default_tick_rate")]
    pub tick_rate_ms: u64,

    /// How long one message token takes to cross the diagram.
    #[serde(default = "default_hop_animation")]
    pub hop_animation_ms: u64,

    #[serde(default)]
    pub start_pattern: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternsConfig {
    #[serde(default)]
    pub kafka_lag_ms: u64,
}

fn default_speed() -> f64 {
    1.0
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_theme() -> String {
    "Tokyo Night".to_string()
}

fn default_tick_rate() -> u64 {
    50
}

fn default_hop_animation() -> u64 {
    600
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            speed: default_speed(),
            autoplay_on_load: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

impl Default for TuiConfig {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            tick_rate_ms: default_tick_rate(),
            hop_animation_ms: default_hop_animation(),
            start_pattern: None,
        }
    }
}

impl Default for PatternsConfig {
    fn default() -> Self {
        Self { kafka_lag_ms: 0 }
    }
}

impl FlowscopeConfig {
    pub fn load() -> Result<Self, ConfigLoadError> {
        Self::load_from_paths(get_config_paths())
    }

    pub fn load_from_paths(paths: Vec<PathBuf>) -> Result<Self, ConfigLoadError> {
        load_dotenv_files();

        let mut builder = ConfigBuilder::builder();

        for path in paths {
            if path.exists() {
                builder = builder.add_source(File::from(path).required(false));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("FLOWSCOPE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let mut flowscope_config: FlowscopeConfig = config.try_deserialize()?;

        if let Ok(level) = std::env::var("RUST_LOG") {
            flowscope_config.logging.level = level;
        }

        flowscope_config.validate()?;

        Ok(flowscope_config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        let speed = self.playback.speed;
        if !speed.is_finite() || speed < MIN_SPEED || speed > MAX_SPEED {
            return Err(ConfigLoadError::InvalidValue {
                key: "playback.speed".to_string(),
                message: format!("Must be between {} and {}", MIN_SPEED, MAX_SPEED),
            });
        }

        if self.tui.tick_rate_ms == 0 {
            return Err(ConfigLoadError::InvalidValue {
                key: "tui.tick_rate_ms".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if self.patterns.kafka_lag_ms > MAX_KAFKA_LAG_MS {
            return Err(ConfigLoadError::InvalidValue {
                key: "patterns.kafka_lag_ms".to_string(),
                message: format!("Must be at most {}", MAX_KAFKA_LAG_MS),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        let level_lower = self.logging.level.to_lowercase();
        if !valid_levels.contains(&level_lower.as_str()) && !level_lower.contains('=') {
            return Err(ConfigLoadError::InvalidValue {
                key: "logging.level".to_string(),
                message: format!(
                    "Invalid log level '{}'. Must be one of: {:?}",
                    self.logging.level, valid_levels
                ),
            });
        }

        Ok(())
    }

    pub fn log_level(&self) -> &str {
        &self.logging.level
    }
}

fn get_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(config_dir) = get_config_dir() {
        paths.push(config_dir.join("config.toml"));
    }

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join("flowscope.toml"));
    }

    paths
}

fn load_dotenv_files() {
    let mut paths = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(".env"));
    }

    if let Some(config_dir) = get_config_dir() {
        paths.push(config_dir.join(".env"));
    }

    for path in paths {
        if path.exists() {
            let _ = dotenvy::from_path(&path);
        }
    }
}

pub fn get_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("flowscope"))
}

pub fn get_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("flowscope"))
}

pub fn ensure_config_dir() -> Result<PathBuf, std::io::Error> {
    ensure_dir(get_config_dir(), "config")
}

pub fn ensure_data_dir() -> Result<PathBuf, std::io::Error> {
    ensure_dir(get_data_dir(), "data")
}

fn ensure_dir(dir: Option<PathBuf>, kind: &str) -> Result<PathBuf, std::io::Error> {
    let dir = dir.ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Could not determine {} directory", kind),
        )
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
    }

    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = FlowscopeConfig::default();

        assert_eq!(config.playback.speed, 1.0);
        assert!(!config.playback.autoplay_on_load);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json_format);
        assert_eq!(config.tui.tick_rate_ms, 50);
        assert_eq!(config.tui.hop_animation_ms, 600);
        assert!(config.tui.start_pattern.is_none());
        assert_eq!(config.patterns.kafka_lag_ms, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_speed_out_of_range() {
        let mut config = FlowscopeConfig::default();
        config.playback.speed = 4.0;
        assert!(config.validate().is_err());

        config.playback.speed = 0.25;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_zero_tick_rate() {
        let mut config = FlowscopeConfig::default();
        config.tui.tick_rate_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_kafka_lag() {
        let mut config = FlowscopeConfig::default();
        config.patterns.kafka_lag_ms = 5_000;
        assert!(config.validate().is_ok());

        config.patterns.kafka_lag_ms = 5_001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_log_level() {
        let mut config = FlowscopeConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());

        config.logging.level = "flowscope_core=debug,warn".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[playback]\nspeed = 2.0\nautoplay_on_load = true\n\n[tui]\ntheme = \"Dracula\"\n\n[patterns]\nkafka_lag_ms = 1500"
        )
        .unwrap();

        let config = FlowscopeConfig::load_from_paths(vec![file.path().to_path_buf()]).unwrap();

        assert_eq!(config.playback.speed, 2.0);
        assert!(config.playback.autoplay_on_load);
        assert_eq!(config.tui.theme, "Dracula");
        assert_eq!(config.tui.tick_rate_ms, 50);
        assert_eq!(config.patterns.kafka_lag_ms, 1500);
    }

    #[test]
    fn test_load_rejects_invalid_file_values() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[playback]\nspeed = 10.0").unwrap();

        let err = FlowscopeConfig::load_from_paths(vec![file.path().to_path_buf()]).unwrap_err();
        let err: FlowscopeError = err.into();
        assert_eq!(err.error_code(), "E2002");
    }

    #[test]
    fn test_missing_files_fall_back_to_defaults() {
        let config =
            FlowscopeConfig::load_from_paths(vec![PathBuf::from("/nonexistent/flowscope.toml")])
                .unwrap();
        assert_eq!(config.playback.speed, 1.0);
    }

    #[test]
    fn test_directory_helpers() {
        assert!(get_config_dir().is_some());
        assert!(get_data_dir().is_some());
    }
}
