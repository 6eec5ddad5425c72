//! Configuration management for oledmon
//!
//! TOML configuration for the monitor listener, the per-display render loops
//! and the list of displays to drive.
//!
//! ```toml
//! displays = ["linux:1:3c", "trace"]
//!
//! [monitor]
//! port = 8087
//!
//! [render]
//! interval_ms = 25
//! contrast = 0.1
//! ```

mod monitor_config;
mod render_config;

pub use monitor_config::MonitorConfig;
pub use render_config::RenderConfig;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// System-wide configuration path
pub const CONFIG_DIR: &str = "/etc/oledmon";
/// Per-user configuration path, relative to `$HOME`
pub const USER_CONFIG_DIR: &str = ".config/oledmon";

/// Main oledmon configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OledmonConfig {
    /// Device specifications, e.g. `linux:1:3c` or `trace`
    #[serde(default)]
    pub displays: Vec<String>,

    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub render: RenderConfig,
}

impl OledmonConfig {
    /// Load and validate configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Candidate files, most specific first
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(home) = std::env::var_os("HOME") {
            paths.push(PathBuf::from(home).join(USER_CONFIG_DIR).join("config.toml"));
        }
        paths.push(Path::new(CONFIG_DIR).join("config.toml"));
        paths
    }

    /// Load configuration from default locations
    pub fn load_default() -> Result<Self, ConfigError> {
        for path in Self::search_paths() {
            if path.exists() {
                return Self::load(&path);
            }
        }

        tracing::warn!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Load `path` if given, otherwise fall back to the default locations
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Self::load_default(),
        }
    }

    /// Reject values the render loops cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let render = &self.render;
        if !(0.0..=1.0).contains(&render.contrast) {
            return Err(ConfigError::Invalid(format!(
                "render.contrast {} outside [0, 1]",
                render.contrast
            )));
        }
        if render.interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "render.interval_ms must be positive".to_string(),
            ));
        }
        if render.history == 0 {
            return Err(ConfigError::Invalid(
                "render.history must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
