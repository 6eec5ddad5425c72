//! Render loop settings

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-device render loop configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Pause between frames in milliseconds
    #[serde(default = "default_interval")]
    pub interval_ms: u64,

    /// Contrast applied at init, as a fraction in [0, 1]
    #[serde(default = "default_contrast")]
    pub contrast: f64,

    /// Start with inverted polarity
    #[serde(default)]
    pub invert: bool,

    /// Recent writes and latencies kept per display
    #[serde(default = "default_history")]
    pub history: usize,

    /// Stop each loop after this many frames (0 = run forever)
    #[serde(default)]
    pub frames: u64,
}

fn default_interval() -> u64 {
    25
}

fn default_contrast() -> f64 {
    0.1
}

fn default_history() -> usize {
    100
}

impl RenderConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval(),
            contrast: default_contrast(),
            invert: false,
            history: default_history(),
            frames: 0,
        }
    }
}
