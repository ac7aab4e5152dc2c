//! Animator configuration
//!
//! Configuration can be built in code or loaded from a TOML file:
//!
//! ```toml
//! target_fps = 60
//! debug = true
//! ```

use crate::error::{AnimatorError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

fn default_target_fps() -> u32 {
    120
}

/// Configuration for an [`Animator`](crate::Animator) driven by a thread clock.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimatorConfig {
    /// Refresh rate of the frame clock.
    #[serde(default = "default_target_fps")]
    pub target_fps: u32,
    /// Emit clock lifecycle messages.
    #[serde(default)]
    pub debug: bool,
}

impl Default for AnimatorConfig {
    fn default() -> Self {
        Self {
            target_fps: default_target_fps(),
            debug: false,
        }
    }
}

impl AnimatorConfig {
    /// Parse a configuration from TOML text and validate it.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AnimatorConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Set the frame clock refresh rate.
    pub fn with_target_fps(mut self, fps: u32) -> Self {
        self.target_fps = fps;
        self
    }

    /// Enable or disable clock lifecycle messages.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.target_fps == 0 || self.target_fps > 1000 {
            return Err(AnimatorError::InvalidConfig(format!(
                "target_fps must be within 1..=1000, got {}",
                self.target_fps
            )));
        }
        Ok(())
    }

    /// Time between two frame clock fires.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.target_fps.max(1)))
    }
}
