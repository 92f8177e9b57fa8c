//! Runtime settings
//!
//! Read from an optional JSON file; missing keys fall back to defaults.

use std::{fs, io, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_FPS, FINAL_LEVEL, STARTING_LIVES};
use crate::error::ConfigError;

/// Session and scheduler settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Logic and physics ticks per second
    pub fps: i32,
    /// Layout/power-up RNG seed; random when absent
    pub seed: Option<u64>,
    pub starting_lives: i32,
    /// Clearing this level wins the game
    pub final_level: u32,
    /// Save slot location
    pub save_path: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            seed: None,
            starting_lives: STARTING_LIVES,
            final_level: FINAL_LEVEL,
            save_path: "brickfall.sav".to_string(),
        }
    }
}

impl Settings {
    /// Load from a JSON file, using defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = match fs::read_to_string(path) {
            Ok(json) => json,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::info!("No settings at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(err) => return Err(ConfigError::Read(err)),
        };

        let settings: Self = serde_json::from_str(&json)?;
        settings.validate()?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Write as pretty JSON
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(ConfigError::Read)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fps <= 0 {
            return Err(ConfigError::InvalidFps(self.fps));
        }
        Ok(())
    }

    /// Period between logic (and physics) ticks
    pub fn frame_interval(&self) -> Result<Duration, ConfigError> {
        self.validate()?;
        Ok(Duration::from_nanos(1_000_000_000 / self.fps as u64))
    }
}
