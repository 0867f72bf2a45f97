// SPDX-License-Identifier: MPL-2.0-only

use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use std::{
    io,
    path::{Path, PathBuf},
};

pub const NAME: &str = "visitor-gag";
pub const CONFIG_FILE: &str = "config.ron";

/// Failures while reading or validating the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("rerun delay range is empty ({min} ms > {max} ms)")]
    EmptyDelayRange { min: u64, max: u64 },
    #[error("wipe duration must be greater than zero")]
    ZeroWipeDuration,
}

/// Which screen capture path to use.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackendPreference {
    /// Pick the borderless capture API when the OS offers it
    #[default]
    Automatic,
    /// Always use the graphics capture API
    GraphicsCapture,
    /// Always use desktop duplication
    Duplication,
}

/// Distance of the demo placement from the top right corner of the output.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Margin {
    pub right: i32,
    pub top: i32,
}

impl Default for Margin {
    fn default() -> Self {
        Self {
            right: 100,
            top: 100,
        }
    }
}

/// Inclusive bounds, in milliseconds, of the pause between two appearances.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DelayRange {
    pub min: u64,
    pub max: u64,
}

impl Default for DelayRange {
    fn default() -> Self {
        Self {
            min: 5_000,
            max: 30_000,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Setters)]
#[serde(default, deny_unknown_fields)]
#[must_use]
pub struct Config {
    /// enable the graphics debug layer
    pub debug_layer: bool,
    /// capture backend override
    pub capture_backend: BackendPreference,
    /// place the animation at a fixed spot instead of a random one
    pub demo: bool,
    /// offsets used by demo placement
    pub demo_margin: Margin,
    /// length of the reveal and conceal wipes in milliseconds
    pub wipe_duration_ms: u64,
    /// pause between a conceal and the next reveal
    pub rerun_delay_ms: DelayRange,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug_layer: false,
            capture_backend: BackendPreference::default(),
            demo: false,
            demo_margin: Margin::default(),
            wipe_duration_ms: 800,
            rerun_delay_ms: DelayRange::default(),
        }
    }
}

impl Config {
    /// Location of the configuration file, if the platform has a config directory.
    #[must_use]
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(NAME).join(CONFIG_FILE))
    }

    /// Load the user's configuration, falling back to defaults when no file exists.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read, parsed or validated.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::path() {
            Some(path) if path.is_file() => Self::load_from(&path),
            _ => {
                tracing::debug!("no config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load and validate the configuration stored at `path`.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read, parsed or validated.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::parse(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Parse a RON document. Missing fields take their default values.
    ///
    /// # Errors
    ///
    /// Fails on malformed RON or unknown fields.
    pub fn parse(contents: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(contents)
    }

    /// Check the invariants serde cannot express.
    ///
    /// # Errors
    ///
    /// Fails on an empty rerun delay range or a zero wipe duration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let DelayRange { min, max } = self.rerun_delay_ms;
        if min > max {
            return Err(ConfigError::EmptyDelayRange { min, max });
        }

        if self.wipe_duration_ms == 0 {
            return Err(ConfigError::ZeroWipeDuration);
        }

        Ok(())
    }
}
