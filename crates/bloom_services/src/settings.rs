//! Settings management

use bloom_sim::{ConfigError, SimConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed settings file")]
    Parse(#[from] serde_json::Error),

    #[error("invalid simulation config")]
    Invalid(#[from] ConfigError),
}

/// Runtime settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub sim: SimConfig,
    pub runtime: RuntimeSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Ticks to run; 0 runs until the input is exhausted.
    pub ticks: u64,
    /// JSON-lines landmark recording. The scripted pose is used when unset.
    pub input: Option<PathBuf>,
    /// Write every frame as a JSON line here.
    pub frames_out: Option<PathBuf>,
    pub log_level: String,
    /// Ticks between status lines.
    pub report_interval: u64,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            ticks: 3_600,
            input: None,
            frames_out: None,
            log_level: "info".to_owned(),
            report_interval: 600,
        }
    }
}

impl Settings {
    pub fn from_json(text: &str) -> Result<Self, SettingsError> {
        let settings: Settings = serde_json::from_str(text)?;
        settings.sim.validate()?;
        Ok(settings)
    }

    /// Load from `path`, falling back to defaults when the file does not
    /// exist.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no settings file, using defaults");
                return Ok(Settings::default());
            }
            Err(source) => {
                return Err(SettingsError::Io {
                    path: path.to_owned(),
                    source,
                })
            }
        };
        let settings = Self::from_json(&text)?;
        tracing::info!(path = %path.display(), "settings loaded");
        Ok(settings)
    }
}
