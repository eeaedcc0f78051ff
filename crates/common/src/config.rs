//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Export engine defaults.
    pub export: ExportDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default export engine parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportDefaults {
    /// Video synthesis frame rate.
    pub fps: u32,

    /// Minimum exported video duration in seconds.
    pub min_video_secs: f64,

    /// Extra seconds drawn past the target duration before the loop stops.
    pub stop_buffer_secs: f64,

    /// Per-clip readiness timeout in seconds before a slot degrades to
    /// a placeholder.
    pub clip_ready_timeout_secs: f64,

    /// Bounded retry count for transient asset reads.
    pub asset_retries: u32,

    /// Initial backoff between asset retries (doubles per attempt).
    pub asset_retry_backoff_ms: u64,

    /// Device class used to pick the bitrate ceiling.
    pub device_class: DeviceClass,

    /// Optional directory of extra font files for text elements.
    pub fonts_dir: Option<PathBuf>,
}

/// Rough device capability bucket for encode bitrate selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    #[default]
    Standard,
    Constrained,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "framebooth=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for ExportDefaults {
    fn default() -> Self {
        Self {
            fps: 30,
            min_video_secs: 3.0,
            stop_buffer_secs: 0.25,
            clip_ready_timeout_secs: 8.0,
            asset_retries: 2,
            asset_retry_backoff_ms: 150,
            device_class: DeviceClass::Standard,
            fonts_dir: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("framebooth").join("config.json")
}
