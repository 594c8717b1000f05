//! Configuration management for lectern
//!
//! Layering is env > TOML file > default for every field. The TOML file is
//! optional; a missing or broken file degrades to defaults with a warning.

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use crate::Result;

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Reader backend base URL (content + synthesis endpoints)
    pub server_url: String,

    /// Backend access token, sent with every request
    pub access_token: String,

    /// Synthesis voice identifier; empty means no voice selected
    pub voice: String,

    /// Speech rate multiplier
    pub rate: f32,

    /// How many units ahead to prefetch; 0 disables prefetching
    pub prefetch_depth: usize,

    /// Delay between prefetch retry attempts, in milliseconds
    pub retry_delay_ms: u64,

    /// Path to data directory (progress database)
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8096".to_string(),
            access_token: String::new(),
            voice: String::new(),
            rate: 1.0,
            prefetch_depth: 3,
            retry_delay_ms: 500,
            data_dir: default_data_dir(),
        }
    }
}

impl Config {
    /// Load configuration (env > TOML > default)
    ///
    /// # Errors
    ///
    /// Returns error if the data directory cannot be created
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();
        let default = Self::default();

        let server_url = std::env::var("LECTERN_SERVER_URL")
            .ok()
            .or(fc.server.url)
            .unwrap_or(default.server_url);

        let access_token = std::env::var("LECTERN_ACCESS_TOKEN")
            .ok()
            .or(fc.server.access_token)
            .unwrap_or(default.access_token);

        let voice = std::env::var("LECTERN_VOICE")
            .ok()
            .or(fc.voice.voice)
            .unwrap_or(default.voice);

        let rate = std::env::var("LECTERN_RATE")
            .ok()
            .and_then(|s| s.parse().ok())
            .or(fc.voice.rate)
            .unwrap_or(default.rate);

        let prefetch_depth = std::env::var("LECTERN_PREFETCH_DEPTH")
            .ok()
            .and_then(|s| s.parse().ok())
            .or(fc.playback.prefetch_depth)
            .unwrap_or(default.prefetch_depth);

        let retry_delay_ms = std::env::var("LECTERN_RETRY_DELAY_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .or(fc.playback.retry_delay_ms)
            .unwrap_or(default.retry_delay_ms);

        let data_dir = std::env::var("LECTERN_DATA_DIR")
            .ok()
            .map(PathBuf::from)
            .or(fc.data_dir.map(PathBuf::from))
            .unwrap_or(default.data_dir);

        std::fs::create_dir_all(&data_dir)?;

        Ok(Self {
            server_url,
            access_token,
            voice,
            rate,
            prefetch_depth,
            retry_delay_ms,
            data_dir,
        })
    }

    /// Delay between prefetch retry attempts
    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Default data directory: `~/.local/share/lectern/` on Linux
fn default_data_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from(".local/share/lectern"),
        |d| d.data_dir().join("lectern"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = Config::default();
        assert_eq!(config.prefetch_depth, 3);
        assert_eq!(config.retry_delay_ms, 500);
        assert!((config.rate - 1.0).abs() < f32::EPSILON);
        assert!(config.voice.is_empty());
        assert!(config.access_token.is_empty());
    }

    #[test]
    fn retry_delay_conversion() {
        let config = Config {
            retry_delay_ms: 250,
            ..Config::default()
        };
        assert_eq!(config.retry_delay(), Duration::from_millis(250));
    }
}
