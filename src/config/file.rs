//! TOML configuration file loading
//!
//! Supports `~/.config/lectern/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct LecternConfigFile {
    /// Backend server settings
    #[serde(default)]
    pub server: ServerFileConfig,

    /// Voice settings
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Playback settings
    #[serde(default)]
    pub playback: PlaybackFileConfig,

    /// Data directory override
    #[serde(default)]
    pub data_dir: Option<String>,
}

/// Backend server settings
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// Base URL of the reader backend
    pub url: Option<String>,

    /// Access token sent with every request
    pub access_token: Option<String>,
}

/// Voice settings
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// Synthesis voice identifier
    pub voice: Option<String>,

    /// Speech rate multiplier
    pub rate: Option<f32>,
}

/// Playback settings
#[derive(Debug, Default, Deserialize)]
pub struct PlaybackFileConfig {
    /// Units to prefetch ahead of the cursor
    pub prefetch_depth: Option<usize>,

    /// Delay between prefetch retries, in milliseconds
    pub retry_delay_ms: Option<u64>,
}

/// Load the TOML config file from the standard path
///
/// Returns `LecternConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> LecternConfigFile {
    let Some(path) = config_file_path() else {
        return LecternConfigFile::default();
    };

    if !path.exists() {
        return LecternConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                LecternConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            LecternConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/lectern/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("lectern").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_file() {
        let content = r#"
            data_dir = "/tmp/lectern"

            [server]
            url = "http://reader.local"
            access_token = "tok"

            [voice]
            voice = "en_US/amy"
            rate = 1.25

            [playback]
            prefetch_depth = 5
            retry_delay_ms = 200
        "#;
        let fc: LecternConfigFile = toml::from_str(content).unwrap();

        assert_eq!(fc.server.url.as_deref(), Some("http://reader.local"));
        assert_eq!(fc.server.access_token.as_deref(), Some("tok"));
        assert_eq!(fc.voice.voice.as_deref(), Some("en_US/amy"));
        assert_eq!(fc.voice.rate, Some(1.25));
        assert_eq!(fc.playback.prefetch_depth, Some(5));
        assert_eq!(fc.playback.retry_delay_ms, Some(200));
        assert_eq!(fc.data_dir.as_deref(), Some("/tmp/lectern"));
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let fc: LecternConfigFile = toml::from_str("").unwrap();
        assert!(fc.server.url.is_none());
        assert!(fc.voice.voice.is_none());
        assert!(fc.playback.prefetch_depth.is_none());
    }

    #[test]
    fn partial_file_leaves_rest_none() {
        let fc: LecternConfigFile = toml::from_str("[voice]\nvoice = \"amy\"\n").unwrap();
        assert_eq!(fc.voice.voice.as_deref(), Some("amy"));
        assert!(fc.voice.rate.is_none());
        assert!(fc.server.url.is_none());
    }
}
