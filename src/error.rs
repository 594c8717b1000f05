//! Error types for the lectern playback engine

use thiserror::Error;

/// Result type alias for lectern operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the playback engine
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// No synthesis voice has been selected
    #[error("no voice selected")]
    NoVoiceSelected,

    /// Synthesis endpoint returned something that is not playable audio
    #[error("invalid synthesis response: {0}")]
    InvalidResponse(String),

    /// Audio payload could not be decoded
    #[error("decode error: {0}")]
    Decode(String),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// Chapter content error
    #[error("content error: {0}")]
    Content(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// `SQLite` error
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}
