//! Remote speech synthesis client
//!
//! One unit of text in, one playable audio payload out. The server is
//! trusted for audio quality but not for correctness: every response is
//! validated (status, content type, minimum size) before it is allowed
//! anywhere near the playback queue.

use async_trait::async_trait;

use crate::config::Config;
use crate::{Error, Result};

/// Smallest payload that can plausibly be a synthesized utterance.
/// Error pages and empty bodies fall well under this.
pub const MIN_AUDIO_BYTES: usize = 512;

/// Synthesizes speech for a single unit of text
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Check that the synthesizer is able to produce audio at all.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoVoiceSelected`] when no voice is configured.
    fn ready(&self) -> Result<()> {
        Ok(())
    }

    /// Synthesize `text` to audio bytes.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure or when the response is not
    /// valid audio. Callers decide whether to retry.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

/// HTTP synthesizer backed by the reader's backend TTS endpoint
pub struct HttpSynthesizer {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
    voice: String,
    rate: f32,
}

impl HttpSynthesizer {
    /// Create a synthesizer from the runtime configuration
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.server_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
            voice: config.voice.clone(),
            rate: config.rate,
        }
    }

    /// Build the synthesis URL for a unit of text
    fn synthesis_url(&self, text: &str) -> String {
        format!(
            "{}/api/tts?token={}&voice={}&rate={}&text={}",
            self.base_url,
            urlencoding::encode(&self.access_token),
            urlencoding::encode(&self.voice),
            self.rate,
            urlencoding::encode(text)
        )
    }
}

#[async_trait]
impl Synthesizer for HttpSynthesizer {
    fn ready(&self) -> Result<()> {
        if self.voice.is_empty() {
            return Err(Error::NoVoiceSelected);
        }
        Ok(())
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        self.ready()?;

        let response = self.client.get(self.synthesis_url(text)).send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response.bytes().await?;

        validate_audio(status, &content_type, body.len()).map_err(Error::InvalidResponse)?;

        tracing::debug!(bytes = body.len(), chars = text.len(), "synthesized unit");
        Ok(body.to_vec())
    }
}

/// Decide whether a synthesis response is playable audio.
///
/// All three checks must pass: success status, an `audio/*` content type,
/// and a body of at least [`MIN_AUDIO_BYTES`]. Returns the rejection
/// reason on failure.
///
/// # Errors
///
/// Returns a human-readable reason when the response is not valid audio.
pub fn validate_audio(
    status: u16,
    content_type: &str,
    len: usize,
) -> std::result::Result<(), String> {
    if !(200..300).contains(&status) {
        return Err(format!("status {status}"));
    }
    if !content_type
        .trim_start()
        .to_ascii_lowercase()
        .starts_with("audio/")
    {
        return Err(format!("content type {content_type:?} is not audio"));
    }
    if len < MIN_AUDIO_BYTES {
        return Err(format!("payload too small ({len} bytes)"));
    }
    Ok(())
}
