//! Chapter content client
//!
//! Fetches raw chapter markup from the reader backend. Segmentation is the
//! caller's job; this module only moves text.

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::Config;
use crate::{Error, Result};

/// Source of chapter text
#[async_trait]
pub trait ContentApi: Send + Sync {
    /// Fetch the raw text of one chapter of a book.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure or when the chapter does not
    /// exist.
    async fn chapter_text(&self, book_id: &str, chapter_index: usize) -> Result<String>;
}

/// HTTP chapter source backed by the reader's backend library API
pub struct HttpContentApi {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl HttpContentApi {
    /// Create a content client from the runtime configuration
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.server_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
        }
    }

    fn chapter_url(&self, book_id: &str, chapter_index: usize) -> String {
        format!(
            "{}/api/books/{}/chapters/{chapter_index}?token={}",
            self.base_url,
            urlencoding::encode(book_id),
            urlencoding::encode(&self.access_token)
        )
    }
}

/// Chapter payload as served by the backend
#[derive(Debug, Deserialize)]
struct ChapterPayload {
    /// Raw chapter markup
    text: String,
}

#[async_trait]
impl ContentApi for HttpContentApi {
    async fn chapter_text(&self, book_id: &str, chapter_index: usize) -> Result<String> {
        let url = self.chapter_url(book_id, chapter_index);
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Content(format!(
                "chapter {chapter_index} of {book_id}: {status}: {body}"
            )));
        }

        let payload: ChapterPayload = serde_json::from_slice(&response.bytes().await?)?;
        Ok(payload.text)
    }
}
