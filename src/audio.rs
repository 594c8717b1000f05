//! Audio output capability
//!
//! The engine talks to the device through [`AudioOutput`] so tests can run
//! without hardware and platforms can swap backends. The real backend is
//! rodio; the stream is created inside a blocking task because audio
//! streams aren't `Send` and must live on the thread that plays them.

use std::io::Cursor;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use rodio::{Decoder, OutputStream, Sink};

use crate::{Error, Result};

/// How a playback attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// The payload played to its natural end
    Completed,
    /// Playback was cut short by an interrupt
    Interrupted,
}

/// A device that can play one audio payload at a time
#[async_trait]
pub trait AudioOutput: Send + Sync {
    /// Play a complete audio payload, returning when it finishes or is
    /// interrupted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] when the payload is not decodable audio,
    /// or [`Error::Audio`] when the device cannot be opened.
    async fn play(&self, audio: Vec<u8>) -> Result<PlayOutcome>;

    /// Suspend the device, keeping buffered state
    fn pause(&self);

    /// Resume a paused device.
    ///
    /// Returns `false` when the buffered state was lost (for example the
    /// device was torn down during an interruption); the caller must then
    /// restart playback of the current unit itself.
    fn resume(&self) -> bool;

    /// Cut the current payload short; the in-flight [`AudioOutput::play`]
    /// returns [`PlayOutcome::Interrupted`]
    fn interrupt(&self);

    /// Whether the device is currently paused
    fn is_paused(&self) -> bool;
}

/// Rodio-backed audio output
pub struct RodioOutput {
    current: Arc<Mutex<Option<Arc<Sink>>>>,
    interrupted: Arc<AtomicBool>,
}

impl RodioOutput {
    /// Create an idle output; the device is opened per payload
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: Arc::new(Mutex::new(None)),
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    fn sink(&self) -> Option<Arc<Sink>> {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Default for RodioOutput {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioOutput for RodioOutput {
    async fn play(&self, audio: Vec<u8>) -> Result<PlayOutcome> {
        self.interrupted.store(false, Ordering::SeqCst);
        let current = Arc::clone(&self.current);
        let interrupted = Arc::clone(&self.interrupted);

        let outcome = tokio::task::spawn_blocking(move || -> Result<PlayOutcome> {
            // The stream handle must outlive playback and stay on this thread
            let (_stream, handle) =
                OutputStream::try_default().map_err(|e| Error::Audio(e.to_string()))?;
            let sink =
                Arc::new(Sink::try_new(&handle).map_err(|e| Error::Audio(e.to_string()))?);
            let source =
                Decoder::new(Cursor::new(audio)).map_err(|e| Error::Decode(e.to_string()))?;

            sink.append(source);
            *current.lock().unwrap_or_else(|e| e.into_inner()) = Some(Arc::clone(&sink));

            sink.sleep_until_end();

            *current.lock().unwrap_or_else(|e| e.into_inner()) = None;
            if interrupted.load(Ordering::SeqCst) {
                Ok(PlayOutcome::Interrupted)
            } else {
                Ok(PlayOutcome::Completed)
            }
        })
        .await
        .map_err(|e| Error::Audio(format!("playback task failed: {e}")))??;

        Ok(outcome)
    }

    fn pause(&self) {
        if let Some(sink) = self.sink() {
            sink.pause();
        }
    }

    fn resume(&self) -> bool {
        match self.sink() {
            Some(sink) => {
                sink.play();
                true
            }
            None => false,
        }
    }

    fn interrupt(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
        if let Some(sink) = self.sink() {
            sink.stop();
        }
    }

    fn is_paused(&self) -> bool {
        self.sink().is_some_and(|sink| sink.is_paused())
    }
}
