//! Lectern - Streaming text-to-speech reader for remote libraries
//!
//! This library provides the core functionality for the Lectern reader:
//! - Chapter markup segmentation into playable units
//! - Per-unit audio synthesis against a remote TTS endpoint
//! - Gapless playback with predictive prefetch and bounded retry
//! - Chapter crossover staging and progress persistence
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 Control surface                      │
//! │   play │ pause │ resume │ stop │ skip │ chapters    │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                PlaybackEngine                        │
//! │   driver  │  prefetch  │  crossover  │  progress    │
//! └──────┬─────────────┬────────────────────┬───────────┘
//!        │             │                    │
//! ┌──────▼─────┐ ┌─────▼───────┐ ┌──────────▼──────────┐
//! │ Synthesizer│ │ ContentApi  │ │ AudioOutput / rodio │
//! │ (HTTP TTS) │ │ (chapters)  │ │                     │
//! └────────────┘ └─────────────┘ └─────────────────────┘
//! ```

pub mod audio;
pub mod cache;
pub mod config;
pub mod content;
pub mod db;
pub mod engine;
pub mod error;
pub mod media;
pub mod progress;
pub mod segment;
pub mod synth;

pub use audio::{AudioOutput, PlayOutcome, RodioOutput};
pub use cache::PrefetchCache;
pub use config::Config;
pub use content::{ContentApi, HttpContentApi};
pub use db::{DbConn, DbPool};
pub use engine::{
    EngineEvent, EngineOptions, PlaybackEngine, PlaybackSnapshot, RetryPolicy, SETTLE_DELAY,
    StartRequest,
};
pub use error::{Error, Result};
pub use media::{KeepAliveGuard, MediaSession, NoopMediaSession, NowPlaying, SessionSignal};
pub use progress::{ProgressMarker, ProgressStore};
pub use segment::{is_speakable, segment_chapter};
pub use synth::{HttpSynthesizer, MIN_AUDIO_BYTES, Synthesizer};
