//! Shared test utilities
//!
//! In-memory collaborators for exercising the playback engine without a
//! server or an audio device. The mock synthesizer returns the input text
//! as bytes, so the mock audio output can log exactly which units played
//! and in what order.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use lectern::audio::{AudioOutput, PlayOutcome};
use lectern::content::ContentApi;
use lectern::db;
use lectern::media::{MediaSession, NowPlaying};
use lectern::synth::Synthesizer;
use lectern::{
    EngineOptions, Error, PlaybackEngine, ProgressStore, Result, RetryPolicy, StartRequest,
};

/// Synthesizer returning the input text as audio bytes, with optional
/// injected failures and per-text call counting
#[derive(Default)]
pub struct MockSynthesizer {
    calls: Mutex<HashMap<String, u32>>,
    fail_always: Mutex<HashSet<String>>,
    fail_first: Mutex<HashMap<String, u32>>,
    delays: Mutex<HashMap<String, Duration>>,
}

impl MockSynthesizer {
    /// Every synthesis of `text` fails
    pub fn fail_always(&self, text: &str) {
        self.fail_always.lock().unwrap().insert(text.to_string());
    }

    /// Every synthesis of `text` takes `delay` to complete
    pub fn delay(&self, text: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(text.to_string(), delay);
    }

    /// The first `times` syntheses of `text` fail, later ones succeed
    #[allow(dead_code)]
    pub fn fail_first(&self, text: &str, times: u32) {
        self.fail_first
            .lock()
            .unwrap()
            .insert(text.to_string(), times);
    }

    /// How many times `text` was submitted for synthesis
    pub fn calls(&self, text: &str) -> u32 {
        self.calls.lock().unwrap().get(text).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Synthesizer for MockSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let attempt = {
            let mut calls = self.calls.lock().unwrap();
            let count = calls.entry(text.to_string()).or_insert(0);
            *count += 1;
            *count
        };

        let delay = self.delays.lock().unwrap().get(text).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_always.lock().unwrap().contains(text) {
            return Err(Error::InvalidResponse(format!(
                "injected failure for {text:?}"
            )));
        }
        if let Some(&times) = self.fail_first.lock().unwrap().get(text) {
            if attempt <= times {
                return Err(Error::InvalidResponse(format!(
                    "injected failure {attempt} for {text:?}"
                )));
            }
        }

        Ok(text.as_bytes().to_vec())
    }
}

/// Content API serving chapters from memory, with per-chapter fetch counts
pub struct MockContent {
    pub chapters: Vec<String>,
    fetches: Mutex<HashMap<usize, u32>>,
}

impl MockContent {
    pub fn new(chapters: &[&str]) -> Self {
        Self {
            chapters: chapters.iter().map(ToString::to_string).collect(),
            fetches: Mutex::new(HashMap::new()),
        }
    }

    /// How many times a chapter's text was fetched
    pub fn fetches(&self, chapter_index: usize) -> u32 {
        self.fetches
            .lock()
            .unwrap()
            .get(&chapter_index)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl ContentApi for MockContent {
    async fn chapter_text(&self, _book_id: &str, chapter_index: usize) -> Result<String> {
        *self
            .fetches
            .lock()
            .unwrap()
            .entry(chapter_index)
            .or_insert(0) += 1;
        self.chapters
            .get(chapter_index)
            .cloned()
            .ok_or_else(|| Error::Content(format!("no chapter {chapter_index}")))
    }
}

/// Audio output that "plays" by ticking a short timer, honoring pause and
/// interrupt, and logging each completed payload as text.
///
/// Sink semantics match a real device: pause and resume only act on a
/// play that is in flight, and every fresh play starts unpaused. There is
/// no sticky device-wide pause flag; deferring playback while paused is
/// the engine's job.
#[derive(Default)]
pub struct MockAudio {
    played: Mutex<Vec<String>>,
    active: AtomicBool,
    paused: AtomicBool,
    interrupted: AtomicBool,
}

impl MockAudio {
    /// Payloads played to completion, in order, decoded back to text
    pub fn played(&self) -> Vec<String> {
        self.played.lock().unwrap().clone()
    }

    /// Simulate the output device dropping its buffered state: the current
    /// play ends as interrupted and there is nothing left to resume
    #[allow(dead_code)]
    pub fn lose_device(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl AudioOutput for MockAudio {
    async fn play(&self, audio: Vec<u8>) -> Result<PlayOutcome> {
        self.active.store(true, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        self.interrupted.store(false, Ordering::SeqCst);
        let mut elapsed = 0;
        loop {
            if self.interrupted.swap(false, Ordering::SeqCst) {
                self.active.store(false, Ordering::SeqCst);
                return Ok(PlayOutcome::Interrupted);
            }
            if !self.paused.load(Ordering::SeqCst) {
                elapsed += 1;
                if elapsed >= 5 {
                    self.played
                        .lock()
                        .unwrap()
                        .push(String::from_utf8_lossy(&audio).into_owned());
                    self.active.store(false, Ordering::SeqCst);
                    return Ok(PlayOutcome::Completed);
                }
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }

    fn pause(&self) {
        if self.active.load(Ordering::SeqCst) {
            self.paused.store(true, Ordering::SeqCst);
        }
    }

    fn resume(&self) -> bool {
        if self.active.load(Ordering::SeqCst) {
            self.paused.store(false, Ordering::SeqCst);
            true
        } else {
            false
        }
    }

    fn interrupt(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }

    fn is_paused(&self) -> bool {
        self.active.load(Ordering::SeqCst) && self.paused.load(Ordering::SeqCst)
    }
}

/// Media session counting keep-alive acquisitions and releases
#[derive(Default)]
pub struct CountingSession {
    acquired: AtomicU64,
    released: AtomicU64,
}

impl CountingSession {
    pub fn acquired(&self) -> u64 {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> u64 {
        self.released.load(Ordering::SeqCst)
    }
}

impl MediaSession for CountingSession {
    fn acquire_keep_alive(&self) -> u64 {
        self.acquired.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn release_keep_alive(&self, _token: u64) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }

    fn publish_now_playing(&self, _now: &NowPlaying) {}
}

/// An engine wired to in-memory collaborators
pub struct Harness {
    pub engine: PlaybackEngine,
    pub synth: Arc<MockSynthesizer>,
    pub content: Arc<MockContent>,
    pub audio: Arc<MockAudio>,
    pub session: Arc<CountingSession>,
    pub progress: ProgressStore,
}

/// Build an engine over in-memory chapters with fast retry delays
pub fn harness(chapters: &[&str], prefetch_depth: usize) -> Harness {
    let pool = db::init_memory().expect("failed to init test db");
    let synth = Arc::new(MockSynthesizer::default());
    let content = Arc::new(MockContent::new(chapters));
    let audio = Arc::new(MockAudio::default());
    let session = Arc::new(CountingSession::default());
    let progress = ProgressStore::new(pool.clone());

    let engine = PlaybackEngine::new(
        synth.clone(),
        content.clone(),
        audio.clone(),
        session.clone(),
        ProgressStore::new(pool),
        EngineOptions {
            prefetch_depth,
            retry: RetryPolicy {
                max_attempts: 3,
                delay: Duration::from_millis(5),
            },
        },
    );

    Harness {
        engine,
        synth,
        content,
        audio,
        session,
        progress,
    }
}

/// A start request over the harness's chapters, titled "Chapter N"
pub fn start_request(h: &Harness, chapter_index: usize) -> StartRequest {
    let total = h.content.chapters.len();
    StartRequest {
        book_id: "book-1".to_string(),
        book_title: "Test Book".to_string(),
        chapter_titles: (1..=total).map(|i| format!("Chapter {i}")).collect(),
        chapter_index,
        text: h.content.chapters[chapter_index].clone(),
    }
}
