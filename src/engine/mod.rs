//! Playback state machine
//!
//! One owned [`PlaybackEngine`] per app. A session is driven by a single
//! spawned task that selects the current unit, fetches audio on a cache
//! miss, plays it, advances, and schedules background prefetch. All shared
//! state lives behind one mutex that is never held across an await;
//! everything async re-validates the session epoch before applying its
//! result, so stale fetches are discarded instead of cancelled.
//!
//! ```text
//!  Idle ──start_reading──▶ Playing(i) ──unit done──▶ Playing(i+1)
//!    ▲                      │    ▲ │
//!    │                   pause   │ └─end of units──▶ next chapter / Idle
//!    └──────stop───────── Paused(i)
//! ```

pub mod crossover;
pub mod retry;

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{Notify, broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::audio::{AudioOutput, PlayOutcome};
use crate::cache::PrefetchCache;
use crate::config::Config;
use crate::content::ContentApi;
use crate::media::{KeepAliveGuard, MediaSession, NowPlaying, SessionSignal};
use crate::progress::{ProgressMarker, ProgressStore};
use crate::segment;
use crate::synth::Synthesizer;
use crate::Result;

pub use crossover::{CrossoverState, StagedChapter};
pub use retry::RetryPolicy;

/// How long to wait after an audio interruption ends before resuming.
/// Resuming the instant the other app releases focus tends to clip the
/// first word.
pub const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Everything needed to start reading a book
#[derive(Debug, Clone)]
pub struct StartRequest {
    pub book_id: String,
    pub book_title: String,
    /// Titles of every chapter, in order; also defines the chapter count
    pub chapter_titles: Vec<String>,
    /// Chapter to start in
    pub chapter_index: usize,
    /// Raw markup of that chapter
    pub text: String,
}

/// Engine tuning knobs
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Units to prefetch ahead of the cursor; 0 disables prefetching
    pub prefetch_depth: usize,
    /// Prefetch retry policy
    pub retry: RetryPolicy,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            prefetch_depth: 3,
            retry: RetryPolicy::default(),
        }
    }
}

impl From<&Config> for EngineOptions {
    fn from(config: &Config) -> Self {
        Self {
            prefetch_depth: config.prefetch_depth,
            retry: RetryPolicy {
                delay: config.retry_delay(),
                ..RetryPolicy::default()
            },
        }
    }
}

/// Events published on the engine's broadcast channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// Playback moved to a different chapter
    ChapterChanged(usize),
    /// The session reached the end of the book
    Finished,
}

/// Observable playback state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSnapshot {
    pub is_playing: bool,
    pub is_paused: bool,
    pub current_unit_index: usize,
    pub total_units: usize,
    pub is_loading_audio: bool,
    /// Unit indices with cached audio, ascending
    pub preloaded_units: Vec<usize>,
    pub chapter_index: usize,
}

#[derive(Default)]
#[allow(clippy::struct_excessive_bools)]
struct EngineState {
    /// Session epoch; bumped by `start_reading` and `stop` so in-flight
    /// work for an older session is discarded on arrival
    session_id: u64,
    book_id: String,
    book_title: String,
    chapter_titles: Vec<String>,
    chapter_index: usize,
    units: Vec<String>,
    cursor: usize,
    playing: bool,
    paused: bool,
    loading: bool,
    /// Play the chapter title before the next unit
    announce_title: bool,
    /// A chapter jump requested by the control surface
    pending_chapter: Option<usize>,
    cache: PrefetchCache,
    crossover: CrossoverState,
    keep_alive: Option<KeepAliveGuard>,
}

struct Inner {
    state: Mutex<EngineState>,
    synth: Arc<dyn Synthesizer>,
    content: Arc<dyn ContentApi>,
    audio: Arc<dyn AudioOutput>,
    session: Arc<dyn MediaSession>,
    progress: ProgressStore,
    prefetch_depth: usize,
    retry: RetryPolicy,
    events: broadcast::Sender<EngineEvent>,
    /// Wakes a driver parked on a pause or on an in-flight background
    /// fetch; every control mutation and fetch resolution pulses it
    wake: Notify,
}

/// Owned playback controller; cheap to clone, all clones share one session
#[derive(Clone)]
pub struct PlaybackEngine {
    inner: Arc<Inner>,
}

impl PlaybackEngine {
    /// Build an engine over its collaborators
    #[must_use]
    pub fn new(
        synth: Arc<dyn Synthesizer>,
        content: Arc<dyn ContentApi>,
        audio: Arc<dyn AudioOutput>,
        session: Arc<dyn MediaSession>,
        progress: ProgressStore,
        options: EngineOptions,
    ) -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(EngineState::default()),
                synth,
                content,
                audio,
                session,
                progress,
                prefetch_depth: options.prefetch_depth,
                retry: options.retry,
                events,
                wake: Notify::new(),
            }),
        }
    }

    /// Start reading a book, replacing any active session.
    ///
    /// When a progress marker exists for this book and chapter, playback
    /// resumes at the saved unit; otherwise it starts at unit 0 with a
    /// chapter title announcement.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NoVoiceSelected`] when the synthesizer has
    /// no voice configured, or a database error from the progress store.
    pub fn start_reading(&self, request: StartRequest) -> Result<()> {
        self.inner.synth.ready()?;

        let units = segment::segment_chapter(&request.text);
        let marker = self.inner.progress.get(&request.book_id)?;
        let resume_unit = marker
            .filter(|m| m.chapter_index == request.chapter_index)
            .map(|m| m.unit_index)
            .filter(|&unit| unit < units.len())
            .unwrap_or(0);

        info!(
            book = %request.book_id,
            chapter = request.chapter_index,
            unit = resume_unit,
            units = units.len(),
            "starting reading session"
        );

        let (session_id, replaced_guard) = {
            let mut st = lock(&self.inner.state);
            let replaced = st.keep_alive.take();
            st.session_id += 1;
            st.book_id = request.book_id;
            st.book_title = request.book_title;
            st.chapter_titles = request.chapter_titles;
            st.chapter_index = request.chapter_index;
            st.units = units;
            st.cursor = resume_unit;
            st.playing = true;
            st.paused = false;
            st.loading = false;
            st.pending_chapter = None;
            st.announce_title = resume_unit == 0;
            st.cache.clear();
            st.crossover.clear();
            st.keep_alive = Some(KeepAliveGuard::acquire(Arc::clone(&self.inner.session)));
            (st.session_id, replaced)
        };
        drop(replaced_guard);

        // Unblock a driver parked by the previous session
        self.inner.wake.notify_one();
        tokio::spawn(drive(Arc::clone(&self.inner), session_id));
        Ok(())
    }

    /// Suspend playback, keeping the device's buffered state
    pub fn pause(&self) {
        {
            let mut st = lock(&self.inner.state);
            if !st.playing || st.paused {
                return;
            }
            st.paused = true;
        }
        self.inner.audio.pause();
        debug!("playback paused");
        publish_now_playing(&self.inner);
    }

    /// Resume paused playback.
    ///
    /// If the device lost its buffered state during the pause, the current
    /// unit is replayed from the top instead.
    pub fn resume(&self) {
        {
            let mut st = lock(&self.inner.state);
            if !st.playing || !st.paused {
                return;
            }
            st.paused = false;
        }
        if !self.inner.audio.resume() {
            debug!("device state lost during pause, replaying current unit");
        }
        self.inner.wake.notify_one();
        publish_now_playing(&self.inner);
    }

    /// End the session: discard caches, release the keep-alive, go idle.
    /// In-flight fetches are not cancelled; their results are discarded on
    /// arrival.
    pub fn stop(&self) {
        let guard = {
            let mut st = lock(&self.inner.state);
            st.session_id += 1;
            st.playing = false;
            st.paused = false;
            st.loading = false;
            st.pending_chapter = None;
            st.cache.clear();
            st.crossover.clear();
            st.keep_alive.take()
        };
        drop(guard);
        self.inner.audio.interrupt();
        self.inner.wake.notify_one();
        info!("playback stopped");
        publish_now_playing(&self.inner);
    }

    /// Skip forward one unit; no-op at the last unit
    pub fn next_sentence(&self) {
        self.skip_to(|cursor, total| (cursor + 1 < total).then_some(cursor + 1));
    }

    /// Skip back one unit; no-op at unit 0
    pub fn previous_sentence(&self) {
        self.skip_to(|cursor, _| cursor.checked_sub(1));
    }

    fn skip_to(&self, target: impl FnOnce(usize, usize) -> Option<usize>) {
        let marker = {
            let mut st = lock(&self.inner.state);
            if !st.playing {
                return;
            }
            let Some(next) = target(st.cursor, st.units.len()) else {
                return;
            };
            st.cursor = next;
            ProgressMarker {
                book_id: st.book_id.clone(),
                chapter_index: st.chapter_index,
                unit_index: next,
            }
        };
        persist(&self.inner, &marker);
        // The driver re-selects at the new cursor; cached prefetches for
        // this chapter stay valid
        self.inner.audio.interrupt();
        self.inner.wake.notify_one();
        publish_now_playing(&self.inner);
    }

    /// Jump to the next chapter; no-op at the last chapter
    pub fn next_chapter(&self) {
        let target = {
            let st = lock(&self.inner.state);
            if !st.playing || st.chapter_index + 1 >= st.chapter_titles.len() {
                return;
            }
            st.chapter_index + 1
        };
        self.jump_to_chapter(target);
    }

    /// Jump to the previous chapter; no-op at the first chapter
    pub fn previous_chapter(&self) {
        let target = {
            let st = lock(&self.inner.state);
            if !st.playing || st.chapter_index == 0 {
                return;
            }
            st.chapter_index - 1
        };
        self.jump_to_chapter(target);
    }

    fn jump_to_chapter(&self, target: usize) {
        {
            let mut st = lock(&self.inner.state);
            if !st.playing {
                return;
            }
            st.pending_chapter = Some(target);
            st.paused = false;
        }
        self.inner.audio.interrupt();
        self.inner.wake.notify_one();
    }

    /// Current observable state
    #[must_use]
    pub fn snapshot(&self) -> PlaybackSnapshot {
        let st = lock(&self.inner.state);
        PlaybackSnapshot {
            is_playing: st.playing,
            is_paused: st.paused,
            current_unit_index: st.cursor.min(st.units.len().saturating_sub(1)),
            total_units: st.units.len(),
            is_loading_audio: st.loading,
            preloaded_units: st.cache.cached_indices(),
            chapter_index: st.chapter_index,
        }
    }

    /// Subscribe to engine events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.inner.events.subscribe()
    }

    /// Pump platform session signals into the control surface
    pub fn attach_signals(&self, mut signals: mpsc::Receiver<SessionSignal>) {
        let engine = self.clone();
        tokio::spawn(async move {
            while let Some(signal) = signals.recv().await {
                debug!(?signal, "session signal");
                match signal {
                    SessionSignal::InterruptionBegan | SessionSignal::OutputDeviceRemoved => {
                        engine.pause();
                    }
                    SessionSignal::InterruptionEnded { resume_suggested } => {
                        if resume_suggested {
                            tokio::time::sleep(SETTLE_DELAY).await;
                            engine.resume();
                        }
                    }
                    SessionSignal::RemotePlay => engine.resume(),
                    SessionSignal::RemotePause => engine.pause(),
                    SessionSignal::RemoteNextChapter => engine.next_chapter(),
                    SessionSignal::RemotePreviousChapter => engine.previous_chapter(),
                }
            }
        });
    }
}

fn lock(state: &Mutex<EngineState>) -> MutexGuard<'_, EngineState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

fn chapter_title(st: &EngineState) -> String {
    st.chapter_titles
        .get(st.chapter_index)
        .cloned()
        .unwrap_or_else(|| format!("Chapter {}", st.chapter_index + 1))
}

fn persist(inner: &Inner, marker: &ProgressMarker) {
    if let Err(e) = inner.progress.set(marker) {
        warn!(error = %e, "failed to persist progress marker");
    }
}

fn publish_now_playing(inner: &Inner) {
    let now = {
        let st = lock(&inner.state);
        NowPlaying {
            book_title: st.book_title.clone(),
            chapter_title: chapter_title(&st),
            unit_index: st.cursor.min(st.units.len().saturating_sub(1)),
            total_units: st.units.len(),
            playing: st.playing && !st.paused,
        }
    };
    inner.session.publish_now_playing(&now);
}

/// One iteration's worth of work for the driver
enum Step {
    /// The session was replaced; exit
    Stale,
    /// Paused with no audio in flight; park until resumed
    WaitResume,
    /// Play the chapter title pseudo-unit
    Announce { title: String },
    /// Play one unit, fetching first on a cache miss
    Play {
        index: usize,
        text: String,
        cached: Option<Vec<u8>>,
    },
    /// A background fetch for this unit is already in flight; park until
    /// it lands rather than fetching the same unit twice
    WaitFetch { index: usize },
    /// Unit has no speakable text; advance without touching the network
    SkipUnspeakable { index: usize },
    /// Move into another chapter
    EnterChapter { target: usize },
    /// No more units and no more chapters
    Finished,
}

fn next_step(inner: &Inner, session_id: u64) -> Step {
    let mut st = lock(&inner.state);
    if st.session_id != session_id {
        return Step::Stale;
    }
    if st.paused {
        return Step::WaitResume;
    }
    if let Some(target) = st.pending_chapter.take() {
        return Step::EnterChapter { target };
    }
    if st.announce_title {
        st.announce_title = false;
        return Step::Announce {
            title: chapter_title(&st),
        };
    }
    if st.cursor >= st.units.len() {
        if st.chapter_index + 1 < st.chapter_titles.len() {
            return Step::EnterChapter {
                target: st.chapter_index + 1,
            };
        }
        return Step::Finished;
    }

    let index = st.cursor;
    let text = st.units[index].clone();
    if !segment::is_speakable(&text) {
        return Step::SkipUnspeakable { index };
    }
    let cached = st.cache.audio(index);
    if cached.is_none() && st.cache.is_fetching(index) {
        st.loading = true;
        return Step::WaitFetch { index };
    }
    st.loading = cached.is_none();
    Step::Play {
        index,
        text,
        cached,
    }
}

async fn drive(inner: Arc<Inner>, session_id: u64) {
    loop {
        match next_step(&inner, session_id) {
            Step::Stale => return,
            Step::WaitResume => wait_while_paused(&inner, session_id).await,
            Step::Announce { title } => announce(&inner, session_id, &title).await,
            Step::Play {
                index,
                text,
                cached,
            } => play_unit(&inner, session_id, index, &text, cached).await,
            Step::WaitFetch { index } => wait_for_fetch(&inner, session_id, index).await,
            Step::SkipUnspeakable { index } => {
                debug!(unit = index, "unit has no speakable text, skipping");
                advance_past(&inner, session_id, index);
            }
            Step::EnterChapter { target } => {
                if !enter_chapter(&inner, session_id, target).await {
                    return;
                }
            }
            Step::Finished => {
                finish(&inner, session_id, true);
                return;
            }
        }
    }
}

async fn wait_while_paused(inner: &Inner, session_id: u64) {
    loop {
        {
            let st = lock(&inner.state);
            if st.session_id != session_id || !st.paused {
                return;
            }
        }
        inner.wake.notified().await;
    }
}

/// Park until the in-flight background fetch for the cursor unit lands,
/// is abandoned, or the cursor moves. At most one fetch per unit is ever
/// in flight.
async fn wait_for_fetch(inner: &Inner, session_id: u64, index: usize) {
    loop {
        {
            let st = lock(&inner.state);
            if st.session_id != session_id
                || st.cursor != index
                || st.pending_chapter.is_some()
                || st.cache.is_cached(index)
                || !st.cache.is_fetching(index)
            {
                return;
            }
        }
        inner.wake.notified().await;
    }
}

/// Play the chapter title announcement. Failures are not worth a skip;
/// playback just starts with the first unit.
async fn announce(inner: &Arc<Inner>, session_id: u64, title: &str) {
    match inner.synth.synthesize(title).await {
        Ok(audio) => {
            {
                let mut st = lock(&inner.state);
                if st.session_id != session_id {
                    return;
                }
                if st.paused {
                    // A pause landed during synthesis; announce again on
                    // resume instead of speaking over the pause
                    st.announce_title = true;
                    return;
                }
            }
            if let Err(e) = inner.audio.play(audio).await {
                debug!(error = %e, "title announcement playback failed");
            }
        }
        Err(e) => debug!(error = %e, "title announcement synthesis failed"),
    }
}

async fn play_unit(
    inner: &Arc<Inner>,
    session_id: u64,
    index: usize,
    text: &str,
    cached: Option<Vec<u8>>,
) {
    let chapter = {
        let mut st = lock(&inner.state);
        if st.session_id != session_id || st.paused {
            return;
        }
        if cached.is_none() && !st.cache.mark_fetching(index) {
            // A background fetch raced in since step selection; the next
            // iteration waits for it instead of fetching twice
            return;
        }
        st.chapter_index
    };

    let audio = if let Some(audio) = cached {
        audio
    } else {
        // The active unit is fetched exactly once; on failure the listener
        // hears the next unit instead of a stall. Retry is reserved for
        // background prefetch.
        let fetched = inner.synth.synthesize(text).await;
        let mut st = lock(&inner.state);
        st.loading = false;
        if st.session_id != session_id || st.chapter_index != chapter {
            return;
        }
        st.cache.unmark_fetching(index);
        if st.cursor != index {
            // Arrived too late; discard without caching or playing
            return;
        }
        match fetched {
            Ok(audio) => {
                st.cache.put(index, audio.clone());
                if st.paused {
                    // A pause landed during the fetch; keep the audio
                    // cached and play it on resume
                    return;
                }
                drop(st);
                audio
            }
            Err(e) => {
                drop(st);
                warn!(unit = index, error = %e, "unit synthesis failed, skipping");
                advance_past(inner, session_id, index);
                return;
            }
        }
    };

    schedule_prefetch(inner, session_id);
    publish_now_playing(inner);

    match inner.audio.play(audio).await {
        Ok(PlayOutcome::Completed) => advance_past(inner, session_id, index),
        // Interrupted: a skip, jump, pause teardown, or stop. The next
        // `next_step` re-reads the cursor and does the right thing.
        Ok(PlayOutcome::Interrupted) => {}
        Err(e) => {
            warn!(unit = index, error = %e, "audio decode failed, skipping");
            advance_past(inner, session_id, index);
        }
    }
}

/// Advance the cursor past a unit that finished or was skipped over.
/// If a manual skip already moved the cursor elsewhere, leave it alone.
fn advance_past(inner: &Inner, session_id: u64, from_index: usize) {
    let marker = {
        let mut st = lock(&inner.state);
        if st.session_id != session_id {
            return;
        }
        if st.cursor == from_index {
            st.cursor += 1;
        }
        ProgressMarker {
            book_id: st.book_id.clone(),
            chapter_index: st.chapter_index,
            // Past the last unit the cursor sits at `units.len()`; the
            // marker stays clamped to a resumable unit
            unit_index: st.cursor.min(st.units.len().saturating_sub(1)),
        }
    };
    persist(inner, &marker);
    publish_now_playing(inner);
}

/// Kick off background fetches for the window ahead of the cursor, and
/// trigger next-chapter staging when the chapter runs low.
fn schedule_prefetch(inner: &Arc<Inner>, session_id: u64) {
    let depth = inner.prefetch_depth;
    if depth == 0 {
        return;
    }

    let mut jobs = Vec::new();
    let mut staging = None;
    {
        let mut guard = lock(&inner.state);
        let st = &mut *guard;
        if st.session_id != session_id {
            return;
        }

        let chapter = st.chapter_index;
        let start = st.cursor + 1;
        let end = (start + depth).min(st.units.len());
        for index in start..end {
            if !segment::is_speakable(&st.units[index]) {
                continue;
            }
            if st.cache.is_cached(index) || st.cache.is_fetching(index) {
                continue;
            }
            if inner.retry.exhausted(st.cache.failures(index)) {
                continue;
            }
            st.cache.mark_fetching(index);
            jobs.push((chapter, index, st.units[index].clone()));
        }

        let remaining = st.units.len().saturating_sub(st.cursor + 1);
        let next = st.chapter_index + 1;
        if remaining <= depth / 2
            && next < st.chapter_titles.len()
            && st.crossover.should_stage(next)
        {
            st.crossover.begin();
            staging = Some((st.book_id.clone(), next));
        }
    }

    for (chapter, index, text) in jobs {
        tokio::spawn(prefetch_unit(
            Arc::clone(inner),
            session_id,
            chapter,
            index,
            text,
        ));
    }
    if let Some((book_id, next)) = staging {
        info!(chapter = next, "staging next chapter");
        tokio::spawn(run_crossover(Arc::clone(inner), session_id, book_id, next));
    }
}

/// Background fetch of one unit, with bounded fixed-delay retry
async fn prefetch_unit(
    inner: Arc<Inner>,
    session_id: u64,
    chapter: usize,
    index: usize,
    text: String,
) {
    loop {
        let result = inner.synth.synthesize(&text).await;
        let delay = {
            let mut st = lock(&inner.state);
            if st.session_id != session_id || st.chapter_index != chapter {
                // Session or chapter moved on; the cleared cache already
                // dropped our fetching mark
                return;
            }
            match result {
                Ok(audio) => {
                    st.cache.put(index, audio);
                    drop(st);
                    debug!(unit = index, "prefetched unit");
                    // The driver may be parked waiting on this unit
                    inner.wake.notify_one();
                    return;
                }
                Err(e) => {
                    let failures = st.cache.record_failure(index);
                    match inner.retry.next_delay(failures) {
                        Some(delay) => {
                            debug!(unit = index, failures, error = %e, "prefetch failed, will retry");
                            delay
                        }
                        None => {
                            st.cache.unmark_fetching(index);
                            drop(st);
                            warn!(unit = index, failures, error = %e, "prefetch abandoned");
                            inner.wake.notify_one();
                            return;
                        }
                    }
                }
            }
        };
        tokio::time::sleep(delay).await;
    }
}

/// Background staging of the next chapter
async fn run_crossover(inner: Arc<Inner>, session_id: u64, book_id: String, chapter_index: usize) {
    let staged = crossover::stage(
        inner.content.as_ref(),
        inner.synth.as_ref(),
        &book_id,
        chapter_index,
    )
    .await;

    let mut st = lock(&inner.state);
    if st.session_id != session_id {
        return;
    }
    match staged {
        Ok(chapter) => st.crossover.complete(chapter),
        Err(e) => {
            st.crossover.fail();
            warn!(chapter = chapter_index, error = %e, "chapter staging failed");
        }
    }
}

/// Move playback into `target`, adopting staged data when available.
/// Returns `false` when the driver should exit.
async fn enter_chapter(inner: &Arc<Inner>, session_id: u64, target: usize) -> bool {
    let (book_id, staged) = {
        let mut st = lock(&inner.state);
        if st.session_id != session_id {
            return false;
        }
        (st.book_id.clone(), st.crossover.take(target))
    };

    let (units, cache) = if let Some(staged) = staged {
        debug!(chapter = target, prefetched = staged.cache.len(), "adopting staged chapter");
        (staged.units, staged.cache)
    } else {
        match inner.content.chapter_text(&book_id, target).await {
            Ok(text) => (segment::segment_chapter(&text), PrefetchCache::new()),
            Err(e) => {
                warn!(chapter = target, error = %e, "chapter fetch failed, ending session");
                finish(inner, session_id, false);
                return false;
            }
        }
    };

    let marker = {
        let mut st = lock(&inner.state);
        if st.session_id != session_id {
            return false;
        }
        st.chapter_index = target;
        st.units = units;
        st.cursor = 0;
        st.cache = cache;
        st.announce_title = true;
        ProgressMarker {
            book_id: st.book_id.clone(),
            chapter_index: target,
            unit_index: 0,
        }
    };
    persist(inner, &marker);
    let _ = inner.events.send(EngineEvent::ChapterChanged(target));
    publish_now_playing(inner);
    true
}

/// End of the session: go idle and release the keep-alive. A finished
/// book also drops its progress marker so the next start begins at the
/// top; a session ended by a fetch failure keeps its marker.
fn finish(inner: &Inner, session_id: u64, book_done: bool) {
    let (guard, book_id) = {
        let mut st = lock(&inner.state);
        if st.session_id != session_id {
            return;
        }
        st.playing = false;
        st.paused = false;
        st.loading = false;
        st.crossover.clear();
        (st.keep_alive.take(), st.book_id.clone())
    };
    drop(guard);
    if book_done {
        if let Err(e) = inner.progress.clear(&book_id) {
            warn!(error = %e, "failed to clear progress marker");
        }
    }
    let _ = inner.events.send(EngineEvent::Finished);
    info!("reached end of book");
    publish_now_playing(inner);
}
