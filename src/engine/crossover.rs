//! Next-chapter staging
//!
//! When the current chapter runs low the engine stages the next one in the
//! background: fetch the text, segment it, and prefetch the first few unit
//! audios into a private cache. At the boundary the staged data is adopted
//! by move, so crossover costs no network round-trip on the hot path.

use tracing::{debug, warn};

use crate::cache::PrefetchCache;
use crate::content::ContentApi;
use crate::segment;
use crate::synth::Synthesizer;
use crate::Result;

/// How many units of the next chapter are prefetched while staging
pub const STAGE_PREFETCH: usize = 3;

/// A fully staged chapter, ready to adopt at the boundary
#[derive(Debug)]
pub struct StagedChapter {
    pub chapter_index: usize,
    pub units: Vec<String>,
    pub cache: PrefetchCache,
}

/// Staging bookkeeping owned by the engine state
#[derive(Debug, Default)]
pub struct CrossoverState {
    in_progress: bool,
    staged: Option<StagedChapter>,
}

impl CrossoverState {
    /// Whether a staging run for `chapter_index` should start now.
    ///
    /// Repeated triggers while a run is in flight or after it completed are
    /// no-ops; a failed run leaves the state clear so the next trigger
    /// retries.
    #[must_use]
    pub fn should_stage(&self, chapter_index: usize) -> bool {
        if self.in_progress {
            return false;
        }
        !matches!(&self.staged, Some(s) if s.chapter_index == chapter_index)
    }

    /// Mark a staging run as started
    pub fn begin(&mut self) {
        self.in_progress = true;
    }

    /// Record a completed staging run
    pub fn complete(&mut self, staged: StagedChapter) {
        self.in_progress = false;
        self.staged = Some(staged);
    }

    /// Record a failed staging run; the next trigger will retry
    pub fn fail(&mut self) {
        self.in_progress = false;
    }

    /// Take the staged chapter if it matches, transferring ownership
    pub fn take(&mut self, chapter_index: usize) -> Option<StagedChapter> {
        if matches!(&self.staged, Some(s) if s.chapter_index == chapter_index) {
            return self.staged.take();
        }
        None
    }

    /// Drop any staged data and in-flight mark
    pub fn clear(&mut self) {
        self.in_progress = false;
        self.staged = None;
    }
}

/// Fetch, segment, and partially prefetch a chapter.
///
/// Prefetch failures are logged and skipped; a staged chapter with fewer
/// cached units is still worth adopting. Only the text fetch itself is
/// fatal to the staging run.
///
/// # Errors
///
/// Returns an error when the chapter text cannot be fetched.
pub async fn stage(
    content: &dyn ContentApi,
    synth: &dyn Synthesizer,
    book_id: &str,
    chapter_index: usize,
) -> Result<StagedChapter> {
    let text = content.chapter_text(book_id, chapter_index).await?;
    let units = segment::segment_chapter(&text);

    let mut cache = PrefetchCache::new();
    for (idx, unit) in units.iter().take(STAGE_PREFETCH).enumerate() {
        match synth.synthesize(unit).await {
            Ok(audio) => cache.put(idx, audio),
            Err(e) => {
                warn!(chapter = chapter_index, unit = idx, error = %e, "staging prefetch failed");
            }
        }
    }

    debug!(
        chapter = chapter_index,
        units = units.len(),
        prefetched = cache.len(),
        "staged chapter"
    );

    Ok(StagedChapter {
        chapter_index,
        units,
        cache,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct StaticContent(String);

    #[async_trait]
    impl ContentApi for StaticContent {
        async fn chapter_text(&self, _book_id: &str, _chapter_index: usize) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    struct EchoSynth;

    #[async_trait]
    impl Synthesizer for EchoSynth {
        async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
            Ok(text.as_bytes().to_vec())
        }
    }

    fn staged(chapter_index: usize) -> StagedChapter {
        StagedChapter {
            chapter_index,
            units: vec!["one".to_string()],
            cache: PrefetchCache::new(),
        }
    }

    #[test]
    fn stage_prefetches_leading_units() {
        let content = StaticContent("<p>a</p><p>b</p><p>c</p><p>d</p>".to_string());
        let chapter = tokio_test::block_on(stage(&content, &EchoSynth, "book", 1)).unwrap();

        assert_eq!(chapter.chapter_index, 1);
        assert_eq!(chapter.units.len(), 4);
        assert_eq!(chapter.cache.cached_indices(), vec![0, 1, 2]);
    }

    #[test]
    fn trigger_is_idempotent_while_in_progress() {
        let mut state = CrossoverState::default();
        assert!(state.should_stage(1));
        state.begin();
        assert!(!state.should_stage(1));
    }

    #[test]
    fn trigger_is_idempotent_after_completion() {
        let mut state = CrossoverState::default();
        state.begin();
        state.complete(staged(1));
        assert!(!state.should_stage(1));
        // A different chapter is a fresh target
        assert!(state.should_stage(2));
    }

    #[test]
    fn failure_allows_retry() {
        let mut state = CrossoverState::default();
        state.begin();
        state.fail();
        assert!(state.should_stage(1));
    }

    #[test]
    fn take_matches_chapter_index() {
        let mut state = CrossoverState::default();
        state.complete(staged(2));
        assert!(state.take(3).is_none());
        assert!(state.take(2).is_some());
        // Ownership moved out, nothing left to take
        assert!(state.take(2).is_none());
    }

    #[test]
    fn clear_drops_staged_data() {
        let mut state = CrossoverState::default();
        state.begin();
        state.complete(staged(1));
        state.clear();
        assert!(state.take(1).is_none());
        assert!(state.should_stage(1));
    }
}
