//! Media session capability
//!
//! The host platform owns lock-screen metadata, remote commands, and
//! background keep-alives. The engine sees all of that through
//! [`MediaSession`] plus a stream of [`SessionSignal`]s, so the same core
//! runs headless, under a desktop shell, or inside a mobile app.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Metadata published to the platform's now-playing surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NowPlaying {
    pub book_title: String,
    pub chapter_title: String,
    pub unit_index: usize,
    pub total_units: usize,
    pub playing: bool,
}

/// Platform media integration
pub trait MediaSession: Send + Sync {
    /// Acquire a keep-alive preventing the platform from suspending audio.
    /// Returns a token for the matching release.
    fn acquire_keep_alive(&self) -> u64;

    /// Release a previously acquired keep-alive
    fn release_keep_alive(&self, token: u64);

    /// Publish now-playing metadata
    fn publish_now_playing(&self, now: &NowPlaying) {
        let _ = now;
    }
}

/// Scoped keep-alive: released when dropped, on every exit path
pub struct KeepAliveGuard {
    session: Arc<dyn MediaSession>,
    token: u64,
}

impl KeepAliveGuard {
    /// Acquire a keep-alive from the session
    #[must_use]
    pub fn acquire(session: Arc<dyn MediaSession>) -> Self {
        let token = session.acquire_keep_alive();
        Self { session, token }
    }
}

impl Drop for KeepAliveGuard {
    fn drop(&mut self) {
        self.session.release_keep_alive(self.token);
    }
}

impl std::fmt::Debug for KeepAliveGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeepAliveGuard")
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

/// External events the platform delivers to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSignal {
    /// Another app took the audio focus (phone call, navigation prompt)
    InterruptionBegan,
    /// The interruption ended; `resume_suggested` is the platform's hint
    /// that playback should continue on its own
    InterruptionEnded { resume_suggested: bool },
    /// The active output device disappeared (headphones unplugged)
    OutputDeviceRemoved,
    /// Remote play/resume command (lock screen, headset button)
    RemotePlay,
    /// Remote pause command
    RemotePause,
    /// Remote next-track command, mapped to the next chapter
    RemoteNextChapter,
    /// Remote previous-track command, mapped to the previous chapter
    RemotePreviousChapter,
}

/// Media session for headless use: hands out tokens, ignores metadata
#[derive(Debug, Default)]
pub struct NoopMediaSession {
    counter: AtomicU64,
}

impl MediaSession for NoopMediaSession {
    fn acquire_keep_alive(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn release_keep_alive(&self, _token: u64) {}
}
