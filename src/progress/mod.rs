//! Playback progress persistence: turns a noisy time signal into a few idempotent saves.

mod clock;
mod session;
mod tracker;

use std::sync::Arc;

use serde::Serialize;

use crate::config::TrackerSettings;
use crate::error::SaveError;

pub use clock::{Clock, PlaybackClock, PlaybackState, SystemClock};
pub use session::SessionManager;
pub use tracker::{ProgressTracker, TrackerState};

#[cfg(test)]
pub(crate) use clock::manual::ManualClock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaybackProgress {
    pub episode_id: String,
    pub progress_seconds: u32,
    pub is_finished: bool,
    /// Bumped per issued save; orders completions within one session only.
    pub saved_at_logical: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    pub episode_id: String,
    pub progress_seconds: u32,
    pub is_finished: bool,
    /// Issued while the page/process is going away; must not be cancelled by it.
    pub keep_alive: bool,
}

/// Persistence collaborator for playback progress. Implementations must be idempotent
/// per (user, episode): an older or repeated position must not regress what is stored.
pub trait ProgressSink: Send + Sync + 'static {
    fn save(&self, request: &SaveRequest) -> Result<(), SaveError>;
}

impl<F> ProgressSink for F
where
    F: Fn(&SaveRequest) -> Result<(), SaveError> + Send + Sync + 'static,
{
    fn save(&self, request: &SaveRequest) -> Result<(), SaveError> {
        self(request)
    }
}

/// Tracker with default thresholds, the system clock and a private playback clock.
pub fn create_progress_tracker<S: ProgressSink>(episode_id: &str, sink: S) -> ProgressTracker {
    ProgressTracker::new(
        episode_id,
        Arc::new(sink),
        Arc::new(SystemClock),
        PlaybackClock::new(),
        TrackerSettings::default(),
    )
}

pub(crate) fn whole_seconds(seconds: f64) -> u32 {
    if seconds.is_finite() && seconds > 0.0 {
        seconds.floor().min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}
