use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlaybackState {
    pub position_seconds: f64,
    pub duration_seconds: Option<f64>,
    pub playing: bool,
}

/// Shared playback store. The player writes it; trackers and cue followers only read.
#[derive(Debug, Clone, Default)]
pub struct PlaybackClock {
    state: Arc<RwLock<PlaybackState>>,
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> PlaybackState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn position(&self) -> f64 {
        self.snapshot().position_seconds
    }

    pub fn duration(&self) -> Option<f64> {
        self.snapshot().duration_seconds
    }

    pub fn set_position(&self, seconds: f64) {
        self.update(|state| state.position_seconds = seconds.max(0.0));
    }

    pub fn set_duration(&self, seconds: Option<f64>) {
        self.update(|state| state.duration_seconds = seconds.filter(|d| d.is_finite() && *d > 0.0));
    }

    pub fn set_playing(&self, playing: bool) {
        self.update(|state| state.playing = playing);
    }

    fn update<F: FnOnce(&mut PlaybackState)>(&self, f: F) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut state);
    }
}
