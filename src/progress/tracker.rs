use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::{debug, info, warn};

use super::clock::{Clock, PlaybackClock};
use super::{PlaybackProgress, ProgressSink, SaveRequest, whole_seconds};
use crate::config::TrackerSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Idle,
    Tracking,
    Saving,
    Flushed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SavePath {
    Voluntary,
    Forced,
    KeepAlive,
}

impl SavePath {
    fn bypasses_guard(self) -> bool {
        !matches!(self, Self::Voluntary)
    }
}

#[derive(Debug, Default)]
struct SaveLedger {
    in_flight: bool,
    last_saved_seconds: u32,
    saved_finished: bool,
    saved_at_logical: u64,
}

/// Decides when one episode's playback position is persisted.
///
/// Voluntary saves (pause, periodic checkpoint) never overlap: a request arriving
/// while one is in flight is dropped and the next trigger carries the newer time.
/// Two paths skip that guard: the forced teardown flush, and the keep-alive save
/// from `on_page_hide`, which also carries a terminal position. Failed saves are
/// logged only.
pub struct ProgressTracker {
    episode_id: String,
    sink: Arc<dyn ProgressSink>,
    clock: Arc<dyn Clock>,
    playback: PlaybackClock,
    settings: TrackerSettings,
    ledger: Arc<Mutex<SaveLedger>>,
    started: bool,
    playing: bool,
    flushed: bool,
    finished: bool,
    last_time: f64,
    last_attempt_at: Instant,
    next_logical: u64,
    workers: Vec<JoinHandle<()>>,
}

impl ProgressTracker {
    pub fn new(
        episode_id: &str,
        sink: Arc<dyn ProgressSink>,
        clock: Arc<dyn Clock>,
        playback: PlaybackClock,
        settings: TrackerSettings,
    ) -> Self {
        let last_attempt_at = clock.now();
        Self {
            episode_id: episode_id.to_string(),
            sink,
            clock,
            playback,
            settings,
            ledger: Arc::new(Mutex::new(SaveLedger::default())),
            started: false,
            playing: false,
            flushed: false,
            finished: false,
            last_time: 0.0,
            last_attempt_at,
            next_logical: 0,
            workers: Vec::new(),
        }
    }

    /// Starts from a previously stored position, which then counts as already saved.
    pub fn resume_from(mut self, seconds: f64) -> Self {
        let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
        lock(&self.ledger).last_saved_seconds = whole_seconds(seconds);
        self.last_time = seconds;
        self
    }

    pub fn episode_id(&self) -> &str {
        &self.episode_id
    }

    pub fn state(&self) -> TrackerState {
        if self.flushed {
            TrackerState::Flushed
        } else if lock(&self.ledger).in_flight {
            TrackerState::Saving
        } else if self.started {
            TrackerState::Tracking
        } else {
            TrackerState::Idle
        }
    }

    pub fn progress(&self) -> PlaybackProgress {
        let ledger = lock(&self.ledger);
        PlaybackProgress {
            episode_id: self.episode_id.clone(),
            progress_seconds: ledger.last_saved_seconds,
            is_finished: ledger.saved_finished,
            saved_at_logical: ledger.saved_at_logical,
        }
    }

    pub fn on_time_update(&mut self, seconds: f64) {
        if self.flushed || !seconds.is_finite() {
            return;
        }
        self.started = true;
        self.last_time = seconds.max(0.0);

        if !self.playing {
            return;
        }
        let elapsed = self.clock.now().saturating_duration_since(self.last_attempt_at);
        if elapsed >= self.settings.checkpoint_interval {
            let is_finished = self.finished;
            self.dispatch(self.last_time, is_finished, SavePath::Voluntary);
        }
    }

    pub fn on_play_state_change(&mut self, is_playing: bool) {
        if self.flushed {
            return;
        }
        self.started = true;
        let was_playing = std::mem::replace(&mut self.playing, is_playing);
        if is_playing {
            if !was_playing {
                // The checkpoint window starts over when playback (re)starts.
                self.last_attempt_at = self.clock.now();
            }
            return;
        }
        if !was_playing {
            return;
        }

        let position = self.last_time;
        if whole_seconds(position) == lock(&self.ledger).last_saved_seconds {
            return;
        }
        let is_finished = self.finished_at(position);
        self.dispatch(position, is_finished, SavePath::Voluntary);
    }

    /// Best-effort save for an imminent page/process exit. Returns without waiting.
    pub fn on_page_hide(&mut self) {
        if self.flushed || !self.started {
            return;
        }
        let position = self.last_time;
        let is_finished = self.finished_at(position);
        self.dispatch(position, is_finished, SavePath::KeepAlive);
    }

    /// Ends the session. Saves unconditionally, even over an in-flight save, when
    /// more than the flush threshold is unsaved. Idempotent.
    pub fn teardown(&mut self) {
        if self.flushed {
            return;
        }
        self.flushed = true;
        self.playing = false;

        let position = self.last_time;
        let saved = lock(&self.ledger).last_saved_seconds;
        let delta = (f64::from(whole_seconds(position)) - f64::from(saved)).abs();
        if delta <= self.settings.flush_threshold_secs {
            debug!(
                episode = %self.episode_id,
                delta,
                "skipping forced flush below threshold"
            );
            return;
        }
        let is_finished = self.finished_at(position);
        self.dispatch(position, is_finished, SavePath::Forced);
    }

    pub fn wait_for_saves(&mut self) {
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!(episode = %self.episode_id, "progress save worker panicked");
            }
        }
    }

    fn finished_at(&mut self, position: f64) -> bool {
        if let Some(duration) = self.playback.duration()
            && position >= duration - self.settings.finish_margin_secs
        {
            self.finished = true;
        }
        self.finished
    }

    fn dispatch(&mut self, position: f64, is_finished: bool, path: SavePath) {
        if !path.bypasses_guard() {
            let mut ledger = lock(&self.ledger);
            if ledger.in_flight {
                debug!(
                    episode = %self.episode_id,
                    position,
                    "save already in flight, dropping request"
                );
                return;
            }
            ledger.in_flight = true;
        }

        self.workers.retain(|worker| !worker.is_finished());
        self.next_logical += 1;
        self.last_attempt_at = self.clock.now();
        let logical = self.next_logical;
        let request = SaveRequest {
            episode_id: self.episode_id.clone(),
            progress_seconds: whole_seconds(position),
            is_finished,
            keep_alive: path == SavePath::KeepAlive,
        };
        let seconds = request.progress_seconds;
        match path {
            SavePath::Voluntary => debug!(episode = %self.episode_id, seconds, "saving progress"),
            SavePath::Forced => info!(episode = %self.episode_id, seconds, "forced progress flush"),
            SavePath::KeepAlive => {
                info!(episode = %self.episode_id, seconds, "keep-alive progress save")
            }
        }

        let sink = Arc::clone(&self.sink);
        let ledger = Arc::clone(&self.ledger);
        let worker = thread::spawn(move || {
            let result = sink.save(&request);
            let mut ledger = lock(&ledger);
            if !path.bypasses_guard() {
                ledger.in_flight = false;
            }
            match result {
                Ok(()) => {
                    // A later-issued save may have landed first; never roll back to this one.
                    if logical > ledger.saved_at_logical {
                        ledger.saved_at_logical = logical;
                        ledger.last_saved_seconds = request.progress_seconds;
                        ledger.saved_finished |= request.is_finished;
                    }
                }
                Err(err) => warn!(
                    episode = %request.episode_id,
                    seconds = request.progress_seconds,
                    "progress save failed: {err}"
                ),
            }
        });
        self.workers.push(worker);
    }
}

impl Drop for ProgressTracker {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn lock(ledger: &Mutex<SaveLedger>) -> MutexGuard<'_, SaveLedger> {
    ledger.lock().unwrap_or_else(PoisonError::into_inner)
}
