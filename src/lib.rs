//! Learning progress engine for podcast-based language study.
//!
//! Three parts: a timed-text engine ([`transcript`]) that parses and aligns bilingual
//! transcripts and finds the active cue for a playback time, a progress tracker
//! ([`progress`]) that turns playback events into a few idempotent saves, and a
//! Leitner review scheduler ([`review`]).

pub mod config;
pub mod db;
pub mod error;
pub mod fetch;
mod http;
pub mod paths;
pub mod progress;
pub mod review;
pub mod transcript;

pub use error::{FetchError, MismatchedTrackLengthError, SaveError, StoreError};
pub use progress::{
    PlaybackClock, PlaybackProgress, ProgressSink, ProgressTracker, SaveRequest,
    create_progress_tracker,
};
pub use review::{Quality, ReviewState, next_state};
pub use transcript::{AlignedCue, Cue, CueTimeline, merge, parse, resolve};
