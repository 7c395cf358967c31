use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::transcript::AlignMode;

pub const DB_ENV: &str = "PODLINGO_DB";
pub const CHECKPOINT_ENV: &str = "PODLINGO_CHECKPOINT_SECS";
pub const FINISH_MARGIN_ENV: &str = "PODLINGO_FINISH_MARGIN_SECS";
pub const FLUSH_THRESHOLD_ENV: &str = "PODLINGO_FLUSH_THRESHOLD_SECS";
pub const ALIGN_MODE_ENV: &str = "PODLINGO_ALIGN_MODE";

#[derive(Debug, Clone, PartialEq)]
pub struct TrackerSettings {
    pub checkpoint_interval: Duration,
    /// Playback within this many seconds of the end counts as finished.
    pub finish_margin_secs: f64,
    /// Teardown skips the forced save when less than this is unsaved.
    pub flush_threshold_secs: f64,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            checkpoint_interval: Duration::from_secs(15),
            finish_margin_secs: 5.0,
            flush_threshold_secs: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpSettings {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub attempts: usize,
    pub retry_delay: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(3),
            read_timeout: Duration::from_secs(10),
            attempts: 3,
            retry_delay: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    pub tracker: TrackerSettings,
    pub align_mode: AlignMode,
    pub http: HttpSettings,
    pub database_path: Option<PathBuf>,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(path) = lookup(DB_ENV).filter(|value| !value.trim().is_empty()) {
            settings.database_path = Some(PathBuf::from(path));
        }
        if let Some(secs) = positive_secs(&lookup, CHECKPOINT_ENV) {
            match Duration::try_from_secs_f64(secs) {
                Ok(interval) => settings.tracker.checkpoint_interval = interval,
                Err(err) => warn!(secs, "ignoring out-of-range {CHECKPOINT_ENV}: {err}"),
            }
        }
        if let Some(secs) = positive_secs(&lookup, FINISH_MARGIN_ENV) {
            settings.tracker.finish_margin_secs = secs;
        }
        if let Some(secs) = positive_secs(&lookup, FLUSH_THRESHOLD_ENV) {
            settings.tracker.flush_threshold_secs = secs;
        }
        if let Some(raw) = lookup(ALIGN_MODE_ENV) {
            match parse_align_mode(&raw) {
                Some(mode) => settings.align_mode = mode,
                None => warn!(value = %raw, "ignoring unknown {ALIGN_MODE_ENV}"),
            }
        }

        settings
    }
}

pub fn parse_align_mode(raw: &str) -> Option<AlignMode> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "position" => Some(AlignMode::Position),
        "index" | "cue-index" => Some(AlignMode::CueIndex),
        _ => None,
    }
}

fn positive_secs<F>(lookup: &F, key: &str) -> Option<f64>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs >= 0.0 => Some(secs),
        _ => {
            warn!(value = %raw, "ignoring invalid {key}");
            None
        }
    }
}
