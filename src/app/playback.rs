use std::io::BufRead;

use anyhow::{Context, Result};
use podlingo::progress::{PlaybackClock, ProgressTracker};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum PlaybackEvent {
    Time(f64),
    Duration(f64),
    Play,
    Pause,
    Hide,
    End,
}

pub(crate) fn parse_playback_event(line: &str) -> Option<PlaybackEvent> {
    let mut parts = line.split_whitespace();
    let keyword = parts.next()?.to_ascii_lowercase();
    let argument = parts.next();
    if parts.next().is_some() {
        return None;
    }

    let seconds = || {
        argument
            .and_then(|raw| raw.parse::<f64>().ok())
            .filter(|value| value.is_finite() && *value >= 0.0)
    };
    match (keyword.as_str(), argument) {
        ("time" | "t", Some(_)) => seconds().map(PlaybackEvent::Time),
        ("duration", Some(_)) => seconds().map(PlaybackEvent::Duration),
        ("play", None) => Some(PlaybackEvent::Play),
        ("pause", None) => Some(PlaybackEvent::Pause),
        ("hide", None) => Some(PlaybackEvent::Hide),
        ("end" | "quit", None) => Some(PlaybackEvent::End),
        _ => None,
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct TrackSummary {
    pub(crate) events: usize,
    pub(crate) ignored_lines: usize,
    pub(crate) last_position: f64,
}

/// Feeds events into the shared playback clock and the tracker, then tears the
/// tracker down on `end`, end of input or a read error, and waits for
/// outstanding saves.
pub(crate) fn drive_tracker<R: BufRead>(
    mut input: R,
    tracker: &mut ProgressTracker,
    playback: &PlaybackClock,
) -> Result<TrackSummary> {
    let mut summary = TrackSummary::default();
    let outcome = feed_events(&mut input, tracker, playback, &mut summary);

    playback.set_playing(false);
    tracker.teardown();
    tracker.wait_for_saves();
    outcome.map(|()| summary)
}

fn feed_events<R: BufRead>(
    input: &mut R,
    tracker: &mut ProgressTracker,
    playback: &PlaybackClock,
    summary: &mut TrackSummary,
) -> Result<()> {
    let mut buf = Vec::new();
    let mut line_no = 0usize;
    loop {
        buf.clear();
        let read = input
            .read_until(b'\n', &mut buf)
            .context("failed reading playback events")?;
        if read == 0 {
            return Ok(());
        }
        line_no += 1;

        let Ok(line) = std::str::from_utf8(&buf) else {
            warn!(line = line_no, "ignoring playback event that is not valid UTF-8");
            summary.ignored_lines += 1;
            continue;
        };
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let Some(event) = parse_playback_event(trimmed) else {
            warn!(line = line_no, text = trimmed, "ignoring unrecognized playback event");
            summary.ignored_lines += 1;
            continue;
        };

        summary.events += 1;
        match event {
            PlaybackEvent::Time(seconds) => {
                playback.set_position(seconds);
                summary.last_position = seconds;
                tracker.on_time_update(seconds);
            }
            PlaybackEvent::Duration(seconds) => playback.set_duration(Some(seconds)),
            PlaybackEvent::Play => {
                playback.set_playing(true);
                tracker.on_play_state_change(true);
            }
            PlaybackEvent::Pause => {
                playback.set_playing(false);
                tracker.on_play_state_change(false);
            }
            PlaybackEvent::Hide => tracker.on_page_hide(),
            PlaybackEvent::End => return Ok(()),
        }
    }
}
