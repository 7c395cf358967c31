use std::io::{self, BufRead, Cursor, Read};
use std::sync::{Arc, Mutex};

use podlingo::config::{Settings, TrackerSettings};
use podlingo::db::{Database, DbProgressSink};
use podlingo::progress::{PlaybackClock, ProgressTracker, SystemClock};
use podlingo::transcript::AlignedCue;

use super::playback::*;
use super::*;

#[test]
fn parse_playback_event_accepts_known_commands() {
    assert_eq!(parse_playback_event("time 12.5"), Some(PlaybackEvent::Time(12.5)));
    assert_eq!(parse_playback_event("t 3"), Some(PlaybackEvent::Time(3.0)));
    assert_eq!(
        parse_playback_event("duration 600"),
        Some(PlaybackEvent::Duration(600.0))
    );
    assert_eq!(parse_playback_event("PLAY"), Some(PlaybackEvent::Play));
    assert_eq!(parse_playback_event("pause"), Some(PlaybackEvent::Pause));
    assert_eq!(parse_playback_event("hide"), Some(PlaybackEvent::Hide));
    assert_eq!(parse_playback_event("end"), Some(PlaybackEvent::End));
}

#[test]
fn parse_playback_event_rejects_malformed_lines() {
    assert_eq!(parse_playback_event(""), None);
    assert_eq!(parse_playback_event("time"), None);
    assert_eq!(parse_playback_event("time -4"), None);
    assert_eq!(parse_playback_event("time soon"), None);
    assert_eq!(parse_playback_event("play 3"), None);
    assert_eq!(parse_playback_event("time 1 2"), None);
    assert_eq!(parse_playback_event("rewind"), None);
}

#[test]
fn format_timestamp_renders_hours_minutes_seconds_millis() {
    assert_eq!(format_timestamp(0.0), "00:00:00.000");
    assert_eq!(format_timestamp(61.25), "00:01:01.250");
    assert_eq!(format_timestamp(3723.004), "01:02:03.004");
    assert_eq!(format_timestamp(-5.0), "00:00:00.000");
    assert_eq!(format_timestamp(f64::NAN), "00:00:00.000");
}

#[test]
fn truncate_keeps_short_text_and_marks_cut_text() {
    assert_eq!(truncate("episode-1", 32), "episode-1");
    assert_eq!(truncate("abcdefghij", 8), "abcde...");
    assert_eq!(truncate("你好世界你好世界", 5), "你好...");
}

#[test]
fn cue_text_shows_both_languages_when_present() {
    let mut cue = AlignedCue {
        id: 1,
        start_seconds: 0.0,
        end_seconds: 1.0,
        primary_text: "Good morning".to_string(),
        secondary_text: Some("早上好".to_string()),
    };
    assert_eq!(cue_text(&cue), "Good morning | 早上好");
    cue.secondary_text = None;
    assert_eq!(cue_text(&cue), "Good morning");
}

fn write_fixture(name: &str, body: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("podlingo-app-{}-{name}", std::process::id()));
    std::fs::write(&path, body).expect("write fixture");
    path
}

#[test]
fn load_transcript_falls_back_to_primary_on_length_mismatch() {
    let primary = write_fixture(
        "mismatch-en.srt",
        "1\n00:00:01,000 --> 00:00:02,000\nOne\n\n2\n00:00:03,000 --> 00:00:04,000\nTwo\n",
    );
    let secondary = write_fixture("mismatch-zh.srt", "1\n00:00:01,000 --> 00:00:02,000\n一\n");

    let loaded = load_transcript(
        &Settings::default(),
        primary.to_str().expect("utf-8 path"),
        Some(secondary.to_str().expect("utf-8 path")),
    )
    .expect("mismatch should degrade, not fail");
    assert_eq!(loaded.timeline.len(), 2);
    assert!(loaded.timeline.iter().all(|cue| cue.secondary_text.is_none()));
    assert!(
        loaded
            .fallback_reason
            .as_deref()
            .is_some_and(|reason| reason.contains("2 cue(s)")),
        "unexpected fallback: {:?}",
        loaded.fallback_reason
    );

    let _ = std::fs::remove_file(primary);
    let _ = std::fs::remove_file(secondary);
}

#[test]
fn load_transcript_pairs_tracks_and_counts_dropped_blocks() {
    let primary = write_fixture(
        "pair-en.vtt",
        "WEBVTT\n\nNOTE recorded live\n\n00:01.000 --> 00:02.000\nHello\n\n00:02.500 --> 00:04.000\nWorld\n",
    );
    let secondary = write_fixture(
        "pair-zh.srt",
        "1\n00:00:01,000 --> 00:00:02,000\n你好\n\n2\n00:00:02,500 --> 00:00:04,000\n世界\n",
    );

    let loaded = load_transcript(
        &Settings::default(),
        primary.to_str().expect("utf-8 path"),
        Some(secondary.to_str().expect("utf-8 path")),
    )
    .expect("tracks should align");
    assert!(loaded.fallback_reason.is_none());
    assert_eq!(loaded.dropped_blocks, 1);
    let active = loaded.timeline.resolve(3.0).expect("cue should be active");
    assert_eq!(active.secondary_text.as_deref(), Some("世界"));

    let _ = std::fs::remove_file(primary);
    let _ = std::fs::remove_file(secondary);
}

#[test]
fn load_transcript_without_secondary_file_is_primary_only() {
    let primary = write_fixture("solo-en.srt", "1\n00:00:01,000 --> 00:00:02,000\nSolo\n");
    let loaded = load_transcript(
        &Settings::default(),
        primary.to_str().expect("utf-8 path"),
        Some("/no/such/secondary.srt"),
    )
    .expect("missing secondary is fine");
    assert_eq!(loaded.timeline.len(), 1);
    assert!(loaded.fallback_reason.is_none());
    let _ = std::fs::remove_file(primary);
}

#[test]
fn drive_tracker_persists_pause_and_final_position() {
    let db = Database::open_in_memory().expect("open db");
    db.migrate().expect("migrate");
    let db = Arc::new(Mutex::new(db));

    let playback = PlaybackClock::new();
    let mut tracker = ProgressTracker::new(
        "ep-42",
        Arc::new(DbProgressSink::new(Arc::clone(&db), "tester")),
        Arc::new(SystemClock),
        playback.clone(),
        TrackerSettings::default(),
    );

    let events = "duration 300\nplay\ntime 10\ntime 42\npause\n# comment\nbogus line\nplay\ntime 298\nend\ntime 5\n";
    let summary =
        drive_tracker(Cursor::new(events), &mut tracker, &playback).expect("drive tracker");
    assert_eq!(summary.events, 8);
    assert_eq!(summary.ignored_lines, 1);
    assert_eq!(summary.last_position, 298.0);

    let entry = db
        .lock()
        .expect("lock db")
        .load_progress("tester", "ep-42")
        .expect("load")
        .expect("progress should be stored");
    assert_eq!(entry.progress_seconds, 298);
    assert!(entry.is_finished);
}

fn tracker_on(db: &Arc<Mutex<Database>>, playback: &PlaybackClock) -> ProgressTracker {
    ProgressTracker::new(
        "ep-7",
        Arc::new(DbProgressSink::new(Arc::clone(db), "tester")),
        Arc::new(SystemClock),
        playback.clone(),
        TrackerSettings::default(),
    )
}

fn stored_seconds(db: &Arc<Mutex<Database>>) -> Option<u32> {
    db.lock()
        .expect("lock db")
        .load_progress("tester", "ep-7")
        .expect("load")
        .map(|entry| entry.progress_seconds)
}

#[test]
fn drive_tracker_skips_undecodable_lines_and_still_flushes() {
    let db = Database::open_in_memory().expect("open db");
    db.migrate().expect("migrate");
    let db = Arc::new(Mutex::new(db));
    let playback = PlaybackClock::new();
    let mut tracker = tracker_on(&db, &playback);

    let mut events = b"play\ntime 120\n".to_vec();
    events.extend_from_slice(&[0xff, 0xfe, b'\n']);
    events.extend_from_slice(b"time 130\n");
    let summary =
        drive_tracker(Cursor::new(events), &mut tracker, &playback).expect("drive tracker");

    assert_eq!(summary.events, 3);
    assert_eq!(summary.ignored_lines, 1);
    assert_eq!(tracker.state(), podlingo::progress::TrackerState::Flushed);
    assert_eq!(stored_seconds(&db), Some(130));
}

/// Yields its lines, then fails like a broken pipe.
struct FailingInput {
    inner: Cursor<Vec<u8>>,
}

impl Read for FailingInput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl BufRead for FailingInput {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.inner.position() >= self.inner.get_ref().len() as u64 {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdin closed"));
        }
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.inner.consume(amt);
    }
}

#[test]
fn drive_tracker_flushes_before_reporting_read_errors() {
    let db = Database::open_in_memory().expect("open db");
    db.migrate().expect("migrate");
    let db = Arc::new(Mutex::new(db));
    let playback = PlaybackClock::new();
    let mut tracker = tracker_on(&db, &playback);

    let input = FailingInput {
        inner: Cursor::new(b"play\ntime 120\ntime 130\n".to_vec()),
    };
    let result = drive_tracker(input, &mut tracker, &playback);

    assert!(result.is_err());
    assert_eq!(tracker.state(), podlingo::progress::TrackerState::Flushed);
    assert_eq!(stored_seconds(&db), Some(130));
}
