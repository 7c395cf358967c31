mod playback;

#[cfg(test)]
mod tests;

use std::io;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::Utc;
use podlingo::config::Settings;
use podlingo::db::{Database, DbProgressSink};
use podlingo::fetch::{fetch_optional_transcript, fetch_transcript};
use podlingo::paths::database_file_path;
use podlingo::progress::{PlaybackClock, ProgressTracker, SystemClock};
use podlingo::review::{Quality, review_vocabulary};
use podlingo::transcript::{AlignedCue, CueTimeline, merge_with, parse_with_report};
use tracing::warn;

use crate::cli::{Cli, Command, VocabCommand};

use self::playback::drive_tracker;

pub fn run(cli: Cli, settings: &Settings) -> Result<()> {
    match cli.command {
        Command::Cues {
            primary,
            secondary,
            json,
        } => run_cues(settings, &primary, secondary.as_deref(), json),
        Command::At {
            primary,
            seconds,
            secondary,
        } => run_at(settings, &primary, secondary.as_deref(), seconds),
        Command::Track {
            episode_id,
            user,
            duration,
        } => run_track(settings, &episode_id, &user, duration),
        Command::Progress { user } => run_progress(settings, &user),
        Command::Vocab(VocabCommand::Add { word, translation }) => {
            run_vocab_add(settings, &word, &translation)
        }
        Command::Vocab(VocabCommand::Due) => run_vocab_due(settings),
        Command::Review { id, quality } => run_review(settings, id, quality),
    }
}

struct LoadedTranscript {
    timeline: CueTimeline,
    dropped_blocks: usize,
    fallback_reason: Option<String>,
}

fn load_transcript(
    settings: &Settings,
    primary: &str,
    secondary: Option<&str>,
) -> Result<LoadedTranscript> {
    let primary_raw = fetch_transcript(primary, &settings.http)
        .with_context(|| format!("failed to load primary transcript {primary}"))?;
    let primary_report = parse_with_report(&primary_raw);
    let mut dropped_blocks = primary_report.dropped_blocks;

    let secondary_cues = match secondary {
        Some(locator) => match fetch_optional_transcript(locator, &settings.http) {
            Ok(Some(raw)) => {
                let report = parse_with_report(&raw);
                dropped_blocks += report.dropped_blocks;
                report.cues
            }
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!("secondary transcript unavailable: {err}");
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    let (cues, fallback_reason) =
        match merge_with(&primary_report.cues, &secondary_cues, settings.align_mode) {
            Ok(cues) => (cues, None),
            Err(err) => {
                // Never guess a pairing; show the primary track alone.
                let cues = merge_with(&primary_report.cues, &[], settings.align_mode)?;
                (cues, Some(err.to_string()))
            }
        };

    Ok(LoadedTranscript {
        timeline: CueTimeline::new(cues),
        dropped_blocks,
        fallback_reason,
    })
}

fn run_cues(settings: &Settings, primary: &str, secondary: Option<&str>, json: bool) -> Result<()> {
    let loaded = load_transcript(settings, primary, secondary)?;
    if json {
        let out = serde_json::to_string_pretty(loaded.timeline.cues())
            .context("failed to serialize cues")?;
        println!("{out}");
    } else {
        println!("{:<6} {:<12} {:<12} {}", "ID", "START", "END", "TEXT");
        for cue in loaded.timeline.iter() {
            println!(
                "{:<6} {:<12} {:<12} {}",
                cue.id,
                format_timestamp(cue.start_seconds),
                format_timestamp(cue.end_seconds),
                cue_text(cue)
            );
        }
    }
    report_degradations(&loaded);
    Ok(())
}

fn run_at(settings: &Settings, primary: &str, secondary: Option<&str>, seconds: f64) -> Result<()> {
    let loaded = load_transcript(settings, primary, secondary)?;
    match loaded.timeline.resolve(seconds) {
        Some(cue) => println!(
            "[{} - {}] #{} {}",
            format_timestamp(cue.start_seconds),
            format_timestamp(cue.end_seconds),
            cue.id,
            cue_text(cue)
        ),
        None => println!("No active cue at {}.", format_timestamp(seconds)),
    }
    report_degradations(&loaded);
    Ok(())
}

fn run_track(
    settings: &Settings,
    episode_id: &str,
    user: &str,
    duration: Option<f64>,
) -> Result<()> {
    let db = open_db(settings)?;
    let resume_at = db
        .load_progress(user, episode_id)?
        .map(|entry| f64::from(entry.progress_seconds))
        .unwrap_or(0.0);
    let db = Arc::new(Mutex::new(db));

    let playback = PlaybackClock::new();
    playback.set_duration(duration);
    playback.set_position(resume_at);
    let mut tracker = ProgressTracker::new(
        episode_id,
        Arc::new(DbProgressSink::new(Arc::clone(&db), user)),
        Arc::new(SystemClock),
        playback.clone(),
        settings.tracker.clone(),
    )
    .resume_from(resume_at);

    println!("Tracking {episode_id} from {}.", format_timestamp(resume_at));
    let summary = drive_tracker(io::stdin().lock(), &mut tracker, &playback)?;
    let progress = tracker.progress();
    println!(
        "Processed {} event(s), ignored {} line(s). Saved position: {}{}",
        summary.events,
        summary.ignored_lines,
        format_timestamp(f64::from(progress.progress_seconds)),
        if progress.is_finished { " (finished)" } else { "" }
    );
    Ok(())
}

fn run_progress(settings: &Settings, user: &str) -> Result<()> {
    let db = open_db(settings)?;
    let items = db.list_progress(user)?;
    if items.is_empty() {
        println!("No listening progress yet. Run `podlingo track <episode>` first.");
        return Ok(());
    }

    println!("{:<32} {:<12} {:<9} {:<28}", "EPISODE", "POSITION", "FINISHED", "UPDATED");
    for item in items {
        println!(
            "{:<32} {:<12} {:<9} {:<28}",
            truncate(&item.episode_id, 32),
            format_timestamp(f64::from(item.progress_seconds)),
            if item.is_finished { "yes" } else { "no" },
            item.updated_at
        );
    }
    Ok(())
}

fn run_vocab_add(settings: &Settings, word: &str, translation: &str) -> Result<()> {
    let db = open_db(settings)?;
    let id = db.add_vocabulary(word, translation, Utc::now())?;
    println!("Added #{id}: {} = {}", word.trim(), translation.trim());
    Ok(())
}

fn run_vocab_due(settings: &Settings) -> Result<()> {
    let db = open_db(settings)?;
    let items = db.list_due(Utc::now())?;
    if items.is_empty() {
        println!("Nothing due for review.");
        return Ok(());
    }

    println!("{:<6} {:<24} {:<24} {:<6}", "ID", "WORD", "TRANSLATION", "LEVEL");
    for item in items {
        println!(
            "{:<6} {:<24} {:<24} {:<6}",
            item.id,
            truncate(&item.word, 24),
            truncate(&item.translation, 24),
            item.proficiency
        );
    }
    Ok(())
}

fn run_review(settings: &Settings, id: i64, quality: Quality) -> Result<()> {
    let db = open_db(settings)?;
    let entry = db.vocabulary(id)?;
    let state = review_vocabulary(&db, id, quality, Utc::now())?;
    println!(
        "{} ({quality}): level {} -> {}, next review {}",
        entry.word,
        entry.proficiency,
        state.proficiency,
        state.next_review_at.format("%Y-%m-%d %H:%M UTC")
    );
    Ok(())
}

fn open_db(settings: &Settings) -> Result<Database> {
    let db_path = database_file_path(settings)?;
    let db = Database::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;
    db.migrate().context("failed to migrate database")?;
    Ok(db)
}

fn report_degradations(loaded: &LoadedTranscript) {
    if let Some(reason) = &loaded.fallback_reason {
        eprintln!("Warning: {reason}. Showing primary track only.");
    }
    if loaded.dropped_blocks > 0 {
        eprintln!(
            "Warning: skipped {} malformed transcript block(s).",
            loaded.dropped_blocks
        );
    }
}

pub(crate) fn cue_text(cue: &AlignedCue) -> String {
    match &cue.secondary_text {
        Some(secondary) => format!("{} | {secondary}", cue.primary_text),
        None => cue.primary_text.clone(),
    }
}

pub(crate) fn format_timestamp(seconds: f64) -> String {
    let total_ms = if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1000.0).round() as u64
    } else {
        0
    };
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms / 60_000) % 60;
    let secs = (total_ms / 1000) % 60;
    let millis = total_ms % 1000;
    format!("{hours:02}:{minutes:02}:{secs:02}.{millis:03}")
}

pub(crate) fn truncate(input: &str, max: usize) -> String {
    let count = input.chars().count();
    if count <= max {
        return input.to_string();
    }
    if max <= 3 {
        return input.chars().take(max).collect();
    }
    let mut out = input.chars().take(max - 3).collect::<String>();
    out.push_str("...");
    out
}
