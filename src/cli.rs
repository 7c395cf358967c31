use clap::{Parser, Subcommand};
use podlingo::review::Quality;

#[derive(Debug, Parser)]
#[command(
    name = "podlingo",
    version,
    about = "Bilingual transcripts, listening progress and vocabulary review for podcast episodes"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Parse and align transcripts, then print every cue.
    Cues {
        /// Primary-language transcript (path or http(s) URL).
        primary: String,
        /// Secondary-language transcript; a missing one is not an error.
        #[arg(long)]
        secondary: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Show the cue active at a playback time.
    At {
        primary: String,
        seconds: f64,
        #[arg(long)]
        secondary: Option<String>,
    },
    /// Drive a progress tracker from playback events on stdin.
    Track {
        episode_id: String,
        #[arg(long, default_value = "local")]
        user: String,
        #[arg(long)]
        duration: Option<f64>,
    },
    /// List stored listening progress.
    Progress {
        #[arg(long, default_value = "local")]
        user: String,
    },
    #[command(subcommand)]
    Vocab(VocabCommand),
    /// Grade one vocabulary item and reschedule it.
    Review {
        id: i64,
        #[arg(value_parser = parse_quality)]
        quality: Quality,
    },
}

#[derive(Debug, Subcommand)]
pub enum VocabCommand {
    Add { word: String, translation: String },
    Due,
}

fn parse_quality(raw: &str) -> Result<Quality, String> {
    raw.parse()
}
