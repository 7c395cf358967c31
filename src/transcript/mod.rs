//! Timed-text engine: transcript parsing, bilingual alignment and active cue lookup.

mod align;
mod parse;
mod resolve;

use serde::Serialize;

pub use align::{AlignMode, merge, merge_with};
pub use parse::{ParseReport, parse, parse_timestamp, parse_with_report};
pub use resolve::{CueCursor, CueTimeline, resolve};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cue {
    pub index: u32,
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedCue {
    pub id: u32,
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub primary_text: String,
    pub secondary_text: Option<String>,
}

impl AlignedCue {
    pub fn contains(&self, at_seconds: f64) -> bool {
        self.start_seconds <= at_seconds && at_seconds <= self.end_seconds
    }
}
