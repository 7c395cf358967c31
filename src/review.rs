//! Leitner-style review scheduling for learned vocabulary.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::info;

use crate::error::StoreError;

/// Days until the next review, indexed by the proficiency reached. Levels past the
/// end reuse the last interval.
pub const INTERVAL_DAYS: [i64; 7] = [0, 1, 3, 7, 14, 30, 90];

const HARD_RETRY_DAYS: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Forgot,
    Hard,
    Good,
    Easy,
}

impl Quality {
    pub fn label(self) -> &'static str {
        match self {
            Self::Forgot => "forgot",
            Self::Hard => "hard",
            Self::Good => "good",
            Self::Easy => "easy",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Quality {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "forgot" | "0" => Ok(Self::Forgot),
            "hard" | "1" => Ok(Self::Hard),
            "good" | "2" => Ok(Self::Good),
            "easy" | "3" => Ok(Self::Easy),
            other => Err(format!(
                "unknown review quality '{other}' (expected forgot, hard, good or easy)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReviewState {
    pub proficiency: u32,
    pub next_review_at: DateTime<Utc>,
}

pub fn interval_days(level: u32) -> i64 {
    let idx = (level as usize).min(INTERVAL_DAYS.len() - 1);
    INTERVAL_DAYS[idx]
}

pub fn next_state(current_proficiency: u32, quality: Quality) -> ReviewState {
    next_state_at(current_proficiency, quality, Utc::now())
}

/// Pure scheduling step. Easy is scheduled exactly like good.
pub fn next_state_at(
    current_proficiency: u32,
    quality: Quality,
    now: DateTime<Utc>,
) -> ReviewState {
    match quality {
        Quality::Forgot => ReviewState {
            proficiency: 0,
            next_review_at: now,
        },
        Quality::Hard => ReviewState {
            proficiency: current_proficiency.saturating_sub(1),
            next_review_at: now + Duration::days(HARD_RETRY_DAYS),
        },
        Quality::Good | Quality::Easy => {
            let proficiency = current_proficiency.saturating_add(1);
            ReviewState {
                proficiency,
                next_review_at: now + Duration::days(interval_days(proficiency)),
            }
        }
    }
}

pub trait VocabularyStore {
    fn load_proficiency(&self, vocabulary_id: i64) -> Result<u32, StoreError>;
    fn save_review_state(&self, vocabulary_id: i64, state: &ReviewState)
    -> Result<(), StoreError>;
}

/// Reads the current level fresh from the store, schedules, and writes the result back.
pub fn review_vocabulary<S: VocabularyStore + ?Sized>(
    store: &S,
    vocabulary_id: i64,
    quality: Quality,
    now: DateTime<Utc>,
) -> Result<ReviewState, StoreError> {
    let current = store.load_proficiency(vocabulary_id)?;
    let state = next_state_at(current, quality, now);
    store.save_review_state(vocabulary_id, &state)?;
    info!(
        vocabulary_id,
        %quality,
        from = current,
        to = state.proficiency,
        next_review_at = %state.next_review_at.to_rfc3339(),
        "vocabulary reviewed"
    );
    Ok(state)
}
