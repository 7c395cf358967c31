use std::collections::HashMap;

use super::{AlignedCue, Cue};
use crate::error::MismatchedTrackLengthError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlignMode {
    /// Position `i` pairs with position `i`; unequal non-empty lengths are an error.
    #[default]
    Position,
    /// Pair on `Cue::index`; primary cues without a counterpart get no secondary text.
    CueIndex,
}

pub fn merge(
    primary: &[Cue],
    secondary: &[Cue],
) -> Result<Vec<AlignedCue>, MismatchedTrackLengthError> {
    merge_with(primary, secondary, AlignMode::Position)
}

pub fn merge_with(
    primary: &[Cue],
    secondary: &[Cue],
    mode: AlignMode,
) -> Result<Vec<AlignedCue>, MismatchedTrackLengthError> {
    if primary.is_empty() {
        return Ok(Vec::new());
    }
    if secondary.is_empty() {
        return Ok(primary.iter().map(|cue| aligned(cue, None)).collect());
    }

    match mode {
        AlignMode::Position => {
            if primary.len() != secondary.len() {
                return Err(MismatchedTrackLengthError {
                    primary: primary.len(),
                    secondary: secondary.len(),
                });
            }
            Ok(primary
                .iter()
                .zip(secondary)
                .map(|(cue, other)| aligned(cue, Some(other.text.clone())))
                .collect())
        }
        AlignMode::CueIndex => {
            let by_index = secondary
                .iter()
                .map(|cue| (cue.index, cue.text.as_str()))
                .collect::<HashMap<_, _>>();
            Ok(primary
                .iter()
                .map(|cue| aligned(cue, by_index.get(&cue.index).map(|text| text.to_string())))
                .collect())
        }
    }
}

fn aligned(cue: &Cue, secondary_text: Option<String>) -> AlignedCue {
    AlignedCue {
        id: cue.index,
        start_seconds: cue.start_seconds,
        end_seconds: cue.end_seconds,
        primary_text: cue.text.clone(),
        secondary_text,
    }
}
