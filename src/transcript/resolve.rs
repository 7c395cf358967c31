use std::ops::Deref;

use super::AlignedCue;

/// Immutable cue sequence for one episode, indexed for per-tick lookup.
///
/// Cues must already be sorted by `start_seconds`; this is not re-checked. Alongside
/// the cues it keeps the running maximum of end times, which lets the first
/// matching cue be found by binary search even when malformed input overlaps.
#[derive(Debug, Clone, Default)]
pub struct CueTimeline {
    cues: Vec<AlignedCue>,
    max_end_through: Vec<f64>,
}

impl CueTimeline {
    pub fn new(cues: Vec<AlignedCue>) -> Self {
        let mut running = f64::NEG_INFINITY;
        let max_end_through = cues
            .iter()
            .map(|cue| {
                running = running.max(cue.end_seconds);
                running
            })
            .collect();
        Self {
            cues,
            max_end_through,
        }
    }

    pub fn cues(&self) -> &[AlignedCue] {
        &self.cues
    }

    pub fn resolve(&self, at_seconds: f64) -> Option<&AlignedCue> {
        self.resolve_index(at_seconds).map(|idx| &self.cues[idx])
    }

    fn resolve_index(&self, at_seconds: f64) -> Option<usize> {
        // Cues in [0, started) begin at or before the query time.
        let started = self
            .cues
            .partition_point(|cue| cue.start_seconds <= at_seconds);
        let first = self
            .max_end_through
            .partition_point(|max_end| *max_end < at_seconds);
        (first < started).then_some(first)
    }

    /// True when `idx` is the first cue in sequence order that covers `at_seconds`.
    fn is_first_match(&self, idx: usize, at_seconds: f64) -> bool {
        let Some(cue) = self.cues.get(idx) else {
            return false;
        };
        cue.contains(at_seconds) && (idx == 0 || self.max_end_through[idx - 1] < at_seconds)
    }
}

impl From<Vec<AlignedCue>> for CueTimeline {
    fn from(cues: Vec<AlignedCue>) -> Self {
        Self::new(cues)
    }
}

impl Deref for CueTimeline {
    type Target = [AlignedCue];

    fn deref(&self) -> &Self::Target {
        &self.cues
    }
}

/// Cue active at `at_seconds`, or `None` inside a gap. Boundaries are inclusive and
/// the earliest cue in sequence order wins when cues overlap.
pub fn resolve(cues: &CueTimeline, at_seconds: f64) -> Option<&AlignedCue> {
    cues.resolve(at_seconds)
}

/// Remembers the last resolved cue so forward playback usually skips the search.
/// Always agrees with [`resolve`]; a stale hint after a backward seek just misses.
#[derive(Debug, Clone, Copy, Default)]
pub struct CueCursor {
    hint: Option<usize>,
}

impl CueCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active<'a>(
        &mut self,
        timeline: &'a CueTimeline,
        at_seconds: f64,
    ) -> Option<&'a AlignedCue> {
        if let Some(hint) = self.hint {
            for candidate in [hint, hint + 1] {
                if timeline.is_first_match(candidate, at_seconds) {
                    self.hint = Some(candidate);
                    return timeline.cues.get(candidate);
                }
            }
        }

        let found = timeline.resolve_index(at_seconds);
        if found.is_some() {
            self.hint = found;
        }
        found.map(|idx| &timeline.cues[idx])
    }

    pub fn reset(&mut self) {
        self.hint = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cue(id: u32, start: f64, end: f64) -> AlignedCue {
        AlignedCue {
            id,
            start_seconds: start,
            end_seconds: end,
            primary_text: format!("cue {id}"),
            secondary_text: None,
        }
    }

    fn active_id(timeline: &CueTimeline, at: f64) -> Option<u32> {
        resolve(timeline, at).map(|cue| cue.id)
    }

    #[test]
    fn boundaries_are_inclusive() {
        let timeline = CueTimeline::new(vec![cue(1, 10.0, 15.0)]);
        assert_eq!(active_id(&timeline, 10.0), Some(1));
        assert_eq!(active_id(&timeline, 12.5), Some(1));
        assert_eq!(active_id(&timeline, 15.0), Some(1));
        assert_eq!(active_id(&timeline, 9.999), None);
        assert_eq!(active_id(&timeline, 15.001), None);
    }

    #[test]
    fn gaps_resolve_to_none() {
        let timeline = CueTimeline::new(vec![cue(1, 0.0, 2.0), cue(2, 5.0, 7.0)]);
        assert_eq!(active_id(&timeline, 3.0), None);
        assert_eq!(active_id(&timeline, 8.0), None);
        assert_eq!(active_id(&timeline, 6.0), Some(2));
    }

    #[test]
    fn touching_cues_prefer_the_earlier_one() {
        let timeline = CueTimeline::new(vec![cue(1, 10.0, 15.0), cue(2, 15.0, 20.0)]);
        assert_eq!(active_id(&timeline, 15.0), Some(1));
        assert_eq!(active_id(&timeline, 15.5), Some(2));
    }

    #[test]
    fn overlapping_cues_resolve_to_first_in_sequence() {
        let timeline = CueTimeline::new(vec![
            cue(1, 0.0, 100.0),
            cue(2, 10.0, 20.0),
            cue(3, 30.0, 40.0),
        ]);
        assert_eq!(active_id(&timeline, 35.0), Some(1));

        let timeline = CueTimeline::new(vec![
            cue(1, 0.0, 5.0),
            cue(2, 10.0, 50.0),
            cue(3, 30.0, 40.0),
        ]);
        assert_eq!(active_id(&timeline, 35.0), Some(2));
        assert_eq!(active_id(&timeline, 7.0), None);
    }

    #[test]
    fn empty_timeline_and_nan_resolve_to_none() {
        let empty = CueTimeline::default();
        assert_eq!(active_id(&empty, 1.0), None);
        let timeline = CueTimeline::new(vec![cue(1, 0.0, 2.0)]);
        assert_eq!(active_id(&timeline, f64::NAN), None);
    }

    #[test]
    fn binary_search_matches_linear_scan_on_large_sequence() {
        let cues = (0..1_000)
            .map(|i| cue(i + 1, i as f64 * 3.0, i as f64 * 3.0 + 2.0))
            .collect::<Vec<_>>();
        let timeline = CueTimeline::new(cues.clone());
        for step in 0..6_100 {
            let at = step as f64 * 0.5;
            let linear = cues.iter().find(|cue| cue.contains(at)).map(|cue| cue.id);
            assert_eq!(active_id(&timeline, at), linear, "mismatch at {at}");
        }
    }

    #[test]
    fn cursor_agrees_with_resolve_forward_and_backward() {
        let timeline = CueTimeline::new(vec![
            cue(1, 0.0, 2.0),
            cue(2, 2.0, 4.0),
            cue(3, 5.0, 7.0),
            cue(4, 7.5, 9.0),
        ]);
        let mut cursor = CueCursor::new();
        let forward = [0.5, 1.9, 2.0, 3.0, 4.5, 5.0, 6.9, 7.4, 8.0, 9.5];
        let backward = [8.0, 1.0, 6.0, 2.0, 0.0];
        for at in forward.iter().chain(backward.iter()) {
            let via_cursor = cursor.active(&timeline, *at).map(|cue| cue.id);
            assert_eq!(via_cursor, active_id(&timeline, *at), "mismatch at {at}");
        }
    }
}
