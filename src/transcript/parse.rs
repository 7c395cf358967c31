use tracing::debug;

use super::Cue;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseReport {
    pub cues: Vec<Cue>,
    pub dropped_blocks: usize,
}

pub fn parse(raw: &str) -> Vec<Cue> {
    parse_with_report(raw).cues
}

/// Parses SRT or WebVTT-like text. Never fails: blocks without a usable time range,
/// with an empty or inverted range, or without text are dropped and counted.
pub fn parse_with_report(raw: &str) -> ParseReport {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let mut report = ParseReport::default();

    for (block_idx, block) in split_blocks(raw).into_iter().enumerate() {
        let block = if block_idx == 0 {
            match strip_vtt_header(block) {
                Some(rest) => rest,
                None => continue,
            }
        } else {
            block
        };
        if block.is_empty() {
            continue;
        }

        match parse_block(&block) {
            Some((start_seconds, end_seconds, text)) => {
                let index = report.cues.len() as u32 + 1;
                report.cues.push(Cue {
                    index,
                    start_seconds,
                    end_seconds,
                    text,
                });
            }
            None => report.dropped_blocks += 1,
        }
    }

    if report.dropped_blocks > 0 {
        debug!(
            dropped = report.dropped_blocks,
            kept = report.cues.len(),
            "dropped malformed transcript block(s)"
        );
    }
    report
}

fn split_blocks(raw: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();
    for line in raw.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

// A header block (WEBVTT plus metadata lines) is skipped entirely. If the header line
// shares a block with a cue, only the header line goes.
fn strip_vtt_header(block: Vec<&str>) -> Option<Vec<&str>> {
    let Some(first) = block.first() else {
        return Some(block);
    };
    if !first.trim_start().starts_with("WEBVTT") {
        return Some(block);
    }
    if block.iter().any(|line| line.contains("-->")) {
        Some(block[1..].to_vec())
    } else {
        None
    }
}

fn parse_block(lines: &[&str]) -> Option<(f64, f64, String)> {
    // Only the first or second line may carry the time range; the second slot allows
    // a numeric SRT index or a VTT cue identifier in front of it.
    let range_pos = lines.iter().take(2).position(|line| line.contains("-->"))?;
    let (start, end) = parse_time_range(lines[range_pos])?;
    if end <= start {
        return None;
    }

    let text = lines[range_pos + 1..]
        .iter()
        .map(|line| strip_markup(line))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if text.is_empty() {
        return None;
    }
    Some((start, end, text))
}

fn parse_time_range(line: &str) -> Option<(f64, f64)> {
    let (left, right) = line.split_once("-->")?;
    // VTT cue settings ("align:start position:10%") may follow the end timestamp.
    let end_token = right.split_whitespace().next()?;
    Some((parse_timestamp(left.trim())?, parse_timestamp(end_token)?))
}

/// Accepts `HH:MM:SS,mmm`, `HH:MM:SS.mmm`, `MM:SS.mmm` and the same without fraction.
pub fn parse_timestamp(raw: &str) -> Option<f64> {
    let normalized = raw.trim().replace(',', ".");
    let parts = normalized.split(':').collect::<Vec<_>>();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (parse_whole(h)?, parse_whole(m)?, parse_seconds(s)?),
        [m, s] => (0, parse_whole(m)?, parse_seconds(s)?),
        _ => return None,
    };
    if parts.len() == 3 && minutes >= 60 {
        return None;
    }
    if seconds >= 60.0 {
        return None;
    }
    Some(f64::from(hours) * 3600.0 + f64::from(minutes) * 60.0 + seconds)
}

fn parse_whole(raw: &str) -> Option<u32> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse::<u32>().ok()
}

fn parse_seconds(raw: &str) -> Option<f64> {
    let (whole, fraction) = match raw.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (raw, None),
    };
    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if let Some(fraction) = fraction
        && (fraction.is_empty() || !fraction.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }
    raw.parse::<f64>().ok()
}

fn strip_markup(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;
    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let opens_tag = after
            .chars()
            .next()
            .is_some_and(|c| c == '/' || c.is_ascii_alphanumeric());
        match after.find('>') {
            Some(close) if opens_tag => rest = &after[close + 1..],
            _ => {
                out.push('<');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}
