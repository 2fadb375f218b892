//! SubRip captions and clock strings
//!
//! Caption tracks are sometimes published as SRT rather than as JSON line
//! lists. Only the start of each cue matters for transcript navigation.

use super::TranscriptLine;

/// Parse a clock or seconds string into seconds.
///
/// Accepts `HH:MM:SS,mmm`, `HH:MM:SS.mmm`, `HH:MM:SS`, `MM:SS` and plain
/// (possibly fractional) seconds.
pub fn parse_timestamp(timestamp: &str) -> Option<f64> {
    let t = timestamp.trim();
    if t.is_empty() {
        return None;
    }

    if !t.contains(':') {
        return t.parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0);
    }

    let parts: Vec<&str> = t.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (h.parse::<u64>().ok()?, m.parse::<u64>().ok()?, *s),
        [m, s] => (0, m.parse::<u64>().ok()?, *s),
        _ => return None,
    };

    let seconds: f64 = seconds.replace(',', ".").parse().ok()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }

    let whole = hours.checked_mul(3600)?.checked_add(minutes.checked_mul(60)?)?;
    Some(whole as f64 + seconds)
}

/// Format seconds as `MM:SS`, or `H:MM:SS` from one hour on
pub fn format_clock(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };

    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

/// Whether a body looks like SubRip text
pub fn looks_like_srt(content: &str) -> bool {
    content.lines().any(|line| line.contains("-->"))
}

/// Parse SRT cues into transcript lines keyed by cue start.
///
/// Malformed cues are skipped; ordering is left to the transcript index.
pub fn parse_srt(content: &str) -> Vec<TranscriptLine> {
    let normalized = content.replace("\r\n", "\n");
    let mut lines = Vec::new();

    for block in normalized.split("\n\n") {
        let mut rows = block.lines().map(str::trim).filter(|row| !row.is_empty());

        let Some(timing) = rows.by_ref().find(|row| row.contains("-->")) else {
            continue;
        };

        let start = timing.split("-->").next().and_then(parse_timestamp);
        let text = clean_text(&rows.collect::<Vec<_>>().join(" "));

        match start {
            Some(start) if !text.is_empty() => lines.push(TranscriptLine::new(start, text)),
            _ => continue,
        }
    }

    lines
}

/// Collapse whitespace for single-line display
fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
