pub mod source;
pub mod srt;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use srt::{format_clock, parse_srt, parse_timestamp};

/// One line of a video transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptLine {
    /// Seconds from the start of the video
    pub offset_seconds: f64,
    pub text: String,
}

impl TranscriptLine {
    pub fn new(offset_seconds: f64, text: impl Into<String>) -> Self {
        Self {
            offset_seconds,
            text: text.into(),
        }
    }

    /// Clock label shown beside the line
    pub fn display_time(&self) -> String {
        format_clock(self.offset_seconds)
    }
}

/// Transcript lines ordered by offset, able to map a playback position to
/// the line being spoken.
#[derive(Debug, Clone)]
pub struct TranscriptIndex {
    lines: Vec<TranscriptLine>,
}

impl TranscriptIndex {
    /// Build an index, returning `None` for an empty transcript.
    ///
    /// Lines with a non-finite offset are dropped; the rest are stably
    /// sorted so equal offsets keep their source order.
    pub fn new(lines: Vec<TranscriptLine>) -> Option<Self> {
        let mut lines: Vec<TranscriptLine> = lines
            .into_iter()
            .filter(|line| line.offset_seconds.is_finite())
            .collect();

        if lines.is_empty() {
            return None;
        }

        lines.sort_by(|a, b| a.offset_seconds.total_cmp(&b.offset_seconds));
        Some(Self { lines })
    }

    /// Index of the last line whose offset is at or before `position`,
    /// or 0 when the position precedes the first line.
    pub fn resolve_active_line(&self, position: f64) -> usize {
        let started = self
            .lines
            .partition_point(|line| line.offset_seconds <= position);
        started.saturating_sub(1)
    }

    pub fn lines(&self) -> &[TranscriptLine] {
        &self.lines
    }

    pub fn get(&self, index: usize) -> Option<&TranscriptLine> {
        self.lines.get(index)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Availability of the transcript for the loaded video
#[derive(Debug, Clone, Default)]
pub enum TranscriptState {
    /// Fetch still in flight
    #[default]
    Loading,
    /// Source had no data, or the fetch failed
    Unavailable,
    Ready(TranscriptIndex),
}

impl TranscriptState {
    /// Build the state from a fetched line list; empty or absent data is
    /// reported as unavailable rather than as a transcript positioned at 0.
    pub fn from_lines(lines: Option<Vec<TranscriptLine>>) -> Self {
        match lines.and_then(TranscriptIndex::new) {
            Some(index) => Self::Ready(index),
            None => Self::Unavailable,
        }
    }

    /// Active line for a position, `None` unless a transcript is loaded
    pub fn active_line(&self, position: f64) -> Option<usize> {
        match self {
            Self::Ready(index) => Some(index.resolve_active_line(position)),
            _ => None,
        }
    }

    pub fn index(&self) -> Option<&TranscriptIndex> {
        match self {
            Self::Ready(index) => Some(index),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

/// Request to bring a transcript line into view, smoothly centered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScrollRequest {
    pub line: usize,
    pub smooth: bool,
    pub center: bool,
}

impl ScrollRequest {
    fn centered(line: usize) -> Self {
        Self {
            line,
            smooth: true,
            center: true,
        }
    }
}

/// Remembers the last highlighted line so scroll commands are only emitted
/// when the active line actually changes.
#[derive(Debug, Clone, Default)]
pub struct ActiveLineTracker {
    current: Option<usize>,
}

impl ActiveLineTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the newly resolved line; returns a scroll request only if it
    /// differs from the previous one.
    pub fn update(&mut self, resolved: Option<usize>) -> Option<ScrollRequest> {
        if resolved == self.current {
            return None;
        }

        self.current = resolved;
        resolved.map(|line| {
            debug!("📜 Active transcript line -> {}", line);
            ScrollRequest::centered(line)
        })
    }

    /// Forget the last line, e.g. after the transcript is (re)loaded
    pub fn reset(&mut self) {
        self.current = None;
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> TranscriptIndex {
        TranscriptIndex::new(vec![
            TranscriptLine::new(0.0, "intro"),
            TranscriptLine::new(4.5, "first point"),
            TranscriptLine::new(9.0, "second point"),
            TranscriptLine::new(15.0, "wrap up"),
        ])
        .unwrap()
    }

    #[test]
    fn test_resolve_active_line() {
        let index = sample_index();
        assert_eq!(index.resolve_active_line(0.0), 0);
        assert_eq!(index.resolve_active_line(4.4), 0);
        assert_eq!(index.resolve_active_line(4.5), 1);
        assert_eq!(index.resolve_active_line(10.0), 2);
        assert_eq!(index.resolve_active_line(1000.0), 3);
    }

    #[test]
    fn test_position_before_first_line_is_zero() {
        let index = TranscriptIndex::new(vec![
            TranscriptLine::new(3.0, "late start"),
            TranscriptLine::new(6.0, "next"),
        ])
        .unwrap();
        assert_eq!(index.resolve_active_line(1.0), 0);
        assert_eq!(index.resolve_active_line(-5.0), 0);
    }

    #[test]
    fn test_resolution_is_monotonic() {
        let index = sample_index();
        let mut previous = 0;
        let mut position = -2.0;
        while position < 20.0 {
            let line = index.resolve_active_line(position);
            assert!(line >= previous, "line went backwards at {}", position);
            previous = line;
            position += 0.25;
        }
    }

    #[test]
    fn test_unsorted_input_is_sorted_stably() {
        let index = TranscriptIndex::new(vec![
            TranscriptLine::new(5.0, "b"),
            TranscriptLine::new(1.0, "a"),
            TranscriptLine::new(5.0, "c"),
            TranscriptLine::new(f64::NAN, "dropped"),
        ])
        .unwrap();

        let texts: Vec<&str> = index.lines().iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
        assert_eq!(index.resolve_active_line(5.0), 2);
    }

    #[test]
    fn test_empty_transcript_is_unavailable() {
        assert!(TranscriptIndex::new(Vec::new()).is_none());

        let state = TranscriptState::from_lines(Some(Vec::new()));
        assert!(matches!(state, TranscriptState::Unavailable));
        assert_eq!(state.active_line(12.0), None);

        let state = TranscriptState::from_lines(None);
        assert!(matches!(state, TranscriptState::Unavailable));

        assert_eq!(TranscriptState::Loading.active_line(0.0), None);
    }

    #[test]
    fn test_tracker_only_scrolls_on_change() {
        let mut tracker = ActiveLineTracker::new();
        assert_eq!(tracker.update(Some(0)), Some(ScrollRequest::centered(0)));
        assert_eq!(tracker.update(Some(0)), None);
        assert_eq!(tracker.update(Some(2)), Some(ScrollRequest::centered(2)));
        assert_eq!(tracker.update(None), None);
        assert_eq!(tracker.current(), None);

        tracker.update(Some(1));
        tracker.reset();
        assert_eq!(tracker.update(Some(1)), Some(ScrollRequest::centered(1)));
    }

    #[test]
    fn test_display_time() {
        assert_eq!(TranscriptLine::new(75.9, "x").display_time(), "01:15");
    }
}
