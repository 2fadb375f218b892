/// Navigation sequence builder
///
/// Turns the persisted result set of an earlier full-text search into the
/// ordered list of moments of one video the viewer can step through.
pub mod normalize;
pub mod store;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use self::normalize::normalize_record;
use self::store::PersistedStore;

/// One search match, normalized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub video_id: String,
    pub offset_seconds: f64,
    pub text: String,
    pub score: f64,
}

/// Selected entry of a navigation sequence; `None` iff the sequence is empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Cursor(Option<usize>);

impl Cursor {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn at(index: usize) -> Self {
        Self(Some(index))
    }

    pub fn index(&self) -> Option<usize> {
        self.0
    }

    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }
}

/// Per-video ordered moments with a cursor
#[derive(Debug, Clone, Default)]
pub struct NavigationSequence {
    entries: Vec<SearchResult>,
    cursor: Cursor,
}

impl NavigationSequence {
    /// Build the sequence for `video_id` from the results stored under
    /// `persisted_key`.
    ///
    /// A missing key, absent value or unparsable value yields an empty
    /// sequence. With a requested offset the cursor starts at the first
    /// entry within `tolerance` seconds of it, else at the first entry.
    pub fn build(
        store: &dyn PersistedStore,
        persisted_key: Option<&str>,
        video_id: &str,
        requested_offset: Option<f64>,
        tolerance: f64,
    ) -> Self {
        let Some(key) = persisted_key else {
            debug!("No query key, navigation context disabled");
            return Self::default();
        };

        let Some(raw) = store.get(key) else {
            debug!("No stored results for key {}", key);
            return Self::default();
        };

        let records = match parse_result_set(&raw) {
            Some(records) => records,
            None => {
                warn!("Stored results for key {} are malformed, ignoring", key);
                return Self::default();
            }
        };

        let sequence = Self::from_results(records.iter().filter_map(normalize_record), video_id, requested_offset, tolerance);
        info!(
            "🧭 Navigation sequence for {}: {} moments, cursor {:?}",
            video_id,
            sequence.len(),
            sequence.cursor.index()
        );
        sequence
    }

    /// Filter, stably sort and position the cursor over normalized results
    pub fn from_results(
        results: impl IntoIterator<Item = SearchResult>,
        video_id: &str,
        requested_offset: Option<f64>,
        tolerance: f64,
    ) -> Self {
        let mut entries: Vec<SearchResult> = results
            .into_iter()
            .filter(|result| result.video_id == video_id)
            .collect();

        // sort_by is stable: equal offsets keep their stored order
        entries.sort_by(|a, b| a.offset_seconds.total_cmp(&b.offset_seconds));

        // Identical moments share an offset, so only the run of equal offsets is compared
        let before = entries.len();
        let mut unique: Vec<SearchResult> = Vec::with_capacity(before);
        for entry in entries {
            let duplicate = unique
                .iter()
                .rev()
                .take_while(|kept| kept.offset_seconds == entry.offset_seconds)
                .any(|kept| kept.text == entry.text);
            if !duplicate {
                unique.push(entry);
            }
        }
        if unique.len() < before {
            debug!("Dropped {} duplicate moments for {}", before - unique.len(), video_id);
        }
        let entries = unique;

        let cursor = if entries.is_empty() {
            Cursor::none()
        } else {
            let matched = requested_offset.filter(|o| o.is_finite()).and_then(|requested| {
                entries
                    .iter()
                    .position(|entry| (entry.offset_seconds - requested).abs() <= tolerance)
            });
            Cursor::at(matched.unwrap_or(0))
        };

        Self { entries, cursor }
    }

    pub fn entries(&self) -> &[SearchResult] {
        &self.entries
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Entry under the cursor
    pub fn current(&self) -> Option<&SearchResult> {
        self.cursor.index().and_then(|i| self.entries.get(i))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_next(&self) -> bool {
        matches!(self.cursor.index(), Some(i) if i + 1 < self.entries.len())
    }

    pub fn has_prev(&self) -> bool {
        matches!(self.cursor.index(), Some(i) if i > 0)
    }

    /// Advance the cursor; no-op at the last entry. Returns the new entry
    /// when the cursor moved.
    pub fn next(&mut self) -> Option<&SearchResult> {
        if !self.has_next() {
            return None;
        }
        self.cursor = Cursor::at(self.cursor.index()? + 1);
        self.current()
    }

    /// Step the cursor back; no-op at the first entry
    pub fn prev(&mut self) -> Option<&SearchResult> {
        if !self.has_prev() {
            return None;
        }
        self.cursor = Cursor::at(self.cursor.index()? - 1);
        self.current()
    }

    /// Jump to an entry; out-of-range or unchanged selections are no-ops
    pub fn select(&mut self, index: usize) -> Option<&SearchResult> {
        if index >= self.entries.len() || self.cursor.index() == Some(index) {
            return None;
        }
        self.cursor = Cursor::at(index);
        self.current()
    }

    /// Human label such as `2 / 5`
    pub fn position_label(&self) -> Option<String> {
        self.cursor
            .index()
            .map(|i| format!("{} / {}", i + 1, self.entries.len()))
    }
}

/// Accept a bare list, or an object wrapping one under `matches`/`results`
pub(crate) fn parse_result_set(raw: &str) -> Option<Vec<Value>> {
    match serde_json::from_str::<Value>(raw).ok()? {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => ["matches", "results"].iter().find_map(|key| match map.remove(*key) {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::store::MemoryStore;
    use super::*;

    const TOLERANCE: f64 = 2.0;

    fn store_with(raw: &str) -> MemoryStore {
        MemoryStore::with_entry("q", raw)
    }

    fn sample_store() -> MemoryStore {
        store_with(
            r#"[
                {"video_id": "A", "offset_seconds": 10, "text": "ten"},
                {"video_id": "B", "offset_seconds": 5, "text": "other video"},
                {"video_id": "A", "offset_seconds": 3, "text": "three"}
            ]"#,
        )
    }

    fn offsets(sequence: &NavigationSequence) -> Vec<f64> {
        sequence.entries().iter().map(|e| e.offset_seconds).collect()
    }

    #[test]
    fn test_filters_and_sorts_by_offset() {
        let sequence = NavigationSequence::build(&sample_store(), Some("q"), "A", None, TOLERANCE);
        assert_eq!(offsets(&sequence), vec![3.0, 10.0]);
        assert_eq!(sequence.cursor(), Cursor::at(0));
    }

    #[test]
    fn test_requested_offset_within_tolerance() {
        let sequence = NavigationSequence::build(&sample_store(), Some("q"), "A", Some(10.5), TOLERANCE);
        assert_eq!(sequence.current().unwrap().offset_seconds, 10.0);

        let sequence = NavigationSequence::build(&sample_store(), Some("q"), "A", Some(50.0), TOLERANCE);
        assert_eq!(sequence.cursor(), Cursor::at(0));
    }

    #[test]
    fn test_empty_missing_or_malformed_store() {
        let empty = MemoryStore::new();
        for sequence in [
            NavigationSequence::build(&empty, Some("q"), "A", Some(3.0), TOLERANCE),
            NavigationSequence::build(&sample_store(), None, "A", None, TOLERANCE),
            NavigationSequence::build(&store_with("{not json"), Some("q"), "A", None, TOLERANCE),
            NavigationSequence::build(&store_with("\"a string\""), Some("q"), "A", None, TOLERANCE),
            NavigationSequence::build(&store_with("[]"), Some("q"), "A", Some(1.0), TOLERANCE),
            NavigationSequence::build(&sample_store(), Some("q"), "Z", None, TOLERANCE),
        ] {
            assert!(sequence.is_empty());
            assert!(sequence.cursor().is_none());
            assert!(sequence.current().is_none());
            assert!(sequence.position_label().is_none());
        }
    }

    #[test]
    fn test_partially_shaped_records_are_tolerated() {
        let store = store_with(
            r#"{"matches": [
                {"metadata": {"url": "https://www.youtube.com/watch?v=A&t=42"}},
                {"error": "Error occurred during query. Please try again."},
                17,
                {"videoId": "A", "start": "00:07"},
                {"video_id": "A", "start": "18446744073709551615:00", "text": "overflowing clock"}
            ]}"#,
        );

        let sequence = NavigationSequence::build(&store, Some("q"), "A", None, TOLERANCE);
        assert_eq!(offsets(&sequence), vec![0.0, 7.0, 42.0]);
    }

    #[test]
    fn test_equal_offsets_keep_stored_order() {
        let store = store_with(
            r#"[
                {"video_id": "A", "start": 5, "text": "first"},
                {"video_id": "A", "start": 1, "text": "earliest"},
                {"video_id": "A", "start": 5, "text": "second"}
            ]"#,
        );

        let sequence = NavigationSequence::build(&store, Some("q"), "A", Some(5.5), TOLERANCE);
        let texts: Vec<&str> = sequence.entries().iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["earliest", "first", "second"]);
        assert_eq!(sequence.current().unwrap().text, "first");
    }

    #[test]
    fn test_duplicate_moments_collapse() {
        let store = store_with(
            r#"[
                {"video_id": "A", "start": 5, "text": "same"},
                {"video_id": "A", "start": 5, "text": "other"},
                {"video_id": "A", "start": 9, "text": "later"},
                {"video_id": "A", "start": 5, "text": "same"}
            ]"#,
        );

        let sequence = NavigationSequence::build(&store, Some("q"), "A", None, TOLERANCE);
        assert_eq!(offsets(&sequence), vec![5.0, 5.0, 9.0]);
    }

    #[test]
    fn test_cursor_never_leaves_bounds() {
        let mut sequence = NavigationSequence::build(&sample_store(), Some("q"), "A", None, TOLERANCE);

        assert!(sequence.prev().is_none());
        assert_eq!(sequence.cursor(), Cursor::at(0));

        assert_eq!(sequence.next().unwrap().offset_seconds, 10.0);
        assert!(sequence.next().is_none());
        assert_eq!(sequence.cursor(), Cursor::at(1));
        assert_eq!(sequence.position_label().as_deref(), Some("2 / 2"));

        assert_eq!(sequence.prev().unwrap().offset_seconds, 3.0);
        assert!(!sequence.has_prev());
        assert!(sequence.has_next());

        assert!(sequence.select(7).is_none());
        assert!(sequence.select(0).is_none());
        assert_eq!(sequence.select(1).unwrap().offset_seconds, 10.0);
    }

    #[test]
    fn test_empty_sequence_navigation_is_noop() {
        let mut sequence = NavigationSequence::default();
        assert!(sequence.next().is_none());
        assert!(sequence.prev().is_none());
        assert!(sequence.select(0).is_none());
        assert!(sequence.cursor().is_none());
    }
}
