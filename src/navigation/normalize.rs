//! Normalization of loosely shaped search-result records
//!
//! Results come from a vector index whose matches carry their fields either
//! at the top level or under `metadata`, under several possible names, and
//! sometimes only inside a watch URL. Every fallback chain lives here.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use url::Url;

use super::SearchResult;
use crate::transcript::parse_timestamp;

const VIDEO_ID_KEYS: [&str; 2] = ["video_id", "videoId"];
const EXPLICIT_OFFSET_KEYS: [&str; 2] = ["offset_seconds", "offsetSeconds"];
const ALTERNATE_OFFSET_KEYS: [&str; 3] = ["start", "time", "timestamp"];
const URL_KEYS: [&str; 3] = ["url", "video_url", "link"];
const TIME_PARAMS: [&str; 2] = ["t", "start"];

/// Normalize one raw record, or `None` when its video cannot be determined
pub fn normalize_record(record: &Value) -> Option<SearchResult> {
    if !record.is_object() {
        return None;
    }

    Some(SearchResult {
        video_id: resolve_video_id(record)?,
        offset_seconds: resolve_offset(record),
        text: resolve_text(record),
        score: resolve_score(record),
    })
}

/// Look a field up under `metadata` first, then at the top level
fn field<'a>(record: &'a Value, key: &str) -> Option<&'a Value> {
    record
        .get("metadata")
        .and_then(|meta| meta.get(key))
        .filter(|value| !value.is_null())
        .or_else(|| record.get(key).filter(|value| !value.is_null()))
}

fn record_urls(record: &Value) -> impl Iterator<Item = &str> {
    URL_KEYS
        .iter()
        .filter_map(move |key| field(record, key))
        .filter_map(Value::as_str)
}

/// Video identifier: direct field, then extracted from a URL-shaped field
pub fn resolve_video_id(record: &Value) -> Option<String> {
    let direct = VIDEO_ID_KEYS
        .iter()
        .filter_map(|key| field(record, key))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|id| !id.is_empty());

    if let Some(id) = direct {
        return Some(id.to_string());
    }

    record_urls(record).find_map(video_id_from_url)
}

/// Offset: explicit field, then a differently named numeric field, then the
/// URL timestamp parameter, then 0.
pub fn resolve_offset(record: &Value) -> f64 {
    find_offset(record).unwrap_or(0.0)
}

/// Offset fallback chain without the final default
pub fn find_offset(record: &Value) -> Option<f64> {
    EXPLICIT_OFFSET_KEYS
        .iter()
        .chain(ALTERNATE_OFFSET_KEYS.iter())
        .find_map(|key| field(record, key).and_then(seconds_from_value))
        .or_else(|| record_urls(record).find_map(offset_from_url))
}

pub fn resolve_text(record: &Value) -> String {
    field(record, "text")
        .and_then(Value::as_str)
        .map(|text| text.trim().to_string())
        .unwrap_or_default()
}

pub fn resolve_score(record: &Value) -> f64 {
    field(record, "score")
        .and_then(Value::as_f64)
        .filter(|score| score.is_finite())
        .unwrap_or(0.0)
}

/// Interpret a JSON value as seconds: a number, a numeric string, a clock
/// string or a `1m30s` style duration. Negative or non-finite values are
/// rejected.
pub fn seconds_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite() && *v >= 0.0),
        Value::String(s) => parse_timestamp(s).or_else(|| parse_time_param(s)),
        _ => None,
    }
}

fn duration_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:(\d+)h)?(?:(\d+)m)?(?:(\d+(?:\.\d+)?)s)?$").expect("duration pattern is valid")
    })
}

fn watch_param_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[?&]v=([^&#]+)").expect("watch pattern is valid"))
}

/// Parse a URL time parameter: `90`, `90.5`, `90s`, `1m30s`, `1h2m3s`
pub fn parse_time_param(raw: &str) -> Option<f64> {
    let t = raw.trim();
    if t.is_empty() {
        return None;
    }

    if let Ok(seconds) = t.parse::<f64>() {
        return Some(seconds).filter(|v| v.is_finite() && *v >= 0.0);
    }

    let caps = duration_regex().captures(t)?;
    if caps.get(1).is_none() && caps.get(2).is_none() && caps.get(3).is_none() {
        return None;
    }

    let part = |i: usize| -> Option<f64> {
        caps.get(i).map_or(Some(0.0), |m| m.as_str().parse::<f64>().ok())
    };

    Some(part(1)? * 3600.0 + part(2)? * 60.0 + part(3)?)
}

/// Parse absolute URLs as-is and relative or bare ones against a dummy base
fn parse_loose_url(raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    Url::parse(raw).ok().or_else(|| {
        let base = Url::parse("https://localhost/").ok()?;
        base.join(raw).ok()
    })
}

/// Extract a video identifier from a watch, short or embed URL
pub fn video_id_from_url(raw: &str) -> Option<String> {
    if let Some(url) = parse_loose_url(raw) {
        if let Some((_, id)) = url.query_pairs().find(|(key, value)| key == "v" && !value.is_empty()) {
            return Some(id.into_owned());
        }

        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        if url.host_str() == Some("youtu.be") {
            if let Some(id) = segments.first() {
                return Some((*id).to_string());
            }
        }

        if let Some(pos) = segments.iter().position(|s| matches!(*s, "embed" | "shorts" | "live")) {
            if let Some(id) = segments.get(pos + 1) {
                return Some((*id).to_string());
            }
        }
    }

    watch_param_regex()
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn is_time_param(key: &str) -> bool {
    TIME_PARAMS.contains(&key)
}

/// Extract the timestamp parameter (`t` or `start`, query or fragment)
pub fn offset_from_url(raw: &str) -> Option<f64> {
    let url = parse_loose_url(raw)?;

    let from_query = url
        .query_pairs()
        .find(|(key, _)| is_time_param(key))
        .and_then(|(_, value)| parse_time_param(&value));

    from_query.or_else(|| {
        url.fragment()?
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| is_time_param(key))
            .and_then(|(_, value)| parse_time_param(value))
    })
}
