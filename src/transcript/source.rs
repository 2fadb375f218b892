//! Transcript and summary data sources keyed by video identifier

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::srt::{looks_like_srt, parse_srt};
use super::TranscriptLine;
use crate::navigation::normalize::seconds_from_value;
use crate::{Result, SyncError};

/// Keys a transcript record may carry its offset under, in priority order
const OFFSET_KEYS: [&str; 4] = ["offset_seconds", "offsetSeconds", "start", "time"];

/// Source of transcript lines for a video.
///
/// `Ok(None)` means "not yet available" and is not an error.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    async fn fetch_transcript(&self, video_id: &str) -> Result<Option<Vec<TranscriptLine>>>;
}

/// Source of a text summary for a video
#[async_trait]
pub trait SummarySource: Send + Sync {
    async fn fetch_summary(&self, video_id: &str) -> Result<Option<String>>;
}

/// Fetches `{base_url}/{video_id}.json` transcripts over HTTP
pub struct HttpTranscriptSource {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTranscriptSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    fn transcript_url(&self, video_id: &str) -> String {
        format!(
            "{}/{}.json",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(video_id)
        )
    }
}

#[async_trait]
impl TranscriptSource for HttpTranscriptSource {
    async fn fetch_transcript(&self, video_id: &str) -> Result<Option<Vec<TranscriptLine>>> {
        let url = self.transcript_url(video_id);
        debug!("Fetching transcript from {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        // Buckets answer 403 for keys that were never uploaded
        if status == StatusCode::NOT_FOUND || status == StatusCode::FORBIDDEN {
            info!("📭 No transcript published yet for {}", video_id);
            return Ok(None);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Remote {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let lines = parse_transcript_body(&body)?;

        if lines.is_empty() {
            info!("📭 Transcript for {} is empty", video_id);
            return Ok(None);
        }

        info!("📜 Loaded {} transcript lines for {}", lines.len(), video_id);
        Ok(Some(lines))
    }
}

/// Parse a transcript body: a JSON list of records (optionally wrapped in
/// an object) or SubRip text.
pub fn parse_transcript_body(body: &str) -> Result<Vec<TranscriptLine>> {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => Ok(parse_transcript_json(&value)),
        Err(e) if looks_like_srt(body) => {
            debug!("Transcript body is not JSON ({}), parsing as SRT", e);
            Ok(parse_srt(body))
        }
        Err(e) => Err(e.into()),
    }
}

/// Normalize JSON transcript records into lines, dropping unusable records
pub fn parse_transcript_json(value: &Value) -> Vec<TranscriptLine> {
    let records = match value {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match ["segments", "lines", "transcript"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array))
        {
            Some(items) => items.as_slice(),
            None => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    let mut skipped = 0;
    let lines: Vec<TranscriptLine> = records
        .iter()
        .filter_map(|record| {
            let line = transcript_line_from_record(record);
            if line.is_none() {
                skipped += 1;
            }
            line
        })
        .collect();

    if skipped > 0 {
        warn!("Skipped {} malformed transcript records", skipped);
    }

    lines
}

fn transcript_line_from_record(record: &Value) -> Option<TranscriptLine> {
    let text = record.get("text")?.as_str()?.trim();
    if text.is_empty() {
        return None;
    }

    let offset = OFFSET_KEYS
        .iter()
        .find_map(|key| record.get(*key).and_then(seconds_from_value))?;

    Some(TranscriptLine::new(offset, text))
}

/// Fetches summaries from the backend summary endpoint
pub struct HttpSummarySource {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpSummarySource {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }
}

#[async_trait]
impl SummarySource for HttpSummarySource {
    async fn fetch_summary(&self, video_id: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("video_id", video_id)])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Remote {
                status: status.as_u16(),
                body,
            });
        }

        let value: Value = response.json().await?;
        let summary = match &value {
            Value::String(text) => Some(text.as_str()),
            Value::Object(map) => map.get("summary").and_then(Value::as_str),
            _ => None,
        };

        Ok(summary
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string))
    }
}
