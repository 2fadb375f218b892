//! Full-text query feature
//!
//! Runs a search against the backend, persists the raw match list under a
//! caller-chosen key for later navigation, and groups matches per video for
//! display.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::navigation::normalize::{find_offset, resolve_score, resolve_text, resolve_video_id};
use crate::navigation::parse_result_set;
use crate::navigation::store::WritableStore;
use crate::{Result, SyncError};

/// Group name for matches whose video cannot be determined
pub const UNKNOWN_VIDEO: &str = "unknown";

/// Parameters of one search
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRequest {
    pub query_phrase: String,
    pub channel_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_key: Option<String>,
}

/// Search service returning raw match records
#[async_trait]
pub trait QueryClient: Send + Sync {
    async fn query(&self, request: &QueryRequest) -> Result<Vec<Value>>;
}

/// Backend query endpoint over HTTP
pub struct HttpQueryClient {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpQueryClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }
}

#[async_trait]
impl QueryClient for HttpQueryClient {
    async fn query(&self, request: &QueryRequest) -> Result<Vec<Value>> {
        debug!("Querying {} for '{}'", self.endpoint, request.query_phrase);

        let response = self.client.get(&self.endpoint).query(request).send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(SyncError::AuthRequired);
        }

        let body = response.text().await?;
        if !status.is_success() {
            return Err(SyncError::Remote {
                status: status.as_u16(),
                body,
            });
        }

        parse_result_set(&body).ok_or_else(|| SyncError::Remote {
            status: status.as_u16(),
            body,
        })
    }
}

/// One match ready for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryMatch {
    pub offset_seconds: Option<f64>,
    pub text: String,
    pub score: f64,
    pub landing_url: String,
}

/// Matches of one video, best score first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoGroup {
    pub video_id: String,
    pub matches: Vec<QueryMatch>,
}

/// Result of running a query
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Results(Vec<VideoGroup>),
    /// Fixed local message; the query is not retried
    Failed(String),
    AuthRequired { login_url: String },
}

/// Group raw matches by video. Groups keep first-seen order.
pub fn group_by_video(records: &[Value], landing_base: &str, query_key: &str) -> Vec<VideoGroup> {
    let mut groups: Vec<VideoGroup> = Vec::new();

    for record in records.iter().filter(|record| record.is_object()) {
        let video_id = resolve_video_id(record).unwrap_or_else(|| UNKNOWN_VIDEO.to_string());
        let offset = find_offset(record);

        let entry = QueryMatch {
            offset_seconds: offset,
            text: resolve_text(record),
            score: resolve_score(record),
            landing_url: landing_url(landing_base, &video_id, offset, query_key),
        };

        match groups.iter_mut().find(|group| group.video_id == video_id) {
            Some(group) => group.matches.push(entry),
            None => groups.push(VideoGroup {
                video_id,
                matches: vec![entry],
            }),
        }
    }

    for group in &mut groups {
        group.matches.sort_by(|a, b| b.score.total_cmp(&a.score));
    }

    groups
}

/// Address of the video detail view for a match
pub fn landing_url(base: &str, video_id: &str, offset: Option<f64>, query_key: &str) -> String {
    let mut url = format!("{}/{}", base.trim_end_matches('/'), urlencoding::encode(video_id));
    let mut separator = '?';

    if let Some(offset) = offset.filter(|o| o.is_finite() && *o >= 0.0) {
        url.push_str(&format!("{}t={}", separator, format_seconds(offset)));
        separator = '&';
    }

    if !query_key.is_empty() {
        url.push_str(&format!("{}q={}", separator, urlencoding::encode(query_key)));
    }

    url
}

/// Whole seconds print without a fractional part
pub(crate) fn format_seconds(seconds: f64) -> String {
    if seconds.fract() == 0.0 {
        format!("{:.0}", seconds)
    } else {
        format!("{}", seconds)
    }
}

/// Run a query, persist its raw results under `query_key` and group them
pub async fn run_query(
    client: &dyn QueryClient,
    store: &dyn WritableStore,
    query_key: &str,
    request: &QueryRequest,
    config: &Config,
) -> QueryOutcome {
    info!("🔍 Searching for '{}'", request.query_phrase);

    let records = match client.query(request).await {
        Ok(records) => records,
        Err(SyncError::AuthRequired) => {
            warn!("Query rejected, login required");
            return QueryOutcome::AuthRequired {
                login_url: config.services.login_url(),
            };
        }
        Err(e) => {
            warn!("Query failed: {}", e);
            return QueryOutcome::Failed(config.assistant.query_error_text.clone());
        }
    };

    match serde_json::to_string(&records) {
        Ok(raw) => {
            if let Err(e) = store.set(query_key, raw) {
                warn!("Could not persist results under {}: {}", query_key, e);
            }
        }
        Err(e) => warn!("Could not serialize results: {}", e),
    }

    let groups = group_by_video(&records, &config.services.backend_url, query_key);
    info!("✅ {} matches across {} videos", records.len(), groups.len());
    QueryOutcome::Results(groups)
}
