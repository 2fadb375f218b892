use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::navigation::normalize::seconds_from_value;
use crate::Result;

/// Keys an answer may carry its moment under, in priority order
const OFFSET_KEYS: [&str; 4] = ["offset_seconds", "offsetSeconds", "offset", "timestamp"];

/// Question posted to the chat endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AskRequest {
    pub question: String,
    pub video_id: String,
}

/// Body returned by the chat endpoint. Every field is optional; the
/// backend sends `error` instead of `answer` when it could not respond.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AskResponse {
    pub answer: Option<String>,
    pub error: Option<String>,
    pub offset_seconds: Option<f64>,
}

impl AskResponse {
    /// Read a loosely shaped reply. Fields of the wrong type count as
    /// absent, and the offset may be a number, a numeric string or a clock.
    pub fn from_value(value: &Value) -> Self {
        let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);

        Self {
            answer: text("answer"),
            error: text("error"),
            offset_seconds: OFFSET_KEYS
                .iter()
                .find_map(|key| value.get(*key).and_then(seconds_from_value)),
        }
    }
}

/// Question-answering service
#[async_trait]
pub trait AssistantClient: Send + Sync {
    async fn ask(&self, request: &AskRequest) -> Result<AskResponse>;
}

/// JSON-over-HTTP chat client
pub struct HttpAssistantClient {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpAssistantClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }
}

#[async_trait]
impl AssistantClient for HttpAssistantClient {
    async fn ask(&self, request: &AskRequest) -> Result<AskResponse> {
        debug!("Posting question for {} to {}", request.video_id, self.endpoint);

        let response = self.client.post(&self.endpoint).json(request).send().await?;
        let status = response.status();

        // Error responses still carry a JSON body with an `error` field
        let body = response.text().await?;
        let parsed = AskResponse::from_value(&serde_json::from_str(&body)?);

        if !status.is_success() {
            debug!("Chat endpoint answered {} with error: {:?}", status, parsed.error);
        }

        Ok(parsed)
    }
}
