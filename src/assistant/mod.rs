pub mod client;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::AssistantConfig;
use crate::SyncError;

pub use client::{AskRequest, AskResponse, AssistantClient, HttpAssistantClient};

/// Who wrote a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

/// One message of the assistant conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset_seconds: Option<f64>,
    /// Placeholder still waiting for its answer
    #[serde(default)]
    pub pending: bool,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
            offset_seconds: None,
            pending: false,
        }
    }

    pub fn assistant(text: impl Into<String>, offset_seconds: Option<f64>) -> Self {
        Self {
            sender: Sender::Assistant,
            text: text.into(),
            offset_seconds,
            pending: false,
        }
    }

    fn placeholder(text: impl Into<String>) -> Self {
        Self {
            pending: true,
            ..Self::assistant(text, None)
        }
    }

    /// Moment the view may offer to jump to
    pub fn jump_target(&self) -> Option<f64> {
        match self.sender {
            Sender::Assistant if !self.pending => self.offset_seconds,
            _ => None,
        }
    }
}

/// Position of a placeholder in the message list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(usize);

impl SlotId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A submitted question whose answer is still outstanding
#[derive(Debug, Clone)]
pub struct PendingAsk {
    pub slot: SlotId,
    pub request: AskRequest,
}

/// Linear conversation about one video.
///
/// Messages are only ever appended; a placeholder is replaced in place by
/// its answer, addressed by position, so concurrent questions resolving out
/// of order cannot reorder the list.
pub struct AssistantSession {
    video_id: String,
    messages: Vec<ChatMessage>,
    input: String,
    texts: AssistantConfig,
}

impl AssistantSession {
    pub fn new(video_id: impl Into<String>, texts: AssistantConfig) -> Self {
        let messages = texts
            .greeting
            .iter()
            .map(|greeting| ChatMessage::assistant(greeting.clone(), None))
            .collect();

        Self {
            video_id: video_id.into(),
            messages,
            input: String::new(),
            texts,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Submit the current input field, clearing it
    pub fn submit(&mut self) -> Option<PendingAsk> {
        if self.input.trim().is_empty() {
            return None;
        }
        let question = std::mem::take(&mut self.input);
        self.ask(&question)
    }

    /// Append the question and a placeholder; empty questions are ignored.
    pub fn ask(&mut self, question: &str) -> Option<PendingAsk> {
        if question.trim().is_empty() {
            debug!("Ignoring empty question");
            return None;
        }

        self.messages.push(ChatMessage::user(question));
        let slot = SlotId(self.messages.len());
        self.messages.push(ChatMessage::placeholder(self.texts.placeholder_text.clone()));
        self.input.clear();

        info!("💬 Question queued in slot {} for {}", slot.0, self.video_id);
        Some(PendingAsk {
            slot,
            request: AskRequest {
                question: question.to_string(),
                video_id: self.video_id.clone(),
            },
        })
    }

    /// Fill a placeholder with the outcome of its request. Returns `false`
    /// if the slot is not a pending placeholder.
    pub fn complete(&mut self, slot: SlotId, outcome: Result<AskResponse, SyncError>) -> bool {
        let message = match self.messages.get_mut(slot.0) {
            Some(message) if message.pending => message,
            _ => {
                warn!("No pending placeholder at slot {}", slot.0);
                return false;
            }
        };

        *message = match outcome {
            Ok(response) => {
                let offset = response.offset_seconds.filter(|o| o.is_finite() && *o >= 0.0);
                let text = non_blank(response.answer)
                    .or_else(|| non_blank(response.error))
                    .unwrap_or_else(|| self.texts.fallback_text.clone());
                ChatMessage::assistant(text, offset)
            }
            Err(e) => {
                warn!("Assistant request for slot {} failed: {}", slot.0, e);
                ChatMessage::assistant(self.texts.transport_error_text.clone(), None)
            }
        };

        debug!("Slot {} answered", slot.0);
        true
    }

    /// Jump offset of the message at `index`, if it offers one
    pub fn jump_target(&self, index: usize) -> Option<f64> {
        self.messages.get(index).and_then(ChatMessage::jump_target)
    }

    pub fn pending_count(&self) -> usize {
        self.messages.iter().filter(|m| m.pending).count()
    }
}

fn non_blank(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn session() -> AssistantSession {
        let mut texts = Config::default().assistant;
        texts.greeting = None;
        AssistantSession::new("vid", texts)
    }

    fn answer(text: &str, offset: Option<f64>) -> Result<AskResponse, SyncError> {
        Ok(AskResponse {
            answer: Some(text.to_string()),
            error: None,
            offset_seconds: offset,
        })
    }

    #[test]
    fn test_empty_questions_are_ignored() {
        let mut session = session();
        assert!(session.ask("").is_none());
        assert!(session.ask("   \n").is_none());
        session.set_input("  ");
        assert!(session.submit().is_none());
        assert!(session.messages().is_empty());
    }

    #[test]
    fn test_greeting_is_first_message() {
        let session = AssistantSession::new("vid", Config::default().assistant);
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].sender, Sender::Assistant);
        assert_eq!(session.jump_target(0), None);
    }

    #[test]
    fn test_submit_clears_input_and_appends_placeholder() {
        let mut session = session();
        session.set_input("where is the sauce?");
        let pending = session.submit().unwrap();

        assert_eq!(session.input(), "");
        assert_eq!(pending.request.question, "where is the sauce?");
        assert_eq!(pending.request.video_id, "vid");
        assert_eq!(session.messages()[0], ChatMessage::user("where is the sauce?"));
        assert!(session.messages()[1].pending);
        assert_eq!(session.messages()[1].text, "Thinking...");
    }

    #[test]
    fn test_out_of_order_completion_preserves_positions() {
        let mut session = session();
        let first = session.ask("Q1").unwrap();
        let second = session.ask("Q2").unwrap();
        assert_eq!(session.messages().len(), 4);
        assert_eq!(session.pending_count(), 2);

        assert!(session.complete(second.slot, answer("A2", Some(30.0))));
        assert!(session.messages()[1].pending);
        assert_eq!(session.messages()[3], ChatMessage::assistant("A2", Some(30.0)));

        assert!(session.complete(first.slot, answer("A1", None)));
        let texts: Vec<&str> = session.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["Q1", "A1", "Q2", "A2"]);
        assert_eq!(session.pending_count(), 0);
        assert_eq!(session.jump_target(3), Some(30.0));
        assert_eq!(session.jump_target(1), None);
    }

    #[test]
    fn test_answer_text_fallbacks() {
        let mut session = session();

        let pending = session.ask("q").unwrap();
        let response = AskResponse {
            answer: Some("  ".to_string()),
            error: Some("model unavailable".to_string()),
            offset_seconds: None,
        };
        session.complete(pending.slot, Ok(response));
        assert_eq!(session.messages()[1].text, "model unavailable");

        let pending = session.ask("q").unwrap();
        session.complete(pending.slot, Ok(AskResponse::default()));
        assert_eq!(session.messages()[3].text, "Sorry, I couldn't find an answer.");
    }

    #[test]
    fn test_transport_failure_message() {
        let mut session = session();
        let pending = session.ask("q").unwrap();
        let failure = SyncError::Remote {
            status: 502,
            body: "bad gateway".to_string(),
        };

        session.complete(pending.slot, Err(failure));
        assert_eq!(session.messages()[1], ChatMessage::assistant("Error contacting server.", None));
    }

    #[test]
    fn test_slot_completes_once() {
        let mut session = session();
        let pending = session.ask("q").unwrap();
        assert!(session.complete(pending.slot, answer("a", None)));
        assert!(!session.complete(pending.slot, answer("again", None)));
        assert_eq!(session.messages()[1].text, "a");
    }
}
