//! Video detail session
//!
//! Composes the transcript index, navigation sequence, playback
//! synchronizer and assistant conversation of one video. Every input is a
//! `ViewEvent` or a fetch completion, applied one at a time.

pub mod driver;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::assistant::{AskResponse, AssistantSession, PendingAsk, Sender, SlotId};
use crate::config::Config;
use crate::deep_link::DeepLink;
use crate::navigation::store::PersistedStore;
use crate::navigation::{NavigationSequence, SearchResult};
use crate::playback::{PlaybackSynchronizer, PlayerControl, SeekOutcome, SeekReason};
use crate::transcript::{ActiveLineTracker, ScrollRequest, TranscriptLine, TranscriptState};
use crate::Result;

/// Transcript panel that can bring a line into view
pub trait TranscriptScroller {
    fn scroll_to_line(&mut self, request: ScrollRequest);
}

/// Availability of the video summary
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SummaryState {
    #[default]
    Loading,
    Unavailable,
    Ready(String),
}

/// Input from the view or the player
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    /// Player position callback
    Position(f64),
    /// Player play event
    Play,
    TranscriptLineClicked(usize),
    NextTimestamp,
    PrevTimestamp,
    SelectTimestamp(usize),
    InputChanged(String),
    /// Submit the current input field
    SubmitQuestion,
    Ask(String),
    /// Jump control of the chat message at this index
    JumpToAnswer(usize),
}

pub struct VideoSession<P: PlayerControl, S: TranscriptScroller> {
    link: DeepLink,
    transcript: TranscriptState,
    summary: SummaryState,
    tracker: ActiveLineTracker,
    navigation: NavigationSequence,
    sync: PlaybackSynchronizer<P>,
    scroller: S,
    assistant: AssistantSession,
}

impl<P: PlayerControl, S: TranscriptScroller> VideoSession<P, S> {
    /// Open the detail view for a link: build the navigation sequence,
    /// load the player and request the initial seek.
    pub fn open(
        link: DeepLink,
        store: &dyn PersistedStore,
        player: P,
        scroller: S,
        config: &Config,
        now: Instant,
    ) -> Self {
        let navigation = NavigationSequence::build(
            store,
            link.query_key.as_deref(),
            &link.video_id,
            link.offset_seconds,
            config.navigation.offset_tolerance_seconds,
        );

        let mut sync = PlaybackSynchronizer::new(player, config.playback.seek_settle_timeout());
        sync.load(&config.playback.source_for(&link.video_id));

        let initial = navigation
            .current()
            .map(|entry| entry.offset_seconds)
            .or(link.offset_seconds);
        if let Some(offset) = initial {
            sync.request_seek(offset, SeekReason::DeepLink, now);
        }

        info!("🎞️ Opened session for {}", link.video_id);
        let assistant = AssistantSession::new(link.video_id.clone(), config.assistant.clone());

        Self {
            link,
            transcript: TranscriptState::Loading,
            summary: SummaryState::Loading,
            tracker: ActiveLineTracker::new(),
            navigation,
            sync,
            scroller,
            assistant,
        }
    }

    pub fn video_id(&self) -> &str {
        &self.link.video_id
    }

    pub fn link(&self) -> &DeepLink {
        &self.link
    }

    /// Apply a transcript fetch result
    pub fn set_transcript(&mut self, fetched: Result<Option<Vec<TranscriptLine>>>) {
        let lines = fetched.unwrap_or_else(|e| {
            warn!("Transcript for {} unavailable: {}", self.link.video_id, e);
            None
        });

        self.transcript = TranscriptState::from_lines(lines);
        self.tracker.reset();
        self.refresh_active_line();
    }

    /// Apply a summary fetch result
    pub fn set_summary(&mut self, fetched: Result<Option<String>>) {
        self.summary = match fetched {
            Ok(Some(text)) => SummaryState::Ready(text),
            Ok(None) => SummaryState::Unavailable,
            Err(e) => {
                warn!("Summary for {} unavailable: {}", self.link.video_id, e);
                SummaryState::Unavailable
            }
        };
    }

    /// Apply one view event. Returns the assistant request to send, if the
    /// event submitted a question.
    pub fn handle(&mut self, event: ViewEvent, now: Instant) -> Option<PendingAsk> {
        match event {
            ViewEvent::Position(position) => {
                self.sync.on_position(position, now);
                self.refresh_active_line();
            }
            ViewEvent::Play => self.sync.on_play(),
            ViewEvent::TranscriptLineClicked(line) => self.handle_line_click(line, now),
            ViewEvent::NextTimestamp => {
                self.handle_next_timestamp(now);
            }
            ViewEvent::PrevTimestamp => {
                self.handle_prev_timestamp(now);
            }
            ViewEvent::SelectTimestamp(index) => {
                let offset = self.navigation.select(index).map(|entry| entry.offset_seconds);
                self.seek_to(offset, SeekReason::CursorChange, now);
            }
            ViewEvent::InputChanged(text) => self.assistant.set_input(text),
            ViewEvent::SubmitQuestion => return self.assistant.submit(),
            ViewEvent::Ask(question) => return self.assistant.ask(&question),
            ViewEvent::JumpToAnswer(index) => {
                let offset = self.assistant.jump_target(index);
                if offset.is_none() {
                    debug!("Message {} has no moment to jump to", index);
                }
                self.seek_to(offset, SeekReason::AssistantAnswer, now);
            }
        }
        None
    }

    /// Advance the navigation cursor and seek to the new entry. No-op at
    /// the last entry.
    pub fn handle_next_timestamp(&mut self, now: Instant) -> Option<SeekOutcome> {
        let offset = self.navigation.next().map(|entry| entry.offset_seconds);
        self.seek_to(offset, SeekReason::CursorChange, now)
    }

    /// Step the navigation cursor back. No-op at the first entry.
    pub fn handle_prev_timestamp(&mut self, now: Instant) -> Option<SeekOutcome> {
        let offset = self.navigation.prev().map(|entry| entry.offset_seconds);
        self.seek_to(offset, SeekReason::CursorChange, now)
    }

    fn handle_line_click(&mut self, line: usize, now: Instant) {
        let offset = self
            .transcript
            .index()
            .and_then(|index| index.get(line))
            .map(|line| line.offset_seconds);

        if offset.is_none() {
            debug!("Ignoring click on transcript line {}", line);
        }
        self.seek_to(offset, SeekReason::TranscriptClick, now);
    }

    fn seek_to(&mut self, offset: Option<f64>, reason: SeekReason, now: Instant) -> Option<SeekOutcome> {
        offset.map(|offset| self.sync.request_seek(offset, reason, now))
    }

    fn refresh_active_line(&mut self) {
        let resolved = self.transcript.active_line(self.sync.position());
        if let Some(request) = self.tracker.update(resolved) {
            self.scroller.scroll_to_line(request);
        }
    }

    /// Deliver an assistant answer to its placeholder
    pub fn on_answer(&mut self, slot: SlotId, outcome: Result<AskResponse>) -> bool {
        self.assistant.complete(slot, outcome)
    }

    /// Settle a seek whose play event never arrived
    pub fn poll(&mut self, now: Instant) -> bool {
        self.sync.poll_timeout(now)
    }

    /// Next instant `poll` has work to do
    pub fn next_deadline(&self) -> Option<Instant> {
        self.sync.deadline()
    }

    pub fn transcript(&self) -> &TranscriptState {
        &self.transcript
    }

    pub fn summary(&self) -> &SummaryState {
        &self.summary
    }

    pub fn navigation(&self) -> &NavigationSequence {
        &self.navigation
    }

    pub fn playback(&self) -> &PlaybackSynchronizer<P> {
        &self.sync
    }

    pub fn assistant(&self) -> &AssistantSession {
        &self.assistant
    }

    pub fn scroller(&self) -> &S {
        &self.scroller
    }

    /// Serializable picture of everything the view displays
    pub fn snapshot(&self) -> ViewModel {
        let position = self.sync.position();

        let transcript = match &self.transcript {
            TranscriptState::Loading => TranscriptPanel::Loading,
            TranscriptState::Unavailable => TranscriptPanel::Unavailable,
            TranscriptState::Ready(index) => TranscriptPanel::Ready {
                active: index.resolve_active_line(position),
                lines: index
                    .lines()
                    .iter()
                    .map(|line| LineView {
                        offset_seconds: line.offset_seconds,
                        time_label: line.display_time(),
                        text: line.text.clone(),
                    })
                    .collect(),
            },
        };

        let summary = match &self.summary {
            SummaryState::Loading => SummaryPanel::Loading,
            SummaryState::Unavailable => SummaryPanel::Unavailable,
            SummaryState::Ready(text) => SummaryPanel::Ready { text: text.clone() },
        };

        let navigation = NavigationPanel {
            entries: self.navigation.entries().to_vec(),
            cursor: self.navigation.cursor().index(),
            label: self.navigation.position_label(),
            has_prev: self.navigation.has_prev(),
            has_next: self.navigation.has_next(),
        };

        let playback = PlaybackPanel {
            state: self.sync.state().name().to_string(),
            position_seconds: position,
            autoplay_armed: self.sync.autoplay_armed(),
        };

        let chat = self
            .assistant
            .messages()
            .iter()
            .map(|message| ChatEntry {
                sender: message.sender,
                text: message.text.clone(),
                pending: message.pending,
                jump_offset: message.jump_target(),
            })
            .collect();

        ViewModel {
            video_id: self.link.video_id.clone(),
            transcript,
            summary,
            navigation,
            playback,
            chat,
            input: self.assistant.input().to_string(),
        }
    }
}

/// Data contract of the video detail view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewModel {
    pub video_id: String,
    pub transcript: TranscriptPanel,
    pub summary: SummaryPanel,
    pub navigation: NavigationPanel,
    pub playback: PlaybackPanel,
    pub chat: Vec<ChatEntry>,
    pub input: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TranscriptPanel {
    Loading,
    Unavailable,
    Ready { lines: Vec<LineView>, active: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineView {
    pub offset_seconds: f64,
    pub time_label: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SummaryPanel {
    Loading,
    Unavailable,
    Ready { text: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationPanel {
    pub entries: Vec<SearchResult>,
    pub cursor: Option<usize>,
    pub label: Option<String>,
    pub has_prev: bool,
    pub has_next: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackPanel {
    pub state: String,
    pub position_seconds: f64,
    pub autoplay_armed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatEntry {
    pub sender: Sender,
    pub text: String,
    pub pending: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jump_offset: Option<f64>,
}
