//! Single-task event loop around a `VideoSession`

use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

use super::{TranscriptScroller, VideoSession, ViewEvent, ViewModel};
use crate::assistant::{AskResponse, AssistantClient, PendingAsk, SlotId};
use crate::playback::PlayerControl;
use crate::transcript::source::{SummarySource, TranscriptSource};
use crate::transcript::TranscriptLine;
use crate::Result;

type AnswerFuture = BoxFuture<'static, (SlotId, Result<AskResponse>)>;

/// Drives a session from view events, fetch completions, assistant answers
/// and the seek-settle deadline, applying them one at a time.
pub struct SessionDriver<P: PlayerControl, S: TranscriptScroller> {
    session: VideoSession<P, S>,
    assistant: Arc<dyn AssistantClient>,
    transcripts: Arc<dyn TranscriptSource>,
    summaries: Arc<dyn SummarySource>,
    snapshots: Option<watch::Sender<ViewModel>>,
}

impl<P: PlayerControl, S: TranscriptScroller> SessionDriver<P, S> {
    pub fn new(
        session: VideoSession<P, S>,
        assistant: Arc<dyn AssistantClient>,
        transcripts: Arc<dyn TranscriptSource>,
        summaries: Arc<dyn SummarySource>,
    ) -> Self {
        Self {
            session,
            assistant,
            transcripts,
            summaries,
            snapshots: None,
        }
    }

    /// Publish a fresh `ViewModel` after every applied input
    pub fn subscribe(&mut self) -> watch::Receiver<ViewModel> {
        let (tx, rx) = watch::channel(self.session.snapshot());
        self.snapshots = Some(tx);
        rx
    }

    /// Run until the event channel closes, then let fetches and in-flight
    /// questions finish. Returns the final session.
    pub async fn run(mut self, mut events: mpsc::Receiver<ViewEvent>) -> VideoSession<P, S> {
        let video_id = self.session.video_id().to_string();
        info!("🚀 Session loop started for {}", video_id);

        let transcripts = Arc::clone(&self.transcripts);
        let transcript_id = video_id.clone();
        let mut transcript_fetch: BoxFuture<'static, Result<Option<Vec<TranscriptLine>>>> =
            async move { transcripts.fetch_transcript(&transcript_id).await }.boxed();
        let mut transcript_done = false;

        let summaries = Arc::clone(&self.summaries);
        let summary_id = video_id.clone();
        let mut summary_fetch: BoxFuture<'static, Result<Option<String>>> =
            async move { summaries.fetch_summary(&summary_id).await }.boxed();
        let mut summary_done = false;

        let mut answers: FuturesUnordered<AnswerFuture> = FuturesUnordered::new();
        let mut events_open = true;

        loop {
            if !events_open && transcript_done && summary_done && answers.is_empty() {
                break;
            }

            let deadline = self.session.next_deadline();

            tokio::select! {
                event = events.recv(), if events_open => match event {
                    Some(event) => {
                        if let Some(pending) = self.session.handle(event, Instant::now()) {
                            answers.push(self.send_question(pending));
                        }
                    }
                    None => {
                        debug!("View event channel closed");
                        events_open = false;
                    }
                },
                fetched = &mut transcript_fetch, if !transcript_done => {
                    transcript_done = true;
                    self.session.set_transcript(fetched);
                }
                fetched = &mut summary_fetch, if !summary_done => {
                    summary_done = true;
                    self.session.set_summary(fetched);
                }
                Some((slot, outcome)) = answers.next(), if !answers.is_empty() => {
                    self.session.on_answer(slot, outcome);
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() && events_open => {
                    self.session.poll(Instant::now());
                }
            }

            self.publish();
        }

        info!("🏁 Session loop finished for {}", video_id);
        self.session
    }

    fn send_question(&self, pending: PendingAsk) -> AnswerFuture {
        let client = Arc::clone(&self.assistant);
        async move {
            let outcome = client.ask(&pending.request).await;
            (pending.slot, outcome)
        }
        .boxed()
    }

    fn publish(&self) {
        if let Some(tx) = &self.snapshots {
            tx.send_replace(self.session.snapshot());
        }
    }
}
