/// Clipt Sync - time-synchronization and navigation engine
///
/// Keeps video playback position, transcript highlighting, the sequence of
/// search-derived moments and assistant-suggested moments consistent for a
/// single video detail view.

pub mod assistant;
pub mod config;
pub mod deep_link;
pub mod navigation;
pub mod playback;
pub mod search;
pub mod session;
pub mod transcript;

// Re-export main types for easy access
pub use crate::assistant::{AssistantClient, AssistantSession, ChatMessage, HttpAssistantClient, Sender, SlotId};
pub use crate::config::Config;
pub use crate::deep_link::DeepLink;
pub use crate::navigation::store::{FileStore, MemoryStore, PersistedStore, WritableStore};
pub use crate::navigation::{Cursor, NavigationSequence, SearchResult};
pub use crate::playback::{PlaybackSynchronizer, PlayerControl, SeekOutcome, SeekReason, SyncState};
pub use crate::search::{HttpQueryClient, QueryClient, QueryOutcome, QueryRequest, VideoGroup};
pub use crate::session::driver::SessionDriver;
pub use crate::session::{SummaryState, TranscriptScroller, VideoSession, ViewEvent, ViewModel};
pub use crate::transcript::source::{HttpSummarySource, HttpTranscriptSource, SummarySource, TranscriptSource};
pub use crate::transcript::{ActiveLineTracker, ScrollRequest, TranscriptIndex, TranscriptLine, TranscriptState};

/// Result type for sync engine operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Error types for sync engine operations
#[derive(thiserror::Error, Debug)]
pub enum SyncError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Remote service error {status}: {body}")]
    Remote { status: u16, body: String },

    #[error("Authentication required")]
    AuthRequired,

    #[error("Invalid link: {0}")]
    InvalidLink(String),
}
