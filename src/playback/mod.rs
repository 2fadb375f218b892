//! Playback synchronizer
//!
//! Single source of truth for the current playback position. Programmatic
//! seeks (navigation cursor changes, transcript clicks, assistant answers)
//! arm autoplay and wait for the player's next play event; a bounded settle
//! timeout keeps a missed event from stranding the state machine.

use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Control surface of the embedded video player
pub trait PlayerControl {
    fn load(&mut self, source: &str);
    fn seek(&mut self, offset_seconds: f64);
}

/// What caused a programmatic seek
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeekReason {
    DeepLink,
    CursorChange,
    TranscriptClick,
    AssistantAnswer,
}

/// Synchronizer state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SyncState {
    /// No position reported yet for the loaded video
    Idle,
    /// Position updates flowing
    Ready,
    /// A programmatic seek was issued and autoplay is armed
    SeekPending {
        target: f64,
        reason: SeekReason,
        deadline: Instant,
    },
}

impl SyncState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Ready => "ready",
            Self::SeekPending { .. } => "seek_pending",
        }
    }
}

/// Result of a seek request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeekOutcome {
    /// Seek sent to the player
    Issued { target: f64 },
    /// Seek sent to the player, replacing a pending target
    Superseded { target: f64, previous: f64 },
    /// Player not ready yet; the seek is issued on its first position report
    Deferred { target: f64 },
    /// Target was not a finite number
    Ignored,
}

/// Finite-state machine between the engine and the player
pub struct PlaybackSynchronizer<P: PlayerControl> {
    player: P,
    state: SyncState,
    position: f64,
    autoplay_armed: bool,
    deferred: Option<(f64, SeekReason)>,
    settle_timeout: Duration,
}

impl<P: PlayerControl> PlaybackSynchronizer<P> {
    pub fn new(player: P, settle_timeout: Duration) -> Self {
        Self {
            player,
            state: SyncState::Idle,
            position: 0.0,
            autoplay_armed: false,
            deferred: None,
            settle_timeout,
        }
    }

    /// Load a new source, returning to `Idle`
    pub fn load(&mut self, source: &str) {
        info!("🎬 Loading player source: {}", source);
        self.player.load(source);
        self.state = SyncState::Idle;
        self.position = 0.0;
        self.autoplay_armed = false;
        self.deferred = None;
    }

    /// Player position callback
    pub fn on_position(&mut self, position: f64, now: Instant) {
        if !position.is_finite() {
            return;
        }
        self.position = position.max(0.0);

        if self.state == SyncState::Idle {
            debug!("Player reported first position {:.2}s", self.position);
            self.state = SyncState::Ready;

            if let Some((target, reason)) = self.deferred.take() {
                self.issue(target, reason, now);
            }
        }
    }

    /// Player "play" event: disarms autoplay and settles a pending seek
    pub fn on_play(&mut self) {
        self.autoplay_armed = false;
        if let SyncState::SeekPending { target, .. } = self.state {
            debug!("▶️ Play event settled seek to {:.2}s", target);
            self.state = SyncState::Ready;
        }
    }

    /// Request a programmatic seek. A newer request always wins over a
    /// pending or deferred one; requests are never queued.
    pub fn request_seek(&mut self, offset: f64, reason: SeekReason, now: Instant) -> SeekOutcome {
        if !offset.is_finite() {
            return SeekOutcome::Ignored;
        }
        let target = offset.max(0.0);

        match self.state {
            SyncState::Idle => {
                debug!("Deferring {:?} seek to {:.2}s until the player is ready", reason, target);
                self.deferred = Some((target, reason));
                SeekOutcome::Deferred { target }
            }
            SyncState::Ready => {
                self.issue(target, reason, now);
                SeekOutcome::Issued { target }
            }
            SyncState::SeekPending { target: previous, .. } => {
                debug!("Seek to {:.2}s supersedes pending {:.2}s", target, previous);
                self.issue(target, reason, now);
                SeekOutcome::Superseded { target, previous }
            }
        }
    }

    fn issue(&mut self, target: f64, reason: SeekReason, now: Instant) {
        info!("⏩ Seeking to {:.2}s ({:?})", target, reason);
        self.player.seek(target);
        self.autoplay_armed = true;
        self.state = SyncState::SeekPending {
            target,
            reason,
            deadline: now + self.settle_timeout,
        };
    }

    /// Revert a pending seek whose play event never arrived. Returns `true`
    /// when the state changed.
    pub fn poll_timeout(&mut self, now: Instant) -> bool {
        match self.state {
            SyncState::SeekPending { target, deadline, .. } if now >= deadline => {
                debug!("Seek to {:.2}s settled by timeout", target);
                self.state = SyncState::Ready;
                self.autoplay_armed = false;
                true
            }
            _ => false,
        }
    }

    /// When the pending seek times out, if one is pending
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            SyncState::SeekPending { deadline, .. } => Some(deadline),
            _ => None,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn autoplay_armed(&self) -> bool {
        self.autoplay_armed
    }

    /// Seek waiting for the player to become ready
    pub fn deferred_target(&self) -> Option<f64> {
        self.deferred.map(|(target, _)| target)
    }

    pub fn player(&self) -> &P {
        &self.player
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingPlayer {
        loaded: Vec<String>,
        seeks: Vec<f64>,
    }

    impl PlayerControl for RecordingPlayer {
        fn load(&mut self, source: &str) {
            self.loaded.push(source.to_string());
        }

        fn seek(&mut self, offset_seconds: f64) {
            self.seeks.push(offset_seconds);
        }
    }

    const SETTLE: Duration = Duration::from_millis(1500);

    fn ready_sync(now: Instant) -> PlaybackSynchronizer<RecordingPlayer> {
        let mut sync = PlaybackSynchronizer::new(RecordingPlayer::default(), SETTLE);
        sync.load("https://www.youtube.com/watch?v=abc");
        sync.on_position(0.0, now);
        sync
    }

    #[test]
    fn test_idle_to_ready_on_first_position() {
        let now = Instant::now();
        let mut sync = PlaybackSynchronizer::new(RecordingPlayer::default(), SETTLE);
        assert_eq!(sync.state(), SyncState::Idle);

        sync.on_position(1.25, now);
        assert_eq!(sync.state(), SyncState::Ready);
        assert_eq!(sync.position(), 1.25);
    }

    #[test]
    fn test_seek_arms_autoplay_and_play_settles() {
        let now = Instant::now();
        let mut sync = ready_sync(now);

        let outcome = sync.request_seek(42.0, SeekReason::CursorChange, now);
        assert_eq!(outcome, SeekOutcome::Issued { target: 42.0 });
        assert!(sync.autoplay_armed());
        assert!(matches!(sync.state(), SyncState::SeekPending { target, .. } if target == 42.0));
        assert_eq!(sync.player().seeks, vec![42.0]);

        sync.on_play();
        assert_eq!(sync.state(), SyncState::Ready);
        assert!(!sync.autoplay_armed());
    }

    #[test]
    fn test_timeout_reverts_to_ready() {
        let now = Instant::now();
        let mut sync = ready_sync(now);
        sync.request_seek(10.0, SeekReason::TranscriptClick, now);

        assert_eq!(sync.deadline(), Some(now + SETTLE));
        assert!(!sync.poll_timeout(now + Duration::from_millis(100)));
        assert!(sync.poll_timeout(now + SETTLE));
        assert_eq!(sync.state(), SyncState::Ready);
        assert!(!sync.autoplay_armed());
        assert_eq!(sync.deadline(), None);
    }

    #[test]
    fn test_newer_seek_wins_while_pending() {
        let now = Instant::now();
        let mut sync = ready_sync(now);
        sync.request_seek(10.0, SeekReason::CursorChange, now);

        let later = now + Duration::from_millis(500);
        let outcome = sync.request_seek(20.0, SeekReason::AssistantAnswer, later);
        assert_eq!(outcome, SeekOutcome::Superseded { target: 20.0, previous: 10.0 });
        assert_eq!(sync.deadline(), Some(later + SETTLE));

        sync.on_play();
        sync.poll_timeout(later + SETTLE);
        assert_eq!(sync.player().seeks, vec![10.0, 20.0]);
        assert_eq!(sync.state(), SyncState::Ready);
    }

    #[test]
    fn test_seek_before_ready_is_deferred_last_write_wins() {
        let now = Instant::now();
        let mut sync = PlaybackSynchronizer::new(RecordingPlayer::default(), SETTLE);

        assert_eq!(
            sync.request_seek(5.0, SeekReason::DeepLink, now),
            SeekOutcome::Deferred { target: 5.0 }
        );
        sync.request_seek(8.0, SeekReason::CursorChange, now);
        assert!(sync.player().seeks.is_empty());
        assert_eq!(sync.deferred_target(), Some(8.0));

        sync.on_position(0.0, now);
        assert_eq!(sync.player().seeks, vec![8.0]);
        assert!(matches!(sync.state(), SyncState::SeekPending { target, .. } if target == 8.0));
        assert_eq!(sync.deferred_target(), None);
    }

    #[test]
    fn test_invalid_targets() {
        let now = Instant::now();
        let mut sync = ready_sync(now);
        assert_eq!(sync.request_seek(f64::NAN, SeekReason::CursorChange, now), SeekOutcome::Ignored);
        assert_eq!(sync.state(), SyncState::Ready);

        assert_eq!(
            sync.request_seek(-3.0, SeekReason::CursorChange, now),
            SeekOutcome::Issued { target: 0.0 }
        );
    }

    #[test]
    fn test_play_without_pending_seek_keeps_ready() {
        let now = Instant::now();
        let mut sync = ready_sync(now);
        sync.on_play();
        assert_eq!(sync.state(), SyncState::Ready);
        sync.on_position(30.0, now);
        assert_eq!(sync.position(), 30.0);
    }

    #[test]
    fn test_reload_returns_to_idle() {
        let now = Instant::now();
        let mut sync = ready_sync(now);
        sync.request_seek(12.0, SeekReason::CursorChange, now);
        sync.load("https://www.youtube.com/watch?v=other");
        assert_eq!(sync.state(), SyncState::Idle);
        assert!(!sync.autoplay_armed());
        assert_eq!(sync.player().loaded.len(), 2);
    }
}
