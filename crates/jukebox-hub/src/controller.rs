//! Per-session playback controller.
//!
//! Owns the pending queue plus current/loop/pause/volume state for one voice
//! session. User commands and backend track-end reports both funnel through one
//! async mutex, so transitions for a session never interleave.

use std::sync::Arc;
use std::time::Duration;

use jukebox_types::{ControllerStatus, PlaybackState, QueueItem, TrackEndReason};
use tokio::sync::Mutex;

use crate::error::PlaybackError;
use crate::events::EventBus;
use crate::models::SessionId;
use crate::player_backend::{BackendError, EndedTrack, PlayerBackend};
use crate::track_queue::TrackQueue;

pub const MAX_VOLUME: u16 = 1000;
pub const DEFAULT_VOLUME: u16 = 100;
pub const DEFAULT_ADVANCE_TIMEOUT: Duration = Duration::from_millis(1000);

/// Tunables shared by every controller the registry creates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControllerSettings {
    /// Bounded wait for the next item before a session goes idle.
    pub advance_timeout: Duration,
    /// Volume a new session starts with.
    pub default_volume: u16,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            advance_timeout: DEFAULT_ADVANCE_TIMEOUT,
            default_volume: DEFAULT_VOLUME,
        }
    }
}

#[derive(Debug)]
struct ControllerState {
    current: Option<QueueItem>,
    loop_enabled: bool,
    paused: bool,
    volume: u16,
    /// Set by `skip`; the next advance moves on even when looping.
    skip_requested: bool,
    /// Tag of the most recent start. Bumped on every start, replays included.
    play_id: u64,
}

impl ControllerState {
    fn playback_state(&self) -> PlaybackState {
        match (&self.current, self.paused) {
            (None, _) => PlaybackState::Idle,
            (Some(_), true) => PlaybackState::Paused,
            (Some(_), false) => PlaybackState::Playing,
        }
    }

    fn clear_current(&mut self) {
        self.current = None;
        self.paused = false;
        self.skip_requested = false;
    }

    fn next_play_id(&mut self) -> u64 {
        self.play_id += 1;
        self.play_id
    }

    /// `true` when the report belongs to the start that is current now.
    ///
    /// A play id settles it; locator-only reports can only be matched by track.
    fn is_current_start(&self, ended: &EndedTrack) -> bool {
        let Some(current) = self.current.as_ref() else {
            return false;
        };
        match (ended.play_id, ended.locator.as_deref()) {
            (Some(play_id), _) => play_id == self.play_id,
            (None, Some(locator)) => locator == current.locator,
            (None, None) => true,
        }
    }
}

/// What an advance step did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// Loop is on; the current track was started again.
    Replayed(QueueItem),
    /// The queue head was started.
    Started(QueueItem),
    /// The queue stayed empty past the bounded wait.
    Idle,
}

/// How a track-end report was handled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TrackEndOutcome {
    /// Replaced, stale, or duplicate report.
    Ignored,
    Advanced(AdvanceOutcome),
    /// The backend failed during advance; the session is idle.
    Failed,
}

/// Result of an enqueue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnqueueOutcome {
    /// Items appended to the queue.
    pub queued: usize,
    /// Item started right away because the session was idle.
    pub started: Option<QueueItem>,
}

pub struct PlaybackController {
    session_id: SessionId,
    backend: Arc<dyn PlayerBackend>,
    queue: TrackQueue,
    state: Mutex<ControllerState>,
    events: EventBus,
    settings: ControllerSettings,
}

impl PlaybackController {
    pub fn new(
        session_id: SessionId,
        backend: Arc<dyn PlayerBackend>,
        events: EventBus,
        settings: ControllerSettings,
    ) -> Self {
        Self {
            session_id,
            backend,
            queue: TrackQueue::new(),
            state: Mutex::new(ControllerState {
                current: None,
                loop_enabled: false,
                paused: false,
                volume: settings.default_volume.min(MAX_VOLUME),
                skip_requested: false,
                play_id: 0,
            }),
            events,
            settings,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Append items and start the head if nothing is playing.
    ///
    /// A backend failure while starting is returned to the caller; the
    /// controller is idle afterwards.
    pub async fn enqueue(&self, items: Vec<QueueItem>) -> Result<EnqueueOutcome, PlaybackError> {
        let queued = self.queue.push_many(items);
        if queued == 0 {
            return Ok(EnqueueOutcome {
                queued,
                started: None,
            });
        }
        self.events.queue_changed(self.session_id);
        tracing::debug!(session_id = %self.session_id, queued, "queued tracks");

        let mut state = self.state.lock().await;
        if state.current.is_some() {
            return Ok(EnqueueOutcome {
                queued,
                started: None,
            });
        }
        match self.advance_locked(&mut state).await {
            Ok(AdvanceOutcome::Started(item)) => Ok(EnqueueOutcome {
                queued,
                started: Some(item),
            }),
            Ok(_) => Ok(EnqueueOutcome {
                queued,
                started: None,
            }),
            Err(err) => {
                tracing::warn!(session_id = %self.session_id, error = %err, "failed to start queued track");
                Err(err.into())
            }
        }
    }

    /// Replay the current track when looping, otherwise start the next one or go idle.
    ///
    /// Production advances are driven by `enqueue` and `on_track_ended`.
    #[cfg(test)]
    pub async fn advance(&self) -> Result<AdvanceOutcome, PlaybackError> {
        let mut state = self.state.lock().await;
        Ok(self.advance_locked(&mut state).await?)
    }

    /// Handle a track-end report from the backend.
    ///
    /// Only the first report for the current start advances; reports for earlier
    /// starts (stopped, skipped, or replayed) are ignored even when the same track
    /// is playing again.
    pub async fn on_track_ended(&self, ended: &EndedTrack, reason: &TrackEndReason) -> TrackEndOutcome {
        if reason.is_replaced() {
            tracing::debug!(session_id = %self.session_id, "ignoring replaced track end");
            return TrackEndOutcome::Ignored;
        }

        let mut state = self.state.lock().await;
        if !state.is_current_start(ended) {
            tracing::debug!(
                session_id = %self.session_id,
                reason = %reason,
                play_id = ?ended.play_id,
                "track end for a start that is no longer current"
            );
            return TrackEndOutcome::Ignored;
        }

        tracing::debug!(session_id = %self.session_id, reason = %reason, "track ended; advancing");
        match self.advance_locked(&mut state).await {
            Ok(outcome) => TrackEndOutcome::Advanced(outcome),
            Err(err) => {
                tracing::warn!(session_id = %self.session_id, error = %err, "advance after track end failed");
                self.events.advance_failed(self.session_id, err.to_string());
                TrackEndOutcome::Failed
            }
        }
    }

    /// Stop the current track; the backend's end report drives the advance.
    pub async fn skip(&self) -> Result<QueueItem, PlaybackError> {
        let mut state = self.state.lock().await;
        let Some(current) = state.current.clone() else {
            return Err(PlaybackError::NothingPlaying);
        };
        self.backend.stop(self.session_id).await?;
        state.skip_requested = true;
        tracing::info!(session_id = %self.session_id, title = %current.title, "skip requested");
        Ok(current)
    }

    /// Clear the queue and stop playback. Returns how many queued items were dropped.
    pub async fn stop(&self) -> Result<usize, PlaybackError> {
        let mut state = self.state.lock().await;
        let cleared = self.queue.drain();
        if cleared > 0 {
            self.events.queue_changed(self.session_id);
        }
        let result = self.backend.stop(self.session_id).await;
        state.clear_current();
        self.events.status_changed(self.session_id);
        result?;
        tracing::info!(session_id = %self.session_id, cleared, "playback stopped");
        Ok(cleared)
    }

    pub async fn pause(&self) -> Result<(), PlaybackError> {
        self.set_paused(true).await
    }

    pub async fn resume(&self) -> Result<(), PlaybackError> {
        self.set_paused(false).await
    }

    async fn set_paused(&self, paused: bool) -> Result<(), PlaybackError> {
        let mut state = self.state.lock().await;
        if state.current.is_none() {
            return Err(PlaybackError::NothingPlaying);
        }
        self.backend.set_paused(self.session_id, paused).await?;
        state.paused = paused;
        self.events.status_changed(self.session_id);
        Ok(())
    }

    pub async fn set_loop(&self, enabled: bool) {
        self.state.lock().await.loop_enabled = enabled;
        self.events.status_changed(self.session_id);
    }

    /// Flip loop and return the new value.
    pub async fn toggle_loop(&self) -> bool {
        let enabled = {
            let mut state = self.state.lock().await;
            state.loop_enabled = !state.loop_enabled;
            state.loop_enabled
        };
        self.events.status_changed(self.session_id);
        enabled
    }

    /// Clamp to `0..=1000`, forward, and store. Returns the stored value.
    pub async fn set_volume(&self, requested: i64) -> Result<u16, PlaybackError> {
        let volume = requested.clamp(0, i64::from(MAX_VOLUME)) as u16;
        let mut state = self.state.lock().await;
        self.backend.set_volume(self.session_id, volume).await?;
        state.volume = volume;
        self.events.status_changed(self.session_id);
        Ok(volume)
    }

    pub async fn volume(&self) -> u16 {
        self.state.lock().await.volume
    }

    /// Seek within the current track. Negative positions clamp to `0`.
    pub async fn seek(&self, position_ms: i64) -> Result<u64, PlaybackError> {
        let position_ms = position_ms.max(0) as u64;
        let state = self.state.lock().await;
        if state.current.is_none() {
            return Err(PlaybackError::NothingPlaying);
        }
        self.backend.seek(self.session_id, position_ms).await?;
        Ok(position_ms)
    }

    pub async fn now_playing(&self) -> Result<QueueItem, PlaybackError> {
        self.state
            .lock()
            .await
            .current
            .clone()
            .ok_or(PlaybackError::NothingPlaying)
    }

    /// Ordered copy of the upcoming items.
    pub fn snapshot_queue(&self) -> Vec<QueueItem> {
        self.queue.snapshot()
    }

    pub async fn status(&self) -> ControllerStatus {
        let state = self.state.lock().await;
        ControllerStatus {
            state: state.playback_state(),
            current: state.current.clone(),
            queue_len: self.queue.len(),
            loop_enabled: state.loop_enabled,
            paused: state.paused,
            volume: state.volume,
        }
    }

    /// Drop queued items and the node-side player ahead of teardown.
    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        let cleared = self.queue.drain();
        state.clear_current();
        if let Err(err) = self.backend.destroy(self.session_id).await {
            tracing::warn!(session_id = %self.session_id, error = %err, "failed to destroy backend player");
        }
        tracing::debug!(session_id = %self.session_id, cleared, "controller shut down");
    }

    async fn advance_locked(&self, state: &mut ControllerState) -> Result<AdvanceOutcome, BackendError> {
        let skipping = std::mem::take(&mut state.skip_requested);
        if state.loop_enabled && !skipping {
            if let Some(item) = state.current.clone() {
                let play_id = state.next_play_id();
                return match self.backend.start(self.session_id, &item, state.volume, play_id).await {
                    Ok(()) => {
                        state.paused = false;
                        tracing::debug!(session_id = %self.session_id, title = %item.title, "replaying looped track");
                        Ok(AdvanceOutcome::Replayed(item))
                    }
                    Err(err) => {
                        state.clear_current();
                        self.events.status_changed(self.session_id);
                        Err(err)
                    }
                };
            }
        }

        let Some(next) = self.queue.pop_timeout(self.settings.advance_timeout).await else {
            state.clear_current();
            self.events.status_changed(self.session_id);
            tracing::info!(session_id = %self.session_id, "queue empty; going idle");
            self.backend.stop(self.session_id).await?;
            return Ok(AdvanceOutcome::Idle);
        };
        self.events.queue_changed(self.session_id);

        let play_id = state.next_play_id();
        match self.backend.start(self.session_id, &next, state.volume, play_id).await {
            Ok(()) => {
                tracing::info!(
                    session_id = %self.session_id,
                    title = %next.title,
                    author = %next.author,
                    "track started"
                );
                state.current = Some(next.clone());
                state.paused = false;
                self.events.status_changed(self.session_id);
                Ok(AdvanceOutcome::Started(next))
            }
            Err(err) => {
                state.clear_current();
                self.events.status_changed(self.session_id);
                Err(err)
            }
        }
    }
}
