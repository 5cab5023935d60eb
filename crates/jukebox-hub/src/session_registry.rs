//! In-memory registry of per-session playback controllers.
//!
//! Each session gets one controller plus one event pump task that feeds it
//! track-end reports in the order the backend emitted them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use jukebox_types::TrackEndReason;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::controller::{ControllerSettings, PlaybackController};
use crate::events::EventBus;
use crate::models::SessionId;
use crate::player_backend::{BackendEvent, EndedTrack, PlayerBackend};

#[derive(Debug)]
struct TrackEnd {
    track: EndedTrack,
    reason: TrackEndReason,
}

struct SessionEntry {
    controller: Arc<PlaybackController>,
    notifications: mpsc::UnboundedSender<TrackEnd>,
    pump: JoinHandle<()>,
}

pub struct SessionRegistry {
    backend: Arc<dyn PlayerBackend>,
    events: EventBus,
    settings: ControllerSettings,
    sessions: Mutex<HashMap<SessionId, SessionEntry>>,
}

impl SessionRegistry {
    pub fn new(backend: Arc<dyn PlayerBackend>, events: EventBus, settings: ControllerSettings) -> Self {
        Self {
            backend,
            events,
            settings,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SessionId, SessionEntry>> {
        self.sessions.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// Return the session's controller, creating it (and its pump) on first use.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn get_or_create(&self, session: SessionId) -> Arc<PlaybackController> {
        let mut sessions = self.lock();
        if let Some(entry) = sessions.get(&session) {
            return entry.controller.clone();
        }

        let controller = Arc::new(PlaybackController::new(
            session,
            self.backend.clone(),
            self.events.clone(),
            self.settings,
        ));
        let (notifications, receiver) = mpsc::unbounded_channel();
        let pump = tokio::spawn(run_pump(controller.clone(), receiver));
        sessions.insert(
            session,
            SessionEntry {
                controller: controller.clone(),
                notifications,
                pump,
            },
        );
        tracing::info!(session_id = %session, "session created");
        controller
    }

    pub fn get(&self, session: SessionId) -> Option<Arc<PlaybackController>> {
        self.lock().get(&session).map(|entry| entry.controller.clone())
    }

    /// Tear a session down: stop its pump, drain its queue, drop the node player.
    ///
    /// Returns `true` when a controller existed.
    pub async fn remove(&self, session: SessionId) -> bool {
        let Some(entry) = self.lock().remove(&session) else {
            return false;
        };
        entry.pump.abort();
        entry.controller.shutdown().await;
        self.events.session_closed(session);
        tracing::info!(session_id = %session, "session removed");
        true
    }

    /// Route a backend report to the owning session.
    ///
    /// Returns `true` when the event was delivered or acted on.
    pub async fn dispatch(&self, event: BackendEvent) -> bool {
        match event {
            BackendEvent::Ready { .. } => false,
            BackendEvent::TrackEnded {
                session,
                track,
                reason,
            } => self.forward_track_end(session, TrackEnd { track, reason }),
            BackendEvent::SocketClosed {
                session,
                code,
                reason,
            } => {
                tracing::info!(session_id = %session, code, reason = %reason, "voice socket closed");
                self.remove(session).await
            }
        }
    }

    fn forward_track_end(&self, session: SessionId, notice: TrackEnd) -> bool {
        let sessions = self.lock();
        let Some(entry) = sessions.get(&session) else {
            tracing::debug!(session_id = %session, "track end for unknown session");
            return false;
        };
        entry.notifications.send(notice).is_ok()
    }

    /// Active session ids in ascending order.
    pub fn session_ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.lock().keys().copied().collect();
        ids.sort();
        ids
    }
}

async fn run_pump(controller: Arc<PlaybackController>, mut receiver: mpsc::UnboundedReceiver<TrackEnd>) {
    while let Some(notice) = receiver.recv().await {
        controller
            .on_track_ended(&notice.track, &notice.reason)
            .await;
    }
    tracing::debug!(session_id = %controller.session_id(), "event pump finished");
}
