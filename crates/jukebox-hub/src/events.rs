//! In-process event bus for hub-side updates.
//!
//! Observability channel for controller transitions, including failures on the
//! notification-driven advance path that have no caller to report to.

use tokio::sync::broadcast;

use crate::models::SessionId;

/// Hub event payloads published by controllers and the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubEvent {
    QueueChanged { session: SessionId },
    StatusChanged { session: SessionId },
    /// Advancing after a track end failed; the session went idle.
    AdvanceFailed { session: SessionId, error: String },
    SessionClosed { session: SessionId },
}

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<HubEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Create a new event bus with a bounded broadcast channel.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(64);
        Self { sender }
    }

    /// Subscribe to the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<HubEvent> {
        self.sender.subscribe()
    }

    pub fn queue_changed(&self, session: SessionId) {
        let _ = self.sender.send(HubEvent::QueueChanged { session });
    }

    pub fn status_changed(&self, session: SessionId) {
        let _ = self.sender.send(HubEvent::StatusChanged { session });
    }

    pub fn advance_failed(&self, session: SessionId, error: String) {
        let _ = self.sender.send(HubEvent::AdvanceFailed { session, error });
    }

    pub fn session_closed(&self, session: SessionId) {
        let _ = self.sender.send(HubEvent::SessionClosed { session });
    }
}

/// Log hub events until the bus closes.
///
/// Advance failures are surfaced at `warn`; everything else at `debug`.
pub async fn log_events(mut receiver: broadcast::Receiver<HubEvent>) {
    loop {
        match receiver.recv().await {
            Ok(HubEvent::AdvanceFailed { session, error }) => {
                tracing::warn!(session_id = %session, error = %error, "auto-advance failed; session idle");
            }
            Ok(event) => {
                tracing::debug!(event = ?event, "hub event");
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event log lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
