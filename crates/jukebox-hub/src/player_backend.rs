//! Player backend abstraction for dispatching playback commands.
//!
//! Implementations translate controller operations into calls against the
//! audio node. Track lifecycle reports come back separately as [`BackendEvent`]s.

use async_trait::async_trait;
use jukebox_types::{QueueItem, TrackEndReason};
use thiserror::Error;

use crate::models::SessionId;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BackendError {
    /// Transport-level failure (connect, timeout, missing session).
    #[error("backend unreachable: {0}")]
    Unreachable(String),
    /// The node answered with a non-success status.
    #[error("backend rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

#[async_trait]
pub trait PlayerBackend: Send + Sync {
    /// Start `item` for the session, replacing whatever the node holds.
    ///
    /// `play_id` tags this start; the node echoes it back on the matching end report.
    async fn start(&self, session: SessionId, item: &QueueItem, volume: u16, play_id: u64) -> Result<(), BackendError>;
    async fn stop(&self, session: SessionId) -> Result<(), BackendError>;
    async fn set_paused(&self, session: SessionId, paused: bool) -> Result<(), BackendError>;
    async fn set_volume(&self, session: SessionId, volume: u16) -> Result<(), BackendError>;
    async fn seek(&self, session: SessionId, position_ms: u64) -> Result<(), BackendError>;
    /// Drop the node-side player for a session that is being torn down.
    async fn destroy(&self, session: SessionId) -> Result<(), BackendError>;

    /// Record the node's session handshake id.
    fn attach_session(&self, _backend_session: &str) {}

    /// `true` once the node can accept player commands.
    fn is_ready(&self) -> bool {
        true
    }

    /// Short label used in status output.
    fn node_label(&self) -> String;
}

/// Which start of a track an end report refers to.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EndedTrack {
    /// Locator of the track that ended, when the node reports it.
    pub locator: Option<String>,
    /// Tag passed to [`PlayerBackend::start`], when the node echoes it.
    pub play_id: Option<u64>,
}

impl EndedTrack {
    pub fn new(locator: impl Into<String>, play_id: Option<u64>) -> Self {
        Self {
            locator: Some(locator.into()),
            play_id,
        }
    }
}

/// Inbound lifecycle report from the node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackendEvent {
    /// Node handshake finished; carries the node session id.
    Ready { backend_session: String },
    /// A track left the player.
    TrackEnded {
        session: SessionId,
        track: EndedTrack,
        reason: TrackEndReason,
    },
    /// The voice socket for a session closed.
    SocketClosed {
        session: SessionId,
        code: u16,
        reason: String,
    },
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub(crate) enum BackendCall {
        Start { session: SessionId, locator: String, volume: u16, play_id: u64 },
        Stop { session: SessionId },
        Paused { session: SessionId, paused: bool },
        Volume { session: SessionId, volume: u16 },
        Seek { session: SessionId, position_ms: u64 },
        Destroy { session: SessionId },
    }

    /// Records every command; optionally fails them all.
    #[derive(Default)]
    pub(crate) struct RecordingBackend {
        calls: Mutex<Vec<BackendCall>>,
        failing: AtomicBool,
    }

    impl RecordingBackend {
        pub(crate) fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        pub(crate) fn calls(&self) -> Vec<BackendCall> {
            self.calls.lock().unwrap().clone()
        }

        pub(crate) fn started(&self) -> Vec<String> {
            self.calls()
                .into_iter()
                .filter_map(|call| match call {
                    BackendCall::Start { locator, .. } => Some(locator),
                    _ => None,
                })
                .collect()
        }

        /// Tag of the most recent start.
        pub(crate) fn last_play_id(&self) -> u64 {
            self.calls()
                .iter()
                .rev()
                .find_map(|call| match call {
                    BackendCall::Start { play_id, .. } => Some(*play_id),
                    _ => None,
                })
                .unwrap_or_default()
        }

        pub(crate) fn stop_count(&self) -> usize {
            self.calls()
                .iter()
                .filter(|call| matches!(call, BackendCall::Stop { .. }))
                .count()
        }

        fn record(&self, call: BackendCall) -> Result<(), BackendError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(BackendError::Unreachable("connection refused".to_string()));
            }
            self.calls.lock().unwrap().push(call);
            Ok(())
        }
    }

    #[async_trait]
    impl PlayerBackend for RecordingBackend {
        async fn start(&self, session: SessionId, item: &QueueItem, volume: u16, play_id: u64) -> Result<(), BackendError> {
            self.record(BackendCall::Start {
                session,
                locator: item.locator.clone(),
                volume,
                play_id,
            })
        }

        async fn stop(&self, session: SessionId) -> Result<(), BackendError> {
            self.record(BackendCall::Stop { session })
        }

        async fn set_paused(&self, session: SessionId, paused: bool) -> Result<(), BackendError> {
            self.record(BackendCall::Paused { session, paused })
        }

        async fn set_volume(&self, session: SessionId, volume: u16) -> Result<(), BackendError> {
            self.record(BackendCall::Volume { session, volume })
        }

        async fn seek(&self, session: SessionId, position_ms: u64) -> Result<(), BackendError> {
            self.record(BackendCall::Seek { session, position_ms })
        }

        async fn destroy(&self, session: SessionId) -> Result<(), BackendError> {
            self.record(BackendCall::Destroy { session })
        }

        fn node_label(&self) -> String {
            "recording".to_string()
        }
    }

    pub(crate) fn item(name: &str) -> QueueItem {
        QueueItem {
            title: format!("{name} title"),
            author: format!("{name} author"),
            duration_ms: 180_000,
            locator: format!("enc:{name}"),
            uri: None,
        }
    }
}
