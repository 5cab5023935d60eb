//! Voice channel membership.
//!
//! The hub does not carry audio itself; it only needs to know which channel a
//! session sits in and to ask the transport to join, move, or leave.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::PlaybackError;
use crate::models::{ChannelId, SessionId};
use crate::session_registry::SessionRegistry;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum VoiceError {
    #[error("missing permission to join the channel")]
    Forbidden,
    #[error("{0}")]
    Failed(String),
}

#[async_trait]
pub trait VoiceTransport: Send + Sync {
    async fn connect(&self, session: SessionId, channel: ChannelId) -> Result<(), VoiceError>;
    async fn move_to(&self, session: SessionId, channel: ChannelId) -> Result<(), VoiceError>;
    async fn disconnect(&self, session: SessionId) -> Result<(), VoiceError>;
    fn current_channel(&self, session: SessionId) -> Option<ChannelId>;
}

/// What `ensure_voice` had to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoiceOutcome {
    Connected,
    Moved { from: ChannelId },
    AlreadyThere,
}

impl VoiceOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoiceOutcome::Connected => "connected",
            VoiceOutcome::Moved { .. } => "moved",
            VoiceOutcome::AlreadyThere => "unchanged",
        }
    }
}

impl From<VoiceError> for PlaybackError {
    fn from(err: VoiceError) -> Self {
        match err {
            VoiceError::Forbidden => PlaybackError::TransportForbidden,
            VoiceError::Failed(message) => PlaybackError::TransportFailed(message),
        }
    }
}

/// Put the session in `channel`, connecting or moving as needed.
pub async fn ensure_voice(
    transport: &dyn VoiceTransport,
    session: SessionId,
    channel: ChannelId,
) -> Result<VoiceOutcome, PlaybackError> {
    let outcome = match transport.current_channel(session) {
        None => {
            transport.connect(session, channel).await?;
            VoiceOutcome::Connected
        }
        Some(current) if current == channel => VoiceOutcome::AlreadyThere,
        Some(current) => {
            transport.move_to(session, channel).await?;
            VoiceOutcome::Moved { from: current }
        }
    };
    tracing::info!(session_id = %session, channel_id = %channel, action = outcome.as_str(), "voice ensured");
    Ok(outcome)
}

/// Disconnect and tear the session's controller down.
pub async fn leave(
    transport: &dyn VoiceTransport,
    registry: &SessionRegistry,
    session: SessionId,
) -> Result<(), PlaybackError> {
    if transport.current_channel(session).is_none() {
        return Err(PlaybackError::NotConnected);
    }
    transport.disconnect(session).await?;
    registry.remove(session).await;
    Ok(())
}

/// Channel bookkeeping for deployments where an external gateway owns the
/// actual voice socket.
#[derive(Default)]
pub struct TrackedVoiceTransport {
    channels: Mutex<HashMap<SessionId, ChannelId>>,
}

impl TrackedVoiceTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn set(&self, session: SessionId, channel: Option<ChannelId>) {
        let mut channels = self.channels.lock().unwrap_or_else(|err| err.into_inner());
        match channel {
            Some(channel) => channels.insert(session, channel),
            None => channels.remove(&session),
        };
    }
}

#[async_trait]
impl VoiceTransport for TrackedVoiceTransport {
    async fn connect(&self, session: SessionId, channel: ChannelId) -> Result<(), VoiceError> {
        self.set(session, Some(channel));
        Ok(())
    }

    async fn move_to(&self, session: SessionId, channel: ChannelId) -> Result<(), VoiceError> {
        self.set(session, Some(channel));
        Ok(())
    }

    async fn disconnect(&self, session: SessionId) -> Result<(), VoiceError> {
        self.set(session, None);
        Ok(())
    }

    fn current_channel(&self, session: SessionId) -> Option<ChannelId> {
        self.channels
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .get(&session)
            .copied()
    }
}
