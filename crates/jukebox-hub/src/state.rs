//! Shared application state.
//!
//! Holds the session registry plus the process-wide backend, resolver and voice
//! handles the HTTP handlers need.

use std::sync::Arc;

use crate::player_backend::PlayerBackend;
use crate::search::TrackResolver;
use crate::session_registry::SessionRegistry;
use crate::voice::VoiceTransport;

pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub backend: Arc<dyn PlayerBackend>,
    pub resolver: Arc<dyn TrackResolver>,
    pub voice: Arc<dyn VoiceTransport>,
}

impl AppState {
    pub fn new(
        registry: Arc<SessionRegistry>,
        backend: Arc<dyn PlayerBackend>,
        resolver: Arc<dyn TrackResolver>,
        voice: Arc<dyn VoiceTransport>,
    ) -> Self {
        Self {
            registry,
            backend,
            resolver,
            voice,
        }
    }
}
