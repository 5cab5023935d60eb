//! Typed failures returned to command callers.
//!
//! Every variant carries exactly one user-facing message (its `Display`) and maps
//! to one HTTP status.

use actix_web::HttpResponse;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::player_backend::BackendError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PlaybackError {
    /// No controller or voice connection exists for the session.
    #[error("Not connected to a voice channel.")]
    NotConnected,
    /// The operation needs a current track.
    #[error("Nothing playing.")]
    NothingPlaying,
    /// The audio backend could not be reached or refused the command.
    #[error("Could not reach the audio backend: {0}")]
    BackendUnreachable(String),
    /// The voice transport denied the join/move.
    #[error("Missing permission to connect or speak in that voice channel.")]
    TransportForbidden,
    /// The voice transport failed for another reason.
    #[error("Voice connection failed: {0}")]
    TransportFailed(String),
    /// Search returned no candidates.
    #[error("No results found.")]
    ResolutionEmpty,
    /// Search failed on the backend side.
    #[error("Track lookup failed: {0}")]
    ResolutionFailed(String),
}

/// JSON body returned for failed commands.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Stable failure kind, e.g. `nothing_playing`.
    pub kind: &'static str,
    /// Human-readable message.
    pub message: String,
}

impl PlaybackError {
    /// Stable machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            PlaybackError::NotConnected => "not_connected",
            PlaybackError::NothingPlaying => "nothing_playing",
            PlaybackError::BackendUnreachable(_) => "backend_unreachable",
            PlaybackError::TransportForbidden => "transport_forbidden",
            PlaybackError::TransportFailed(_) => "transport_failed",
            PlaybackError::ResolutionEmpty => "resolution_empty",
            PlaybackError::ResolutionFailed(_) => "resolution_failed",
        }
    }

    /// Convert the failure into an HTTP response.
    pub fn into_response(self) -> HttpResponse {
        let body = ErrorBody {
            kind: self.kind(),
            message: self.to_string(),
        };
        match self {
            PlaybackError::NotConnected => HttpResponse::Conflict().json(body),
            PlaybackError::NothingPlaying => HttpResponse::Conflict().json(body),
            PlaybackError::BackendUnreachable(_) => HttpResponse::ServiceUnavailable().json(body),
            PlaybackError::TransportForbidden => HttpResponse::Forbidden().json(body),
            PlaybackError::TransportFailed(_) => HttpResponse::BadGateway().json(body),
            PlaybackError::ResolutionEmpty => HttpResponse::NotFound().json(body),
            PlaybackError::ResolutionFailed(_) => HttpResponse::BadGateway().json(body),
        }
    }
}

impl From<BackendError> for PlaybackError {
    fn from(err: BackendError) -> Self {
        PlaybackError::BackendUnreachable(err.to_string())
    }
}
