use std::fmt;

use serde::{Deserialize, Serialize};

/// A playable unit handed to the audio backend.
///
/// The hub never owns media data; it only orders these references and passes
/// the `locator` back to the backend when a track should start.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct QueueItem {
    /// Display title.
    pub title: String,
    /// Display author / uploader.
    pub author: String,
    /// Track length in milliseconds (`0` for streams of unknown length).
    pub duration_ms: u64,
    /// Backend-resolvable track handle (Lavalink `encoded` string).
    pub locator: String,
    /// Source URL, when the backend reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

impl QueueItem {
    /// Whole seconds of the track length, rounded down.
    pub fn duration_secs(&self) -> u64 {
        self.duration_ms / 1000
    }
}

/// Why the backend reports that a track stopped.
///
/// Only [`TrackEndReason::Replaced`] is controller-initiated; every other value
/// is treated as the track leaving the player.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum TrackEndReason {
    /// The track played to its end.
    Finished,
    /// The backend failed to load or decode the track.
    LoadFailed,
    /// The player was told to stop.
    Stopped,
    /// Another start request replaced the track.
    Replaced,
    /// The player was cleaned up by the backend.
    Cleanup,
    /// A reason this hub does not know about.
    Other(String),
}

impl TrackEndReason {
    /// Parse a wire value (`finished`, `loadFailed`, ...). Unknown values are kept.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "finished" => Self::Finished,
            "loadFailed" | "load_failed" => Self::LoadFailed,
            "stopped" => Self::Stopped,
            "replaced" => Self::Replaced,
            "cleanup" => Self::Cleanup,
            other => Self::Other(other.to_string()),
        }
    }

    /// Wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Finished => "finished",
            Self::LoadFailed => "loadFailed",
            Self::Stopped => "stopped",
            Self::Replaced => "replaced",
            Self::Cleanup => "cleanup",
            Self::Other(raw) => raw.as_str(),
        }
    }

    /// `true` when the end was caused by the controller starting another track.
    pub fn is_replaced(&self) -> bool {
        matches!(self, Self::Replaced)
    }
}

impl From<String> for TrackEndReason {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<TrackEndReason> for String {
    fn from(reason: TrackEndReason) -> Self {
        reason.as_str().to_string()
    }
}

impl fmt::Display for TrackEndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse controller state.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    /// Nothing is current.
    #[default]
    Idle,
    /// A track is current and audible.
    Playing,
    /// A track is current but paused.
    Paused,
}

/// Session-level playback status exposed by the hub API.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ControllerStatus {
    /// Derived state (`idle`, `playing`, `paused`).
    pub state: PlaybackState,
    /// Track the backend currently holds for this session.
    pub current: Option<QueueItem>,
    /// Number of items waiting behind `current`.
    pub queue_len: usize,
    /// `true` when `current` is replayed instead of advancing.
    pub loop_enabled: bool,
    /// `true` when playback is paused.
    pub paused: bool,
    /// Player volume in `0..=1000`.
    pub volume: u16,
}
