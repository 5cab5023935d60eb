//! API models and OpenAPI schemas.
//!
//! Defines identifiers plus the request/response structures for the hub API.

use std::fmt;
use std::str::FromStr;

use jukebox_types::{ControllerStatus, QueueItem};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Voice session identifier (the guild snowflake).
///
/// Serialized as a decimal string, matching how the backend reports guild ids.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(pub u64);

/// Voice channel identifier.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
#[schema(value_type = String)]
pub struct ChannelId(pub u64);

macro_rules! snowflake_impls {
    ($ty:ident, $label:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                raw.trim()
                    .parse::<u64>()
                    .map($ty)
                    .map_err(|_| format!("invalid {}: {raw:?}", $label))
            }
        }

        impl TryFrom<String> for $ty {
            type Error = String;

            fn try_from(raw: String) -> Result<Self, Self::Error> {
                raw.parse()
            }
        }

        impl From<$ty> for String {
            fn from(id: $ty) -> Self {
                id.to_string()
            }
        }
    };
}

snowflake_impls!(SessionId, "session id");
snowflake_impls!(ChannelId, "channel id");

/// Join request payload for `/sessions/{id}/join`.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct JoinRequest {
    /// Voice channel the caller is sitting in.
    pub channel_id: ChannelId,
}

/// Join response payload.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct JoinResponse {
    /// Channel the hub is now connected to.
    pub channel_id: ChannelId,
    /// `connected`, `moved`, or `unchanged`.
    pub action: String,
}

/// Play request payload for `/sessions/{id}/play`.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PlayRequest {
    /// Search text or a direct URL.
    pub query: String,
    /// Caller's voice channel; joins or moves there first when present.
    #[serde(default)]
    pub channel_id: Option<ChannelId>,
}

/// Play response payload.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PlayResponse {
    /// Items appended to the queue, in order.
    pub queued: Vec<QueueItem>,
    /// Item that started immediately because the session was idle.
    pub started: Option<QueueItem>,
    /// Playlist name when the query expanded to a playlist.
    pub playlist: Option<String>,
    /// Short user-facing summary.
    pub message: String,
}

/// Now-playing payload.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct NowPlayingResponse {
    /// Current track.
    pub track: QueueItem,
    /// Track length in whole seconds (`0` for streams).
    pub duration_secs: u64,
    /// Short user-facing summary.
    pub message: String,
}

impl From<QueueItem> for NowPlayingResponse {
    fn from(track: QueueItem) -> Self {
        let duration_secs = track.duration_secs();
        let message = format!(
            "Now playing: {} by {} [{}s]",
            track.title, track.author, duration_secs
        );
        Self {
            track,
            duration_secs,
            message,
        }
    }
}

/// Seek request payload (seconds, as typed by users).
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SeekRequest {
    /// Target position in seconds; negative values clamp to `0`.
    pub seconds: i64,
}

/// Volume request payload.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct VolumeRequest {
    /// Requested volume; clamped to `0..=1000`.
    pub volume: i64,
}

/// Volume response payload.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct VolumeResponse {
    /// Stored volume after clamping.
    pub volume: u16,
}

/// Loop request payload; an absent `enabled` toggles.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct LoopRequest {
    /// Explicit loop state.
    #[serde(default)]
    pub enabled: Option<bool>,
}

/// Loop response payload.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct LoopResponse {
    /// Loop state after the request.
    pub enabled: bool,
}

/// Queue listing query parameters.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct QueueQuery {
    /// Maximum number of items to return (default 10).
    pub limit: Option<usize>,
}

/// Upcoming queue payload.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct QueueResponse {
    /// First `limit` upcoming items.
    pub items: Vec<QueueItem>,
    /// Total number of upcoming items.
    pub total: usize,
    /// Items not included in `items`.
    pub remaining: usize,
}

/// Result of a skip request.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SkipResponse {
    /// Track that was skipped.
    pub skipped: QueueItem,
}

/// Result of a stop request.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct StopResponse {
    /// Number of queued items discarded.
    pub cleared: usize,
}

/// Per-session status payload.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionStatusResponse {
    /// Session id.
    #[schema(value_type = String)]
    pub session_id: SessionId,
    /// Connected voice channel, if any.
    pub channel_id: Option<ChannelId>,
    /// Controller state.
    pub playback: ControllerStatus,
}

/// Hub-wide status payload.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct HubStatusResponse {
    /// Backend node label (base URI).
    pub node: String,
    /// `true` once the backend session handshake is known.
    pub node_ready: bool,
    /// Active session ids.
    #[schema(value_type = Vec<String>)]
    pub sessions: Vec<SessionId>,
    /// Hub version.
    pub version: String,
    /// Build revision.
    pub build: String,
}

/// Accepted-event acknowledgement for `/events`.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct EventAck {
    /// `true` when the frame mapped to a known event.
    pub handled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_round_trips_as_string() {
        let id: SessionId = serde_json::from_str("\"123456789012345678\"").unwrap();
        assert_eq!(id, SessionId(123456789012345678));
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"123456789012345678\"");
    }

    #[test]
    fn session_id_rejects_garbage() {
        assert!("guild-1".parse::<SessionId>().is_err());
        assert!(serde_json::from_str::<ChannelId>("\"abc\"").is_err());
    }

    #[test]
    fn loop_request_defaults_to_toggle() {
        let req: LoopRequest = serde_json::from_str("{}").unwrap();
        assert!(req.enabled.is_none());
    }
}
