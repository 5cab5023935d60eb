//! HTTP client for a Lavalink v4 node.
//!
//! Implements [`PlayerBackend`] and [`TrackResolver`] over the node's REST API and
//! parses the node's event frames into [`BackendEvent`]s.

use std::sync::RwLock;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use jukebox_types::{QueueItem, TrackEndReason};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

use crate::models::SessionId;
use crate::player_backend::{BackendError, BackendEvent, EndedTrack, PlayerBackend};
use crate::search::{LoadResult, TrackResolver};

/// Connection settings for the node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendSettings {
    /// Base URI, e.g. `http://127.0.0.1:2333`.
    pub uri: String,
    pub password: String,
    /// Node session id, when known ahead of the `ready` frame.
    pub session_id: Option<String>,
    pub timeout: Duration,
}

/// Track object as the node serializes it.
#[derive(Debug, Deserialize)]
struct RawTrack {
    encoded: String,
    info: RawTrackInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTrackInfo {
    title: String,
    author: String,
    #[serde(default)]
    length: u64,
    #[serde(default)]
    is_stream: bool,
    #[serde(default)]
    uri: Option<String>,
}

impl From<RawTrack> for QueueItem {
    fn from(track: RawTrack) -> Self {
        QueueItem {
            title: track.info.title,
            author: track.info.author,
            duration_ms: if track.info.is_stream { 0 } else { track.info.length },
            locator: track.encoded,
            uri: track.info.uri,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadResponse {
    load_type: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RawPlaylist {
    info: RawPlaylistInfo,
    tracks: Vec<RawTrack>,
}

#[derive(Debug, Deserialize)]
struct RawPlaylistInfo {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawException {
    #[serde(default)]
    message: Option<String>,
}

/// `/v4/info` subset used for readiness reporting.
#[derive(Debug, Deserialize)]
pub struct NodeInfo {
    pub version: NodeVersion,
}

#[derive(Debug, Deserialize)]
pub struct NodeVersion {
    pub semver: String,
}

/// Body of a player PATCH. Absent fields are left untouched by the node.
#[derive(Debug, Default, Serialize)]
struct PlayerUpdate<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    track: Option<TrackUpdate<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    paused: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    volume: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    position: Option<u64>,
}

/// `encoded: null` stops the player, so it is always serialized.
#[derive(Debug, Serialize)]
struct TrackUpdate<'a> {
    encoded: Option<&'a str>,
    #[serde(rename = "userData", skip_serializing_if = "Option::is_none")]
    user_data: Option<PlayTag>,
}

/// Stored by the node with the track and echoed back on its events.
#[derive(Debug, Serialize, Deserialize)]
struct PlayTag {
    #[serde(rename = "playId", default)]
    play_id: Option<u64>,
}

/// Error body returned by the node on non-2xx responses.
#[derive(Debug, Deserialize)]
struct NodeErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

pub struct LavalinkClient {
    http: Client,
    base: String,
    password: String,
    session_id: RwLock<Option<String>>,
}

impl LavalinkClient {
    pub fn new(settings: &BackendSettings) -> Result<Self> {
        let http = Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("build backend http client")?;
        Ok(Self {
            http,
            base: settings.uri.trim_end_matches('/').to_string(),
            password: settings.password.clone(),
            session_id: RwLock::new(settings.session_id.clone()),
        })
    }

    /// Fetch node info; used to report readiness at startup.
    pub async fn info(&self) -> Result<NodeInfo, BackendError> {
        let resp = self
            .http
            .get(format!("{}/v4/info", self.base))
            .header(reqwest::header::AUTHORIZATION, &self.password)
            .send()
            .await
            .map_err(unreachable)?;
        let resp = check_status(resp).await?;
        resp.json::<NodeInfo>().await.map_err(unreachable)
    }

    fn session(&self) -> Result<String, BackendError> {
        self.session_id
            .read()
            .unwrap_or_else(|err| err.into_inner())
            .clone()
            .ok_or_else(|| BackendError::Unreachable("backend session not ready".to_string()))
    }

    fn player_url(&self, session: SessionId) -> Result<String, BackendError> {
        Ok(format!(
            "{}/v4/sessions/{}/players/{}",
            self.base,
            self.session()?,
            session
        ))
    }

    async fn update_player(&self, session: SessionId, body: &PlayerUpdate<'_>) -> Result<(), BackendError> {
        let url = self.player_url(session)?;
        let resp = self
            .http
            .patch(url)
            .query(&[("noReplace", "false")])
            .header(reqwest::header::AUTHORIZATION, &self.password)
            .json(body)
            .send()
            .await
            .map_err(unreachable)?;
        check_status(resp).await?;
        Ok(())
    }
}

#[async_trait]
impl PlayerBackend for LavalinkClient {
    async fn start(&self, session: SessionId, item: &QueueItem, volume: u16, play_id: u64) -> Result<(), BackendError> {
        self.update_player(
            session,
            &PlayerUpdate {
                track: Some(TrackUpdate {
                    encoded: Some(&item.locator),
                    user_data: Some(PlayTag {
                        play_id: Some(play_id),
                    }),
                }),
                volume: Some(volume),
                ..Default::default()
            },
        )
        .await
    }

    async fn stop(&self, session: SessionId) -> Result<(), BackendError> {
        self.update_player(
            session,
            &PlayerUpdate {
                track: Some(TrackUpdate {
                    encoded: None,
                    user_data: None,
                }),
                ..Default::default()
            },
        )
        .await
    }

    async fn set_paused(&self, session: SessionId, paused: bool) -> Result<(), BackendError> {
        self.update_player(
            session,
            &PlayerUpdate {
                paused: Some(paused),
                ..Default::default()
            },
        )
        .await
    }

    async fn set_volume(&self, session: SessionId, volume: u16) -> Result<(), BackendError> {
        self.update_player(
            session,
            &PlayerUpdate {
                volume: Some(volume),
                ..Default::default()
            },
        )
        .await
    }

    async fn seek(&self, session: SessionId, position_ms: u64) -> Result<(), BackendError> {
        self.update_player(
            session,
            &PlayerUpdate {
                position: Some(position_ms),
                ..Default::default()
            },
        )
        .await
    }

    async fn destroy(&self, session: SessionId) -> Result<(), BackendError> {
        let url = self.player_url(session)?;
        let resp = self
            .http
            .delete(url)
            .header(reqwest::header::AUTHORIZATION, &self.password)
            .send()
            .await
            .map_err(unreachable)?;
        check_status(resp).await?;
        Ok(())
    }

    fn attach_session(&self, backend_session: &str) {
        let mut guard = self.session_id.write().unwrap_or_else(|err| err.into_inner());
        if guard.as_deref() != Some(backend_session) {
            tracing::info!(backend_session, "backend session attached");
            *guard = Some(backend_session.to_string());
        }
    }

    fn is_ready(&self) -> bool {
        self.session().is_ok()
    }

    fn node_label(&self) -> String {
        self.base.clone()
    }
}

#[async_trait]
impl TrackResolver for LavalinkClient {
    async fn load(&self, identifier: &str) -> Result<LoadResult, BackendError> {
        let resp = self
            .http
            .get(format!("{}/v4/loadtracks", self.base))
            .query(&[("identifier", identifier)])
            .header(reqwest::header::AUTHORIZATION, &self.password)
            .send()
            .await
            .map_err(unreachable)?;
        let resp = check_status(resp).await?;
        let body: LoadResponse = resp.json().await.map_err(unreachable)?;
        load_result_from_response(body).map_err(|err| BackendError::Unreachable(format!("{err:#}")))
    }
}

fn unreachable(err: reqwest::Error) -> BackendError {
    BackendError::Unreachable(err.to_string())
}

async fn check_status(resp: Response) -> Result<Response, BackendError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<NodeErrorBody>(&text)
        .ok()
        .and_then(|body| body.message.or(body.error))
        .unwrap_or(text);
    Err(BackendError::Rejected {
        status: status.as_u16(),
        message,
    })
}

fn load_result_from_response(body: LoadResponse) -> Result<LoadResult> {
    let result = match body.load_type.as_str() {
        "track" => {
            let track: RawTrack = serde_json::from_value(body.data).context("decode track")?;
            LoadResult::Track(track.into())
        }
        "playlist" => {
            let playlist: RawPlaylist = serde_json::from_value(body.data).context("decode playlist")?;
            LoadResult::Playlist {
                name: playlist.info.name,
                tracks: playlist.tracks.into_iter().map(QueueItem::from).collect(),
            }
        }
        "search" => {
            let tracks: Vec<RawTrack> = serde_json::from_value(body.data).context("decode search results")?;
            LoadResult::Search(tracks.into_iter().map(QueueItem::from).collect())
        }
        "empty" => LoadResult::Empty,
        "error" => {
            let exception: RawException = serde_json::from_value(body.data).unwrap_or(RawException { message: None });
            LoadResult::Failed(exception.message.unwrap_or_else(|| "unknown load error".to_string()))
        }
        other => return Err(anyhow!("unknown load type {other:?}")),
    };
    Ok(result)
}

/// Frame as sent over the node's websocket (and relayed to `/events`).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFrame {
    op: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    guild_id: Option<String>,
    #[serde(default)]
    track: Option<RawFrameTrack>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawFrameTrack {
    encoded: String,
    #[serde(rename = "userData", default)]
    user_data: Option<PlayTag>,
}

impl From<RawFrameTrack> for EndedTrack {
    fn from(track: RawFrameTrack) -> Self {
        let play_id = track.user_data.and_then(|tag| tag.play_id);
        EndedTrack::new(track.encoded, play_id)
    }
}

/// Parse one node frame. Frames the hub does not act on yield `Ok(None)`.
pub fn parse_event_frame(raw: &[u8]) -> Result<Option<BackendEvent>> {
    let frame: RawFrame = serde_json::from_slice(raw).context("decode backend frame")?;
    match frame.op.as_str() {
        "ready" => {
            let backend_session = frame
                .session_id
                .ok_or_else(|| anyhow!("ready frame without sessionId"))?;
            Ok(Some(BackendEvent::Ready { backend_session }))
        }
        "event" => {
            let kind = frame.kind.unwrap_or_default();
            if kind != "TrackEndEvent" && kind != "WebSocketClosedEvent" {
                return Ok(None);
            }
            let session = frame
                .guild_id
                .ok_or_else(|| anyhow!("{kind} without guildId"))?
                .parse::<SessionId>()
                .map_err(|err| anyhow!(err))?;
            if kind == "TrackEndEvent" {
                Ok(Some(BackendEvent::TrackEnded {
                    session,
                    track: frame.track.map(EndedTrack::from).unwrap_or_default(),
                    reason: TrackEndReason::parse(frame.reason.as_deref().unwrap_or("finished")),
                }))
            } else {
                Ok(Some(BackendEvent::SocketClosed {
                    session,
                    code: frame.code.unwrap_or(0),
                    reason: frame.reason.unwrap_or_default(),
                }))
            }
        }
        _ => Ok(None),
    }
}
