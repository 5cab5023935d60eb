//! Playback-related API handlers.

use actix_web::{get, post, web, HttpResponse, Responder};
use jukebox_types::QueueItem;

use crate::api::controller_for;
use crate::error::PlaybackError;
use crate::models::{
    LoopRequest, LoopResponse, NowPlayingResponse, PlayRequest, PlayResponse, SeekRequest, SessionId,
    SkipResponse,
    StopResponse, VolumeRequest, VolumeResponse,
};
use crate::search::{resolve_query, ResolvedKind};
use crate::state::AppState;
use crate::voice::ensure_voice;

#[utoipa::path(
    post,
    path = "/sessions/{id}/play",
    params(
        ("id" = String, Path, description = "Session (guild) id")
    ),
    request_body = PlayRequest,
    responses(
        (status = 200, description = "Tracks queued", body = PlayResponse),
        (status = 404, description = "No results", body = crate::error::ErrorBody),
        (status = 409, description = "Not connected", body = crate::error::ErrorBody),
        (status = 503, description = "Backend unreachable", body = crate::error::ErrorBody)
    )
)]
#[post("/sessions/{id}/play")]
/// Resolve a query and queue the results; starts playback when idle.
pub async fn play(
    state: web::Data<AppState>,
    id: web::Path<SessionId>,
    body: web::Json<PlayRequest>,
) -> impl Responder {
    let session = id.into_inner();
    let req = body.into_inner();
    tracing::info!(session_id = %session, query = %req.query, "play request");
    match play_query(&state, session, req).await {
        Ok(resp) => HttpResponse::Ok().json(resp),
        Err(err) => err.into_response(),
    }
}

async fn play_query(state: &AppState, session: SessionId, req: PlayRequest) -> Result<PlayResponse, PlaybackError> {
    match req.channel_id {
        Some(channel) => {
            ensure_voice(state.voice.as_ref(), session, channel).await?;
        }
        None if state.voice.current_channel(session).is_none() => {
            return Err(PlaybackError::NotConnected);
        }
        None => {}
    }

    let resolved = resolve_query(state.resolver.as_ref(), &req.query).await?;
    let playlist = match resolved.kind {
        ResolvedKind::Playlist { name } => Some(name),
        _ => None,
    };
    let controller = state.registry.get_or_create(session);
    let outcome = controller.enqueue(resolved.items.clone()).await?;
    let message = queued_message(&resolved.items, playlist.as_deref());
    Ok(PlayResponse {
        queued: resolved.items,
        started: outcome.started,
        playlist,
        message,
    })
}

fn queued_message(items: &[QueueItem], playlist: Option<&str>) -> String {
    match (items, playlist) {
        ([single], None) => format!("Queued {} by {}", single.title, single.author),
        (_, Some(name)) => format!("Queued {} tracks from {}.", items.len(), name),
        _ => format!("Queued {} tracks.", items.len()),
    }
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/pause",
    params(
        ("id" = String, Path, description = "Session (guild) id")
    ),
    responses(
        (status = 200, description = "Paused"),
        (status = 409, description = "Not connected or nothing playing", body = crate::error::ErrorBody)
    )
)]
#[post("/sessions/{id}/pause")]
pub async fn pause(state: web::Data<AppState>, id: web::Path<SessionId>) -> impl Responder {
    let controller = match controller_for(&state, id.into_inner()) {
        Ok(controller) => controller,
        Err(err) => return err.into_response(),
    };
    match controller.pause().await {
        Ok(()) => HttpResponse::Ok().finish(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/resume",
    params(
        ("id" = String, Path, description = "Session (guild) id")
    ),
    responses(
        (status = 200, description = "Resumed"),
        (status = 409, description = "Not connected or nothing playing", body = crate::error::ErrorBody)
    )
)]
#[post("/sessions/{id}/resume")]
pub async fn resume(state: web::Data<AppState>, id: web::Path<SessionId>) -> impl Responder {
    let controller = match controller_for(&state, id.into_inner()) {
        Ok(controller) => controller,
        Err(err) => return err.into_response(),
    };
    match controller.resume().await {
        Ok(()) => HttpResponse::Ok().finish(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/skip",
    params(
        ("id" = String, Path, description = "Session (guild) id")
    ),
    responses(
        (status = 200, description = "Current track stopped", body = SkipResponse),
        (status = 409, description = "Nothing playing", body = crate::error::ErrorBody)
    )
)]
#[post("/sessions/{id}/skip")]
/// Stop the current track; the next one starts when the backend reports the end.
pub async fn skip(state: web::Data<AppState>, id: web::Path<SessionId>) -> impl Responder {
    let controller = match controller_for(&state, id.into_inner()) {
        Ok(controller) => controller,
        Err(err) => return err.into_response(),
    };
    match controller.skip().await {
        Ok(skipped) => HttpResponse::Ok().json(SkipResponse { skipped }),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/stop",
    params(
        ("id" = String, Path, description = "Session (guild) id")
    ),
    responses(
        (status = 200, description = "Stopped and cleared", body = StopResponse),
        (status = 409, description = "Not connected", body = crate::error::ErrorBody)
    )
)]
#[post("/sessions/{id}/stop")]
/// Clear the queue and stop playback.
pub async fn stop(state: web::Data<AppState>, id: web::Path<SessionId>) -> impl Responder {
    let controller = match controller_for(&state, id.into_inner()) {
        Ok(controller) => controller,
        Err(err) => return err.into_response(),
    };
    match controller.stop().await {
        Ok(cleared) => HttpResponse::Ok().json(StopResponse { cleared }),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/loop",
    params(
        ("id" = String, Path, description = "Session (guild) id")
    ),
    request_body(content = LoopRequest, description = "Omit `enabled` (or the body) to toggle"),
    responses(
        (status = 200, description = "Loop state", body = LoopResponse),
        (status = 409, description = "Not connected", body = crate::error::ErrorBody)
    )
)]
#[post("/sessions/{id}/loop")]
/// Set or toggle looping of the current track.
pub async fn set_loop(
    state: web::Data<AppState>,
    id: web::Path<SessionId>,
    body: Option<web::Json<LoopRequest>>,
) -> impl Responder {
    let controller = match controller_for(&state, id.into_inner()) {
        Ok(controller) => controller,
        Err(err) => return err.into_response(),
    };
    let requested = body.and_then(|body| body.into_inner().enabled);
    let enabled = match requested {
        Some(enabled) => {
            controller.set_loop(enabled).await;
            enabled
        }
        None => controller.toggle_loop().await,
    };
    HttpResponse::Ok().json(LoopResponse { enabled })
}

#[utoipa::path(
    get,
    path = "/sessions/{id}/volume",
    params(
        ("id" = String, Path, description = "Session (guild) id")
    ),
    responses(
        (status = 200, description = "Current volume", body = VolumeResponse),
        (status = 409, description = "Not connected", body = crate::error::ErrorBody)
    )
)]
#[get("/sessions/{id}/volume")]
pub async fn volume_get(state: web::Data<AppState>, id: web::Path<SessionId>) -> impl Responder {
    match controller_for(&state, id.into_inner()) {
        Ok(controller) => HttpResponse::Ok().json(VolumeResponse {
            volume: controller.volume().await,
        }),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/volume",
    params(
        ("id" = String, Path, description = "Session (guild) id")
    ),
    request_body = VolumeRequest,
    responses(
        (status = 200, description = "Stored (clamped) volume", body = VolumeResponse),
        (status = 409, description = "Not connected", body = crate::error::ErrorBody)
    )
)]
#[post("/sessions/{id}/volume")]
/// Set volume; values outside `0..=1000` are clamped.
pub async fn volume_set(
    state: web::Data<AppState>,
    id: web::Path<SessionId>,
    body: web::Json<VolumeRequest>,
) -> impl Responder {
    let controller = match controller_for(&state, id.into_inner()) {
        Ok(controller) => controller,
        Err(err) => return err.into_response(),
    };
    match controller.set_volume(body.volume).await {
        Ok(volume) => HttpResponse::Ok().json(VolumeResponse { volume }),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/seek",
    params(
        ("id" = String, Path, description = "Session (guild) id")
    ),
    request_body = SeekRequest,
    responses(
        (status = 200, description = "Seek requested"),
        (status = 409, description = "Nothing playing", body = crate::error::ErrorBody)
    )
)]
#[post("/sessions/{id}/seek")]
/// Seek within the current track (seconds).
pub async fn seek(
    state: web::Data<AppState>,
    id: web::Path<SessionId>,
    body: web::Json<SeekRequest>,
) -> impl Responder {
    let controller = match controller_for(&state, id.into_inner()) {
        Ok(controller) => controller,
        Err(err) => return err.into_response(),
    };
    match controller.seek(body.seconds.saturating_mul(1000)).await {
        Ok(_) => HttpResponse::Ok().finish(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/sessions/{id}/now-playing",
    params(
        ("id" = String, Path, description = "Session (guild) id")
    ),
    responses(
        (status = 200, description = "Current track", body = NowPlayingResponse),
        (status = 409, description = "Nothing playing", body = crate::error::ErrorBody)
    )
)]
#[get("/sessions/{id}/now-playing")]
pub async fn now_playing(state: web::Data<AppState>, id: web::Path<SessionId>) -> impl Responder {
    let controller = match controller_for(&state, id.into_inner()) {
        Ok(controller) => controller,
        Err(err) => return err.into_response(),
    };
    match controller.now_playing().await {
        Ok(item) => HttpResponse::Ok().json(NowPlayingResponse::from(item)),
        Err(err) => err.into_response(),
    }
}
