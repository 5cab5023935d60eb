//! Session and voice membership API handlers.

use actix_web::{get, post, web, HttpResponse, Responder};

use crate::api::controller_for;
use crate::models::{HubStatusResponse, JoinRequest, JoinResponse, SessionId, SessionStatusResponse};
use crate::state::AppState;
use crate::voice::{ensure_voice, leave};

#[utoipa::path(
    post,
    path = "/sessions/{id}/join",
    params(
        ("id" = String, Path, description = "Session (guild) id")
    ),
    request_body = JoinRequest,
    responses(
        (status = 200, description = "Voice connected", body = JoinResponse),
        (status = 403, description = "Missing voice permissions", body = crate::error::ErrorBody),
        (status = 502, description = "Voice connection failed", body = crate::error::ErrorBody)
    )
)]
#[post("/sessions/{id}/join")]
/// Join (or move to) the caller's voice channel.
pub async fn session_join(
    state: web::Data<AppState>,
    id: web::Path<SessionId>,
    body: web::Json<JoinRequest>,
) -> impl Responder {
    let session = id.into_inner();
    let channel = body.channel_id;
    match ensure_voice(state.voice.as_ref(), session, channel).await {
        Ok(outcome) => {
            state.registry.get_or_create(session);
            HttpResponse::Ok().json(JoinResponse {
                channel_id: channel,
                action: outcome.as_str().to_string(),
            })
        }
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/leave",
    params(
        ("id" = String, Path, description = "Session (guild) id")
    ),
    responses(
        (status = 200, description = "Disconnected"),
        (status = 409, description = "Not connected", body = crate::error::ErrorBody)
    )
)]
#[post("/sessions/{id}/leave")]
/// Disconnect from voice and tear the session down.
pub async fn session_leave(state: web::Data<AppState>, id: web::Path<SessionId>) -> impl Responder {
    let session = id.into_inner();
    tracing::info!(session_id = %session, "leave request");
    match leave(state.voice.as_ref(), &state.registry, session).await {
        Ok(()) => HttpResponse::Ok().finish(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/sessions/{id}/status",
    params(
        ("id" = String, Path, description = "Session (guild) id")
    ),
    responses(
        (status = 200, description = "Session status", body = SessionStatusResponse),
        (status = 409, description = "Not connected", body = crate::error::ErrorBody)
    )
)]
#[get("/sessions/{id}/status")]
/// Controller state plus voice membership for one session.
pub async fn session_status(state: web::Data<AppState>, id: web::Path<SessionId>) -> impl Responder {
    let session = id.into_inner();
    let controller = match controller_for(&state, session) {
        Ok(controller) => controller,
        Err(err) => return err.into_response(),
    };
    HttpResponse::Ok().json(SessionStatusResponse {
        session_id: session,
        channel_id: state.voice.current_channel(session),
        playback: controller.status().await,
    })
}

#[utoipa::path(
    get,
    path = "/status",
    responses(
        (status = 200, description = "Hub status", body = HubStatusResponse)
    )
)]
#[get("/status")]
/// Backend node info, build metadata and active sessions.
pub async fn hub_status(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(HubStatusResponse {
        node: state.backend.node_label(),
        node_ready: state.backend.is_ready(),
        sessions: state.registry.session_ids(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        build: format!("{} ({})", env!("GIT_SHA"), env!("BUILD_DATE")),
    })
}
