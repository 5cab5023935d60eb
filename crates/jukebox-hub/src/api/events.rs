//! Backend event ingest.
//!
//! A relay holding the node websocket forwards each frame here verbatim.

use actix_web::{post, web, HttpResponse, Responder};

use crate::lavalink::parse_event_frame;
use crate::models::EventAck;
use crate::player_backend::BackendEvent;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/events",
    request_body(content = String, description = "Raw node frame (JSON)", content_type = "application/json"),
    responses(
        (status = 200, description = "Frame accepted", body = EventAck),
        (status = 400, description = "Malformed frame")
    )
)]
#[post("/events")]
/// Accept one backend frame and route it to the owning session.
pub async fn events_ingest(state: web::Data<AppState>, body: web::Bytes) -> impl Responder {
    let event = match parse_event_frame(&body) {
        Ok(Some(event)) => event,
        Ok(None) => return HttpResponse::Ok().json(EventAck { handled: false }),
        Err(err) => {
            tracing::warn!(error = %format!("{err:#}"), "rejected backend frame");
            return HttpResponse::BadRequest().body(format!("{err:#}"));
        }
    };
    tracing::debug!(event = ?event, "backend event");
    let handled = match event {
        BackendEvent::Ready { backend_session } => {
            state.backend.attach_session(&backend_session);
            true
        }
        closed @ BackendEvent::SocketClosed { session, .. } => {
            if let Err(err) = state.voice.disconnect(session).await {
                tracing::warn!(session_id = %session, error = %err, "failed to clear voice channel");
            }
            state.registry.dispatch(closed).await
        }
        other => state.registry.dispatch(other).await,
    };
    HttpResponse::Ok().json(EventAck { handled })
}
