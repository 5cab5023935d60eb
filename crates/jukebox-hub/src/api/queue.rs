//! Queue-related API handlers.

use actix_web::{get, web, HttpResponse, Responder};

use crate::api::controller_for;
use crate::models::{QueueQuery, QueueResponse, SessionId};
use crate::state::AppState;

const DEFAULT_QUEUE_LIMIT: usize = 10;

#[utoipa::path(
    get,
    path = "/sessions/{id}/queue",
    params(
        ("id" = String, Path, description = "Session (guild) id"),
        ("limit" = Option<usize>, Query, description = "Maximum items to return (default 10)")
    ),
    responses(
        (status = 200, description = "Upcoming tracks", body = QueueResponse),
        (status = 409, description = "Not connected", body = crate::error::ErrorBody)
    )
)]
#[get("/sessions/{id}/queue")]
/// Return the next few upcoming tracks without consuming them.
pub async fn queue_list(
    state: web::Data<AppState>,
    id: web::Path<SessionId>,
    query: web::Query<QueueQuery>,
) -> impl Responder {
    let controller = match controller_for(&state, id.into_inner()) {
        Ok(controller) => controller,
        Err(err) => return err.into_response(),
    };
    let limit = query.limit.unwrap_or(DEFAULT_QUEUE_LIMIT);
    HttpResponse::Ok().json(queue_page(controller.snapshot_queue(), limit))
}

fn queue_page(mut items: Vec<jukebox_types::QueueItem>, limit: usize) -> QueueResponse {
    let total = items.len();
    items.truncate(limit);
    QueueResponse {
        remaining: total - items.len(),
        items,
        total,
    }
}
