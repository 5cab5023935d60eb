//! HTTP API handlers.
//!
//! Defines the Actix routes for session membership, playback commands, queue
//! inspection, and backend event ingest.

pub mod events;
pub mod liveness;
pub mod playback;
pub mod queue;
pub mod sessions;

use std::sync::Arc;

pub use events::events_ingest;
pub use liveness::{health, HealthResponse};
pub use playback::{
    now_playing,
    pause,
    play,
    resume,
    seek,
    set_loop,
    skip,
    stop,
    volume_get,
    volume_set,
};
pub use queue::queue_list;
pub use sessions::{hub_status, session_join, session_leave, session_status};

use crate::controller::PlaybackController;
use crate::error::PlaybackError;
use crate::models::SessionId;
use crate::state::AppState;

/// Look up an existing controller; commands never create sessions implicitly.
pub(crate) fn controller_for(state: &AppState, session: SessionId) -> Result<Arc<PlaybackController>, PlaybackError> {
    state.registry.get(session).ok_or(PlaybackError::NotConnected)
}

/// Register every route on an app or scope.
pub fn configure(cfg: &mut actix_web::web::ServiceConfig) {
    cfg.service(health)
        .service(hub_status)
        .service(session_join)
        .service(session_leave)
        .service(session_status)
        .service(play)
        .service(pause)
        .service(resume)
        .service(skip)
        .service(stop)
        .service(set_loop)
        .service(volume_get)
        .service(volume_set)
        .service(seek)
        .service(now_playing)
        .service(queue_list)
        .service(events_ingest);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use actix_web::http::StatusCode;
    use actix_web::{test, web, App};
    use serde_json::{json, Value};

    use crate::controller::ControllerSettings;
    use crate::events::EventBus;
    use crate::models::{
        HubStatusResponse,
        JoinResponse,
        NowPlayingResponse,
        PlayResponse,
        QueueResponse,
        VolumeResponse,
    };
    use crate::player_backend::testing::{item, RecordingBackend};
    use crate::search::testing::StaticResolver;
    use crate::search::LoadResult;
    use crate::session_registry::SessionRegistry;
    use crate::state::AppState;
    use crate::voice::TrackedVoiceTransport;

    struct Harness {
        state: web::Data<AppState>,
        backend: Arc<RecordingBackend>,
        resolver: Arc<StaticResolver>,
    }

    fn make_state() -> Harness {
        let backend = Arc::new(RecordingBackend::default());
        let resolver = Arc::new(StaticResolver::default());
        let registry = Arc::new(SessionRegistry::new(
            backend.clone(),
            EventBus::new(),
            ControllerSettings {
                advance_timeout: Duration::from_millis(50),
                ..Default::default()
            },
        ));
        let state = web::Data::new(AppState::new(
            registry,
            backend.clone(),
            resolver.clone(),
            Arc::new(TrackedVoiceTransport::new()),
        ));
        Harness {
            state,
            backend,
            resolver,
        }
    }

    macro_rules! init_app {
        ($state:expr) => {
            test::init_service(App::new().app_data($state.clone()).configure(crate::api::configure)).await
        };
    }

    #[actix_web::test]
    async fn health_ok() {
        let harness = make_state();
        let app = init_app!(harness.state);

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(resp, json!({"status": "ok"}));
    }

    #[actix_web::test]
    async fn play_without_voice_is_not_connected() {
        let harness = make_state();
        let app = init_app!(harness.state);

        let req = test::TestRequest::post()
            .uri("/sessions/1/play")
            .set_json(json!({"query": "anything"}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["kind"], "not_connected");
    }

    #[actix_web::test]
    async fn join_play_and_list_queue() {
        let harness = make_state();
        harness.resolver.answer(
            "ytmsearch:two songs",
            LoadResult::Search(vec![item("a"), item("b")]),
        );
        let app = init_app!(harness.state);

        let req = test::TestRequest::post()
            .uri("/sessions/1/join")
            .set_json(json!({"channel_id": "55"}))
            .to_request();
        let joined: JoinResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(joined.action, "connected");

        let req = test::TestRequest::post()
            .uri("/sessions/1/play")
            .set_json(json!({"query": "two songs"}))
            .to_request();
        let played: PlayResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(played.queued.len(), 2);
        assert_eq!(played.started, Some(item("a")));
        assert_eq!(played.message, "Queued 2 tracks.");

        let req = test::TestRequest::get()
            .uri("/sessions/1/queue?limit=5")
            .to_request();
        let queue: QueueResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(queue.items, vec![item("b")]);
        assert_eq!(queue.remaining, 0);
        assert_eq!(harness.backend.started(), vec!["enc:a"]);
    }

    #[actix_web::test]
    async fn play_with_channel_joins_first() {
        let harness = make_state();
        harness
            .resolver
            .answer("https://example.com/a", LoadResult::Track(item("a")));
        let app = init_app!(harness.state);

        let req = test::TestRequest::post()
            .uri("/sessions/2/play")
            .set_json(json!({"query": "https://example.com/a", "channel_id": "9"}))
            .to_request();
        let played: PlayResponse = test::call_and_read_body_json(&app, req).await;

        assert_eq!(played.message, "Queued a title by a author");
        let req = test::TestRequest::get()
            .uri("/sessions/2/now-playing")
            .to_request();
        let current: NowPlayingResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(current.track, item("a"));
        assert_eq!(current.duration_secs, 180);
    }

    #[actix_web::test]
    async fn play_with_no_results_is_404() {
        let harness = make_state();
        let app = init_app!(harness.state);

        let req = test::TestRequest::post()
            .uri("/sessions/3/play")
            .set_json(json!({"query": "nothing here", "channel_id": "1"}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn skip_when_idle_is_nothing_playing() {
        let harness = make_state();
        let app = init_app!(harness.state);

        let req = test::TestRequest::post()
            .uri("/sessions/4/join")
            .set_json(json!({"channel_id": "1"}))
            .to_request();
        assert!(test::call_service(&app, req).await.status().is_success());

        let req = test::TestRequest::post().uri("/sessions/4/skip").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Nothing playing.");
    }

    #[actix_web::test]
    async fn volume_is_clamped_and_readable() {
        let harness = make_state();
        let app = init_app!(harness.state);
        harness.state.registry.get_or_create(crate::models::SessionId(5));

        let req = test::TestRequest::post()
            .uri("/sessions/5/volume")
            .set_json(json!({"volume": 4000}))
            .to_request();
        let set: VolumeResponse = test::call_and_read_body_json(&app, req).await;
        let req = test::TestRequest::get().uri("/sessions/5/volume").to_request();
        let got: VolumeResponse = test::call_and_read_body_json(&app, req).await;

        assert_eq!(set.volume, 1000);
        assert_eq!(got.volume, 1000);
    }

    #[actix_web::test]
    async fn loop_without_body_toggles() {
        let harness = make_state();
        let app = init_app!(harness.state);
        harness.state.registry.get_or_create(crate::models::SessionId(6));

        let req = test::TestRequest::post().uri("/sessions/6/loop").to_request();
        let first: Value = test::call_and_read_body_json(&app, req).await;
        let req = test::TestRequest::post()
            .uri("/sessions/6/loop")
            .set_json(json!({"enabled": true}))
            .to_request();
        let second: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(first, json!({"enabled": true}));
        assert_eq!(second, json!({"enabled": true}));
    }

    #[actix_web::test]
    async fn track_end_frame_advances_session() {
        let harness = make_state();
        let session = crate::models::SessionId(7);
        let controller = harness.state.registry.get_or_create(session);
        controller.enqueue(vec![item("a"), item("b")]).await.unwrap();
        let app = init_app!(harness.state);

        let req = test::TestRequest::post()
            .uri("/events")
            .set_payload(r#"{"op":"event","type":"TrackEndEvent","guildId":"7","track":{"encoded":"enc:a"},"reason":"finished"}"#)
            .insert_header(("content-type", "application/json"))
            .to_request();
        let ack: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(ack, json!({"handled": true}));

        for _ in 0..100 {
            if harness.backend.started().len() == 2 {
                break;
            }
            actix_web::rt::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(controller.now_playing().await.unwrap(), item("b"));
    }

    #[actix_web::test]
    async fn socket_closed_frame_forgets_voice_channel() {
        let harness = make_state();
        harness
            .resolver
            .answer("https://example.com/a", LoadResult::Track(item("a")));
        let app = init_app!(harness.state);

        let req = test::TestRequest::post()
            .uri("/sessions/8/play")
            .set_json(json!({"query": "https://example.com/a", "channel_id": "3"}))
            .to_request();
        assert!(test::call_service(&app, req).await.status().is_success());

        let req = test::TestRequest::post()
            .uri("/events")
            .set_payload(r#"{"op":"event","type":"WebSocketClosedEvent","guildId":"8","code":4014,"reason":"Disconnected","byRemote":true}"#)
            .insert_header(("content-type", "application/json"))
            .to_request();
        let ack: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(ack, json!({"handled": true}));

        let req = test::TestRequest::post()
            .uri("/sessions/8/play")
            .set_json(json!({"query": "https://example.com/a"}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["kind"], "not_connected");
        assert!(harness.state.registry.get(crate::models::SessionId(8)).is_none());
    }

    #[actix_web::test]
    async fn malformed_frame_is_rejected() {
        let harness = make_state();
        let app = init_app!(harness.state);

        let req = test::TestRequest::post()
            .uri("/events")
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn hub_status_lists_sessions() {
        let harness = make_state();
        harness.state.registry.get_or_create(crate::models::SessionId(20));
        harness.state.registry.get_or_create(crate::models::SessionId(10));
        let app = init_app!(harness.state);

        let req = test::TestRequest::get().uri("/status").to_request();
        let status: HubStatusResponse = test::call_and_read_body_json(&app, req).await;

        assert_eq!(
            status.sessions,
            vec![crate::models::SessionId(10), crate::models::SessionId(20)]
        );
        assert_eq!(status.node, "recording");
        assert!(status.node_ready);
    }

    #[actix_web::test]
    async fn commands_for_unknown_sessions_are_not_connected() {
        let harness = make_state();
        let app = init_app!(harness.state);

        for uri in ["/sessions/99/pause", "/sessions/99/stop", "/sessions/99/skip"] {
            let req = test::TestRequest::post().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::CONFLICT, "{uri}");
        }
    }
}
