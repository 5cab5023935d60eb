use utoipa::OpenApi;

use crate::api;
use crate::error;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::liveness::health,
        api::sessions::hub_status,
        api::sessions::session_join,
        api::sessions::session_leave,
        api::sessions::session_status,
        api::playback::play,
        api::playback::pause,
        api::playback::resume,
        api::playback::skip,
        api::playback::stop,
        api::playback::set_loop,
        api::playback::volume_get,
        api::playback::volume_set,
        api::playback::seek,
        api::playback::now_playing,
        api::queue::queue_list,
        api::events::events_ingest,
    ),
    components(
        schemas(
            api::HealthResponse,
            error::ErrorBody,
            jukebox_types::QueueItem,
            jukebox_types::PlaybackState,
            jukebox_types::ControllerStatus,
            models::ChannelId,
            models::JoinRequest,
            models::JoinResponse,
            models::PlayRequest,
            models::PlayResponse,
            models::NowPlayingResponse,
            models::SeekRequest,
            models::VolumeRequest,
            models::VolumeResponse,
            models::LoopRequest,
            models::LoopResponse,
            models::QueueResponse,
            models::SkipResponse,
            models::StopResponse,
            models::SessionStatusResponse,
            models::HubStatusResponse,
            models::EventAck,
        )
    ),
    tags(
        (name = "jukebox-hub", description = "Per-session music playback control API")
    )
)]
pub struct ApiDoc;
