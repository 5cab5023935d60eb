//! Query-to-track resolution.
//!
//! URLs are handed to the backend untouched. Free text goes through the
//! music-search prefix first and falls back to general video search.

use async_trait::async_trait;
use jukebox_types::QueueItem;

use crate::error::PlaybackError;
use crate::player_backend::BackendError;

pub const MUSIC_SEARCH_PREFIX: &str = "ytmsearch:";
pub const VIDEO_SEARCH_PREFIX: &str = "ytsearch:";

/// Backend answer to a load request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadResult {
    Track(QueueItem),
    Playlist { name: String, tracks: Vec<QueueItem> },
    Search(Vec<QueueItem>),
    Empty,
    /// The backend tried and failed; carries its message.
    Failed(String),
}

#[async_trait]
pub trait TrackResolver: Send + Sync {
    async fn load(&self, identifier: &str) -> Result<LoadResult, BackendError>;
}

/// Shape of a successful resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolvedKind {
    Single,
    Playlist { name: String },
    Search,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolved {
    pub items: Vec<QueueItem>,
    pub kind: ResolvedKind,
}

pub fn is_url(query: &str) -> bool {
    let lower = query.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Turn a user query into queue items.
///
/// Returns [`PlaybackError::ResolutionEmpty`] when nothing matched and
/// [`PlaybackError::ResolutionFailed`] when the backend reported a load error.
pub async fn resolve_query(resolver: &dyn TrackResolver, query: &str) -> Result<Resolved, PlaybackError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(PlaybackError::ResolutionEmpty);
    }

    if is_url(query) {
        let resolved = flatten(resolver.load(query).await?)?;
        return non_empty(resolved);
    }

    let music = flatten(resolver.load(&format!("{MUSIC_SEARCH_PREFIX}{query}")).await?)?;
    if !music.items.is_empty() {
        return Ok(music);
    }
    tracing::debug!(query, "music search empty; falling back to video search");
    let video = flatten(resolver.load(&format!("{VIDEO_SEARCH_PREFIX}{query}")).await?)?;
    non_empty(video)
}

fn flatten(result: LoadResult) -> Result<Resolved, PlaybackError> {
    let resolved = match result {
        LoadResult::Track(item) => Resolved {
            items: vec![item],
            kind: ResolvedKind::Single,
        },
        LoadResult::Playlist { name, tracks } => Resolved {
            items: tracks,
            kind: ResolvedKind::Playlist { name },
        },
        LoadResult::Search(items) => Resolved {
            items,
            kind: ResolvedKind::Search,
        },
        LoadResult::Empty => Resolved {
            items: Vec::new(),
            kind: ResolvedKind::Search,
        },
        LoadResult::Failed(message) => return Err(PlaybackError::ResolutionFailed(message)),
    };
    Ok(resolved)
}

fn non_empty(resolved: Resolved) -> Result<Resolved, PlaybackError> {
    if resolved.items.is_empty() {
        Err(PlaybackError::ResolutionEmpty)
    } else {
        Ok(resolved)
    }
}
