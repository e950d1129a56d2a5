//! Playback engine contract.
//!
//! A playback engine wraps one decode/render pipeline. The core drives one
//! engine per lane: it forwards ordered queue operations and transport
//! commands, and receives lifecycle callbacks through an [`EngineListener`].
//! Engines are created by the host-provided [`EngineFactory`] when the player
//! is set up.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Index of a playback lane, in `0..lane_count`.
pub type LaneId = usize;

/// URI schemes that resolve to content stored on the device.
const LOCAL_SCHEMES: &[&str] = &["file", "content", "asset", "res", "android.resource"];

/// Where an item's audio comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AudioSource {
    /// Content on the device (plain path or a local URI scheme).
    Local { uri: String },
    /// Content fetched over the network.
    Remote { url: String },
}

impl AudioSource {
    /// Classify a resource locator by its scheme.
    ///
    /// Locators without a scheme are treated as local paths.
    pub fn from_uri(uri: impl Into<String>) -> Self {
        let uri = uri.into();
        let scheme = uri
            .split_once("://")
            .or_else(|| uri.split_once(':').filter(|(s, _)| s.len() > 1))
            .map(|(scheme, _)| scheme.to_ascii_lowercase());

        match scheme {
            Some(scheme) if !LOCAL_SCHEMES.contains(&scheme.as_str()) => {
                AudioSource::Remote { url: uri }
            }
            _ => AudioSource::Local { uri },
        }
    }

    /// Determine whether the source represents remote content.
    pub fn is_remote(&self) -> bool {
        matches!(self, AudioSource::Remote { .. })
    }

    /// The original locator string.
    pub fn uri(&self) -> &str {
        match self {
            AudioSource::Local { uri } => uri,
            AudioSource::Remote { url } => url,
        }
    }
}

/// Presentation attributes carried along with an item. The core never
/// interprets them; engines may surface them to media sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaybackMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub artwork: Option<String>,
    /// Duration hint supplied by the host.
    pub duration: Option<Duration>,
    pub rating: Option<serde_json::Value>,
}

/// Engine-facing copy of a queued track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: String,
    pub source: AudioSource,
    pub metadata: PlaybackMetadata,
}

impl MediaItem {
    pub fn new(id: impl Into<String>, source: AudioSource) -> Self {
        Self {
            id: id.into(),
            source,
            metadata: PlaybackMetadata::default(),
        }
    }

    /// Attach metadata to the item.
    pub fn with_metadata(mut self, metadata: PlaybackMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Playback lifecycle state reported by an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    None,
    Stopped,
    Paused,
    Playing,
    Buffering,
    Connecting,
}

impl PlaybackState {
    /// Whether the state counts as actively playing. Buffering counts: the
    /// engine intends to play and keeps the output claimed.
    pub fn is_playing(self) -> bool {
        matches!(self, PlaybackState::Playing | PlaybackState::Buffering)
    }

    /// Numeric code shared with hosts that predate the string names.
    pub fn as_code(self) -> i64 {
        match self {
            PlaybackState::None => 0,
            PlaybackState::Stopped => 1,
            PlaybackState::Paused => 2,
            PlaybackState::Playing => 3,
            PlaybackState::Buffering => 6,
            PlaybackState::Connecting => 8,
        }
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        PlaybackState::None
    }
}

/// Buffering and cache parameters handed to each engine at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Minimum media kept buffered ahead of the playhead.
    pub min_buffer: Duration,
    /// Maximum media buffered ahead of the playhead.
    pub max_buffer: Duration,
    /// Media required before playback starts.
    pub play_buffer: Duration,
    /// Media required before playback resumes after a stall.
    pub rebuffer: Duration,
    /// Quota for locally cached remote content. Zero disables the cache.
    pub cache_max_bytes: u64,
}

/// Lifecycle notifications an engine reports back to the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    StateChanged(PlaybackState),
    TrackChanged {
        previous: Option<String>,
        /// Position reached in the previous track.
        position: Duration,
        next: Option<String>,
    },
    QueueEnded {
        previous: Option<String>,
        position: Duration,
    },
    Error {
        code: String,
        message: String,
    },
}

/// Receiver of engine callbacks. Implementations must not block; the core's
/// implementation only enqueues the event.
pub trait EngineListener: Send + Sync {
    fn on_event(&self, lane: LaneId, event: EngineEvent);
}

/// One decode/render pipeline.
///
/// Track operations address positions in the lane's queue, which the core
/// keeps in step with the engine. Position-like queries return `None` when
/// the engine has no defined value.
#[async_trait::async_trait]
pub trait PlaybackEngine: Send + Sync {
    /// Insert `items` before `index` (`index == len` appends).
    async fn add(&self, items: Vec<MediaItem>, index: usize) -> Result<()>;

    /// Remove the items at `indexes` (ascending, distinct).
    async fn remove(&self, indexes: Vec<usize>) -> Result<()>;

    /// Drop every item after the current one.
    async fn remove_upcoming(&self) -> Result<()>;

    /// Jump to the item at `index`.
    async fn skip(&self, index: usize) -> Result<()>;

    async fn skip_to_next(&self) -> Result<()>;

    async fn skip_to_previous(&self) -> Result<()>;

    async fn play(&self) -> Result<()>;

    async fn pause(&self) -> Result<()>;

    async fn stop(&self) -> Result<()>;

    /// Stop and drop every item.
    async fn reset(&self) -> Result<()>;

    async fn seek_to(&self, position: Duration) -> Result<()>;

    async fn set_volume(&self, volume: f32) -> Result<()>;

    async fn volume(&self) -> Result<f32>;

    async fn set_rate(&self, rate: f32) -> Result<()>;

    async fn rate(&self) -> Result<f32>;

    async fn duration(&self) -> Result<Option<Duration>>;

    async fn buffered_position(&self) -> Result<Option<Duration>>;

    async fn position(&self) -> Result<Option<Duration>>;

    async fn state(&self) -> Result<PlaybackState>;

    /// Whether output goes to a remote device (casting). Remote engines are
    /// exempt from local audio focus and resource holds.
    fn is_remote(&self) -> bool {
        false
    }

    /// Release every native resource. The engine is not used afterwards.
    async fn destroy(&self) -> Result<()>;
}

/// Creates engines for the lanes of a player.
pub trait EngineFactory: Send + Sync {
    fn create_engine(
        &self,
        lane: LaneId,
        config: &EngineConfig,
        listener: Arc<dyn EngineListener>,
    ) -> Result<Box<dyn PlaybackEngine>>;
}
