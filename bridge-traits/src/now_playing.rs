//! Now-playing surface
//!
//! Hosts render media notifications, lock-screen controls and similar
//! "now playing" UI. The core only tells the sink what changed; rendering is
//! entirely the host's concern.

use crate::error::Result;
use crate::playback::{LaneId, MediaItem, PlaybackState};
use serde::{Deserialize, Serialize};

/// Remote-control actions a host may advertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    Play,
    PlayFromId,
    PlayFromSearch,
    Pause,
    Stop,
    SeekTo,
    Skip,
    SkipToNext,
    SkipToPrevious,
    SetRating,
    JumpForward,
    JumpBackward,
}

impl Capability {
    pub const ALL: [Capability; 12] = [
        Capability::Play,
        Capability::PlayFromId,
        Capability::PlayFromSearch,
        Capability::Pause,
        Capability::Stop,
        Capability::SeekTo,
        Capability::Skip,
        Capability::SkipToNext,
        Capability::SkipToPrevious,
        Capability::SetRating,
        Capability::JumpForward,
        Capability::JumpBackward,
    ];

    /// Media-session action bit.
    pub fn as_code(self) -> i64 {
        match self {
            Capability::Stop => 1,
            Capability::Pause => 2,
            Capability::Play => 4,
            Capability::JumpBackward => 8,
            Capability::SkipToPrevious => 16,
            Capability::SkipToNext => 32,
            Capability::JumpForward => 64,
            Capability::SetRating => 128,
            Capability::SeekTo => 256,
            Capability::PlayFromId => 1024,
            Capability::PlayFromSearch => 2048,
            Capability::Skip => 4096,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_code() == code)
    }

    /// Name under which the capability is published to hosts.
    pub fn constant_name(self) -> &'static str {
        match self {
            Capability::Play => "CAPABILITY_PLAY",
            Capability::PlayFromId => "CAPABILITY_PLAY_FROM_ID",
            Capability::PlayFromSearch => "CAPABILITY_PLAY_FROM_SEARCH",
            Capability::Pause => "CAPABILITY_PAUSE",
            Capability::Stop => "CAPABILITY_STOP",
            Capability::SeekTo => "CAPABILITY_SEEK_TO",
            Capability::Skip => "CAPABILITY_SKIP",
            Capability::SkipToNext => "CAPABILITY_SKIP_TO_NEXT",
            Capability::SkipToPrevious => "CAPABILITY_SKIP_TO_PREVIOUS",
            Capability::SetRating => "CAPABILITY_SET_RATING",
            Capability::JumpForward => "CAPABILITY_JUMP_FORWARD",
            Capability::JumpBackward => "CAPABILITY_JUMP_BACKWARD",
        }
    }
}

/// Rating style used when the host lets users rate tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RatingType {
    #[default]
    Heart,
    ThumbsUpDown,
    ThreeStars,
    FourStars,
    FiveStars,
    Percentage,
}

impl RatingType {
    pub const ALL: [RatingType; 6] = [
        RatingType::Heart,
        RatingType::ThumbsUpDown,
        RatingType::ThreeStars,
        RatingType::FourStars,
        RatingType::FiveStars,
        RatingType::Percentage,
    ];

    pub fn as_code(self) -> i64 {
        match self {
            RatingType::Heart => 1,
            RatingType::ThumbsUpDown => 2,
            RatingType::ThreeStars => 3,
            RatingType::FourStars => 4,
            RatingType::FiveStars => 5,
            RatingType::Percentage => 6,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_code() == code)
    }

    pub fn constant_name(self) -> &'static str {
        match self {
            RatingType::Heart => "RATING_HEART",
            RatingType::ThumbsUpDown => "RATING_THUMBS_UP_DOWN",
            RatingType::ThreeStars => "RATING_3_STARS",
            RatingType::FourStars => "RATING_4_STARS",
            RatingType::FiveStars => "RATING_5_STARS",
            RatingType::Percentage => "RATING_PERCENTAGE",
        }
    }
}

/// Presentation options pushed by the host at runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSessionOptions {
    /// Stop playback when the host application's task is removed.
    pub stop_with_app: bool,
    pub capabilities: Vec<Capability>,
    pub rating_type: RatingType,
}

/// Host renderer for now-playing state.
///
/// All methods are notifications; failures stay inside the host, except for
/// [`destroy`](Self::destroy) whose error the core logs during teardown.
pub trait NowPlayingSink: Send + Sync {
    /// Enter or leave foreground playback. `keep_notification` keeps the
    /// notification visible after leaving the foreground (paused, not stopped).
    fn set_foreground(&self, foreground: bool, keep_notification: bool);

    fn update_metadata(&self, _lane: LaneId, _item: &MediaItem) {}

    fn update_playback(&self, _lane: LaneId, _state: PlaybackState) {}

    fn update_options(&self, _options: &MediaSessionOptions) {}

    fn remove_notifications(&self) {}

    fn destroy(&self) -> Result<()> {
        Ok(())
    }
}
