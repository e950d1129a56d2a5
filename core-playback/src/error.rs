//! # Player Error Types
//!
//! Every failure a host command can produce. Each variant carries a stable
//! string code that hosts match on; the display text is the human-readable
//! message.

use bridge_traits::{BridgeError, LaneId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned by player commands.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlayerError {
    // ========================================================================
    // Queue Errors
    // ========================================================================
    /// The referenced track id is not in the lane's queue.
    #[error("The track {0} was not found in the queue")]
    TrackNotFound(String),

    /// A track batch was empty or an element lacked required fields.
    #[error("Invalid track object: {0}")]
    InvalidTrack(String),

    /// No track follows the current one.
    #[error("There is no track left to play")]
    EndOfQueue,

    /// No track precedes the current one.
    #[error("There is no previous track")]
    NoPreviousTrack,

    /// The engine reports no defined playback position.
    #[error("The playback position is unknown")]
    UnknownPosition,

    // ========================================================================
    // Engine Errors
    // ========================================================================
    /// Failure reported by a lane's playback engine, passed through verbatim.
    #[error("{message}")]
    Adapter { code: String, message: String },

    // ========================================================================
    // Precondition Errors
    // ========================================================================
    /// The lane id is outside the configured lane range.
    #[error("Player {lane} does not exist (the player has {lane_count} lanes)")]
    LaneOutOfRange { lane: LaneId, lane_count: usize },

    /// A lane command arrived before the player was set up.
    #[error("The player is not initialized. Call setup first")]
    NotInitialized,

    /// A numeric argument is outside its domain.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Setup or update options could not be parsed or are inconsistent.
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// The player task went away before answering.
    #[error("The playback service disconnected before replying")]
    ServiceDisconnected,
}

impl PlayerError {
    /// Stable code reported to hosts.
    pub fn code(&self) -> &str {
        match self {
            PlayerError::TrackNotFound(_) => "track_not_in_queue",
            PlayerError::InvalidTrack(_) => "invalid_track_object",
            PlayerError::EndOfQueue => "queue_exhausted",
            PlayerError::NoPreviousTrack => "no_previous_track",
            PlayerError::UnknownPosition => "unknown",
            PlayerError::Adapter { code, .. } => code,
            PlayerError::LaneOutOfRange { .. } => "invalid_player_id",
            PlayerError::NotInitialized => "player_not_initialized",
            PlayerError::InvalidArgument(_) => "invalid_argument",
            PlayerError::InvalidOptions(_) => "invalid_options",
            PlayerError::ServiceDisconnected => "service_disconnected",
        }
    }

    /// The code/message pair handed to the host when a command is rejected.
    pub fn rejection(&self) -> Rejection {
        Rejection {
            code: self.code().to_string(),
            message: self.to_string(),
        }
    }

    /// Returns `true` if the engine produced this error.
    pub fn is_engine_error(&self) -> bool {
        matches!(self, PlayerError::Adapter { .. })
    }

    /// Returns `true` if the command was refused before reaching an engine.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            PlayerError::TrackNotFound(_)
                | PlayerError::InvalidTrack(_)
                | PlayerError::EndOfQueue
                | PlayerError::NoPreviousTrack
                | PlayerError::LaneOutOfRange { .. }
                | PlayerError::NotInitialized
                | PlayerError::InvalidArgument(_)
                | PlayerError::InvalidOptions(_)
        )
    }
}

impl From<BridgeError> for PlayerError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::Engine { code, message } => PlayerError::Adapter { code, message },
            BridgeError::NotAvailable(message) => PlayerError::Adapter {
                code: "not_available".to_string(),
                message,
            },
            BridgeError::OperationFailed(message) => PlayerError::Adapter {
                code: "operation_failed".to_string(),
                message,
            },
        }
    }
}

/// Host-facing rejection payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub code: String,
    pub message: String,
}

/// Result type for player operations.
pub type Result<T> = std::result::Result<T, PlayerError>;
