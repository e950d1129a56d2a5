//! # Host Bridge Traits
//!
//! Contracts between the playback core and the host platform.
//!
//! ## Overview
//!
//! The core coordinates queues, audio focus and power/network holds, but it
//! never decodes audio, talks to the OS audio stack or renders notifications.
//! Each of those capabilities is expressed here as a trait that the host
//! implements (or takes from `bridge-desktop`).
//!
//! ## Traits
//!
//! ### Playback
//! - [`PlaybackEngine`](playback::PlaybackEngine) - one decode/render pipeline per lane
//! - [`EngineFactory`](playback::EngineFactory) - creates engines at player setup
//! - [`EngineListener`](playback::EngineListener) - receives engine lifecycle callbacks
//!
//! ### Platform Integration
//! - [`AudioFocusManager`](focus::AudioFocusManager) - shared audio output ownership
//! - [`ResourceLock`](locks::ResourceLock) - power and network holds
//! - [`NowPlayingSink`](now_playing::NowPlayingSink) - notification / media session updates
//!
//! ### Utilities
//! - [`LoggerSink`](log::LoggerSink) - forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Engine failures
//! use [`BridgeError::Engine`](error::BridgeError::Engine), whose code and
//! message reach the host verbatim.
//!
//! ## Thread Safety
//!
//! Every trait requires `Send + Sync`; the core holds implementations behind
//! `Arc` and calls them from its player task.

pub mod error;
pub mod focus;
pub mod locks;
pub mod log;
pub mod now_playing;
pub mod playback;

pub use error::BridgeError;

// Re-export commonly used types
pub use focus::{AudioFocusManager, FocusChange, FocusListener, FocusRequestResult};
pub use locks::{LockKind, ResourceLock};
pub use log::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use now_playing::{Capability, MediaSessionOptions, NowPlayingSink, RatingType};
pub use playback::{
    AudioSource, EngineConfig, EngineEvent, EngineFactory, EngineListener, LaneId, MediaItem,
    PlaybackEngine, PlaybackMetadata, PlaybackState,
};
