//! # Playback Session Core
//!
//! Queue bookkeeping and shared-output policy for a player with two
//! independent lanes.
//!
//! ## Overview
//!
//! This crate handles:
//! - Per-lane queues of host track items ([`queue`], [`track`])
//! - The serialized player task that owns every lane ([`session`])
//! - Buffering of commands until that task exists ([`gate`])
//! - Audio focus shared by both lanes ([`focus`])
//! - Power and network holds shared by both lanes ([`resources`])
//!
//! Decoding and rendering live behind [`bridge_traits::PlaybackEngine`].

pub mod config;
pub mod constants;
pub mod error;
pub mod focus;
pub mod gate;
pub mod queue;
pub mod resources;
pub mod session;
pub mod track;

pub use config::{PlayerOptions, UpdateOptions, LANE_COUNT};
pub use error::{PlayerError, Rejection, Result};
pub use focus::FocusState;
pub use gate::{ConnectionGate, Dispatch, Submission};
pub use resources::HeldResources;
pub use session::{Command, FocusSignal, LaneCommand, PlayerHandle, Reply, SessionCoordinator};
pub use track::Track;
