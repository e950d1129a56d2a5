//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (`core-service`, `core-playback`). Host applications can
//! depend on `trackplayer-workspace` and enable `desktop-shims` for the full
//! façade with desktop bridge defaults, or `coordinator-only` to embed the
//! session coordinator behind their own command transport.

#[cfg(feature = "desktop-shims")]
pub use core_service::TrackPlayer;

#[cfg(feature = "coordinator-only")]
pub use core_playback::session::{PlayerHandle, SessionCoordinator};
