//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `AudioFocusManager` that always grants focus (desktop mixers share the output)
//! - `ResourceLock` tracked in-process (no suspend policy to fight on desktop)
//! - `NowPlayingSink` that only logs
//!
//! The playback engine itself is never provided here: decoding and rendering
//! belong to the host.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{DesktopAudioFocus, ProcessLock, TracingNowPlaying};
//! use std::sync::Arc;
//!
//! let focus = Arc::new(DesktopAudioFocus::new());
//! let power = Arc::new(ProcessLock::power());
//! let network = Arc::new(ProcessLock::network());
//! let now_playing = Arc::new(TracingNowPlaying);
//! ```

mod focus;
mod locks;
mod now_playing;

pub use focus::DesktopAudioFocus;
pub use locks::ProcessLock;
pub use now_playing::TracingNowPlaying;
