//! Audio focus
//!
//! Ownership of the device's shared audio output, negotiated with the
//! platform and other applications.
//!
//! - **Android**: `AudioManager` focus requests plus the
//!   `ACTION_AUDIO_BECOMING_NOISY` broadcast
//! - **iOS**: `AVAudioSession` activation and interruption notifications
//! - **Desktop**: usually no arbitration at all (see `bridge-desktop`)

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Outcome of a focus request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FocusRequestResult {
    Granted,
    Denied,
}

/// Focus changes signaled by the platform after a successful request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FocusChange {
    /// Focus regained after a transient loss.
    Gain,
    /// Another application took the output for an unbounded time.
    Loss,
    /// Short interruption (e.g. a notification sound) that requires pausing.
    LossTransient,
    /// Short interruption during which playback may continue at lower volume.
    LossTransientCanDuck,
}

/// Callback half of a focus request.
pub trait FocusListener: Send + Sync {
    fn on_focus_change(&self, change: FocusChange);

    /// The active output route is about to become audible to others (headphones
    /// unplugged, Bluetooth sink dropped).
    fn on_becoming_noisy(&self);
}

/// Platform focus service.
#[async_trait::async_trait]
pub trait AudioFocusManager: Send + Sync {
    /// Request exclusive media focus. The listener stays registered until
    /// [`abandon_focus`](Self::abandon_focus) succeeds.
    async fn request_focus(&self, listener: Arc<dyn FocusListener>) -> Result<FocusRequestResult>;

    /// Give focus back. Returns `true` when the platform released it.
    async fn abandon_focus(&self) -> Result<bool>;
}
