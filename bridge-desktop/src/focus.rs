//! Audio focus for desktop hosts.

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    focus::{AudioFocusManager, FocusChange, FocusListener, FocusRequestResult},
};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Desktop focus manager.
///
/// Desktop mixers let every application play at once, so requests are always
/// granted. The registered listener is kept so that host integrations (an OS
/// device-change hook, a "pause when headphones unplug" setting) can still
/// deliver signals through [`signal`](Self::signal) and
/// [`signal_noisy`](Self::signal_noisy).
#[derive(Default)]
pub struct DesktopAudioFocus {
    listener: Mutex<Option<Arc<dyn FocusListener>>>,
}

impl DesktopAudioFocus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a focus holder is currently registered.
    pub fn has_holder(&self) -> bool {
        self.listener.lock().is_some()
    }

    /// Deliver a focus change to the current holder. Returns `false` when
    /// nobody holds focus.
    pub fn signal(&self, change: FocusChange) -> bool {
        let listener = self.listener.lock().clone();
        match listener {
            Some(listener) => {
                listener.on_focus_change(change);
                true
            }
            None => false,
        }
    }

    /// Report that the output route became noisy. Returns `false` when
    /// nobody holds focus.
    pub fn signal_noisy(&self) -> bool {
        let listener = self.listener.lock().clone();
        match listener {
            Some(listener) => {
                listener.on_becoming_noisy();
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl AudioFocusManager for DesktopAudioFocus {
    async fn request_focus(&self, listener: Arc<dyn FocusListener>) -> Result<FocusRequestResult> {
        debug!("Granting desktop audio focus");
        *self.listener.lock() = Some(listener);
        Ok(FocusRequestResult::Granted)
    }

    async fn abandon_focus(&self) -> Result<bool> {
        debug!("Releasing desktop audio focus");
        Ok(self.listener.lock().take().is_some())
    }
}
