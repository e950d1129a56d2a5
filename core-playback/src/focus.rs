//! # Audio Focus Arbiter
//!
//! One state machine for the whole player. Lanes never hold focus on their
//! own; the arbiter only sees the aggregate "is any lane playing" predicate
//! and the platform's focus signals.
//!
//! ```text
//!            request            granted
//!   None ─────────────► Requested ────────► Held ◄──────┐
//!    ▲  ▲                   │ denied/error   │  │        │ gain
//!    │  └───────────────────┘                │  │ can-duck
//!    │            loss / abandon             │  ▼        │
//!    └───────────────────────────────────────┴─ Ducked ──┘
//! ```
//!
//! Volume is never touched here. Ducking only informs the host.

use bridge_traits::{AudioFocusManager, FocusChange, FocusListener, FocusRequestResult};
use core_runtime::events::PlayerEvent;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Ownership of the shared audio output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusState {
    #[default]
    None,
    /// A request is in flight.
    Requested,
    Held,
    /// Held, but another application is temporarily mixed over us.
    Ducked,
}

impl FocusState {
    /// Whether we currently own the output, ducked or not.
    pub fn is_held(self) -> bool {
        matches!(self, FocusState::Held | FocusState::Ducked)
    }
}

/// What the coordinator has to do after a platform signal.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FocusReaction {
    /// Pause every lane that is not casting to a remote device.
    pub pause_local_lanes: bool,
    pub event: Option<PlayerEvent>,
}

impl FocusReaction {
    fn ignore() -> Self {
        Self::default()
    }

    fn notify(event: PlayerEvent) -> Self {
        Self {
            pause_local_lanes: false,
            event: Some(event),
        }
    }

    fn pause(event: PlayerEvent) -> Self {
        Self {
            pause_local_lanes: true,
            event: Some(event),
        }
    }
}

pub struct FocusArbiter {
    manager: Arc<dyn AudioFocusManager>,
    listener: Arc<dyn FocusListener>,
    state: FocusState,
}

impl FocusArbiter {
    /// `listener` receives the platform signals once focus is granted.
    pub fn new(manager: Arc<dyn AudioFocusManager>, listener: Arc<dyn FocusListener>) -> Self {
        Self {
            manager,
            listener,
            state: FocusState::None,
        }
    }

    pub fn state(&self) -> FocusState {
        self.state
    }

    /// Ask the platform for focus. Only acts from `None`; a denial is final
    /// until the next request.
    pub async fn request(&mut self) -> FocusState {
        if self.state != FocusState::None {
            return self.state;
        }

        debug!("Requesting audio focus");
        self.state = FocusState::Requested;
        self.state = match self.manager.request_focus(Arc::clone(&self.listener)).await {
            Ok(FocusRequestResult::Granted) => {
                info!("Audio focus granted");
                FocusState::Held
            }
            Ok(FocusRequestResult::Denied) => {
                info!("Audio focus denied");
                FocusState::None
            }
            Err(e) => {
                warn!(error = %e, "Audio focus request failed");
                FocusState::None
            }
        };
        self.state
    }

    /// Give focus back once no lane plays. A refused abandon keeps the
    /// current state.
    pub async fn abandon(&mut self, any_lane_playing: bool) {
        if any_lane_playing || self.state == FocusState::None {
            return;
        }

        debug!("Abandoning audio focus");
        match self.manager.abandon_focus().await {
            Ok(true) => self.state = FocusState::None,
            Ok(false) => warn!(state = ?self.state, "Platform refused to abandon audio focus"),
            Err(e) => warn!(error = %e, "Audio focus abandon failed"),
        }
    }

    /// Teardown: abandon regardless of lane state and forget focus even when
    /// the platform call fails.
    pub async fn release(&mut self) {
        if self.state == FocusState::None {
            return;
        }
        if let Err(e) = self.manager.abandon_focus().await {
            warn!(error = %e, "Audio focus abandon failed during teardown");
        }
        self.state = FocusState::None;
    }

    /// React to a platform focus change.
    pub async fn on_focus_change(&mut self, change: FocusChange) -> FocusReaction {
        debug!(?change, state = ?self.state, "Audio focus changed");

        match (change, self.state) {
            (FocusChange::Loss, FocusState::Held | FocusState::Ducked) => {
                self.state = FocusState::None;
                // The platform already moved focus elsewhere; this only
                // detaches our listener.
                if let Err(e) = self.manager.abandon_focus().await {
                    warn!(error = %e, "Detaching focus listener failed");
                }
                FocusReaction::pause(PlayerEvent::ButtonPause)
            }
            (FocusChange::LossTransient, FocusState::Held | FocusState::Ducked) => {
                FocusReaction::pause(PlayerEvent::ButtonDuck {
                    paused: true,
                    ducking: false,
                })
            }
            (FocusChange::LossTransientCanDuck, FocusState::Held) => {
                self.state = FocusState::Ducked;
                FocusReaction::notify(PlayerEvent::ButtonDuck {
                    paused: false,
                    ducking: true,
                })
            }
            (FocusChange::Gain, FocusState::Ducked) => {
                self.state = FocusState::Held;
                FocusReaction::notify(PlayerEvent::ButtonDuck {
                    paused: false,
                    ducking: false,
                })
            }
            _ => FocusReaction::ignore(),
        }
    }

    /// The output route became noisy (headphones unplugged). Only watched
    /// while focus is held.
    pub fn on_becoming_noisy(&self) -> FocusReaction {
        if self.state.is_held() {
            FocusReaction::notify(PlayerEvent::ButtonPause)
        } else {
            FocusReaction::ignore()
        }
    }
}
