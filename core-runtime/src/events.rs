//! # Player events
//!
//! Everything the host hears from the player goes through one
//! `tokio::sync::broadcast` channel. [`PlayerEvent`] has a variant per
//! notification, [`EventBus`] is the sending side owned by the player task,
//! and [`EventStream`] narrows a subscription to one lane or a predicate.
//!
//! ## Flow
//!
//! ```text
//! ┌──────────────┐  engine callbacks  ┌─────────────┐     emit      ┌──────────┐
//! │ Lane engines ├───────────────────>│ Player task ├──────────────>│ EventBus │
//! └──────────────┘                    │             │               │(broadcast│
//! ┌──────────────┐   focus signals    │             │               │ channel) │
//! │ Focus bridge ├───────────────────>│             │               └────┬─────┘
//! └──────────────┘                    └─────────────┘                    │ subscribe
//!                                                                  ┌─────▼─────┐
//!                                                                  │   Host    │
//!                                                                  └───────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{EventBus, PlayerEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(100);
//! let mut subscriber = bus.subscribe();
//!
//! bus.emit(PlayerEvent::ButtonPause).ok();
//!
//! let event = subscriber.recv().await.unwrap();
//! assert_eq!(event, PlayerEvent::ButtonPause);
//! # }
//! ```
//!
//! ## Wire format
//!
//! Events serialize with an internal `type` tag and camelCase fields, the
//! shape hosts have always received:
//!
//! ```json
//! {"type":"track-changed","laneId":0,"previousId":"a","positionSeconds":12.5,"nextId":"b"}
//! ```
//!
//! A slow subscriber gets `RecvError::Lagged(n)` and may keep receiving.
//! `RecvError::Closed` means the player was torn down.

use bridge_traits::playback::{LaneId, PlaybackState};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Events buffered per subscriber before it starts lagging.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Player Events
// ============================================================================

/// Notification emitted to the host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PlayerEvent {
    /// A lane's engine changed playback state.
    #[serde(rename_all = "camelCase")]
    PlaybackStateChanged {
        lane_id: LaneId,
        state: PlaybackState,
    },
    /// A lane moved from one track to another.
    #[serde(rename_all = "camelCase")]
    TrackChanged {
        lane_id: LaneId,
        previous_id: Option<String>,
        /// Position reached in the previous track.
        position_seconds: f64,
        next_id: Option<String>,
    },
    /// A lane played past its last track.
    #[serde(rename_all = "camelCase")]
    QueueEnded {
        lane_id: LaneId,
        previous_id: Option<String>,
        position_seconds: f64,
    },
    /// An engine reported a failure.
    #[serde(rename_all = "camelCase")]
    PlaybackError {
        lane_id: LaneId,
        code: String,
        message: String,
    },
    /// Audio focus was interrupted or restored. Volume changes are up to the
    /// host.
    ButtonDuck { paused: bool, ducking: bool },
    /// The host should pause: focus was lost for good or the output route
    /// became noisy.
    ButtonPause,
}

impl PlayerEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &'static str {
        match self {
            PlayerEvent::PlaybackStateChanged { .. } => "Playback state changed",
            PlayerEvent::TrackChanged { .. } => "Track changed",
            PlayerEvent::QueueEnded { .. } => "Queue ended",
            PlayerEvent::PlaybackError { .. } => "Playback error",
            PlayerEvent::ButtonDuck { .. } => "Audio focus interrupted",
            PlayerEvent::ButtonPause => "Pause requested",
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            PlayerEvent::PlaybackError { .. } => EventSeverity::Error,
            PlayerEvent::ButtonPause | PlayerEvent::ButtonDuck { .. } => EventSeverity::Warning,
            PlayerEvent::QueueEnded { .. } | PlayerEvent::TrackChanged { .. } => {
                EventSeverity::Info
            }
            PlayerEvent::PlaybackStateChanged { .. } => EventSeverity::Debug,
        }
    }

    /// Lane the event belongs to. Focus events concern every lane.
    pub fn lane(&self) -> Option<LaneId> {
        match self {
            PlayerEvent::PlaybackStateChanged { lane_id, .. }
            | PlayerEvent::TrackChanged { lane_id, .. }
            | PlayerEvent::QueueEnded { lane_id, .. }
            | PlayerEvent::PlaybackError { lane_id, .. } => Some(*lane_id),
            PlayerEvent::ButtonDuck { .. } | PlayerEvent::ButtonPause => None,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

/// Central event bus for publishing and subscribing to player events.
///
/// Clones share the same channel. Sending never blocks; subscribers that fall
/// more than `capacity` events behind receive `RecvError::Lagged`.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<PlayerEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error when nobody is listening.
    pub fn emit(&self, event: PlayerEvent) -> Result<usize, SendError<PlayerEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<PlayerEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

type EventFilter = Box<dyn Fn(&PlayerEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// ```rust
/// use core_runtime::events::{EventBus, EventStream};
///
/// let bus = EventBus::new(100);
/// let lane_one = EventStream::new(bus.subscribe()).for_lane(1);
/// ```
pub struct EventStream {
    receiver: Receiver<PlayerEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<PlayerEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only yield events matching `predicate`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&PlayerEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Only yield events of `lane` plus the lane-independent focus events.
    pub fn for_lane(self, lane: LaneId) -> Self {
        self.filter(move |event| event.lane().map_or(true, |l| l == lane))
    }

    fn accepts(&self, event: &PlayerEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<PlayerEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Next buffered event that passes the filter, or `None` when nothing
    /// matching is queued right now.
    pub fn try_recv(&mut self) -> Option<Result<PlayerEvent, RecvError>> {
        use broadcast::error::TryRecvError;

        loop {
            let event = match self.receiver.try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Lagged(n)) => return Some(Err(RecvError::Lagged(n))),
                Err(TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            };
            if self.accepts(&event) {
                return Some(Ok(event));
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_event(lane_id: LaneId, state: PlaybackState) -> PlayerEvent {
        PlayerEvent::PlaybackStateChanged { lane_id, state }
    }

    #[tokio::test]
    async fn test_event_bus_subscription() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
        let _sub1 = bus.subscribe();
        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus.emit(PlayerEvent::ButtonPause).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = state_event(0, PlaybackState::Playing);
        assert_eq!(bus.emit(event.clone()).unwrap(), 2);

        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe())
            .filter(|event| matches!(event, PlayerEvent::QueueEnded { .. }));

        bus.emit(state_event(0, PlaybackState::Stopped)).ok();
        let ended = PlayerEvent::QueueEnded {
            lane_id: 0,
            previous_id: Some("t3".to_string()),
            position_seconds: 181.0,
        };
        bus.emit(ended.clone()).ok();

        assert_eq!(stream.recv().await.unwrap(), ended);
    }

    #[tokio::test]
    async fn test_lane_stream_keeps_focus_events() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe()).for_lane(1);

        bus.emit(state_event(0, PlaybackState::Playing)).ok();
        bus.emit(state_event(1, PlaybackState::Paused)).ok();
        bus.emit(PlayerEvent::ButtonPause).ok();

        assert_eq!(
            stream.try_recv().unwrap().unwrap(),
            state_event(1, PlaybackState::Paused)
        );
        assert_eq!(stream.try_recv().unwrap().unwrap(), PlayerEvent::ButtonPause);
        assert!(stream.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for lane in 0..5 {
            bus.emit(state_event(lane, PlaybackState::Buffering)).ok();
        }

        assert!(matches!(sub.recv().await, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn test_event_severity_and_lane() {
        let error = PlayerEvent::PlaybackError {
            lane_id: 1,
            code: "playback-source".to_string(),
            message: "404".to_string(),
        };
        assert_eq!(error.severity(), EventSeverity::Error);
        assert_eq!(error.lane(), Some(1));

        let duck = PlayerEvent::ButtonDuck {
            paused: false,
            ducking: true,
        };
        assert_eq!(duck.severity(), EventSeverity::Warning);
        assert_eq!(duck.lane(), None);
        assert_eq!(duck.description(), "Audio focus interrupted");
    }

    #[test]
    fn test_event_wire_format() {
        let event = PlayerEvent::TrackChanged {
            lane_id: 0,
            previous_id: Some("a".to_string()),
            position_seconds: 12.5,
            next_id: None,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "track-changed");
        assert_eq!(json["laneId"], 0);
        assert_eq!(json["previousId"], "a");
        assert_eq!(json["positionSeconds"], 12.5);
        assert!(json["nextId"].is_null());

        let pause = serde_json::to_value(PlayerEvent::ButtonPause).unwrap();
        assert_eq!(pause["type"], "button-pause");

        let state = serde_json::to_value(state_event(1, PlaybackState::Playing)).unwrap();
        assert_eq!(state["type"], "playback-state-changed");
        assert_eq!(state["state"], "playing");
    }
}
