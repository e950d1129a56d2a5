//! End-to-end tests of the player façade: gate, player task and engines.

mod common;

use async_trait::async_trait;
use bridge_desktop::{DesktopAudioFocus, ProcessLock, TracingNowPlaying};
use bridge_traits::{FocusChange, PlaybackState};
use common::{Journal, LoopbackFactory};
use core_playback::{FocusState, HeldResources, PlayerError};
use core_runtime::config::ServiceConfig;
use core_runtime::events::{EventBus, EventStream, PlayerEvent};
use core_service::{Connection, CoreError, LocalConnector, ServiceConnector, TrackPlayer};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

// ============================================================================
// Fixtures
// ============================================================================

struct Fixture {
    journal: Arc<Journal>,
    focus: Arc<DesktopAudioFocus>,
    config: ServiceConfig,
}

impl Fixture {
    fn new() -> Self {
        let factory = LoopbackFactory::default();
        let journal = Arc::clone(&factory.journal);
        let focus = Arc::new(DesktopAudioFocus::new());
        let config = ServiceConfig::builder()
            .engine_factory(Arc::new(factory))
            .focus_manager(focus.clone())
            .power_lock(Arc::new(ProcessLock::power()))
            .network_lock(Arc::new(ProcessLock::network()))
            .now_playing(Arc::new(TracingNowPlaying))
            .build()
            .unwrap();
        Self {
            journal,
            focus,
            config,
        }
    }

    fn player(&self) -> TrackPlayer {
        TrackPlayer::new(self.config.clone())
    }
}

/// Connector that can hold attempts back and fail a number of them.
struct ScriptedConnector {
    local: LocalConnector,
    hold: Option<Arc<Notify>>,
    failures_left: Mutex<usize>,
    attempts: AtomicUsize,
    failed: AtomicUsize,
}

impl ScriptedConnector {
    fn new(config: ServiceConfig, events: EventBus) -> Self {
        Self {
            local: LocalConnector::new(config, events),
            hold: None,
            failures_left: Mutex::new(0),
            attempts: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        }
    }

    fn held_by(mut self, hold: Arc<Notify>) -> Self {
        self.hold = Some(hold);
        self
    }

    fn failing(self, count: usize) -> Self {
        *self.failures_left.lock() = count;
        self
    }

    fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ServiceConnector for ScriptedConnector {
    async fn connect(&self) -> core_service::Result<Connection> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(hold) = &self.hold {
            hold.notified().await;
        }

        let fail = {
            let mut left = self.failures_left.lock();
            let fail = *left > 0;
            if fail {
                *left -= 1;
            }
            fail
        };
        if fail {
            self.failed.fetch_add(1, Ordering::SeqCst);
            return Err(CoreError::InitializationFailed(
                "service unavailable".into(),
            ));
        }

        self.local.connect().await
    }
}

fn scripted(
    fixture: &Fixture,
    connector: impl FnOnce(ScriptedConnector) -> ScriptedConnector,
) -> (TrackPlayer, Arc<ScriptedConnector>) {
    let bus = EventBus::new(64);
    let connector = Arc::new(connector(ScriptedConnector::new(
        fixture.config.clone(),
        bus.clone(),
    )));
    let player = TrackPlayer::with_connector(connector.clone(), bus);
    (player, connector)
}

fn local(id: &str) -> Value {
    json!({ "id": id, "url": format!("/music/{}.flac", id) })
}

fn remote(id: &str) -> Value {
    json!({ "id": id, "url": { "uri": format!("https://cdn.example.com/{}.mp3", id) } })
}

async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached");
}

fn drain(stream: &mut EventStream) -> Vec<PlayerEvent> {
    let mut events = Vec::new();
    while let Some(Ok(event)) = stream.try_recv() {
        events.push(event);
    }
    events
}

async fn queue_ids(player: &TrackPlayer, lane: usize) -> Vec<String> {
    player
        .get_queue(lane)
        .await
        .unwrap()
        .iter()
        .map(|item| item["id"].as_str().unwrap().to_string())
        .collect()
}

// ============================================================================
// Connection gate
// ============================================================================

#[tokio::test]
async fn commands_issued_before_connecting_keep_their_order() {
    let fixture = Fixture::new();
    let hold = Arc::new(Notify::new());
    let (player, connector) = scripted(&fixture, |c| c.held_by(hold.clone()));

    let opener = async {
        tokio::task::yield_now().await;
        assert!(!player.is_connected());
        hold.notify_one();
    };

    let (setup, a, b, c, ()) = futures::join!(
        player.setup_player(Value::Null),
        player.add(0, vec![local("a")], None),
        player.add(0, vec![local("b")], None),
        player.add(0, vec![local("c")], Some("b".into())),
        opener,
    );
    setup.unwrap();
    a.unwrap();
    b.unwrap();
    c.unwrap();

    assert!(player.is_connected());
    assert_eq!(connector.attempts(), 1);
    assert_eq!(queue_ids(&player, 0).await, ["a", "c", "b"]);
    assert_eq!(
        fixture.journal.entries(),
        ["0:add@0[a]", "0:add@1[b]", "0:add@1[c]"]
    );
}

#[tokio::test]
async fn failed_connection_keeps_commands_for_the_next_attempt() {
    let fixture = Fixture::new();
    let (player, connector) = scripted(&fixture, |c| c.failing(1));

    let early = tokio::spawn({
        let player = player.clone();
        async move { player.play(0).await }
    });
    eventually(|| connector.failed.load(Ordering::SeqCst) == 1).await;
    assert!(!player.is_connected());

    player.setup_player(Value::Null).await.unwrap();
    assert_eq!(connector.attempts(), 2);

    // Drained first, so it ran before setup created the lanes.
    let err = early.await.unwrap().unwrap_err();
    assert_eq!(err, PlayerError::NotInitialized);
}

#[tokio::test]
async fn destroy_disconnects_and_the_next_command_reconnects() {
    let fixture = Fixture::new();
    let (player, connector) = scripted(&fixture, |c| c);

    player.setup_player(Value::Null).await.unwrap();
    player.destroy().await;
    eventually(|| !player.is_connected()).await;
    assert_eq!(fixture.journal.count("destroy"), 2);

    let err = player.play(0).await.unwrap_err();
    assert_eq!(err, PlayerError::NotInitialized);
    assert_eq!(connector.attempts(), 2);
}

#[tokio::test]
async fn destroy_without_a_task_does_not_connect() {
    let fixture = Fixture::new();
    let (player, connector) = scripted(&fixture, |c| c);

    player.destroy().await;
    assert_eq!(connector.attempts(), 0);
    assert!(!player.is_connected());
}

// ============================================================================
// Commands
// ============================================================================

#[tokio::test]
async fn validation_errors_carry_stable_codes() {
    let fixture = Fixture::new();
    let player = fixture.player();
    player.setup_player(Value::Null).await.unwrap();
    player.add(0, vec![local("a")], None).await.unwrap();

    let empty = player.add(0, vec![], Some("a".into())).await.unwrap_err();
    assert_eq!(empty.rejection().code, "invalid_track_object");

    let anchor = player
        .add(0, vec![local("b")], Some("missing-id".into()))
        .await
        .unwrap_err();
    assert_eq!(anchor.rejection().code, "track_not_in_queue");
    assert_eq!(queue_ids(&player, 0).await, ["a"]);

    let lane = player.play(5).await.unwrap_err();
    assert_eq!(lane.rejection().code, "invalid_player_id");
}

#[tokio::test]
async fn removing_an_absent_track_is_a_no_op() {
    let fixture = Fixture::new();
    let player = fixture.player();
    player.setup_player(Value::Null).await.unwrap();
    player.add(1, vec![local("a")], None).await.unwrap();

    player.remove(1, vec!["nope".into()]).await.unwrap();
    assert_eq!(fixture.journal.count("remove"), 0);

    player.remove(1, vec!["a".into()]).await.unwrap();
    assert_eq!(fixture.journal.count("1:remove[0]"), 1);
    assert!(queue_ids(&player, 1).await.is_empty());
}

#[tokio::test]
async fn remove_upcoming_then_next_is_end_of_queue() {
    let fixture = Fixture::new();
    let player = fixture.player();
    player.setup_player(Value::Null).await.unwrap();
    player
        .add(0, vec![local("a"), local("b"), local("c")], None)
        .await
        .unwrap();
    player.play(0).await.unwrap();
    assert_eq!(player.get_current_track(0).await.unwrap().as_deref(), Some("a"));

    player.remove_upcoming_tracks(0).await.unwrap();
    assert_eq!(queue_ids(&player, 0).await, ["a"]);
    assert_eq!(
        player.skip_to_next(0).await.unwrap_err(),
        PlayerError::EndOfQueue
    );
}

#[tokio::test]
async fn duration_defaults_to_zero_but_position_is_an_error() {
    let fixture = Fixture::new();
    let player = fixture.player();
    player.setup_player(Value::Null).await.unwrap();

    assert_eq!(player.get_duration(0).await.unwrap(), 200.0);
    assert_eq!(player.get_buffered_position(0).await.unwrap(), 0.0);
    let err = player.get_position(0).await.unwrap_err();
    assert_eq!(err.code(), "unknown");
}

// ============================================================================
// Shared focus and holds
// ============================================================================

#[tokio::test]
async fn remote_lane_adds_network_hold_without_dropping_power() {
    let fixture = Fixture::new();
    let player = fixture.player();
    player.setup_player(Value::Null).await.unwrap();
    player.add(0, vec![local("l")], None).await.unwrap();
    player.add(1, vec![remote("r")], None).await.unwrap();

    player.play(0).await.unwrap();
    assert_eq!(
        player.held_resources().await.unwrap(),
        HeldResources {
            power: true,
            network: false
        }
    );

    player.play(1).await.unwrap();
    assert_eq!(
        player.held_resources().await.unwrap(),
        HeldResources {
            power: true,
            network: true
        }
    );
    assert_eq!(player.focus_state().await.unwrap(), FocusState::Held);

    player.stop(1).await.unwrap();
    assert!(player.held_resources().await.unwrap().power);
}

#[tokio::test]
async fn hard_focus_loss_pauses_every_lane_once() {
    let fixture = Fixture::new();
    let player = fixture.player();
    let mut events = player.subscribe();

    player.setup_player(Value::Null).await.unwrap();
    player.add(0, vec![local("a")], None).await.unwrap();
    player.add(1, vec![local("b")], None).await.unwrap();
    player.play(0).await.unwrap();
    player.play(1).await.unwrap();
    assert_eq!(player.focus_state().await.unwrap(), FocusState::Held);
    drain(&mut events);

    assert!(fixture.focus.signal(FocusChange::Loss));
    assert_eq!(player.focus_state().await.unwrap(), FocusState::None);
    assert_eq!(player.get_state(0).await.unwrap(), PlaybackState::Paused);
    assert_eq!(player.get_state(1).await.unwrap(), PlaybackState::Paused);

    let seen = drain(&mut events);
    let pauses = seen
        .iter()
        .filter(|e| **e == PlayerEvent::ButtonPause)
        .count();
    assert_eq!(pauses, 1);
    assert_eq!(
        player.held_resources().await.unwrap(),
        HeldResources::default()
    );
}

// ============================================================================
// Events and constants
// ============================================================================

#[tokio::test]
async fn events_use_the_host_wire_shape() {
    let fixture = Fixture::new();
    let player = fixture.player();
    let mut lane_zero = player.subscribe().for_lane(0);

    player.setup_player(Value::Null).await.unwrap();
    player.add(0, vec![local("a")], None).await.unwrap();
    player.add(1, vec![local("b")], None).await.unwrap();
    player.play(1).await.unwrap();
    player.play(0).await.unwrap();

    let event = lane_zero.recv().await.unwrap();
    assert_eq!(
        serde_json::to_value(&event).unwrap(),
        json!({ "type": "playback-state-changed", "laneId": 0, "state": "playing" })
    );
}

#[test]
fn compatibility_constants_are_published() {
    let constants = TrackPlayer::constants();
    assert_eq!(constants["STATE_PLAYING"], 3);
    assert_eq!(constants["CAPABILITY_SKIP_TO_NEXT"], 32);
    assert_eq!(constants["RATING_HEART"], 1);
}

#[tokio::test]
async fn update_options_rejects_unknown_capabilities() {
    let fixture = Fixture::new();
    let player = fixture.player();
    player.setup_player(Value::Null).await.unwrap();

    player
        .update_options(json!({ "capabilities": [4, 2, 32], "ratingType": 2 }))
        .await
        .unwrap();
    let err = player
        .update_options(json!({ "capabilities": [3] }))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "invalid_options");
}

#[cfg(feature = "desktop-shims")]
#[tokio::test]
async fn desktop_bootstrap_fills_platform_capabilities() {
    let factory = LoopbackFactory::default();
    let journal = Arc::clone(&factory.journal);
    let player = core_service::bootstrap_desktop(Arc::new(factory)).unwrap();

    player.setup_player(json!({ "maxCacheSize": 1024 })).await.unwrap();
    player.add(0, vec![local("a")], None).await.unwrap();
    player.play(0).await.unwrap();

    assert!(player.held_resources().await.unwrap().power);
    assert_eq!(journal.count("0:play"), 1);
    player.destroy().await;
}
