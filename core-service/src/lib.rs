//! Player façade and service bootstrap.
//!
//! [`TrackPlayer`] is the command surface hosts call. Every command goes
//! through a [`ConnectionGate`]: the first one starts the player task through
//! a [`ServiceConnector`], later ones queue behind it, and all of them reach
//! the task in the order they were issued. Results come back through the
//! returned futures; notifications arrive on [`TrackPlayer::subscribe`].
//!
//! Desktop apps typically enable the `desktop-shims` feature and call
//! [`bootstrap_desktop`], which fills every capability except the playback
//! engine with the defaults from `bridge-desktop`.

pub mod error;

pub use error::{CoreError, Result};

use async_trait::async_trait;
use bridge_traits::{LaneId, PlaybackState};
use core_playback::session::{Command, LaneCommand, PlayerHandle, Reply, SessionCoordinator};
use core_playback::{ConnectionGate, FocusState, HeldResources, PlayerError, Submission};
use core_runtime::config::ServiceConfig;
use core_runtime::events::{EventBus, EventStream};
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

#[cfg(feature = "desktop-shims")]
use bridge_traits::EngineFactory;

type PlayerResult<T> = core_playback::Result<T>;

/// A live player task.
pub struct Connection {
    pub handle: PlayerHandle,
    /// Resolves once the task has stopped.
    pub closed: BoxFuture<'static, ()>,
}

/// Starts player tasks on demand.
#[async_trait]
pub trait ServiceConnector: Send + Sync {
    async fn connect(&self) -> Result<Connection>;
}

/// Runs the player task on the caller's tokio runtime.
pub struct LocalConnector {
    config: ServiceConfig,
    events: EventBus,
}

impl LocalConnector {
    pub fn new(config: ServiceConfig, events: EventBus) -> Self {
        Self { config, events }
    }
}

#[async_trait]
impl ServiceConnector for LocalConnector {
    async fn connect(&self) -> Result<Connection> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| CoreError::InitializationFailed(e.to_string()))?;

        let (coordinator, handle) = SessionCoordinator::new(&self.config, self.events.clone());
        let task = runtime.spawn(coordinator.run());
        info!(session = %handle.id(), "Player task spawned");

        Ok(Connection {
            handle,
            closed: Box::pin(async move {
                if let Err(e) = task.await {
                    warn!(error = %e, "Player task ended abnormally");
                }
            }),
        })
    }
}

struct Inner {
    gate: ConnectionGate<PlayerHandle, Command>,
    connector: Arc<dyn ServiceConnector>,
    events: EventBus,
}

/// Host-facing player.
///
/// Clones share one player task. Dropping the last clone stops it.
#[derive(Clone)]
pub struct TrackPlayer {
    inner: Arc<Inner>,
}

impl TrackPlayer {
    /// Player whose task runs in this process.
    pub fn new(config: ServiceConfig) -> Self {
        let events = EventBus::new(config.event_buffer_size);
        let connector = Arc::new(LocalConnector::new(config, events.clone()));
        Self::with_connector(connector, events)
    }

    /// Player backed by a custom connector. `events` must be the bus the
    /// connector's tasks publish into.
    pub fn with_connector(connector: Arc<dyn ServiceConnector>, events: EventBus) -> Self {
        Self {
            inner: Arc::new(Inner {
                gate: ConnectionGate::new(),
                connector,
                events,
            }),
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Create the lanes. Replaces lanes from an earlier setup.
    pub async fn setup_player(&self, options: Value) -> PlayerResult<()> {
        self.call(|reply| Command::Setup { options, reply }).await
    }

    pub async fn update_options(&self, options: Value) -> PlayerResult<()> {
        self.call(|reply| Command::UpdateOptions { options, reply })
            .await
    }

    /// Tear the player down. Without a running task there is nothing to do.
    pub async fn destroy(&self) {
        let gate = &self.inner.gate;
        if !gate.is_connected() && !gate.is_connecting() {
            debug!("Destroy without a player task");
            return;
        }
        if let Err(e) = self.query(|reply| Command::Destroy { reply }).await {
            debug!(error = %e, "Player task already gone");
        }
    }

    // ------------------------------------------------------------------
    // Queue
    // ------------------------------------------------------------------

    /// Insert `tracks` before `before`, or append them.
    pub async fn add(
        &self,
        lane: LaneId,
        tracks: Vec<Value>,
        before: Option<String>,
    ) -> PlayerResult<()> {
        self.lane_call(lane, |reply| LaneCommand::Add {
            tracks,
            before,
            reply,
        })
        .await
    }

    pub async fn remove(&self, lane: LaneId, ids: Vec<String>) -> PlayerResult<()> {
        self.lane_call(lane, |reply| LaneCommand::Remove { ids, reply })
            .await
    }

    pub async fn remove_upcoming_tracks(&self, lane: LaneId) -> PlayerResult<()> {
        self.lane_call(lane, |reply| LaneCommand::RemoveUpcoming { reply })
            .await
    }

    pub async fn skip(&self, lane: LaneId, id: impl Into<String>) -> PlayerResult<()> {
        let id = id.into();
        self.lane_call(lane, |reply| LaneCommand::Skip { id, reply })
            .await
    }

    pub async fn skip_to_next(&self, lane: LaneId) -> PlayerResult<()> {
        self.lane_call(lane, |reply| LaneCommand::SkipToNext { reply })
            .await
    }

    pub async fn skip_to_previous(&self, lane: LaneId) -> PlayerResult<()> {
        self.lane_call(lane, |reply| LaneCommand::SkipToPrevious { reply })
            .await
    }

    /// Stop the lane and clear its queue.
    pub async fn reset(&self, lane: LaneId) -> PlayerResult<()> {
        self.lane_call(lane, |reply| LaneCommand::Reset { reply })
            .await
    }

    // ------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------

    pub async fn play(&self, lane: LaneId) -> PlayerResult<()> {
        self.lane_call(lane, |reply| LaneCommand::Play { reply })
            .await
    }

    pub async fn pause(&self, lane: LaneId) -> PlayerResult<()> {
        self.lane_call(lane, |reply| LaneCommand::Pause { reply })
            .await
    }

    pub async fn stop(&self, lane: LaneId) -> PlayerResult<()> {
        self.lane_call(lane, |reply| LaneCommand::Stop { reply })
            .await
    }

    pub async fn seek_to(&self, lane: LaneId, seconds: f64) -> PlayerResult<()> {
        self.lane_call(lane, |reply| LaneCommand::SeekTo { seconds, reply })
            .await
    }

    pub async fn set_volume(&self, lane: LaneId, volume: f64) -> PlayerResult<()> {
        self.lane_call(lane, |reply| LaneCommand::SetVolume { volume, reply })
            .await
    }

    pub async fn get_volume(&self, lane: LaneId) -> PlayerResult<f64> {
        self.lane_call(lane, |reply| LaneCommand::GetVolume { reply })
            .await
    }

    pub async fn set_rate(&self, lane: LaneId, rate: f64) -> PlayerResult<()> {
        self.lane_call(lane, |reply| LaneCommand::SetRate { rate, reply })
            .await
    }

    pub async fn get_rate(&self, lane: LaneId) -> PlayerResult<f64> {
        self.lane_call(lane, |reply| LaneCommand::GetRate { reply })
            .await
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub async fn get_track(&self, lane: LaneId, id: impl Into<String>) -> PlayerResult<Option<Value>> {
        let id = id.into();
        self.lane_call(lane, |reply| LaneCommand::GetTrack { id, reply })
            .await
    }

    /// Queued items exactly as they were added.
    pub async fn get_queue(&self, lane: LaneId) -> PlayerResult<Vec<Value>> {
        self.lane_call(lane, |reply| LaneCommand::GetQueue { reply })
            .await
    }

    pub async fn get_current_track(&self, lane: LaneId) -> PlayerResult<Option<String>> {
        self.lane_call(lane, |reply| LaneCommand::GetCurrentTrack { reply })
            .await
    }

    /// Seconds; `0.0` while unknown.
    pub async fn get_duration(&self, lane: LaneId) -> PlayerResult<f64> {
        self.lane_call(lane, |reply| LaneCommand::GetDuration { reply })
            .await
    }

    /// Seconds; `0.0` while unknown.
    pub async fn get_buffered_position(&self, lane: LaneId) -> PlayerResult<f64> {
        self.lane_call(lane, |reply| LaneCommand::GetBufferedPosition { reply })
            .await
    }

    /// Seconds. Fails with [`PlayerError::UnknownPosition`] while unknown.
    pub async fn get_position(&self, lane: LaneId) -> PlayerResult<f64> {
        self.lane_call(lane, |reply| LaneCommand::GetPosition { reply })
            .await
    }

    pub async fn get_state(&self, lane: LaneId) -> PlayerResult<PlaybackState> {
        self.lane_call(lane, |reply| LaneCommand::GetState { reply })
            .await
    }

    pub async fn focus_state(&self) -> PlayerResult<FocusState> {
        self.query(|reply| Command::FocusState { reply }).await
    }

    pub async fn held_resources(&self) -> PlayerResult<HeldResources> {
        self.query(|reply| Command::HeldResources { reply }).await
    }

    // ------------------------------------------------------------------
    // Events and status
    // ------------------------------------------------------------------

    /// Stream of player notifications from now on.
    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.inner.events.subscribe())
    }

    pub fn is_connected(&self) -> bool {
        self.inner.gate.is_connected()
    }

    /// Named integer constants for hosts that use them.
    pub fn constants() -> BTreeMap<&'static str, i64> {
        core_playback::constants::compatibility_table()
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    async fn lane_call<T>(
        &self,
        lane: LaneId,
        op: impl FnOnce(Reply<T>) -> LaneCommand,
    ) -> PlayerResult<T> {
        self.call(|reply| Command::Lane {
            lane,
            op: op(reply),
        })
        .await
    }

    async fn call<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> PlayerResult<T> {
        self.query(command).await?
    }

    async fn query<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> PlayerResult<T> {
        let (reply, rx) = oneshot::channel();
        self.submit(command(reply));
        rx.await.map_err(|_| PlayerError::ServiceDisconnected)
    }

    fn submit(&self, command: Command) {
        if self.inner.gate.submit(command) == Submission::Connect {
            Inner::connect(&self.inner);
        }
    }
}

impl Inner {
    fn connect(inner: &Arc<Inner>) {
        let inner = Arc::clone(inner);
        tokio::spawn(async move {
            match inner.connector.connect().await {
                Ok(connection) => Inner::attach(&inner, connection),
                Err(e) => {
                    warn!(error = %e, "Could not start player task");
                    inner.gate.on_connect_failed();
                }
            }
        });
    }

    fn attach(inner: &Arc<Inner>, connection: Connection) {
        let Connection { handle, closed } = connection;
        let id = handle.id();

        let weak: Weak<Inner> = Arc::downgrade(inner);
        tokio::spawn(async move {
            closed.await;
            if let Some(inner) = weak.upgrade() {
                inner.on_closed(id);
            }
        });

        debug!(session = %id, "Player task connected");
        if inner.gate.on_connected(handle) {
            Inner::connect(inner);
        }
    }

    fn on_closed(&self, id: uuid::Uuid) {
        let current = self.gate.current_pool().map(|pool| pool.id());
        if current == Some(id) {
            info!(session = %id, "Player task disconnected");
            self.gate.on_disconnected();
        }
    }
}

/// Build a player whose focus, holds and now-playing surface come from
/// `bridge-desktop`.
///
/// ```no_run
/// # use std::sync::Arc;
/// # fn engines() -> Arc<dyn bridge_traits::EngineFactory> { unimplemented!() }
/// # async fn example() -> core_service::Result<()> {
/// let player = core_service::bootstrap_desktop(engines())?;
/// player.setup_player(serde_json::json!({ "maxCacheSize": 51200 })).await?;
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "desktop-shims")]
pub fn bootstrap_desktop(engine_factory: Arc<dyn EngineFactory>) -> Result<TrackPlayer> {
    let config = ServiceConfig::builder()
        .engine_factory(engine_factory)
        .build()?;
    Ok(TrackPlayer::new(config))
}
