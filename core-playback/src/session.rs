//! # Session Coordinator
//!
//! The player task. Every mutation of lanes, focus state and resource holds
//! happens inside [`SessionCoordinator::run`], one input at a time, so none of
//! that state needs a lock.
//!
//! ## Inputs
//!
//! ```text
//!   TrackPlayer ──► ConnectionGate ──► PlayerHandle ──┐
//!                                                     │ Command
//!   lane engines ──► SignalForwarder ──┐              ▼
//!                                      ├──► Signal ──► run() ──► EventBus
//!   focus manager ─► SignalForwarder ──┘
//! ```
//!
//! Host commands carry a `oneshot` reply. Engine callbacks and focus signals
//! arrive on a second channel that the loop always services first, so a
//! command never observes lane state older than the callbacks its
//! predecessors triggered.
//!
//! ## Lifecycle
//!
//! The loop ends on [`Command::Destroy`] or when every [`PlayerHandle`] is
//! dropped. Both paths run the same best-effort teardown.

use crate::config::{PlayerOptions, UpdateOptions};
use crate::error::{PlayerError, Result};
use crate::focus::{FocusArbiter, FocusReaction, FocusState};
use crate::gate::Dispatch;
use crate::queue::Queue;
use crate::resources::{HeldResources, ResourceHolds};
use crate::track::Track;
use bridge_traits::{
    EngineEvent, EngineFactory, EngineListener, FocusChange, FocusListener, LaneId,
    NowPlayingSink, PlaybackEngine, PlaybackState,
};
use core_runtime::config::ServiceConfig;
use core_runtime::events::{EventBus, PlayerEvent};
use core_runtime::logging::strip_query;
use serde_json::Value;
use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

/// Reply channel of a command.
pub type Reply<T> = oneshot::Sender<Result<T>>;

/// Commands accepted by the player task.
pub enum Command {
    Setup {
        options: Value,
        reply: Reply<()>,
    },
    UpdateOptions {
        options: Value,
        reply: Reply<()>,
    },
    /// Operation on one lane. The lane id is checked before the operation
    /// runs.
    Lane { lane: LaneId, op: LaneCommand },
    FocusState {
        reply: oneshot::Sender<FocusState>,
    },
    HeldResources {
        reply: oneshot::Sender<HeldResources>,
    },
    /// Tear everything down and stop the task.
    Destroy { reply: oneshot::Sender<()> },
}

/// Lane-scoped operations.
pub enum LaneCommand {
    Add {
        tracks: Vec<Value>,
        before: Option<String>,
        reply: Reply<()>,
    },
    Remove {
        ids: Vec<String>,
        reply: Reply<()>,
    },
    RemoveUpcoming { reply: Reply<()> },
    Skip { id: String, reply: Reply<()> },
    SkipToNext { reply: Reply<()> },
    SkipToPrevious { reply: Reply<()> },
    Reset { reply: Reply<()> },
    Play { reply: Reply<()> },
    Pause { reply: Reply<()> },
    Stop { reply: Reply<()> },
    SeekTo { seconds: f64, reply: Reply<()> },
    SetVolume { volume: f64, reply: Reply<()> },
    GetVolume { reply: Reply<f64> },
    SetRate { rate: f64, reply: Reply<()> },
    GetRate { reply: Reply<f64> },
    GetTrack {
        id: String,
        reply: Reply<Option<Value>>,
    },
    GetQueue { reply: Reply<Vec<Value>> },
    GetCurrentTrack { reply: Reply<Option<String>> },
    GetDuration { reply: Reply<f64> },
    GetBufferedPosition { reply: Reply<f64> },
    GetPosition { reply: Reply<f64> },
    GetState { reply: Reply<PlaybackState> },
}

impl LaneCommand {
    fn name(&self) -> &'static str {
        match self {
            LaneCommand::Add { .. } => "add",
            LaneCommand::Remove { .. } => "remove",
            LaneCommand::RemoveUpcoming { .. } => "remove_upcoming",
            LaneCommand::Skip { .. } => "skip",
            LaneCommand::SkipToNext { .. } => "skip_to_next",
            LaneCommand::SkipToPrevious { .. } => "skip_to_previous",
            LaneCommand::Reset { .. } => "reset",
            LaneCommand::Play { .. } => "play",
            LaneCommand::Pause { .. } => "pause",
            LaneCommand::Stop { .. } => "stop",
            LaneCommand::SeekTo { .. } => "seek_to",
            LaneCommand::SetVolume { .. } => "set_volume",
            LaneCommand::GetVolume { .. } => "get_volume",
            LaneCommand::SetRate { .. } => "set_rate",
            LaneCommand::GetRate { .. } => "get_rate",
            LaneCommand::GetTrack { .. } => "get_track",
            LaneCommand::GetQueue { .. } => "get_queue",
            LaneCommand::GetCurrentTrack { .. } => "get_current_track",
            LaneCommand::GetDuration { .. } => "get_duration",
            LaneCommand::GetBufferedPosition { .. } => "get_buffered_position",
            LaneCommand::GetPosition { .. } => "get_position",
            LaneCommand::GetState { .. } => "get_state",
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Setup { .. } => f.write_str("Setup"),
            Command::UpdateOptions { .. } => f.write_str("UpdateOptions"),
            Command::Lane { lane, op } => write!(f, "Lane({}, {})", lane, op.name()),
            Command::FocusState { .. } => f.write_str("FocusState"),
            Command::HeldResources { .. } => f.write_str("HeldResources"),
            Command::Destroy { .. } => f.write_str("Destroy"),
        }
    }
}

/// Platform focus notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusSignal {
    Change(FocusChange),
    BecomingNoisy,
}

/// Callbacks routed back into the player task.
#[derive(Debug)]
enum Signal {
    Engine {
        generation: u64,
        lane: LaneId,
        event: EngineEvent,
    },
    Focus(FocusSignal),
}

/// Forwards engine and focus callbacks into the loop without blocking the
/// caller.
struct SignalForwarder {
    tx: mpsc::UnboundedSender<Signal>,
}

impl SignalForwarder {
    fn forward(&self, signal: Signal) {
        forward(&self.tx, signal);
    }

    /// Listener for the engines created by one setup. Callbacks carry the
    /// setup's generation so the loop can drop those of replaced engines.
    fn engine_listener(&self, generation: u64) -> Arc<dyn EngineListener> {
        Arc::new(LaneListener {
            generation,
            tx: self.tx.clone(),
        })
    }
}

fn forward(tx: &mpsc::UnboundedSender<Signal>, signal: Signal) {
    if tx.send(signal).is_err() {
        trace!("Player task gone, dropping callback");
    }
}

struct LaneListener {
    generation: u64,
    tx: mpsc::UnboundedSender<Signal>,
}

impl EngineListener for LaneListener {
    fn on_event(&self, lane: LaneId, event: EngineEvent) {
        forward(
            &self.tx,
            Signal::Engine {
                generation: self.generation,
                lane,
                event,
            },
        );
    }
}

impl FocusListener for SignalForwarder {
    fn on_focus_change(&self, change: FocusChange) {
        self.forward(Signal::Focus(FocusSignal::Change(change)));
    }

    fn on_becoming_noisy(&self) {
        self.forward(Signal::Focus(FocusSignal::BecomingNoisy));
    }
}

/// Cloneable handle to a running player task.
///
/// Each task gets its own id, so two handles compare equal only when they
/// reach the same task.
#[derive(Clone)]
pub struct PlayerHandle {
    id: Uuid,
    tx: mpsc::UnboundedSender<Command>,
}

impl PlayerHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Whether the task has stopped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Completes once the task has stopped.
    pub async fn closed(&self) {
        self.tx.closed().await
    }

    /// Send a command and wait for its reply.
    pub async fn request<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(command(reply))
            .map_err(|_| PlayerError::ServiceDisconnected)?;
        rx.await.map_err(|_| PlayerError::ServiceDisconnected)?
    }

    /// Send a lane operation and wait for its reply.
    pub async fn lane_request<T>(
        &self,
        lane: LaneId,
        op: impl FnOnce(Reply<T>) -> LaneCommand,
    ) -> Result<T> {
        self.request(|reply| Command::Lane {
            lane,
            op: op(reply),
        })
        .await
    }
}

impl Dispatch<Command> for PlayerHandle {
    fn dispatch(&self, command: Command) -> std::result::Result<(), Command> {
        self.tx.send(command).map_err(|e| e.0)
    }
}

impl PartialEq for PlayerHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for PlayerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayerHandle")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

struct Lane {
    engine: Box<dyn PlaybackEngine>,
    queue: Queue,
    /// Last state the engine reported.
    state: PlaybackState,
}

/// Owner of every lane and of the shared focus and resource state.
pub struct SessionCoordinator {
    id: Uuid,
    factory: Arc<dyn EngineFactory>,
    now_playing: Arc<dyn NowPlayingSink>,
    events: EventBus,
    lanes: Vec<Lane>,
    /// Bumped by every setup; engine callbacks from older setups are stale.
    generation: u64,
    arbiter: FocusArbiter,
    holds: ResourceHolds,
    forwarder: Arc<SignalForwarder>,
    commands: mpsc::UnboundedReceiver<Command>,
    signals: mpsc::UnboundedReceiver<Signal>,
}

impl SessionCoordinator {
    /// Build a coordinator and the handle that feeds it. Nothing runs until
    /// [`run`](Self::run) is polled.
    pub fn new(config: &ServiceConfig, events: EventBus) -> (Self, PlayerHandle) {
        let id = Uuid::new_v4();
        let (command_tx, commands) = mpsc::unbounded_channel();
        let (signal_tx, signals) = mpsc::unbounded_channel();
        let forwarder = Arc::new(SignalForwarder { tx: signal_tx });

        let coordinator = Self {
            id,
            factory: Arc::clone(&config.engine_factory),
            now_playing: Arc::clone(&config.now_playing),
            events,
            lanes: Vec::new(),
            generation: 0,
            arbiter: FocusArbiter::new(
                Arc::clone(&config.focus_manager),
                Arc::clone(&forwarder) as Arc<dyn FocusListener>,
            ),
            holds: ResourceHolds::new(
                Arc::clone(&config.power_lock),
                Arc::clone(&config.network_lock),
            ),
            forwarder,
            commands,
            signals,
        };
        let handle = PlayerHandle { id, tx: command_tx };
        (coordinator, handle)
    }

    /// Spawn the player task on the current tokio runtime.
    pub fn spawn(config: &ServiceConfig, events: EventBus) -> PlayerHandle {
        let (coordinator, handle) = Self::new(config, events);
        tokio::spawn(coordinator.run());
        handle
    }

    pub async fn run(mut self) {
        info!(session = %self.id, "Player task started");

        loop {
            tokio::select! {
                biased;

                Some(signal) = self.signals.recv() => self.handle_signal(signal).await,

                command = self.commands.recv() => match command {
                    Some(command) => {
                        if let ControlFlow::Break(reply) = self.handle_command(command).await {
                            self.teardown().await;
                            let _ = reply.send(());
                            break;
                        }
                    }
                    None => {
                        debug!(session = %self.id, "All handles dropped");
                        self.teardown().await;
                        break;
                    }
                },
            }
        }

        info!(session = %self.id, "Player task stopped");
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Breaks with the reply of a destroy request; the loop tears down.
    async fn handle_command(&mut self, command: Command) -> ControlFlow<oneshot::Sender<()>> {
        debug!(?command, "Handling command");
        match command {
            Command::Setup { options, reply } => {
                let result = self.setup(options).await;
                respond(reply, result);
            }
            Command::UpdateOptions { options, reply } => {
                respond(reply, self.update_options(options));
            }
            Command::Lane { lane, op } => self.handle_lane(lane, op).await,
            Command::FocusState { reply } => {
                let _ = reply.send(self.arbiter.state());
            }
            Command::HeldResources { reply } => {
                let _ = reply.send(self.holds.held());
            }
            Command::Destroy { reply } => return ControlFlow::Break(reply),
        }
        ControlFlow::Continue(())
    }

    async fn handle_lane(&mut self, lane: LaneId, op: LaneCommand) {
        match op {
            LaneCommand::Add {
                tracks,
                before,
                reply,
            } => {
                let result = self.add(lane, tracks, before).await;
                respond(reply, result);
            }
            LaneCommand::Remove { ids, reply } => {
                let result = self.remove(lane, ids).await;
                respond(reply, result);
            }
            LaneCommand::RemoveUpcoming { reply } => {
                let result = self.remove_upcoming(lane).await;
                respond(reply, result);
            }
            LaneCommand::Skip { id, reply } => {
                let result = self.skip(lane, id).await;
                respond(reply, result);
            }
            LaneCommand::SkipToNext { reply } => {
                let result = self.skip_to_next(lane).await;
                respond(reply, result);
            }
            LaneCommand::SkipToPrevious { reply } => {
                let result = self.skip_to_previous(lane).await;
                respond(reply, result);
            }
            LaneCommand::Reset { reply } => {
                let result = self.reset(lane).await;
                respond(reply, result);
            }
            LaneCommand::Play { reply } => {
                let result = self.play(lane).await;
                respond(reply, result);
            }
            LaneCommand::Pause { reply } => {
                let result = match self.lane(lane) {
                    Ok(l) => l.engine.pause().await.map_err(PlayerError::from),
                    Err(e) => Err(e),
                };
                respond(reply, self.engine_result(lane, result));
            }
            LaneCommand::Stop { reply } => {
                let result = match self.lane(lane) {
                    Ok(l) => l.engine.stop().await.map_err(PlayerError::from),
                    Err(e) => Err(e),
                };
                respond(reply, self.engine_result(lane, result));
            }
            LaneCommand::SeekTo { seconds, reply } => {
                let result = self.seek_to(lane, seconds).await;
                respond(reply, result);
            }
            LaneCommand::SetVolume { volume, reply } => {
                let result = self.set_volume(lane, volume).await;
                respond(reply, result);
            }
            LaneCommand::GetVolume { reply } => {
                let result = match self.lane(lane) {
                    Ok(l) => l.engine.volume().await.map_err(PlayerError::from),
                    Err(e) => Err(e),
                };
                respond(reply, self.engine_result(lane, result).map(f64::from));
            }
            LaneCommand::SetRate { rate, reply } => {
                let result = self.set_rate(lane, rate).await;
                respond(reply, result);
            }
            LaneCommand::GetRate { reply } => {
                let result = match self.lane(lane) {
                    Ok(l) => l.engine.rate().await.map_err(PlayerError::from),
                    Err(e) => Err(e),
                };
                respond(reply, self.engine_result(lane, result).map(f64::from));
            }
            LaneCommand::GetTrack { id, reply } => {
                let result = self
                    .lane(lane)
                    .map(|l| l.queue.get(&id).map(Track::to_value));
                respond(reply, result);
            }
            LaneCommand::GetQueue { reply } => {
                let result = self
                    .lane(lane)
                    .map(|l| l.queue.tracks().iter().map(Track::to_value).collect());
                respond(reply, result);
            }
            LaneCommand::GetCurrentTrack { reply } => {
                let result = self
                    .lane(lane)
                    .map(|l| l.queue.current().map(|t| t.id.clone()));
                respond(reply, result);
            }
            LaneCommand::GetDuration { reply } => {
                let result = match self.lane(lane) {
                    Ok(l) => l.engine.duration().await.map_err(PlayerError::from),
                    Err(e) => Err(e),
                };
                respond(reply, self.engine_result(lane, result).map(seconds_or_zero));
            }
            LaneCommand::GetBufferedPosition { reply } => {
                let result = match self.lane(lane) {
                    Ok(l) => l.engine.buffered_position().await.map_err(PlayerError::from),
                    Err(e) => Err(e),
                };
                respond(reply, self.engine_result(lane, result).map(seconds_or_zero));
            }
            LaneCommand::GetPosition { reply } => {
                let result = match self.lane(lane) {
                    Ok(l) => l.engine.position().await.map_err(PlayerError::from),
                    Err(e) => Err(e),
                };
                let result = self.engine_result(lane, result).and_then(|position| {
                    position
                        .map(|p| p.as_secs_f64())
                        .ok_or(PlayerError::UnknownPosition)
                });
                respond(reply, result);
            }
            LaneCommand::GetState { reply } => {
                let result = match self.lane(lane) {
                    Ok(l) => l.engine.state().await.map_err(PlayerError::from),
                    Err(e) => Err(e),
                };
                respond(reply, self.engine_result(lane, result));
            }
        }
    }

    async fn setup(&mut self, options: Value) -> Result<()> {
        let options = PlayerOptions::from_value(options)?;
        let config = options.engine_config()?;

        if !self.lanes.is_empty() {
            info!("Replacing existing lanes");
            self.destroy_lanes().await;
            self.holds.release_all();
            self.arbiter.abandon(false).await;
        }

        self.generation += 1;
        let listener = self.forwarder.engine_listener(self.generation);
        let mut lanes = Vec::with_capacity(options.lane_count());
        for lane in 0..options.lane_count() {
            match self
                .factory
                .create_engine(lane, &config, Arc::clone(&listener))
            {
                Ok(engine) => lanes.push(Lane {
                    engine,
                    queue: Queue::new(),
                    state: PlaybackState::None,
                }),
                Err(e) => {
                    error!(lane, error = %e, "Engine creation failed");
                    for created in lanes {
                        if let Err(e) = created.engine.destroy().await {
                            warn!(error = %e, "Failed to destroy partially set up engine");
                        }
                    }
                    return Err(e.into());
                }
            }
        }

        self.lanes = lanes;
        info!(
            lanes = self.lanes.len(),
            min_buffer = ?config.min_buffer,
            max_buffer = ?config.max_buffer,
            cache_bytes = config.cache_max_bytes,
            "Player set up"
        );
        Ok(())
    }

    fn update_options(&self, options: Value) -> Result<()> {
        let options = UpdateOptions::from_value(options)?.media_session_options()?;
        debug!(
            capabilities = options.capabilities.len(),
            rating = ?options.rating_type,
            stop_with_app = options.stop_with_app,
            "Updating media session options"
        );
        self.now_playing.update_options(&options);
        Ok(())
    }

    async fn add(&mut self, lane: LaneId, tracks: Vec<Value>, before: Option<String>) -> Result<()> {
        self.lane(lane)?;
        let batch = Track::from_values(tracks)?;

        let slot = self.lane(lane)?;
        let index = slot.queue.insertion_index(before.as_deref())?;
        slot.queue.check_unique(&batch)?;

        for track in &batch {
            trace!(lane, id = %track.id, url = %strip_query(track.url()), "Queueing track");
        }
        let items = batch.iter().map(Track::to_media_item).collect();
        let result = slot.engine.add(items, index).await.map_err(PlayerError::from);
        self.engine_result(lane, result)?;

        let count = batch.len();
        self.lane_mut(lane)?.queue.insert(index, batch);
        debug!(lane, index, count, "Tracks added");
        Ok(())
    }

    async fn remove(&mut self, lane: LaneId, ids: Vec<String>) -> Result<()> {
        let slot = self.lane(lane)?;
        let indexes = slot.queue.resolve(&ids);
        if indexes.is_empty() {
            debug!(lane, requested = ids.len(), "No queued track matched, nothing to remove");
            return Ok(());
        }

        let result = slot
            .engine
            .remove(indexes.iter().copied().collect())
            .await
            .map_err(PlayerError::from);
        self.engine_result(lane, result)?;

        self.lane_mut(lane)?.queue.remove_indexes(&indexes);
        debug!(lane, removed = indexes.len(), "Tracks removed");
        Ok(())
    }

    async fn remove_upcoming(&mut self, lane: LaneId) -> Result<()> {
        let slot = self.lane(lane)?;
        if let Err(e) = slot.engine.remove_upcoming().await {
            warn!(lane, error = %e, "Engine failed to remove upcoming tracks");
        }
        self.lane_mut(lane)?.queue.truncate_upcoming();
        Ok(())
    }

    async fn skip(&mut self, lane: LaneId, id: String) -> Result<()> {
        let slot = self.lane(lane)?;
        let index = slot
            .queue
            .index_of(&id)
            .ok_or_else(|| PlayerError::TrackNotFound(id.clone()))?;

        let result = slot.engine.skip(index).await.map_err(PlayerError::from);
        self.engine_result(lane, result)?;
        self.lane_mut(lane)?.queue.set_current_index(index);
        Ok(())
    }

    async fn skip_to_next(&mut self, lane: LaneId) -> Result<()> {
        let slot = self.lane(lane)?;
        if !slot.queue.has_next() {
            return Err(PlayerError::EndOfQueue);
        }
        let next = slot.queue.current_index().map_or(0, |current| current + 1);

        let result = slot.engine.skip_to_next().await.map_err(PlayerError::from);
        self.engine_result(lane, result)?;
        self.lane_mut(lane)?.queue.set_current_index(next);
        Ok(())
    }

    async fn skip_to_previous(&mut self, lane: LaneId) -> Result<()> {
        let slot = self.lane(lane)?;
        let previous = match slot.queue.current_index() {
            Some(current) if current > 0 => current - 1,
            _ => return Err(PlayerError::NoPreviousTrack),
        };

        let result = slot
            .engine
            .skip_to_previous()
            .await
            .map_err(PlayerError::from);
        self.engine_result(lane, result)?;
        self.lane_mut(lane)?.queue.set_current_index(previous);
        Ok(())
    }

    async fn play(&mut self, lane: LaneId) -> Result<()> {
        let slot = self.lane(lane)?;
        let start_at_head = slot.queue.current_index().is_none() && !slot.queue.is_empty();

        let result = slot.engine.play().await.map_err(PlayerError::from);
        self.engine_result(lane, result)?;
        if start_at_head {
            self.lane_mut(lane)?.queue.set_current_index(0);
        }
        Ok(())
    }

    async fn reset(&mut self, lane: LaneId) -> Result<()> {
        let result = self
            .lane(lane)?
            .engine
            .reset()
            .await
            .map_err(PlayerError::from);
        self.engine_result(lane, result)?;

        let slot = self.lane_mut(lane)?;
        slot.queue.clear();
        slot.state = PlaybackState::None;
        self.now_playing.remove_notifications();

        if !self.any_lane_playing() {
            self.holds.release_all();
            self.arbiter.abandon(false).await;
        }
        debug!(lane, "Lane reset");
        Ok(())
    }

    async fn seek_to(&mut self, lane: LaneId, seconds: f64) -> Result<()> {
        let slot = self.lane(lane)?;
        let position = Duration::try_from_secs_f64(seconds).map_err(|_| {
            PlayerError::InvalidArgument(format!("cannot seek to {} seconds", seconds))
        })?;

        let result = slot.engine.seek_to(position).await.map_err(PlayerError::from);
        self.engine_result(lane, result)
    }

    async fn set_volume(&mut self, lane: LaneId, volume: f64) -> Result<()> {
        let slot = self.lane(lane)?;
        if !volume.is_finite() || !(0.0..=1.0).contains(&volume) {
            return Err(PlayerError::InvalidArgument(format!(
                "volume {} is outside 0..=1",
                volume
            )));
        }

        let result = slot
            .engine
            .set_volume(volume as f32)
            .await
            .map_err(PlayerError::from);
        self.engine_result(lane, result)
    }

    async fn set_rate(&mut self, lane: LaneId, rate: f64) -> Result<()> {
        let slot = self.lane(lane)?;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(PlayerError::InvalidArgument(format!(
                "rate {} must be positive",
                rate
            )));
        }

        let result = slot
            .engine
            .set_rate(rate as f32)
            .await
            .map_err(PlayerError::from);
        self.engine_result(lane, result)
    }

    // ------------------------------------------------------------------
    // Callbacks
    // ------------------------------------------------------------------

    async fn handle_signal(&mut self, signal: Signal) {
        match signal {
            Signal::Engine {
                generation,
                lane,
                event,
            } => {
                if generation != self.generation || lane >= self.lanes.len() {
                    // Late callback from an engine replaced by setup or destroy.
                    trace!(lane, generation, ?event, "Dropping stale engine callback");
                    return;
                }
                self.handle_engine_event(lane, event).await
            }
            Signal::Focus(FocusSignal::Change(change)) => {
                let reaction = self.arbiter.on_focus_change(change).await;
                self.apply(reaction).await;
            }
            Signal::Focus(FocusSignal::BecomingNoisy) => {
                let reaction = self.arbiter.on_becoming_noisy();
                self.apply(reaction).await;
            }
        }
    }

    async fn handle_engine_event(&mut self, lane: LaneId, event: EngineEvent) {
        match event {
            EngineEvent::StateChanged(state) => {
                self.lanes[lane].state = state;
                debug!(lane, ?state, "Lane state changed");
                self.emit(PlayerEvent::PlaybackStateChanged {
                    lane_id: lane,
                    state,
                });
                self.now_playing.update_playback(lane, state);

                match state {
                    PlaybackState::Playing | PlaybackState::Buffering => self.on_play(lane).await,
                    PlaybackState::Paused => self.on_idle(true).await,
                    PlaybackState::Stopped | PlaybackState::None => self.on_idle(false).await,
                    PlaybackState::Connecting => {}
                }
            }
            EngineEvent::TrackChanged {
                previous,
                position,
                next,
            } => {
                let slot = &mut self.lanes[lane];
                slot.queue.set_current(next.as_deref());
                if next.is_some() {
                    if let Some(track) = slot.queue.current() {
                        self.now_playing
                            .update_metadata(lane, &track.to_media_item());
                    }
                }
                debug!(lane, ?previous, ?next, "Track changed");
                self.emit(PlayerEvent::TrackChanged {
                    lane_id: lane,
                    previous_id: previous,
                    position_seconds: position.as_secs_f64(),
                    next_id: next,
                });
            }
            EngineEvent::QueueEnded { previous, position } => {
                info!(lane, "Queue ended");
                self.emit(PlayerEvent::QueueEnded {
                    lane_id: lane,
                    previous_id: previous,
                    position_seconds: position.as_secs_f64(),
                });
            }
            EngineEvent::Error { code, message } => {
                error!(lane, %code, %message, "Engine reported an error");
                self.emit(PlayerEvent::PlaybackError {
                    lane_id: lane,
                    code,
                    message,
                });
            }
        }
    }

    async fn on_play(&mut self, lane: LaneId) {
        let slot = &self.lanes[lane];
        let Some(track) = slot.queue.current() else {
            return;
        };

        if !slot.engine.is_remote() {
            let remote_track = track.is_remote();
            self.arbiter.request().await;
            self.holds.acquire_power();
            if remote_track {
                self.holds.acquire_network();
            }
        }
        self.now_playing.set_foreground(true, true);
    }

    /// A lane paused or stopped. Once nothing plays, give everything back.
    async fn on_idle(&mut self, keep_notification: bool) {
        if self.any_lane_playing() {
            return;
        }
        self.holds.release_all();
        self.arbiter.abandon(false).await;
        self.now_playing.set_foreground(false, keep_notification);
    }

    async fn apply(&mut self, reaction: FocusReaction) {
        if reaction.pause_local_lanes {
            for (lane, slot) in self.lanes.iter().enumerate() {
                if slot.engine.is_remote() {
                    continue;
                }
                if let Err(e) = slot.engine.pause().await {
                    warn!(lane, error = %e, "Failed to pause lane after focus loss");
                }
            }
        }
        if let Some(event) = reaction.event {
            info!(event = event.description(), "Focus reaction");
            self.emit(event);
        }
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    async fn teardown(&mut self) {
        info!(session = %self.id, "Tearing down player");
        self.arbiter.release().await;
        self.destroy_lanes().await;
        if let Err(e) = self.now_playing.destroy() {
            warn!(error = %e, "Failed to destroy now-playing session");
        }
        self.holds.release_all();
    }

    async fn destroy_lanes(&mut self) {
        for (lane, slot) in self.lanes.drain(..).enumerate() {
            if let Err(e) = slot.engine.destroy().await {
                warn!(lane, error = %e, "Failed to destroy engine");
            }
        }
    }

    fn any_lane_playing(&self) -> bool {
        self.lanes.iter().any(|l| l.state.is_playing())
    }

    fn check_lane(&self, lane: LaneId) -> Result<()> {
        if self.lanes.is_empty() {
            return Err(PlayerError::NotInitialized);
        }
        if lane >= self.lanes.len() {
            return Err(PlayerError::LaneOutOfRange {
                lane,
                lane_count: self.lanes.len(),
            });
        }
        Ok(())
    }

    fn lane(&self, lane: LaneId) -> Result<&Lane> {
        self.check_lane(lane)?;
        Ok(&self.lanes[lane])
    }

    fn lane_mut(&mut self, lane: LaneId) -> Result<&mut Lane> {
        self.check_lane(lane)?;
        Ok(&mut self.lanes[lane])
    }

    /// Engine failures are reported on the event bus as well as to the
    /// caller.
    fn engine_result<T>(&self, lane: LaneId, result: Result<T>) -> Result<T> {
        if let Err(PlayerError::Adapter { code, message }) = &result {
            warn!(lane, %code, %message, "Engine rejected command");
            self.emit(PlayerEvent::PlaybackError {
                lane_id: lane,
                code: code.clone(),
                message: message.clone(),
            });
        }
        result
    }

    fn emit(&self, event: PlayerEvent) {
        if self.events.emit(event).is_err() {
            trace!("No event subscribers");
        }
    }
}

fn respond<T>(reply: Reply<T>, result: Result<T>) {
    if let Err(result) = reply.send(result) {
        debug!(failed = result.is_err(), "Caller stopped waiting for reply");
    }
}

fn seconds_or_zero(value: Option<Duration>) -> f64 {
    value.map_or(0.0, |d| d.as_secs_f64())
}
