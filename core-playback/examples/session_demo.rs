//! # Player Session Example
//!
//! Drives a player task with engines that only log what they are asked to
//! do, and prints the events the host would receive.
//!
//! Run with: `cargo run --example session_demo --package core-playback`

use async_trait::async_trait;
use bridge_desktop::{DesktopAudioFocus, ProcessLock, TracingNowPlaying};
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    EngineConfig, EngineEvent, EngineFactory, EngineListener, LaneId, MediaItem, PlaybackEngine,
    PlaybackState,
};
use core_playback::{Command, LaneCommand, SessionCoordinator};
use core_runtime::config::ServiceConfig;
use core_runtime::events::EventBus;
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

struct LoggingEngine {
    lane: LaneId,
    listener: Arc<dyn EngineListener>,
}

impl LoggingEngine {
    fn report(&self, state: PlaybackState) {
        self.listener
            .on_event(self.lane, EngineEvent::StateChanged(state));
    }
}

#[async_trait]
impl PlaybackEngine for LoggingEngine {
    async fn add(&self, items: Vec<MediaItem>, index: usize) -> BridgeResult<()> {
        info!(lane = self.lane, count = items.len(), index, "engine: add");
        Ok(())
    }
    async fn remove(&self, indexes: Vec<usize>) -> BridgeResult<()> {
        info!(lane = self.lane, ?indexes, "engine: remove");
        Ok(())
    }
    async fn remove_upcoming(&self) -> BridgeResult<()> {
        Ok(())
    }
    async fn skip(&self, _index: usize) -> BridgeResult<()> {
        Ok(())
    }
    async fn skip_to_next(&self) -> BridgeResult<()> {
        Ok(())
    }
    async fn skip_to_previous(&self) -> BridgeResult<()> {
        Ok(())
    }
    async fn play(&self) -> BridgeResult<()> {
        self.report(PlaybackState::Buffering);
        self.report(PlaybackState::Playing);
        Ok(())
    }
    async fn pause(&self) -> BridgeResult<()> {
        self.report(PlaybackState::Paused);
        Ok(())
    }
    async fn stop(&self) -> BridgeResult<()> {
        self.report(PlaybackState::Stopped);
        Ok(())
    }
    async fn reset(&self) -> BridgeResult<()> {
        Ok(())
    }
    async fn seek_to(&self, _position: Duration) -> BridgeResult<()> {
        Ok(())
    }
    async fn set_volume(&self, _volume: f32) -> BridgeResult<()> {
        Ok(())
    }
    async fn volume(&self) -> BridgeResult<f32> {
        Ok(1.0)
    }
    async fn set_rate(&self, _rate: f32) -> BridgeResult<()> {
        Ok(())
    }
    async fn rate(&self) -> BridgeResult<f32> {
        Ok(1.0)
    }
    async fn duration(&self) -> BridgeResult<Option<Duration>> {
        Ok(None)
    }
    async fn buffered_position(&self) -> BridgeResult<Option<Duration>> {
        Ok(None)
    }
    async fn position(&self) -> BridgeResult<Option<Duration>> {
        Ok(Some(Duration::ZERO))
    }
    async fn state(&self) -> BridgeResult<PlaybackState> {
        Ok(PlaybackState::None)
    }
    async fn destroy(&self) -> BridgeResult<()> {
        info!(lane = self.lane, "engine: destroy");
        Ok(())
    }
}

struct LoggingFactory;

impl EngineFactory for LoggingFactory {
    fn create_engine(
        &self,
        lane: LaneId,
        config: &EngineConfig,
        listener: Arc<dyn EngineListener>,
    ) -> BridgeResult<Box<dyn PlaybackEngine>> {
        info!(lane, play_buffer = ?config.play_buffer, "engine: created");
        Ok(Box::new(LoggingEngine { lane, listener }))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(LoggingConfig::default().with_format(LogFormat::Compact))?;

    let config = ServiceConfig::builder()
        .engine_factory(Arc::new(LoggingFactory))
        .focus_manager(Arc::new(DesktopAudioFocus::new()))
        .power_lock(Arc::new(ProcessLock::power()))
        .network_lock(Arc::new(ProcessLock::network()))
        .now_playing(Arc::new(TracingNowPlaying))
        .build()?;

    let bus = EventBus::default();
    let mut events = bus.subscribe();
    let handle = SessionCoordinator::spawn(&config, bus);

    handle
        .request(|reply| Command::Setup {
            options: json!({ "maxCacheSize": 10240 }),
            reply,
        })
        .await?;
    handle
        .lane_request(0, |reply| LaneCommand::Add {
            tracks: vec![
                json!({ "id": "intro", "url": "file:///music/intro.flac", "title": "Intro" }),
                json!({ "id": "live", "url": "https://radio.example.com/live.mp3" }),
            ],
            before: None,
            reply,
        })
        .await?;
    handle
        .lane_request(0, |reply| LaneCommand::Play { reply })
        .await?;
    handle
        .lane_request(0, |reply| LaneCommand::Pause { reply })
        .await?;

    while let Ok(event) = events.try_recv() {
        println!("{}", serde_json::to_string(&event)?);
    }

    let (reply, done) = tokio::sync::oneshot::channel();
    handle
        .lane_request(0, |r| LaneCommand::GetQueue { reply: r })
        .await
        .map(|queue| println!("queue length: {}", queue.len()))?;
    core_playback::Dispatch::dispatch(&handle, Command::Destroy { reply })
        .map_err(|_| "player task already stopped")?;
    done.await?;
    Ok(())
}
