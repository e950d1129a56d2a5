//! Loopback engines shared by the façade tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::{
    EngineConfig, EngineEvent, EngineFactory, EngineListener, LaneId, MediaItem, PlaybackEngine,
    PlaybackState,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Everything the engines of one factory were asked to do, in order.
#[derive(Default)]
pub struct Journal {
    entries: Mutex<Vec<String>>,
}

impl Journal {
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    pub fn count(&self, needle: &str) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.contains(needle))
            .count()
    }

    fn push(&self, lane: LaneId, entry: String) {
        self.entries.lock().push(format!("{}:{}", lane, entry));
    }
}

pub struct LoopbackEngine {
    lane: LaneId,
    journal: Arc<Journal>,
    listener: Arc<dyn EngineListener>,
    state: Mutex<PlaybackState>,
}

impl LoopbackEngine {
    fn transition(&self, state: PlaybackState) {
        *self.state.lock() = state;
        self.listener
            .on_event(self.lane, EngineEvent::StateChanged(state));
    }

    fn log(&self, entry: impl Into<String>) -> Result<()> {
        self.journal.push(self.lane, entry.into());
        Ok(())
    }
}

#[async_trait]
impl PlaybackEngine for LoopbackEngine {
    async fn add(&self, items: Vec<MediaItem>, index: usize) -> Result<()> {
        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        self.log(format!("add@{}[{}]", index, ids.join(",")))
    }

    async fn remove(&self, indexes: Vec<usize>) -> Result<()> {
        self.log(format!("remove{:?}", indexes))
    }

    async fn remove_upcoming(&self) -> Result<()> {
        self.log("remove_upcoming")
    }

    async fn skip(&self, index: usize) -> Result<()> {
        self.log(format!("skip@{}", index))
    }

    async fn skip_to_next(&self) -> Result<()> {
        self.log("next")
    }

    async fn skip_to_previous(&self) -> Result<()> {
        self.log("previous")
    }

    async fn play(&self) -> Result<()> {
        self.log("play")?;
        self.transition(PlaybackState::Playing);
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.log("pause")?;
        self.transition(PlaybackState::Paused);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.log("stop")?;
        self.transition(PlaybackState::Stopped);
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        *self.state.lock() = PlaybackState::None;
        self.log("reset")
    }

    async fn seek_to(&self, position: Duration) -> Result<()> {
        self.log(format!("seek@{}", position.as_secs_f64()))
    }

    async fn set_volume(&self, volume: f32) -> Result<()> {
        self.log(format!("volume={}", volume))
    }

    async fn volume(&self) -> Result<f32> {
        Ok(1.0)
    }

    async fn set_rate(&self, rate: f32) -> Result<()> {
        self.log(format!("rate={}", rate))
    }

    async fn rate(&self) -> Result<f32> {
        Ok(1.0)
    }

    async fn duration(&self) -> Result<Option<Duration>> {
        Ok(Some(Duration::from_secs(200)))
    }

    async fn buffered_position(&self) -> Result<Option<Duration>> {
        Ok(None)
    }

    async fn position(&self) -> Result<Option<Duration>> {
        Ok(None)
    }

    async fn state(&self) -> Result<PlaybackState> {
        Ok(*self.state.lock())
    }

    async fn destroy(&self) -> Result<()> {
        self.log("destroy")
    }
}

#[derive(Default)]
pub struct LoopbackFactory {
    pub journal: Arc<Journal>,
}

impl EngineFactory for LoopbackFactory {
    fn create_engine(
        &self,
        lane: LaneId,
        _config: &EngineConfig,
        listener: Arc<dyn EngineListener>,
    ) -> Result<Box<dyn PlaybackEngine>> {
        Ok(Box::new(LoopbackEngine {
            lane,
            journal: Arc::clone(&self.journal),
            listener,
            state: Mutex::new(PlaybackState::None),
        }))
    }
}
