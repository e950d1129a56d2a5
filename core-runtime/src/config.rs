//! # Service Configuration
//!
//! Collects the host capabilities the player service needs before it can
//! start.
//!
//! ## Overview
//!
//! [`ServiceConfig`] is assembled with [`ServiceConfigBuilder`], which
//! validates eagerly: a missing capability is reported at build time with an
//! actionable message instead of surfacing later as a failed command.
//!
//! ## Required Dependencies
//!
//! - `EngineFactory` - creates the playback engine of each lane. The core
//!   never decodes audio, so no default exists.
//!
//! ## Optional Dependencies (with desktop defaults)
//!
//! - `AudioFocusManager` - shared audio output ownership
//! - `ResourceLock` (power) - keeps the CPU awake during playback
//! - `ResourceLock` (network) - keeps the radio awake while streaming
//! - `NowPlayingSink` - notification / media session
//!
//! When the `desktop-shims` feature is enabled, the `bridge-desktop`
//! implementations are injected for any optional dependency that was not
//! provided. Without it every one of them must be supplied.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::ServiceConfig;
//! use std::sync::Arc;
//!
//! let config = ServiceConfig::builder()
//!     .engine_factory(Arc::new(MyEngineFactory))
//!     .focus_manager(Arc::new(MyAudioFocus))
//!     .event_buffer_size(256)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{AudioFocusManager, EngineFactory, LockKind, NowPlayingSink, ResourceLock};
use std::fmt;
use std::sync::Arc;

/// Upper bound for the event channel capacity.
pub const MAX_EVENT_BUFFER_SIZE: usize = 65_536;

/// Capabilities and settings for one player service.
#[derive(Clone)]
pub struct ServiceConfig {
    pub engine_factory: Arc<dyn EngineFactory>,
    pub focus_manager: Arc<dyn AudioFocusManager>,
    pub power_lock: Arc<dyn ResourceLock>,
    pub network_lock: Arc<dyn ResourceLock>,
    pub now_playing: Arc<dyn NowPlayingSink>,
    /// Capacity of the host event channel. Slow subscribers lag past it.
    pub event_buffer_size: usize,
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("engine_factory", &"EngineFactory { ... }")
            .field("focus_manager", &"AudioFocusManager { ... }")
            .field("power_lock", &self.power_lock.kind())
            .field("network_lock", &self.network_lock.kind())
            .field("now_playing", &"NowPlayingSink { ... }")
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

impl ServiceConfig {
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::default()
    }

    /// Checks values the builder cannot enforce through types.
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size > MAX_EVENT_BUFFER_SIZE {
            return Err(Error::Config(format!(
                "Event buffer size exceeds maximum of {}",
                MAX_EVENT_BUFFER_SIZE
            )));
        }

        if self.power_lock.kind() != LockKind::Power {
            return Err(Error::Config(format!(
                "Power lock slot holds a {} lock",
                self.power_lock.kind().as_str()
            )));
        }

        if self.network_lock.kind() != LockKind::Network {
            return Err(Error::Config(format!(
                "Network lock slot holds a {} lock",
                self.network_lock.kind().as_str()
            )));
        }

        Ok(())
    }
}

fn engine_factory_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "EngineFactory".to_string(),
        message: "An EngineFactory is required to create the playback engine of each lane. \
                  Inject the host's decode/render pipeline with .engine_factory()."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_focus_manager() -> Result<Arc<dyn AudioFocusManager>> {
    Ok(Arc::new(bridge_desktop::DesktopAudioFocus::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_focus_manager() -> Result<Arc<dyn AudioFocusManager>> {
    Err(Error::CapabilityMissing {
        capability: "AudioFocusManager".to_string(),
        message: "AudioFocusManager is required to share the audio output. \
                  Desktop: enable the 'desktop-shims' feature. \
                  Mobile: inject the platform audio focus / session API."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_lock(kind: LockKind) -> Result<Arc<dyn ResourceLock>> {
    Ok(Arc::new(bridge_desktop::ProcessLock::new(kind)))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_lock(kind: LockKind) -> Result<Arc<dyn ResourceLock>> {
    Err(Error::CapabilityMissing {
        capability: format!("ResourceLock({})", kind.as_str()),
        message: "Power and network locks are required to keep playback alive in the background. \
                  Desktop: enable the 'desktop-shims' feature. \
                  Mobile: inject wake lock / wifi lock implementations."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_now_playing() -> Result<Arc<dyn NowPlayingSink>> {
    Ok(Arc::new(bridge_desktop::TracingNowPlaying))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_now_playing() -> Result<Arc<dyn NowPlayingSink>> {
    Err(Error::CapabilityMissing {
        capability: "NowPlayingSink".to_string(),
        message: "NowPlayingSink is required to publish the playing track. \
                  Desktop: enable the 'desktop-shims' feature. \
                  Mobile: inject the notification / media session bridge."
            .to_string(),
    })
}

/// Builder for [`ServiceConfig`].
#[derive(Default)]
pub struct ServiceConfigBuilder {
    engine_factory: Option<Arc<dyn EngineFactory>>,
    focus_manager: Option<Arc<dyn AudioFocusManager>>,
    power_lock: Option<Arc<dyn ResourceLock>>,
    network_lock: Option<Arc<dyn ResourceLock>>,
    now_playing: Option<Arc<dyn NowPlayingSink>>,
    event_buffer_size: Option<usize>,
}

impl ServiceConfigBuilder {
    pub fn engine_factory(mut self, factory: Arc<dyn EngineFactory>) -> Self {
        self.engine_factory = Some(factory);
        self
    }

    pub fn focus_manager(mut self, manager: Arc<dyn AudioFocusManager>) -> Self {
        self.focus_manager = Some(manager);
        self
    }

    pub fn power_lock(mut self, lock: Arc<dyn ResourceLock>) -> Self {
        self.power_lock = Some(lock);
        self
    }

    pub fn network_lock(mut self, lock: Arc<dyn ResourceLock>) -> Self {
        self.network_lock = Some(lock);
        self
    }

    pub fn now_playing(mut self, sink: Arc<dyn NowPlayingSink>) -> Self {
        self.now_playing = Some(sink);
        self
    }

    /// Defaults to [`DEFAULT_EVENT_BUFFER_SIZE`].
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when the engine factory is absent, or
    ///   an optional capability is absent and `desktop-shims` is disabled
    /// - [`Error::Config`] when a value is out of range
    pub fn build(self) -> Result<ServiceConfig> {
        let engine_factory = self
            .engine_factory
            .ok_or_else(engine_factory_missing_error)?;

        let focus_manager = match self.focus_manager {
            Some(manager) => manager,
            None => provide_default_focus_manager()?,
        };

        let power_lock = match self.power_lock {
            Some(lock) => lock,
            None => provide_default_lock(LockKind::Power)?,
        };

        let network_lock = match self.network_lock {
            Some(lock) => lock,
            None => provide_default_lock(LockKind::Network)?,
        };

        let now_playing = match self.now_playing {
            Some(sink) => sink,
            None => provide_default_now_playing()?,
        };

        let config = ServiceConfig {
            engine_factory,
            focus_manager,
            power_lock,
            network_lock,
            now_playing,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::{
        error::Result as BridgeResult, EngineConfig, EngineListener, FocusListener,
        FocusRequestResult, LaneId, PlaybackEngine,
    };

    struct NoEngines;

    impl EngineFactory for NoEngines {
        fn create_engine(
            &self,
            _lane: LaneId,
            _config: &EngineConfig,
            _listener: Arc<dyn EngineListener>,
        ) -> BridgeResult<Box<dyn PlaybackEngine>> {
            Err(bridge_traits::BridgeError::NotAvailable("test".to_string()))
        }
    }

    struct GrantAll;

    #[async_trait]
    impl AudioFocusManager for GrantAll {
        async fn request_focus(
            &self,
            _listener: Arc<dyn FocusListener>,
        ) -> BridgeResult<FocusRequestResult> {
            Ok(FocusRequestResult::Granted)
        }

        async fn abandon_focus(&self) -> BridgeResult<bool> {
            Ok(true)
        }
    }

    struct FlagLock(LockKind);

    impl ResourceLock for FlagLock {
        fn kind(&self) -> LockKind {
            self.0
        }
        fn is_held(&self) -> bool {
            false
        }
        fn acquire(&self) -> BridgeResult<()> {
            Ok(())
        }
        fn release(&self) -> BridgeResult<()> {
            Ok(())
        }
    }

    struct Silent;

    impl NowPlayingSink for Silent {
        fn set_foreground(&self, _foreground: bool, _keep_notification: bool) {}
    }

    fn full_builder() -> ServiceConfigBuilder {
        ServiceConfig::builder()
            .engine_factory(Arc::new(NoEngines))
            .focus_manager(Arc::new(GrantAll))
            .power_lock(Arc::new(FlagLock(LockKind::Power)))
            .network_lock(Arc::new(FlagLock(LockKind::Network)))
            .now_playing(Arc::new(Silent))
    }

    #[test]
    fn test_builder_requires_engine_factory() {
        let result = ServiceConfig::builder()
            .focus_manager(Arc::new(GrantAll))
            .build();

        let err = result.unwrap_err();
        assert!(matches!(err, Error::CapabilityMissing { .. }));
        assert!(err.to_string().contains("EngineFactory"));
    }

    #[test]
    fn test_builder_with_all_capabilities() {
        let config = full_builder().build().unwrap();
        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
        assert_eq!(config.power_lock.kind(), LockKind::Power);
        assert_eq!(config.network_lock.kind(), LockKind::Network);
    }

    #[test]
    fn test_validate_rejects_zero_buffer() {
        let err = full_builder().event_buffer_size(0).build().unwrap_err();
        assert!(err.to_string().contains("greater than 0"));
    }

    #[test]
    fn test_validate_rejects_excessive_buffer() {
        let result = full_builder()
            .event_buffer_size(MAX_EVENT_BUFFER_SIZE + 1)
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_swapped_locks() {
        let result = full_builder()
            .power_lock(Arc::new(FlagLock(LockKind::Network)))
            .build();
        assert!(result.unwrap_err().to_string().contains("Power lock slot"));
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_build_with_desktop_defaults() {
        let config = ServiceConfig::builder()
            .engine_factory(Arc::new(NoEngines))
            .build()
            .unwrap();
        assert!(!config.power_lock.is_held());
        assert_eq!(config.network_lock.kind(), LockKind::Network);
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_missing_focus_manager_without_shims() {
        let err = ServiceConfig::builder()
            .engine_factory(Arc::new(NoEngines))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("AudioFocusManager"));
    }
}
