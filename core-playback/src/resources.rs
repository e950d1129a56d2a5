//! Power and network holds for the whole player.
//!
//! Both holds are session-wide singletons, not per lane. Every transition
//! checks the lock's current state first, so acquiring a held lock or
//! releasing a free one never reaches the platform. Failures are logged and
//! swallowed; playback continues without the hold.

use bridge_traits::ResourceLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Snapshot of which holds are active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HeldResources {
    pub power: bool,
    pub network: bool,
}

pub struct ResourceHolds {
    power: Arc<dyn ResourceLock>,
    network: Arc<dyn ResourceLock>,
}

impl ResourceHolds {
    pub fn new(power: Arc<dyn ResourceLock>, network: Arc<dyn ResourceLock>) -> Self {
        Self { power, network }
    }

    pub fn acquire_power(&self) {
        acquire(self.power.as_ref());
    }

    pub fn acquire_network(&self) {
        acquire(self.network.as_ref());
    }

    /// Release network first, then power.
    pub fn release_all(&self) {
        release(self.network.as_ref());
        release(self.power.as_ref());
    }

    pub fn held(&self) -> HeldResources {
        HeldResources {
            power: self.power.is_held(),
            network: self.network.is_held(),
        }
    }
}

fn acquire(lock: &dyn ResourceLock) {
    if lock.is_held() {
        return;
    }
    match lock.acquire() {
        Ok(()) => debug!(lock = lock.kind().as_str(), "Hold acquired"),
        Err(e) => warn!(lock = lock.kind().as_str(), error = %e, "Failed to acquire hold"),
    }
}

fn release(lock: &dyn ResourceLock) {
    if !lock.is_held() {
        return;
    }
    match lock.release() {
        Ok(()) => debug!(lock = lock.kind().as_str(), "Hold released"),
        Err(e) => warn!(lock = lock.kind().as_str(), error = %e, "Failed to release hold"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::Result;
    use bridge_traits::{BridgeError, LockKind};
    use mockall::mock;
    use std::sync::atomic::{AtomicBool, Ordering};

    mock! {
        Lock {}

        impl ResourceLock for Lock {
            fn kind(&self) -> LockKind;
            fn is_held(&self) -> bool;
            fn acquire(&self) -> Result<()>;
            fn release(&self) -> Result<()>;
        }
    }

    /// Lock that records its state, like a platform wake lock would.
    fn stateful_lock(kind: LockKind) -> (MockLock, Arc<AtomicBool>) {
        let held = Arc::new(AtomicBool::new(false));
        let mut lock = MockLock::new();
        lock.expect_kind().return_const(kind);

        let state = Arc::clone(&held);
        lock.expect_is_held()
            .returning(move || state.load(Ordering::SeqCst));
        let state = Arc::clone(&held);
        lock.expect_acquire().times(1).returning(move || {
            state.store(true, Ordering::SeqCst);
            Ok(())
        });
        let state = Arc::clone(&held);
        lock.expect_release().times(1).returning(move || {
            state.store(false, Ordering::SeqCst);
            Ok(())
        });
        (lock, held)
    }

    #[test]
    fn repeated_acquire_and_release_reach_the_platform_once() {
        let (power, _) = stateful_lock(LockKind::Power);
        let (network, _) = stateful_lock(LockKind::Network);
        let holds = ResourceHolds::new(Arc::new(power), Arc::new(network));

        holds.acquire_power();
        holds.acquire_power();
        holds.acquire_network();
        holds.acquire_network();
        assert_eq!(
            holds.held(),
            HeldResources {
                power: true,
                network: true
            }
        );

        holds.release_all();
        holds.release_all();
        assert_eq!(holds.held(), HeldResources::default());
    }

    #[test]
    fn failures_are_swallowed() {
        let mut power = MockLock::new();
        power.expect_kind().return_const(LockKind::Power);
        power.expect_is_held().return_const(false);
        power
            .expect_acquire()
            .returning(|| Err(BridgeError::OperationFailed("denied".into())));

        let mut network = MockLock::new();
        network.expect_kind().return_const(LockKind::Network);
        network.expect_is_held().return_const(true);
        network
            .expect_release()
            .returning(|| Err(BridgeError::OperationFailed("busy".into())));

        let holds = ResourceHolds::new(Arc::new(power), Arc::new(network));
        holds.acquire_power();
        holds.release_all();
        assert!(!holds.held().power);
    }
}
