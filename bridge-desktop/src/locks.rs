//! In-process resource holds.

use bridge_traits::{
    error::{BridgeError, Result},
    locks::{LockKind, ResourceLock},
};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// Hold tracked inside the process.
///
/// Desktop systems do not suspend the CPU or the network under a running
/// media application, so the lock only records its state. Acquiring a held
/// lock or releasing a free one is reported as an error, mirroring platform
/// locks that throw on unbalanced use.
#[derive(Debug)]
pub struct ProcessLock {
    kind: LockKind,
    held: AtomicBool,
}

impl ProcessLock {
    pub fn new(kind: LockKind) -> Self {
        Self {
            kind,
            held: AtomicBool::new(false),
        }
    }

    pub fn power() -> Self {
        Self::new(LockKind::Power)
    }

    pub fn network() -> Self {
        Self::new(LockKind::Network)
    }
}

impl ResourceLock for ProcessLock {
    fn kind(&self) -> LockKind {
        self.kind
    }

    fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }

    fn acquire(&self) -> Result<()> {
        if self.held.swap(true, Ordering::SeqCst) {
            warn!(lock = self.kind.as_str(), "Lock acquired twice");
            return Err(BridgeError::OperationFailed(format!(
                "{} lock already held",
                self.kind.as_str()
            )));
        }
        debug!(lock = self.kind.as_str(), "Lock acquired");
        Ok(())
    }

    fn release(&self) -> Result<()> {
        if !self.held.swap(false, Ordering::SeqCst) {
            warn!(lock = self.kind.as_str(), "Released a lock that was not held");
            return Err(BridgeError::OperationFailed(format!(
                "{} lock not held",
                self.kind.as_str()
            )));
        }
        debug!(lock = self.kind.as_str(), "Lock released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_and_release_toggle_state() {
        let lock = ProcessLock::power();
        assert_eq!(lock.kind(), LockKind::Power);
        assert!(!lock.is_held());

        lock.acquire().unwrap();
        assert!(lock.is_held());

        lock.release().unwrap();
        assert!(!lock.is_held());
    }

    #[test]
    fn unbalanced_use_is_reported() {
        let lock = ProcessLock::network();
        assert!(lock.release().is_err());

        lock.acquire().unwrap();
        assert!(lock.acquire().is_err());
        assert!(lock.is_held());
    }
}
