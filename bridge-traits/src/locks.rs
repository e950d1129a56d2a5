//! Power and network holds
//!
//! Binary locks that keep the device from suspending the CPU or the network
//! interface while audio plays. Holds are not reference counted: acquiring a
//! held lock or releasing a free one is the caller's mistake, and the core
//! checks [`ResourceLock::is_held`] before every transition.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// What a lock keeps alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockKind {
    /// Partial wake lock (CPU keeps running with the screen off).
    Power,
    /// Network interface lock (Wi-Fi stays associated at full power).
    Network,
}

impl LockKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LockKind::Power => "power",
            LockKind::Network => "network",
        }
    }
}

/// A single platform hold.
pub trait ResourceLock: Send + Sync {
    fn kind(&self) -> LockKind;

    fn is_held(&self) -> bool;

    fn acquire(&self) -> Result<()>;

    fn release(&self) -> Result<()>;
}
