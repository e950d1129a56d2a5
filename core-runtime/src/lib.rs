//! # Core Runtime Module
//!
//! Foundational infrastructure shared by the player crates:
//! - Logging and tracing setup
//! - Service configuration
//! - Host event bus
//!
//! ## Overview
//!
//! Nothing here knows about queues or lanes. The crate establishes the
//! logging conventions, the capability checks performed before a player
//! starts, and the broadcast channel through which player events reach the
//! host.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
