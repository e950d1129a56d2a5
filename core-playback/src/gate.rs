//! # Connection Gate
//!
//! Holds commands back until the player task exists, then replays them in
//! submission order.
//!
//! ## Overview
//!
//! The gate is a two-state switch (connected / not connected) with a FIFO.
//! While no pool is available, submissions are buffered and exactly one
//! connection attempt is requested from the caller. Once the pool arrives,
//! the buffer is drained in order. Submissions racing with the drain join the
//! back of the buffer, so the pool always observes submission order.
//!
//! ```text
//!   submit ──► pool ready? ── yes ──► dispatch
//!                  │
//!                  no ──► buffer ──► (first one) Submission::Connect
//!
//!   on_connected(pool) ──► drain buffer FIFO until observed empty
//! ```
//!
//! The gate never times out. A failed attempt is reported with
//! [`ConnectionGate::on_connect_failed`] and the next submission retries.

use parking_lot::Mutex;
use std::collections::VecDeque;
use tracing::{debug, trace, warn};

/// Destination for gated items.
pub trait Dispatch<T> {
    /// Forward one item. A closed destination hands the item back.
    fn dispatch(&self, item: T) -> Result<(), T>;
}

/// What happened to a submitted item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Dispatched to the pool.
    Forwarded,
    /// Buffered behind an attempt already in flight, or behind a drain.
    Buffered,
    /// Buffered, and the caller must start a connection attempt now.
    Connect,
}

#[derive(Debug)]
struct GateState<P, T> {
    pool: Option<P>,
    connecting: bool,
    draining: bool,
    pending: VecDeque<T>,
}

/// FIFO gate in front of a lazily connected pool.
#[derive(Debug)]
pub struct ConnectionGate<P, T> {
    state: Mutex<GateState<P, T>>,
}

impl<P, T> Default for ConnectionGate<P, T> {
    fn default() -> Self {
        Self {
            state: Mutex::new(GateState {
                pool: None,
                connecting: false,
                draining: false,
                pending: VecDeque::new(),
            }),
        }
    }
}

impl<P, T> ConnectionGate<P, T>
where
    P: Dispatch<T> + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Forward `item` or buffer it. Never waits for the connection.
    pub fn submit(&self, item: T) -> Submission {
        let mut state = self.state.lock();

        if !state.draining {
            if let Some(pool) = state.pool.clone() {
                match pool.dispatch(item) {
                    Ok(()) => return Submission::Forwarded,
                    Err(item) => {
                        warn!("Pool closed without a disconnect notice, reconnecting");
                        state.pool = None;
                        state.pending.push_back(item);
                        return Self::request_connection(&mut state);
                    }
                }
            }
        }

        state.pending.push_back(item);
        if state.pool.is_some() {
            trace!(pending = state.pending.len(), "Buffered behind drain");
            return Submission::Buffered;
        }
        Self::request_connection(&mut state)
    }

    fn request_connection(state: &mut GateState<P, T>) -> Submission {
        if state.connecting {
            trace!(pending = state.pending.len(), "Buffered while connecting");
            Submission::Buffered
        } else {
            debug!(pending = state.pending.len(), "Requesting connection");
            state.connecting = true;
            Submission::Connect
        }
    }

    /// Store the pool and drain the buffer in order.
    ///
    /// Returns `true` when the pool died during the drain and the caller must
    /// start another connection attempt. Undelivered items stay buffered.
    pub fn on_connected(&self, pool: P) -> bool {
        {
            let mut state = self.state.lock();
            state.pool = Some(pool);
            state.connecting = false;
            state.draining = true;
            debug!(pending = state.pending.len(), "Connected, draining buffer");
        }

        loop {
            let (pool, item) = {
                let mut state = self.state.lock();
                let Some(pool) = state.pool.clone() else {
                    // Disconnected mid-drain; the rest waits for the next pool.
                    state.draining = false;
                    return false;
                };
                match state.pending.pop_front() {
                    Some(item) => (pool, item),
                    None => {
                        state.draining = false;
                        return false;
                    }
                }
            };

            if let Err(item) = pool.dispatch(item) {
                let mut state = self.state.lock();
                warn!("Pool closed during drain, reconnecting");
                state.pending.push_front(item);
                state.pool = None;
                state.draining = false;
                return matches!(Self::request_connection(&mut state), Submission::Connect);
            }
        }
    }

    /// Drop the pool. Buffered items are kept for the next connection.
    pub fn on_disconnected(&self) {
        let mut state = self.state.lock();
        state.pool = None;
        state.connecting = false;
        state.draining = false;
        debug!(pending = state.pending.len(), "Disconnected");
    }

    /// The attempt requested by [`Submission::Connect`] failed.
    pub fn on_connect_failed(&self) {
        let mut state = self.state.lock();
        state.connecting = false;
        warn!(
            pending = state.pending.len(),
            "Connection attempt failed, buffered commands wait for the next attempt"
        );
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().pool.is_some()
    }

    pub fn is_connecting(&self) -> bool {
        self.state.lock().connecting
    }

    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn current_pool(&self) -> Option<P> {
        self.state.lock().pool.clone()
    }
}
