//! # Runtime events emitted by the lifecycle controller and worker pools.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Lifecycle events**: run-state transitions and signal subscriptions
//! - **Pool events**: worker spawn, drain and exit
//! - **Fault events**: a handler panicked while processing a message
//!
//! The [`Event`] struct carries additional metadata such as timestamps,
//! signal kind, pool name and worker slot.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use taskwarden::{Event, EventKind, RunState, SignalKind};
//!
//! let ev = Event::new(EventKind::StateChanged)
//!     .with_state(RunState::SignalReceived)
//!     .with_signal(SignalKind::Interrupt);
//!
//! assert_eq!(ev.state, Some(RunState::SignalReceived));
//! assert_eq!(ev.signal, Some(SignalKind::Interrupt));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::core::RunState;
use crate::policies::SignalKind;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Lifecycle events ===
    /// The lifecycle controller entered a new [`RunState`].
    ///
    /// Sets:
    /// - `state`: the new state
    /// - `signal`: triggering signal (`SignalReceived`, overriding `ForcedExit`)
    /// - `timeout`: graceful window (`GracefulWindow`)
    /// - `reason`: termination reason (`ForcedExit`)
    StateChanged,

    /// Signal observation armed.
    ///
    /// Sets:
    /// - `reason`: comma-separated signal names
    SignalsArmed,

    /// Signal observation released.
    SignalsDisarmed,

    // === Pool events ===
    /// Worker pool monitor started.
    ///
    /// Sets:
    /// - `pool`: pool name
    PoolStarted,

    /// A worker claimed a slot and started.
    ///
    /// Sets:
    /// - `pool`: pool name
    /// - `worker`: slot index
    WorkerStarted,

    /// A worker observed cancellation and is draining the queue.
    ///
    /// Sets:
    /// - `pool`: pool name
    /// - `worker`: slot index
    WorkerDraining,

    /// A worker released its slot and exited.
    ///
    /// Sets:
    /// - `pool`: pool name
    /// - `worker`: slot index
    WorkerStopped,

    /// Handler panicked while processing a message; the worker continues.
    ///
    /// Sets:
    /// - `pool`: pool name
    /// - `worker`: slot index
    /// - `reason`: panic info
    HandlerPanicked,

    /// All workers and the monitor have exited.
    ///
    /// Sets:
    /// - `pool`: pool name
    PoolStopped,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Lifecycle state (for `StateChanged`).
    pub state: Option<RunState>,
    /// Signal involved, if any.
    pub signal: Option<SignalKind>,
    /// Human-readable reason.
    pub reason: Option<Arc<str>>,
    /// Graceful window, if applicable.
    pub timeout: Option<Duration>,
    /// Pool name, if applicable.
    pub pool: Option<Arc<str>>,
    /// Worker slot index, if applicable.
    pub worker: Option<usize>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            state: None,
            signal: None,
            reason: None,
            timeout: None,
            pool: None,
            worker: None,
        }
    }

    /// Shorthand for a `StateChanged` event.
    #[inline]
    pub fn state_changed(state: RunState) -> Self {
        Event::new(EventKind::StateChanged).with_state(state)
    }

    /// Attaches a lifecycle state.
    #[inline]
    pub fn with_state(mut self, state: RunState) -> Self {
        self.state = Some(state);
        self
    }

    /// Attaches a signal kind.
    #[inline]
    pub fn with_signal(mut self, signal: SignalKind) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a duration.
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout = Some(d);
        self
    }

    /// Attaches a pool name.
    #[inline]
    pub fn with_pool(mut self, pool: impl Into<Arc<str>>) -> Self {
        self.pool = Some(pool.into());
        self
    }

    /// Attaches a worker slot index.
    #[inline]
    pub fn with_worker(mut self, id: usize) -> Self {
        self.worker = Some(id);
        self
    }

    /// `true` for a `StateChanged` event carrying `state`.
    #[inline]
    pub fn is_state(&self, state: RunState) -> bool {
        self.kind == EventKind::StateChanged && self.state == Some(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::PoolStarted);
        let b = Event::new(EventKind::PoolStopped);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_is_state() {
        let ev = Event::state_changed(RunState::GracefulWindow);
        assert!(ev.is_state(RunState::GracefulWindow));
        assert!(!ev.is_state(RunState::Completed));
        assert!(!Event::new(EventKind::SignalsArmed).is_state(RunState::Running));
    }
}
