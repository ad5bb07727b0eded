//! # Shutdown policy.
//!
//! [`ShutdownPolicy`] decides how the [`Lifecycle`](crate::Lifecycle) reacts to
//! termination requests:
//!
//! ```text
//! signals = {}                         → no signal handling, task runs inline
//! graceful = false  or  timeout = 0    → first signal → immediate exit
//! graceful = true   and timeout > 0    → first signal → wait up to `timeout`
//!                                        second signal → forced exit
//! ```
//!
//! A policy is immutable once built and is shared read-only (`Arc`) by the
//! controller for the lifetime of one instance.

use std::time::Duration;

use super::signal::SignalKind;

/// Signals honored by [`ShutdownPolicy::default`] and
/// [`ShutdownPolicy::with_default_signals`].
pub const DEFAULT_SIGNALS: [SignalKind; 4] = SignalKind::ALL;

/// Graceful window used by [`ShutdownPolicy::default`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Immutable description of which signals are honored and how shutdown proceeds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShutdownPolicy {
    signals: Vec<SignalKind>,
    timeout: Duration,
    graceful: bool,
}

impl ShutdownPolicy {
    /// Creates a fully parameterized policy.
    ///
    /// Duplicate signal kinds are collapsed; order is normalized.
    pub fn new(
        signals: impl IntoIterator<Item = SignalKind>,
        timeout: Duration,
        graceful: bool,
    ) -> Self {
        let mut signals: Vec<SignalKind> = signals.into_iter().collect();
        signals.sort_unstable();
        signals.dedup();
        Self {
            signals,
            timeout,
            graceful,
        }
    }

    /// Default signal set (`INT`, `TERM`, `HUP`, `QUIT`), graceful, with the given window.
    pub fn with_default_signals(timeout: Duration) -> Self {
        Self::new(DEFAULT_SIGNALS, timeout, true)
    }

    /// A policy that installs no signal handling at all.
    pub fn no_signals() -> Self {
        Self::new([], Duration::ZERO, false)
    }

    /// Signals this policy reacts to.
    #[inline]
    pub fn signals(&self) -> &[SignalKind] {
        &self.signals
    }

    /// `true` if at least one signal is tracked.
    #[inline]
    pub fn has_signals(&self) -> bool {
        !self.signals.is_empty()
    }

    /// Length of the graceful window.
    #[inline]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether the caller asked for graceful shutdown (see [`ShutdownPolicy::is_graceful`]).
    #[inline]
    pub fn graceful(&self) -> bool {
        self.graceful
    }

    /// Effective graceful mode: requested **and** a non-zero window.
    #[inline]
    pub fn is_graceful(&self) -> bool {
        self.graceful && self.timeout > Duration::ZERO
    }
}

impl Default for ShutdownPolicy {
    /// Default signals, `timeout = 5s`, graceful.
    fn default() -> Self {
        Self::with_default_signals(DEFAULT_TIMEOUT)
    }
}
