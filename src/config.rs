//! # Instance configuration.
//!
//! Provides [`Config`]: settings scoped to one [`Lifecycle`](crate::Lifecycle)
//! instance. Nothing here is process-global; two controllers in the same
//! process may use different names, output sinks and bus sizes.
//!
//! ## Sentinel values
//! - `bus_capacity = 0` → clamped to 1 by the bus

use crate::core::Console;

/// Default capacity of the event bus ring buffer.
pub const DEFAULT_BUS_CAPACITY: usize = 1024;

/// Per-instance configuration for the lifecycle controller.
///
/// ## Field semantics
/// - `name`: instance name, used as a tracing field (must not be empty)
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by `Bus`)
/// - `console`: where user-facing shutdown notices are written
#[derive(Clone, Debug)]
pub struct Config {
    /// Instance name.
    pub name: String,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Receivers that lag behind more than `bus_capacity` events observe
    /// `Lagged` and skip older items.
    pub bus_capacity: usize,

    /// Sink for shutdown notices ("press again to force-quit").
    pub console: Console,
}

impl Config {
    /// Creates a config with the given name and defaults for everything else.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `name = "app"`
    /// - `bus_capacity = 1024`
    /// - `console = Console::Stdout`
    fn default() -> Self {
        Self {
            name: "app".to_string(),
            bus_capacity: DEFAULT_BUS_CAPACITY,
            console: Console::default(),
        }
    }
}
