//! Lifecycle core: run one task under a shutdown policy.
//!
//! The public API from this module is [`Lifecycle`] (with its builder),
//! the outcome types, and the signal sources.
//!
//! Internal modules:
//! - [`runner`]: runs the task on its own tokio task, one result via oneshot;
//! - [`lifecycle`]: races task outcome against signals, graceful window, override;
//! - [`signals`]: arm/disarm signal subscriptions (OS or manual);
//! - [`console`]: operator-facing shutdown notices;
//! - [`builder`]: construction and configuration validation.

mod builder;
mod console;
mod lifecycle;
mod outcome;
pub(crate) mod runner;
mod signals;
mod state;

pub use builder::LifecycleBuilder;
pub use console::Console;
pub use lifecycle::Lifecycle;
pub use outcome::{ExecutionOutcome, TerminationReason};
pub use signals::{ManualSignals, OsSignals, SignalListener, SignalSource};
pub use state::RunState;
