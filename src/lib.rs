//! # taskwarden
//!
//! **Taskwarden** runs one long-lived async task under a signal-aware
//! shutdown policy, and hosts message handlers on bounded worker pools that
//! drain their queues before stopping.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!                     OS signals / ManualSignals
//!                                │
//!                                ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Lifecycle (shutdown controller)                                  │
//! │  - ShutdownPolicy (signals, graceful flag, window)                │
//! │  - Console (operator notices)                                     │
//! │  - Bus (RunState transitions, signal arming)                      │
//! └──────┬────────────────────────────────────────────────────────────┘
//!        │ child CancellationToken
//!        ▼
//!   ┌──────────────┐          ┌──────────────────────────────────────┐
//!   │  Task (user) │ ───────► │  Module                              │
//!   └──────────────┘  start   │  subject ─► Binding                  │
//!                             │    - bounded mpsc queue              │
//!                             │    - WorkerPool (monitor + workers)  │
//!                             └───────┬───────────────┬──────────────┘
//!                                     ▼               ▼
//!                                  worker 0  ...  worker N-1
//!                                     │               │
//!                                     ▼               ▼
//!                             MessageHandler::handle(msg)
//! ```
//!
//! ### Shutdown
//! ```text
//! run(parent, task)
//!   ├─ no tracked signals ─► await task, return its outcome
//!   └─ arm signals ─► spawn task ─► select! {
//!        task done         ─► Success / Failure
//!        signal | parent   ─► cancel task token
//!                              ├─ not graceful ─► Terminated(Immediate)
//!                              └─ graceful ─► select! {
//!                                   task done      ─► its outcome
//!                                   window elapsed ─► Terminated(DeadlineExceeded)
//!                                   signal again   ─► Terminated(Overridden)
//!                                 }
//!      }
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                            |
//! |-------------------|--------------------------------------------------------------|-----------------------------------------------|
//! | **Lifecycle**     | Run a task, race it against signals and a graceful window.   | [`Lifecycle`], [`ExecutionOutcome`]           |
//! | **Policies**      | Which signals count, graceful or immediate, window length.   | [`ShutdownPolicy`], [`SignalKind`]            |
//! | **Handlers**      | Subject-routed handlers with per-handler worker pools.       | [`Module`], [`MessageHandler`], [`HandlerFn`] |
//! | **Pools**         | Bounded concurrency, drain on shutdown, panic isolation.     | [`WorkerPool`]                                |
//! | **Events**        | Broadcast state transitions and pool activity.               | [`Bus`], [`Event`], [`EventKind`]             |
//! | **Errors**        | Typed errors with stable labels.                             | [`TaskError`], [`RuntimeError`]               |
//! | **Configuration** | Per-instance settings, no process globals.                   | [`Config`], [`LifecycleBuilder`]              |
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use taskwarden::{Config, Console, ExecutionOutcome, Lifecycle, ShutdownPolicy, TaskFn, TaskRef};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = Config::named("hello");
//!     cfg.console = Console::Quiet;
//!
//!     let lifecycle = Lifecycle::builder(cfg)
//!         .with_policy(ShutdownPolicy::with_default_signals(Duration::from_secs(5)))
//!         .build()?;
//!
//!     let hello: TaskRef = TaskFn::arc("hello", |ctx: CancellationToken| async move {
//!         if ctx.is_cancelled() { return Ok(()); }
//!         println!("Hello from task!");
//!         Ok(())
//!     });
//!
//!     let outcome = lifecycle.run(&CancellationToken::new(), hello).await?;
//!     assert_eq!(outcome, ExecutionOutcome::Success);
//!     Ok(())
//! }
//! ```
mod config;
mod core;
mod error;
mod events;
mod policies;
mod pool;
mod registry;
mod tasks;

// ---- Public re-exports ----

pub use config::{Config, DEFAULT_BUS_CAPACITY};
pub use core::{
    Console, ExecutionOutcome, Lifecycle, LifecycleBuilder, ManualSignals, OsSignals, RunState,
    SignalListener, SignalSource, TerminationReason,
};
pub use error::{ConfigError, DispatchError, PoolError, RegistryError, RuntimeError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use policies::{DEFAULT_SIGNALS, DEFAULT_TIMEOUT, ParseSignalError, ShutdownPolicy, SignalKind};
pub use pool::WorkerPool;
pub use registry::{HandlerFn, Message, MessageHandler, Module};
pub use tasks::{BoxTaskFuture, Task, TaskFn, TaskRef};
