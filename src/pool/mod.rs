//! Bounded worker pools draining a handler queue.
//!
//! - [`WorkerPool`] owns the monitor and the workers for one queue.
//! - `SlotTable` bounds concurrency; a free slot is the only way to spawn a worker.

mod core;
mod slot;
mod worker;

pub use self::core::WorkerPool;
