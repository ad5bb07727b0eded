//! # Task abstraction.
//!
//! This module defines the [`Task`] trait: the single unit of work a
//! [`Lifecycle`](crate::Lifecycle) runs to completion. The common handle type
//! is [`TaskRef`], an `Arc<dyn Task>`.
//!
//! A task receives a [`CancellationToken`]. Observing it is the task's own
//! responsibility: the controller cancels the token on shutdown but never
//! forces the task to stop.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

/// Boxed future returned by [`Task::spawn`].
pub type BoxTaskFuture = Pin<Box<dyn Future<Output = Result<(), TaskError>> + Send + 'static>>;

/// Shared handle to a task object.
pub type TaskRef = Arc<dyn Task>;

/// # Asynchronous, cancelable unit of work.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use taskwarden::{BoxTaskFuture, Task};
///
/// struct Demo;
///
/// impl Task for Demo {
///     fn name(&self) -> &str { "demo" }
///
///     fn spawn(&self, ctx: CancellationToken) -> BoxTaskFuture {
///         Box::pin(async move {
///             ctx.cancelled().await;
///             Ok(())
///         })
///     }
/// }
/// ```
pub trait Task: Send + Sync + 'static {
    /// Returns a stable, human-readable task name.
    fn name(&self) -> &str;

    /// Creates the future that performs the work.
    ///
    /// The future must be `'static`: it may be moved onto its own tokio task.
    fn spawn(&self, ctx: CancellationToken) -> BoxTaskFuture;
}
