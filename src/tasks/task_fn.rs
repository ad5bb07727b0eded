//! # Closure-backed task
//!
//! A [`TaskFn`] turns `Fn(CancellationToken) -> Future` into a [`Task`].
//! The closure is called once per [`Task::spawn`], so each run owns a fresh
//! future; anything shared between runs has to be captured behind an `Arc`.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use taskwarden::{TaskError, TaskFn, TaskRef};
//!
//! let poller: TaskRef = TaskFn::arc("poller", |token: CancellationToken| async move {
//!     loop {
//!         tokio::select! {
//!             _ = token.cancelled() => return Ok::<_, TaskError>(()),
//!             _ = tokio::time::sleep(Duration::from_secs(1)) => {}
//!         }
//!     }
//! });
//! assert_eq!(poller.name(), "poller");
//! ```

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::tasks::task::{BoxTaskFuture, Task};

/// [`Task`] built from a closure.
pub struct TaskFn<F> {
    name: Cow<'static, str>,
    body: F,
}

impl<F, Fut> TaskFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    /// Wraps `body` under `name`.
    pub fn new(name: impl Into<Cow<'static, str>>, body: F) -> Self {
        Self {
            name: name.into(),
            body,
        }
    }

    /// Same as [`TaskFn::new`], already behind an `Arc` so it coerces to
    /// [`TaskRef`](crate::TaskRef).
    pub fn arc(name: impl Into<Cow<'static, str>>, body: F) -> Arc<Self> {
        Arc::new(Self::new(name, body))
    }
}

impl<F, Fut> Task for TaskFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn spawn(&self, token: CancellationToken) -> BoxTaskFuture {
        Box::pin((self.body)(token))
    }
}

impl<F> fmt::Debug for TaskFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskFn").field("name", &self.name).finish_non_exhaustive()
    }
}
