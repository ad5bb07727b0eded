//! # Run a task on its own tokio task.
//!
//! [`spawn_task`] starts one [`Task`] and hands back a [`TaskRun`]: a future
//! that resolves to the task's outcome, delivered exactly once through a
//! `oneshot` channel.
//!
//! ```text
//! spawn_task(task, token)
//!     └─► tokio::spawn ─► task.spawn(token) ─► catch_unwind ─► oneshot::send
//!                                                                  │
//!                     TaskRun (await) ◄────────────────────────────┘
//! ```
//!
//! ## Rules
//! - The send never blocks; a result nobody awaits any more is discarded.
//! - A panic inside the task becomes [`TaskError::Panicked`].
//! - A sender dropped without a value (runtime torn down) reads as [`TaskError::Canceled`].

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::FutureExt;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::tasks::Task;

/// Pending outcome of a spawned task.
#[derive(Debug)]
pub struct TaskRun {
    rx: oneshot::Receiver<Result<(), TaskError>>,
}

impl Future for TaskRun {
    type Output = Result<(), TaskError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|res| res.unwrap_or(Err(TaskError::Canceled)))
    }
}

/// Starts `task` bound to `token` on a separate tokio task.
pub fn spawn_task<T: Task + ?Sized>(task: &T, token: CancellationToken) -> TaskRun {
    let (tx, rx) = oneshot::channel();
    let name = task.name().to_string();
    let fut = task.spawn(token);

    tokio::spawn(async move {
        let res = match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(res) => res,
            Err(panic) => Err(TaskError::Panicked {
                info: panic_info(&*panic),
            }),
        };
        if tx.send(res).is_err() {
            tracing::debug!(task = %name, "task outcome arrived after controller returned; discarded");
        }
    });

    TaskRun { rx }
}

/// Renders a panic payload as text.
pub(crate) fn panic_info(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
