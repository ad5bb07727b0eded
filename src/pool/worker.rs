//! # Worker: one consumer of a pool's shared queue.
//!
//! ```text
//! loop {
//!   select! {
//!     next message  ─► handler.handle(msg)   (sequential, panic-isolated)
//!     queue closed  ─► cancel pool token, exit
//!     cancelled     ─► drain: try_recv until empty, handle each, exit
//!   }
//! }
//! on exit: SlotGuard dropped → slot released → monitor woken
//! ```
//!
//! Workers compete for messages through one receiver behind an async mutex,
//! so each message reaches exactly one handler invocation.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span};

use super::slot::{SlotGuard, SlotTable};
use crate::core::runner::panic_info;
use crate::events::{Bus, Event, EventKind};
use crate::registry::{Message, MessageHandler};

/// Queue receiver shared by competing workers.
pub(crate) type SharedQueue = Arc<Mutex<mpsc::Receiver<Message>>>;

/// State shared by a pool's monitor and workers.
pub(crate) struct PoolShared {
    pub name: Arc<str>,
    pub handler: Arc<dyn MessageHandler>,
    pub queue: SharedQueue,
    pub slots: Arc<SlotTable>,
    pub bus: Bus,
    pub span: Span,
    pub processed: AtomicU64,
}

pub(crate) struct Worker {
    shared: Arc<PoolShared>,
    slot: SlotGuard,
    token: CancellationToken,
}

impl Worker {
    pub fn new(shared: Arc<PoolShared>, slot: SlotGuard, token: CancellationToken) -> Self {
        Self {
            shared,
            slot,
            token,
        }
    }

    /// Runs until cancelled (then drains) or until the queue closes.
    pub async fn run(self) {
        let span = tracing::trace_span!(parent: &self.shared.span, "worker", worker_id = self.slot.id());
        self.run_inner().instrument(span).await
    }

    async fn run_inner(self) {
        tracing::trace!("starting worker-pool instance");
        self.publish(EventKind::WorkerStarted);

        loop {
            tokio::select! {
                msg = self.next() => match msg {
                    Some(msg) => self.process(msg).await,
                    None => {
                        tracing::debug!("queue closed; winding down pool");
                        self.token.cancel();
                        break;
                    }
                },
                _ = self.token.cancelled() => {
                    self.drain().await;
                    break;
                }
            }
        }

        tracing::trace!("stopping worker-pool instance");
        self.publish(EventKind::WorkerStopped);
    }

    async fn next(&self) -> Option<Message> {
        self.shared.queue.lock().await.recv().await
    }

    async fn drain(&self) {
        self.publish(EventKind::WorkerDraining);
        let mut drained = 0usize;
        loop {
            let next = self.shared.queue.lock().await.try_recv();
            match next {
                Ok(msg) => {
                    self.process(msg).await;
                    drained += 1;
                }
                Err(_) => break,
            }
        }
        tracing::trace!(drained, "worker drained queue");
    }

    async fn process(&self, msg: Message) {
        tracing::trace!(subject = %msg.subject, "worker received message");
        let fut = self.shared.handler.handle(msg);
        if let Err(panic) = AssertUnwindSafe(fut).catch_unwind().await {
            let info = panic_info(&*panic);
            tracing::error!(%info, "handler panicked");
            self.shared.bus.publish(
                Event::new(EventKind::HandlerPanicked)
                    .with_pool(Arc::clone(&self.shared.name))
                    .with_worker(self.slot.id())
                    .with_reason(info),
            );
        }
        self.shared.processed.fetch_add(1, Ordering::Relaxed);
    }

    fn publish(&self, kind: EventKind) {
        self.shared.bus.publish(
            Event::new(kind)
                .with_pool(Arc::clone(&self.shared.name))
                .with_worker(self.slot.id()),
        );
    }
}
