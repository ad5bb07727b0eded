use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::slot::SlotTable;
use super::worker::{PoolShared, Worker};
use crate::error::PoolError;
use crate::events::{Bus, Event, EventKind};
use crate::registry::{Message, MessageHandler};

/// Bounded pool of workers draining one message queue.
///
/// ```text
/// start(parent)
///   └─► child = parent.child_token()
///   └─► monitor: loop {
///          while slot free ─► spawn Worker(slot, child) into JoinSet
///          wait { child cancelled ─► exit | slot released ─► refill }
///       }
///       join every worker
///
/// shutdown()
///   └─► child.cancel() ─► workers drain queue ─► monitor joins them ─► return
/// ```
///
/// `shutdown` has no deadline of its own: it returns once the queue is
/// drained. Wrap it in `tokio::time::timeout` when a bound is needed.
pub struct WorkerPool {
    shared: Arc<PoolShared>,
    token: OnceLock<CancellationToken>,
    monitor: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl WorkerPool {
    /// Creates a stopped pool sized by `handler.max_workers()` (at least 1).
    ///
    /// The pool span is created as a child of the current span.
    pub fn new(
        name: impl Into<Arc<str>>,
        handler: Arc<dyn MessageHandler>,
        queue: mpsc::Receiver<Message>,
        bus: Bus,
    ) -> Self {
        let name = name.into();
        let span = tracing::debug_span!("worker_pool", pool = %name);
        let slots = SlotTable::new(handler.max_workers().max(1));
        Self {
            shared: Arc::new(PoolShared {
                name,
                handler,
                queue: Arc::new(tokio::sync::Mutex::new(queue)),
                slots,
                bus,
                span,
                processed: AtomicU64::new(0),
            }),
            token: OnceLock::new(),
            monitor: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Pool name.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Maximum number of concurrent workers.
    pub fn max_workers(&self) -> usize {
        self.shared.slots.capacity()
    }

    /// Number of workers currently holding a slot.
    pub fn occupied(&self) -> usize {
        self.shared.slots.occupied()
    }

    /// Messages handed to the handler so far (panicked calls included).
    pub fn processed(&self) -> u64 {
        self.shared.processed.load(Ordering::Relaxed)
    }

    /// Starts the monitor under a child token of `parent`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, parent: &CancellationToken) -> Result<(), PoolError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(PoolError::ShutDown);
        }
        let token = parent.child_token();
        self.token
            .set(token.clone())
            .map_err(|_| PoolError::AlreadyStarted)?;

        tracing::debug!(parent: &self.shared.span, max_workers = self.max_workers(), "starting worker-pool");
        self.shared
            .bus
            .publish(Event::new(EventKind::PoolStarted).with_pool(Arc::clone(&self.shared.name)));

        let span = self.shared.span.clone();
        let handle = tokio::spawn(monitor(Arc::clone(&self.shared), token).instrument(span));
        *self.lock_monitor() = Some(handle);
        Ok(())
    }

    /// Cancels the workers and waits until the queue is drained and every worker has exited.
    ///
    /// Only the first call waits; later calls return at once.
    pub async fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        tracing::debug!(parent: &self.shared.span, "shutting down worker-pool");
        if let Some(token) = self.token.get() {
            token.cancel();
        }

        let handle = self.lock_monitor().take();
        let Some(handle) = handle else {
            return;
        };
        if let Err(e) = handle.await {
            tracing::error!(parent: &self.shared.span, error = %e, "worker-pool monitor failed");
        }

        tracing::debug!(parent: &self.shared.span, processed = self.processed(), "worker-pool stopped");
        self.shared
            .bus
            .publish(Event::new(EventKind::PoolStopped).with_pool(Arc::clone(&self.shared.name)));
    }

    fn lock_monitor(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.monitor.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Keeps every free slot occupied until cancelled, then joins the workers.
///
/// Free slots are filled before cancellation is checked, so a pool cancelled
/// right after `start` still gets workers to drain what is queued.
async fn monitor(shared: Arc<PoolShared>, token: CancellationToken) {
    tracing::debug!("starting worker-pool monitor");
    let mut workers = JoinSet::new();
    loop {
        while let Some(slot) = shared.slots.claim() {
            workers.spawn(Worker::new(Arc::clone(&shared), slot, token.clone()).run());
        }

        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = shared.slots.released() => {}
        }
        while workers.try_join_next().is_some() {}
    }

    tracing::debug!(workers = workers.len(), "stopping worker-pool monitor");
    while let Some(res) = workers.join_next().await {
        if let Err(e) = res {
            tracing::error!(error = %e, "worker task failed");
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("name", &self.shared.name)
            .field("max_workers", &self.max_workers())
            .field("occupied", &self.occupied())
            .finish()
    }
}
