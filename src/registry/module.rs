//! # Module: a named set of handlers keyed by exact subject.
//!
//! ```text
//! add_handler(h) ─► validate ─► bounded mpsc(h.queue_capacity())
//!                            └► WorkerPool(h, rx)   (started now if the module runs)
//!
//! dispatch(msg) ─► bindings[msg.subject] ─► tx.send(msg).await ─► pool workers
//!
//! shutdown() ─► every pool shut down concurrently ─► counts logged
//! ```
//!
//! The binding table sits behind a std `RwLock` that is never held across
//! an await: dispatch clones the binding out before sending.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use futures::future::join_all;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::Span;

use super::handler::MessageHandler;
use super::message::Message;
use crate::error::{DispatchError, PoolError, RegistryError};
use crate::events::Bus;
use crate::pool::WorkerPool;

/// Everything bound to one subject.
struct Binding {
    handler: Arc<dyn MessageHandler>,
    tx: mpsc::Sender<Message>,
    pool: WorkerPool,
    inbound: AtomicU64,
    span: Span,
}

impl Binding {
    fn queue_len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    fn accepted(&self) {
        self.inbound.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(parent: &self.span, queue_len = self.queue_len(), "message queued");
    }
}

/// Named registry of message handlers, one worker pool per subject.
pub struct Module {
    name: Arc<str>,
    bus: Bus,
    span: Span,
    bindings: RwLock<HashMap<String, Arc<Binding>>>,
    token: OnceLock<CancellationToken>,
    closed: AtomicBool,
}

impl Module {
    /// Creates an empty module with its own event bus.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self::with_bus(name, Bus::default())
    }

    /// Creates an empty module publishing pool events on `bus`.
    pub fn with_bus(name: impl Into<Arc<str>>, bus: Bus) -> Self {
        let name = name.into();
        let span = tracing::debug_span!("module", module = %name);
        Self {
            name,
            bus,
            span,
            bindings: RwLock::new(HashMap::new()),
            token: OnceLock::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Module name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Event bus shared by this module's pools.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Namespaced subject: `"{prefix}.{name}"`, or just the name for an empty prefix.
    ///
    /// ```
    /// use taskwarden::Module;
    ///
    /// let m = Module::new("greeter");
    /// assert_eq!(m.subject("svc"), "svc.greeter");
    /// assert_eq!(m.subject(""), "greeter");
    /// ```
    pub fn subject(&self, prefix: &str) -> String {
        if prefix.is_empty() {
            self.name.to_string()
        } else {
            format!("{prefix}.{}", self.name)
        }
    }

    /// Bound subjects, sorted.
    pub fn subjects(&self) -> Vec<String> {
        let mut subjects: Vec<String> = self.read().keys().cloned().collect();
        subjects.sort_unstable();
        subjects
    }

    /// Binds `handler` to its subject.
    ///
    /// Rejects an empty subject, zero workers, a zero-capacity queue, and a
    /// subject that is already bound. On success the handler receives its
    /// span through [`MessageHandler::update_span`]. If the module is already
    /// running the new pool starts immediately. After [`Module::shutdown`]
    /// every registration fails with [`RegistryError::ModuleShutDown`].
    pub fn add_handler(&self, handler: Arc<dyn MessageHandler>) -> Result<(), RegistryError> {
        validate(&*handler)?;
        let subject = handler.subject().to_owned();

        let mut bindings = self.write();
        if self.closed.load(Ordering::Acquire) {
            return Err(RegistryError::ModuleShutDown {
                module: self.name.to_string(),
            });
        }
        if bindings.contains_key(&subject) {
            return Err(RegistryError::DuplicateSubject { subject });
        }

        let span = tracing::debug_span!(
            parent: &self.span,
            "handler",
            handler = handler.name(),
            subject = %subject
        );
        handler.update_span(span.clone());

        let (tx, rx) = mpsc::channel(handler.queue_capacity());
        let pool = span.in_scope(|| {
            WorkerPool::new(handler.name(), Arc::clone(&handler), rx, self.bus.clone())
        });
        if let Some(token) = self.token.get() {
            if let Err(e) = pool.start(token) {
                tracing::warn!(parent: &span, error = %e, "failed to start worker-pool");
            }
        }

        tracing::debug!(
            parent: &span,
            max_workers = handler.max_workers(),
            queue_capacity = handler.queue_capacity(),
            "handler registered"
        );
        bindings.insert(
            subject,
            Arc::new(Binding {
                handler,
                tx,
                pool,
                inbound: AtomicU64::new(0),
                span,
            }),
        );
        Ok(())
    }

    /// Unbinds `subject`, draining and stopping its pool. Returns `false` if nothing was bound.
    pub async fn remove_handler(&self, subject: &str) -> bool {
        let removed = self.write().remove(subject);
        let Some(binding) = removed else {
            return false;
        };
        binding.pool.shutdown().await;
        tracing::debug!(
            parent: &binding.span,
            inbound = binding.inbound.load(Ordering::Relaxed),
            processed = binding.pool.processed(),
            "handler removed"
        );
        true
    }

    /// Starts every pool under a child of `parent`.
    pub fn start(&self, parent: &CancellationToken) -> Result<(), PoolError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(PoolError::ShutDown);
        }
        let token = parent.child_token();
        self.token
            .set(token.clone())
            .map_err(|_| PoolError::AlreadyStarted)?;

        let bindings = self.read();
        tracing::debug!(parent: &self.span, handlers = bindings.len(), "starting module");
        for binding in bindings.values() {
            binding.pool.start(&token)?;
        }
        Ok(())
    }

    /// Queues `msg` for the handler bound to its subject, waiting while the queue is full.
    pub async fn dispatch(&self, msg: Message) -> Result<(), DispatchError> {
        let binding = self.binding(&msg.subject)?;
        binding
            .tx
            .send(msg)
            .await
            .map_err(|e| DispatchError::Closed(e.0.subject))?;
        binding.accepted();
        Ok(())
    }

    /// Queues `msg` without waiting.
    pub fn try_dispatch(&self, msg: Message) -> Result<(), DispatchError> {
        let binding = self.binding(&msg.subject)?;
        binding.tx.try_send(msg).map_err(|e| match e {
            TrySendError::Full(m) => DispatchError::Full(m.subject),
            TrySendError::Closed(m) => DispatchError::Closed(m.subject),
        })?;
        binding.accepted();
        Ok(())
    }

    /// Raw queue handle for a transport adapter. Messages sent through it
    /// are not counted as inbound.
    pub fn sender(&self, subject: &str) -> Option<mpsc::Sender<Message>> {
        self.read().get(subject).map(|b| b.tx.clone())
    }

    /// Unbinds every handler and shuts the pools down concurrently.
    ///
    /// Returns once every queue is drained. A module that was never started
    /// has no workers, so whatever sits in its queues is dropped unhandled.
    pub async fn shutdown(&self) {
        let bindings: Vec<Arc<Binding>> = {
            let mut table = self.write();
            self.closed.store(true, Ordering::Release);
            table.drain().map(|(_, b)| b).collect()
        };
        tracing::debug!(parent: &self.span, handlers = bindings.len(), "shutting down module");
        match self.token.get() {
            Some(token) => token.cancel(),
            None => {
                for b in bindings.iter().filter(|b| b.queue_len() > 0) {
                    tracing::debug!(
                        parent: &b.span,
                        dropped = b.queue_len(),
                        "module never started; dropping queued messages"
                    );
                }
            }
        }

        join_all(bindings.iter().map(|b| b.pool.shutdown())).await;

        for b in &bindings {
            tracing::info!(
                parent: &b.span,
                inbound = b.inbound.load(Ordering::Relaxed),
                processed = b.pool.processed(),
                "handler shutdown completed"
            );
        }
        tracing::info!(parent: &self.span, "module shutdown completed");
    }

    fn binding(&self, subject: &str) -> Result<Arc<Binding>, DispatchError> {
        self.read()
            .get(subject)
            .cloned()
            .ok_or_else(|| DispatchError::NoHandler(subject.to_owned()))
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<Binding>>> {
        self.bindings.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<Binding>>> {
        self.bindings.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn validate(handler: &dyn MessageHandler) -> Result<(), RegistryError> {
    let reason = if handler.subject().is_empty() {
        "subject is empty"
    } else if handler.max_workers() == 0 {
        "max_workers must be at least 1"
    } else if handler.queue_capacity() == 0 {
        "queue_capacity must be at least 1"
    } else {
        return Ok(());
    };
    Err(RegistryError::InvalidHandler {
        handler: handler.name().to_owned(),
        reason,
    })
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers: Vec<(String, String)> = self
            .read()
            .values()
            .map(|b| (b.handler.name().to_owned(), b.handler.subject().to_owned()))
            .collect();
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("handlers", &handlers)
            .field("started", &self.token.get().is_some())
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::registry::HandlerFn;

    fn collector(
        subject: &'static str,
        workers: usize,
    ) -> (Arc<dyn MessageHandler>, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler: Arc<dyn MessageHandler> = HandlerFn::arc(subject, subject, workers, move |msg: Message| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().unwrap().push(msg.payload_str().into_owned());
            }
        });
        (handler, seen)
    }

    #[test]
    fn test_duplicate_subject_rejected() {
        let m = Module::new("m");
        let (a, _) = collector("jobs.run", 1);
        let (b, _) = collector("jobs.run", 2);

        m.add_handler(a).unwrap();
        assert_eq!(
            m.add_handler(b),
            Err(RegistryError::DuplicateSubject {
                subject: "jobs.run".into()
            })
        );
        assert_eq!(m.subjects(), vec!["jobs.run"]);
    }

    #[test]
    fn test_invalid_handlers_rejected() {
        let m = Module::new("m");
        let noop = |_msg: Message| async {};

        let empty = HandlerFn::arc("empty", "", 1, noop);
        let zero_workers = HandlerFn::arc("zero", "a", 0, noop);
        let zero_queue = Arc::new(HandlerFn::new("q", "b", 1, noop).with_queue_capacity(0));

        let handlers: [Arc<dyn MessageHandler>; 3] = [empty, zero_workers, zero_queue];
        for h in handlers {
            let err = m.add_handler(h).unwrap_err();
            assert_eq!(err.as_label(), "registry_invalid_handler");
        }
        assert!(m.subjects().is_empty());
    }

    struct SpanProbe(std::sync::atomic::AtomicUsize);

    #[async_trait::async_trait]
    impl MessageHandler for SpanProbe {
        fn name(&self) -> &str {
            "probe"
        }
        fn subject(&self) -> &str {
            "probe.span"
        }
        fn max_workers(&self) -> usize {
            1
        }
        async fn handle(&self, _msg: Message) {}
        fn update_span(&self, _span: Span) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_registration_updates_span_once() {
        let m = Module::new("m");
        let probe = Arc::new(SpanProbe(Default::default()));
        m.add_handler(probe.clone()).unwrap();
        assert!(m.add_handler(probe.clone()).is_err());
        assert_eq!(probe.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_subject_namespacing() {
        let m = Module::new("billing");
        assert_eq!(m.subject("acme"), "acme.billing");
        assert_eq!(m.subject(""), "billing");
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_routes_by_subject() {
        let m = Module::new("m");
        let (a, seen_a) = collector("a", 1);
        let (b, seen_b) = collector("b", 2);
        m.add_handler(a).unwrap();
        m.add_handler(b).unwrap();

        m.start(&CancellationToken::new()).unwrap();
        m.dispatch(Message::new("a", "1")).await.unwrap();
        m.dispatch(Message::new("b", "2")).await.unwrap();
        m.dispatch(Message::new("a", "3")).await.unwrap();
        m.shutdown().await;

        assert_eq!(*seen_a.lock().unwrap(), vec!["1", "3"]);
        assert_eq!(*seen_b.lock().unwrap(), vec!["2"]);
    }

    #[tokio::test]
    async fn test_unknown_subject() {
        let m = Module::new("m");
        assert_eq!(
            m.dispatch(Message::new("nope", "")).await,
            Err(DispatchError::NoHandler("nope".into()))
        );
        assert!(m.sender("nope").is_none());
    }

    #[tokio::test]
    async fn test_try_dispatch_reports_full_queue() {
        let m = Module::new("m");
        let h = Arc::new(HandlerFn::new("h", "q", 1, |_msg: Message| async {}).with_queue_capacity(1));
        m.add_handler(h).unwrap();

        // Not started: nothing consumes.
        m.try_dispatch(Message::new("q", "1")).unwrap();
        assert_eq!(
            m.try_dispatch(Message::new("q", "2")),
            Err(DispatchError::Full("q".into()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_handler_added_after_start_runs() {
        let m = Module::new("m");
        m.start(&CancellationToken::new()).unwrap();

        let (h, seen) = collector("late", 1);
        m.add_handler(h).unwrap();
        m.dispatch(Message::new("late", "hi")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(*seen.lock().unwrap(), vec!["hi"]);
        m.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_handler_drains_and_unbinds() {
        let m = Module::new("m");
        let (h, seen) = collector("r", 1);
        m.add_handler(h).unwrap();
        m.try_dispatch(Message::new("r", "queued")).unwrap();
        m.start(&CancellationToken::new()).unwrap();

        assert!(m.remove_handler("r").await);
        assert!(!m.remove_handler("r").await);
        assert_eq!(*seen.lock().unwrap(), vec!["queued"]);
        assert_eq!(
            m.try_dispatch(Message::new("r", "x")),
            Err(DispatchError::NoHandler("r".into()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_sender_feeds_pool() {
        let m = Module::new("m");
        let (h, seen) = collector("s", 2);
        m.add_handler(h).unwrap();
        m.start(&CancellationToken::new()).unwrap();

        let tx = m.sender("s").unwrap();
        tx.send(Message::new("s", "raw")).await.unwrap();
        m.shutdown().await;

        assert_eq!(*seen.lock().unwrap(), vec!["raw"]);
        assert!(m.subjects().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shut_down_module_refuses_new_handlers() {
        let m = Module::new("m");
        m.start(&CancellationToken::new()).unwrap();
        m.shutdown().await;

        let (h, _) = collector("late", 1);
        let err = m.add_handler(h).unwrap_err();
        assert_eq!(err, RegistryError::ModuleShutDown { module: "m".into() });
        assert_eq!(err.as_label(), "registry_module_shut_down");
        assert!(m.subjects().is_empty());
        assert_eq!(
            m.dispatch(Message::new("late", "lost")).await,
            Err(DispatchError::NoHandler("late".into()))
        );
    }

    #[tokio::test]
    async fn test_shutdown_without_start_drops_queue_and_closes() {
        let m = Module::new("m");
        let (h, seen) = collector("idle", 1);
        m.add_handler(h).unwrap();
        m.try_dispatch(Message::new("idle", "never handled")).unwrap();

        m.shutdown().await;
        assert!(seen.lock().unwrap().is_empty());
        assert!(m.subjects().is_empty());
        assert_eq!(m.start(&CancellationToken::new()), Err(PoolError::ShutDown));
    }

    #[tokio::test]
    async fn test_start_twice_rejected() {
        let m = Module::new("m");
        let token = CancellationToken::new();
        m.start(&token).unwrap();
        assert_eq!(m.start(&token), Err(PoolError::AlreadyStarted));
    }
}
