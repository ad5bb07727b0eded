//! # Message handler contract
//!
//! [`MessageHandler`] is the extension point for consuming messages. Each
//! handler bound into a [`Module`](crate::Module) gets a private bounded
//! queue and a [`WorkerPool`](crate::WorkerPool) of up to
//! [`max_workers`](MessageHandler::max_workers) concurrent workers.
//!
//! ## Contract
//! - One worker never runs two `handle` calls at once; different workers do.
//! - No ordering across workers when `max_workers > 1`.
//! - A panic in `handle` is caught and reported; the worker keeps going.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use taskwarden::{Message, MessageHandler};
//!
//! struct Audit;
//!
//! #[async_trait]
//! impl MessageHandler for Audit {
//!     fn name(&self) -> &str { "audit" }
//!     fn subject(&self) -> &str { "events.audit" }
//!     fn max_workers(&self) -> usize { 4 }
//!
//!     async fn handle(&self, msg: Message) {
//!         let _ = msg.payload_str();
//!     }
//! }
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::Span;

use super::message::Message;

/// Contract for message handlers.
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    /// Human-readable name (for logs).
    fn name(&self) -> &str;

    /// Exact subject this handler is bound to.
    fn subject(&self) -> &str;

    /// Upper bound on concurrent workers; must be at least 1.
    fn max_workers(&self) -> usize;

    /// Capacity of this handler's queue; defaults to `max_workers`.
    fn queue_capacity(&self) -> usize {
        self.max_workers()
    }

    /// Handle a single message.
    async fn handle(&self, msg: Message);

    /// Called once at registration with the span carrying module/handler/subject fields.
    fn update_span(&self, _span: Span) {}
}

/// Closure-backed handler.
///
/// ```rust
/// use taskwarden::{HandlerFn, Message, MessageHandler};
///
/// let h = HandlerFn::arc("hello", "greet.hello", 2, |msg: Message| async move {
///     println!("Hello {}", msg.payload_str());
/// });
/// assert_eq!(h.subject(), "greet.hello");
/// ```
pub struct HandlerFn<F> {
    name: Cow<'static, str>,
    subject: Cow<'static, str>,
    max_workers: usize,
    queue_capacity: Option<usize>,
    span: Mutex<Span>,
    f: F,
}

impl<F, Fut> HandlerFn<F>
where
    F: Fn(Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    /// Creates a handler.
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        subject: impl Into<Cow<'static, str>>,
        max_workers: usize,
        f: F,
    ) -> Self {
        Self {
            name: name.into(),
            subject: subject.into(),
            max_workers,
            queue_capacity: None,
            span: Mutex::new(Span::none()),
            f,
        }
    }

    /// Creates the handler as a shared handle.
    pub fn arc(
        name: impl Into<Cow<'static, str>>,
        subject: impl Into<Cow<'static, str>>,
        max_workers: usize,
        f: F,
    ) -> Arc<Self> {
        Arc::new(Self::new(name, subject, max_workers, f))
    }

    /// Overrides the queue capacity.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    /// Span assigned at registration (`Span::none()` before).
    pub fn span(&self) -> Span {
        self.span
            .lock()
            .map(|s| s.clone())
            .unwrap_or_else(|_| Span::none())
    }
}

#[async_trait]
impl<F, Fut> MessageHandler for HandlerFn<F>
where
    F: Fn(Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn subject(&self) -> &str {
        &self.subject
    }

    fn max_workers(&self) -> usize {
        self.max_workers
    }

    fn queue_capacity(&self) -> usize {
        self.queue_capacity.unwrap_or(self.max_workers)
    }

    async fn handle(&self, msg: Message) {
        (self.f)(msg).await
    }

    fn update_span(&self, span: Span) {
        if let Ok(mut slot) = self.span.lock() {
            *slot = span;
        }
    }
}
