//! A module with two handlers fed by a producer task.
//!
//! On Ctrl+C the producer stops, every handler queue is drained, and the
//! process exits with the lifecycle outcome.
//!
//! ```text
//! RUST_LOG=taskwarden=trace cargo run --example worker_service
//! ```

use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use taskwarden::{
    Config, HandlerFn, Lifecycle, Message, MessageHandler, Module, ShutdownPolicy, TaskError,
    TaskFn, TaskRef,
};
use tokio_util::sync::CancellationToken;
use tracing::Span;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Greets whoever is named in the payload.
struct HelloHandler {
    subject: String,
    max_workers: usize,
    span: Mutex<Span>,
}

impl HelloHandler {
    fn new(subject: impl Into<String>, max_workers: usize) -> Self {
        Self {
            subject: subject.into(),
            max_workers,
            span: Mutex::new(Span::none()),
        }
    }
}

#[async_trait]
impl MessageHandler for HelloHandler {
    fn name(&self) -> &str {
        "hello"
    }

    fn subject(&self) -> &str {
        &self.subject
    }

    fn max_workers(&self) -> usize {
        self.max_workers
    }

    async fn handle(&self, msg: Message) {
        let span = self.span.lock().map(|s| s.clone()).unwrap_or_else(|_| Span::none());
        tracing::trace!(parent: &span, "handling message");
        println!("Hello {}", msg.payload_str());
        tokio::time::sleep(Duration::from_millis(msg.payload.len() as u64)).await;
    }

    fn update_span(&self, span: Span) {
        if let Ok(mut slot) = self.span.lock() {
            *slot = span;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskwarden=debug,worker_service=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let lifecycle = Lifecycle::builder(Config::named("worker-service"))
        .with_policy(ShutdownPolicy::with_default_signals(Duration::from_secs(10)))
        .build()?;

    let module = Arc::new(Module::with_bus("greeter", lifecycle.bus().clone()));
    let hello_subject = format!("{}.hello", module.subject("demo"));
    let audit_subject = format!("{}.audit", module.subject("demo"));

    module.add_handler(Arc::new(HelloHandler::new(hello_subject.clone(), 4)))?;
    module.add_handler(HandlerFn::arc("audit", audit_subject.clone(), 1, |msg: Message| async move {
        tracing::info!(payload = %msg.payload_str(), "audit");
    }))?;

    let service: TaskRef = TaskFn::arc("producer", move |ctx: CancellationToken| {
        let module = Arc::clone(&module);
        let hello_subject = hello_subject.clone();
        let audit_subject = audit_subject.clone();
        async move {
            module
                .start(&ctx)
                .map_err(|e| TaskError::fail(e.to_string()))?;

            let names = ["world", "gopher", "crab", "operator"];
            let mut n = 0usize;
            let mut tick = tokio::time::interval(Duration::from_millis(200));
            loop {
                tokio::select! {
                    _ = ctx.cancelled() => break,
                    _ = tick.tick() => {
                        let name = names[n % names.len()];
                        n += 1;
                        module
                            .dispatch(Message::new(hello_subject.as_str(), name))
                            .await
                            .map_err(|e| TaskError::fail(e.to_string()))?;
                        if n % 5 == 0 {
                            let audit = Message::new(audit_subject.as_str(), format!("{n} greetings"));
                            if let Err(e) = module.try_dispatch(audit) {
                                tracing::debug!(error = %e, label = e.as_label(), "audit message skipped");
                            }
                        }
                    }
                }
            }

            module.shutdown().await;
            Ok(())
        }
    });

    let outcome = lifecycle.run(&CancellationToken::new(), service).await?;
    tracing::info!(%outcome, code = outcome.code(), "finished");
    Ok(outcome.exit_code())
}
