//! Runs a single cancellable task under the default shutdown policy.
//!
//! Press Ctrl+C once to start the graceful window, twice to force exit.
//!
//! ```text
//! RUST_LOG=taskwarden=debug cargo run --example one_shot
//! ```

use std::process::ExitCode;
use std::time::Duration;

use taskwarden::{Config, Lifecycle, ShutdownPolicy, TaskError, TaskFn, TaskRef};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskwarden=debug,one_shot=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let lifecycle = Lifecycle::builder(Config::named("one-shot"))
        .with_policy(ShutdownPolicy::with_default_signals(Duration::from_secs(3)))
        .build()?;

    let counter: TaskRef = TaskFn::arc("counter", |ctx: CancellationToken| async move {
        for tick in 1..=10u32 {
            tokio::select! {
                _ = ctx.cancelled() => {
                    tracing::info!(tick, "cancelled; cleaning up");
                    tokio::time::sleep(Duration::from_millis(500)).await;
                    return Err(TaskError::Canceled);
                }
                _ = tokio::time::sleep(Duration::from_secs(1)) => {
                    tracing::info!(tick, "working");
                }
            }
        }
        Ok(())
    });

    let outcome = lifecycle.run(&CancellationToken::new(), counter).await?;
    tracing::info!(%outcome, code = outcome.code(), "finished");
    Ok(outcome.exit_code())
}
