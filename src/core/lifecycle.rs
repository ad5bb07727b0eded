//! # Lifecycle: run one task while watching for termination requests.
//!
//! The [`Lifecycle`] owns a [`ShutdownPolicy`], a [`SignalSource`] and an
//! event [`Bus`]. [`Lifecycle::run`] executes a single [`Task`](crate::Task) and decides
//! what happens when a tracked signal arrives first.
//!
//! ## High-level flow
//! ```text
//! run(parent, task)
//!   ├─ policy has no signals ─► task.spawn(parent).await ─► outcome
//!   │
//!   ├─ arm signals, child = parent.child_token()
//!   ├─ runner::spawn_task(task, child)                      [Running]
//!   │
//!   ├─ select! {
//!   │     outcome            ─► return outcome              [Completed]
//!   │     signal / parent    ─► child.cancel()              [SignalReceived]
//!   │  }
//!   │
//!   ├─ not graceful ─► "shutting down immediately"
//!   │               ─► Terminated(Immediate)                [ForcedExit]
//!   │
//!   └─ graceful: keep listening, sleep(timeout)             [GracefulWindow]
//!        select! {
//!           outcome        ─► return outcome                [Completed]
//!           timer          ─► Terminated(DeadlineExceeded)  [ForcedExit]
//!           second signal  ─► Terminated(Overridden)        [ForcedExit]
//!        }
//! ```
//!
//! ## Rules
//! - The task outcome is returned verbatim; task errors are not controller errors.
//! - After a forced exit nothing waits for the task. Its token is cancelled;
//!   whether and when it stops is up to the task. A result it produces later
//!   is discarded.
//! - Signal subscriptions are released on every return path.
//! - Parent cancellation counts as a termination request with no signal attached.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::builder::LifecycleBuilder;
use super::outcome::{ExecutionOutcome, TerminationReason};
use super::runner::{self, TaskRun};
use super::signals::{SignalListener, SignalSource};
use super::state::RunState;
use crate::{
    config::Config,
    error::{RuntimeError, TaskError},
    events::{Bus, Event, EventKind},
    policies::{ShutdownPolicy, SignalKind},
    tasks::TaskRef,
};

/// Runs a task under a shutdown policy.
///
/// Cheap to clone; clones share the policy, signal source and bus.
#[derive(Clone)]
pub struct Lifecycle {
    cfg: Config,
    policy: Arc<ShutdownPolicy>,
    signals: Arc<dyn SignalSource>,
    bus: Bus,
}

/// Armed subscription that reports its release on the bus.
struct Armed {
    listener: SignalListener,
    bus: Bus,
}

impl Armed {
    async fn recv(&mut self) -> Option<SignalKind> {
        self.listener.recv().await
    }
}

impl Drop for Armed {
    fn drop(&mut self) {
        tracing::trace!("signal observation released");
        self.bus.publish(Event::new(EventKind::SignalsDisarmed));
    }
}

impl Lifecycle {
    /// Starts building a lifecycle for the given instance config.
    pub fn builder(cfg: Config) -> LifecycleBuilder {
        LifecycleBuilder::new(cfg)
    }

    pub(super) fn new_internal(
        cfg: Config,
        policy: Arc<ShutdownPolicy>,
        signals: Arc<dyn SignalSource>,
        bus: Bus,
    ) -> Self {
        Self {
            cfg,
            policy,
            signals,
            bus,
        }
    }

    /// The shutdown policy in force.
    pub fn policy(&self) -> &ShutdownPolicy {
        &self.policy
    }

    /// The instance configuration.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// The event bus this lifecycle publishes to.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Subscribes to lifecycle events.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Runs `task` to completion or until shutdown policy says stop.
    ///
    /// Returns `Err` only if signal observation could not be armed.
    pub async fn run(
        &self,
        parent: &CancellationToken,
        task: TaskRef,
    ) -> Result<ExecutionOutcome, RuntimeError> {
        let span = tracing::info_span!("lifecycle", app = %self.cfg.name, task = %task.name());
        self.run_inner(parent, task).instrument(span).await
    }

    async fn run_inner(
        &self,
        parent: &CancellationToken,
        task: TaskRef,
    ) -> Result<ExecutionOutcome, RuntimeError> {
        if !self.policy.has_signals() {
            tracing::trace!("executing task without shutdown signals");
            return Ok(task.spawn(parent.clone()).await.into());
        }

        let mut armed = self.arm()?;
        let child = parent.child_token();
        let mut run = runner::spawn_task(&*task, child.clone());
        self.transition(Event::state_changed(RunState::Running));

        let trigger = tokio::select! {
            res = &mut run => {
                tracing::trace!("task finished before any shutdown request");
                return Ok(self.complete(res));
            }
            Some(sig) = armed.recv() => Some(sig),
            _ = parent.cancelled() => None,
        };

        child.cancel();
        let mut ev = Event::state_changed(RunState::SignalReceived);
        if let Some(sig) = trigger {
            ev = ev.with_signal(sig);
        }
        tracing::info!(signal = ?trigger, "shutdown requested");
        self.transition(ev);

        if !self.policy.is_graceful() {
            drop(armed);
            self.cfg.console.notice("shutting down immediately");
            return Ok(self.force(TerminationReason::Immediate, None));
        }

        // The first subscription stays armed for the window: anything it
        // buffered after the trigger counts as the second signal.
        Ok(self.graceful_window(run, armed).await)
    }

    /// Waits for the task within the graceful window.
    async fn graceful_window(&self, mut run: TaskRun, mut window: Armed) -> ExecutionOutcome {
        let timeout = self.policy.timeout();
        self.cfg.console.notice(&format!(
            "waiting {timeout:?} for graceful shutdown... press Ctrl+C again to quit now!"
        ));
        self.transition(Event::state_changed(RunState::GracefulWindow).with_timeout(timeout));

        tokio::select! {
            res = &mut run => {
                tracing::info!("graceful shutdown completed");
                self.complete(res)
            }
            _ = tokio::time::sleep(timeout) => {
                tracing::warn!(?timeout, "graceful shutdown deadline exceeded");
                self.force(TerminationReason::DeadlineExceeded { timeout }, None)
            }
            Some(sig) = window.recv() => {
                self.cfg.console.notice("exiting...");
                tracing::warn!(signal = %sig, "graceful shutdown overridden");
                self.force(TerminationReason::Overridden { signal: sig }, Some(sig))
            }
        }
    }

    fn arm(&self) -> Result<Armed, RuntimeError> {
        let kinds = self.policy.signals();
        let listener = self.signals.listen(kinds)?;
        let names = kinds
            .iter()
            .map(SignalKind::as_str)
            .collect::<Vec<_>>()
            .join(",");
        tracing::trace!(signals = %names, "shutdown signals armed");
        self.bus
            .publish(Event::new(EventKind::SignalsArmed).with_reason(names));
        Ok(Armed {
            listener,
            bus: self.bus.clone(),
        })
    }

    fn transition(&self, ev: Event) {
        if let Some(state) = ev.state {
            tracing::debug!(state = %state, "lifecycle state changed");
        }
        self.bus.publish(ev);
    }

    fn complete(&self, res: Result<(), TaskError>) -> ExecutionOutcome {
        self.transition(Event::state_changed(RunState::Completed));
        res.into()
    }

    fn force(&self, reason: TerminationReason, signal: Option<SignalKind>) -> ExecutionOutcome {
        let mut ev = Event::state_changed(RunState::ForcedExit).with_reason(reason.to_string());
        if let Some(sig) = signal {
            ev = ev.with_signal(sig);
        }
        self.transition(ev);
        ExecutionOutcome::Terminated(reason)
    }
}

impl std::fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lifecycle")
            .field("cfg", &self.cfg)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use tokio::sync::broadcast;

    use super::*;
    use crate::core::{Console, ManualSignals};
    use crate::tasks::TaskFn;

    const TEST_WINDOW: Duration = Duration::from_secs(5);

    fn lifecycle(policy: ShutdownPolicy, signals: &ManualSignals) -> Lifecycle {
        let mut cfg = Config::named("test");
        cfg.console = Console::buffer();
        Lifecycle::builder(cfg)
            .with_policy(policy)
            .with_signal_source(signals.clone())
            .build()
            .unwrap()
    }

    fn graceful() -> ShutdownPolicy {
        ShutdownPolicy::new([SignalKind::Interrupt, SignalKind::Terminate], TEST_WINDOW, true)
    }

    async fn wait_for(rx: &mut broadcast::Receiver<Event>, pred: impl Fn(&Event) -> bool) {
        loop {
            let ev = rx.recv().await.expect("bus closed");
            if pred(&ev) {
                return;
            }
        }
    }

    /// Task that runs until cancelled, then lingers for `linger` before returning `res`.
    fn lingering(linger: Duration, res: Result<(), TaskError>) -> TaskRef {
        TaskFn::arc("lingering", move |ctx: CancellationToken| {
            let res = res.clone();
            async move {
                ctx.cancelled().await;
                tokio::time::sleep(linger).await;
                res
            }
        })
    }

    fn never_returns() -> TaskRef {
        TaskFn::arc("stuck", |_ctx: CancellationToken| async {
            std::future::pending::<()>().await;
            Ok(())
        })
    }

    #[tokio::test]
    async fn test_no_signals_runs_inline_and_passes_outcome_through() {
        let signals = ManualSignals::new();
        let lc = lifecycle(ShutdownPolicy::no_signals(), &signals);
        let mut rx = lc.subscribe();

        let ok: TaskRef = TaskFn::arc("ok", |_ctx| async { Ok(()) });
        let out = lc.run(&CancellationToken::new(), ok).await.unwrap();
        assert_eq!(out, ExecutionOutcome::Success);

        let failing: TaskRef = TaskFn::arc("fail", |_ctx| async { Err(TaskError::fail("boom")) });
        let out = lc.run(&CancellationToken::new(), failing).await.unwrap();
        assert_eq!(out, ExecutionOutcome::Failure(TaskError::fail("boom")));

        // No plumbing: nothing armed, nothing published.
        assert!(matches!(rx.try_recv(), Err(broadcast::error::TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_no_signals_task_sees_parent_token() {
        let signals = ManualSignals::new();
        let lc = lifecycle(ShutdownPolicy::no_signals(), &signals);
        let parent = CancellationToken::new();
        parent.cancel();

        let task: TaskRef = TaskFn::arc("observe", |ctx: CancellationToken| async move {
            if ctx.is_cancelled() {
                Err(TaskError::Canceled)
            } else {
                Ok(())
            }
        });
        let out = lc.run(&parent, task).await.unwrap();
        assert_eq!(out, ExecutionOutcome::Failure(TaskError::Canceled));
    }

    #[tokio::test]
    async fn test_task_completes_before_any_signal() {
        let signals = ManualSignals::new();
        let lc = lifecycle(graceful(), &signals);
        let mut rx = lc.subscribe();

        let task: TaskRef = TaskFn::arc("quick", |_ctx| async { Err(TaskError::fail("bad input")) });
        let out = lc.run(&CancellationToken::new(), task).await.unwrap();
        assert_eq!(out, ExecutionOutcome::Failure(TaskError::fail("bad input")));

        wait_for(&mut rx, |e| e.is_state(RunState::Completed)).await;
        wait_for(&mut rx, |e| e.kind == EventKind::SignalsDisarmed).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_shutdown_does_not_wait_for_task() {
        let signals = ManualSignals::new();
        let policy = ShutdownPolicy::new([SignalKind::Terminate], Duration::from_secs(30), false);
        let lc = lifecycle(policy, &signals);
        let mut rx = lc.subscribe();

        let handle = {
            let lc = lc.clone();
            tokio::spawn(async move { lc.run(&CancellationToken::new(), never_returns()).await })
        };

        wait_for(&mut rx, |e| e.is_state(RunState::Running)).await;
        assert_eq!(signals.raise(SignalKind::Terminate), 1);

        let out = handle.await.unwrap().unwrap();
        assert_eq!(out, ExecutionOutcome::Terminated(TerminationReason::Immediate));
        assert_eq!(out.termination().unwrap().to_string(), "immediate shutdown");
        assert!(
            lc.config()
                .console
                .contents()
                .unwrap()
                .contains("shutting down immediately")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_untracked_signal_is_ignored() {
        let signals = ManualSignals::new();
        let policy = ShutdownPolicy::new([SignalKind::Terminate], Duration::ZERO, false);
        let lc = lifecycle(policy, &signals);
        let mut rx = lc.subscribe();

        let task: TaskRef = TaskFn::arc("sleepy", |_ctx| async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok(())
        });
        let handle = {
            let lc = lc.clone();
            tokio::spawn(async move { lc.run(&CancellationToken::new(), task).await })
        };

        wait_for(&mut rx, |e| e.is_state(RunState::Running)).await;
        signals.raise(SignalKind::Hangup);

        assert_eq!(handle.await.unwrap().unwrap(), ExecutionOutcome::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_graceful_shutdown_returns_task_outcome() {
        let signals = ManualSignals::new();
        let lc = lifecycle(graceful(), &signals);
        let mut rx = lc.subscribe();

        let task = lingering(Duration::from_secs(1), Err(TaskError::fail("flush failed")));
        let handle = {
            let lc = lc.clone();
            tokio::spawn(async move { lc.run(&CancellationToken::new(), task).await })
        };

        wait_for(&mut rx, |e| e.is_state(RunState::Running)).await;
        signals.raise(SignalKind::Interrupt);
        wait_for(&mut rx, |e| e.is_state(RunState::GracefulWindow)).await;

        let out = handle.await.unwrap().unwrap();
        assert_eq!(out, ExecutionOutcome::Failure(TaskError::fail("flush failed")));
        let printed = lc.config().console.contents().unwrap();
        assert!(printed.contains("waiting 5s for graceful shutdown"));
        assert!(printed.contains("press Ctrl+C again to quit now!"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_graceful_deadline_exceeded() {
        let signals = ManualSignals::new();
        let lc = lifecycle(graceful(), &signals);
        let mut rx = lc.subscribe();

        let handle = {
            let lc = lc.clone();
            tokio::spawn(async move { lc.run(&CancellationToken::new(), never_returns()).await })
        };

        wait_for(&mut rx, |e| e.is_state(RunState::Running)).await;
        signals.raise(SignalKind::Terminate);
        wait_for(&mut rx, |e| e.is_state(RunState::GracefulWindow)).await;
        let opened = tokio::time::Instant::now();

        let out = handle.await.unwrap().unwrap();
        assert_eq!(
            out,
            ExecutionOutcome::Terminated(TerminationReason::DeadlineExceeded {
                timeout: TEST_WINDOW
            })
        );
        assert!(opened.elapsed() >= TEST_WINDOW);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_signal_overrides_graceful_window() {
        let signals = ManualSignals::new();
        let lc = lifecycle(graceful(), &signals);
        let mut rx = lc.subscribe();

        let handle = {
            let lc = lc.clone();
            tokio::spawn(async move { lc.run(&CancellationToken::new(), never_returns()).await })
        };

        wait_for(&mut rx, |e| e.is_state(RunState::Running)).await;
        signals.raise(SignalKind::Interrupt);
        wait_for(&mut rx, |e| e.is_state(RunState::GracefulWindow)).await;
        let opened = tokio::time::Instant::now();
        tokio::time::sleep(Duration::from_secs(1)).await;
        signals.raise(SignalKind::Terminate);

        let out = handle.await.unwrap().unwrap();
        assert_eq!(
            out,
            ExecutionOutcome::Terminated(TerminationReason::Overridden {
                signal: SignalKind::Terminate
            })
        );
        assert!(opened.elapsed() < TEST_WINDOW);
        assert!(lc.config().console.contents().unwrap().contains("exiting..."));
    }

    #[tokio::test(start_paused = true)]
    async fn test_back_to_back_signals_override_without_waiting() {
        let signals = ManualSignals::new();
        let policy = ShutdownPolicy::new([SignalKind::Interrupt], TEST_WINDOW, true);
        let lc = lifecycle(policy, &signals);
        let mut rx = lc.subscribe();

        let handle = {
            let lc = lc.clone();
            tokio::spawn(async move { lc.run(&CancellationToken::new(), never_returns()).await })
        };

        wait_for(&mut rx, |e| e.is_state(RunState::Running)).await;
        let started = tokio::time::Instant::now();
        signals.raise(SignalKind::Interrupt);
        signals.raise(SignalKind::Interrupt);

        let out = handle.await.unwrap().unwrap();
        assert_eq!(
            out,
            ExecutionOutcome::Terminated(TerminationReason::Overridden {
                signal: SignalKind::Interrupt
            })
        );
        assert!(started.elapsed() < TEST_WINDOW);
        assert!(lc.config().console.contents().unwrap().contains("exiting..."));
    }

    #[tokio::test(start_paused = true)]
    async fn test_parent_cancellation_starts_shutdown() {
        let signals = ManualSignals::new();
        let lc = lifecycle(graceful(), &signals);
        let parent = CancellationToken::new();
        let observed = Arc::new(AtomicBool::new(false));

        let task: TaskRef = {
            let observed = observed.clone();
            TaskFn::arc("observer", move |ctx: CancellationToken| {
                let observed = observed.clone();
                async move {
                    ctx.cancelled().await;
                    observed.store(true, Ordering::SeqCst);
                    Ok(())
                }
            })
        };

        let handle = {
            let lc = lc.clone();
            let parent = parent.clone();
            tokio::spawn(async move { lc.run(&parent, task).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        parent.cancel();

        assert_eq!(handle.await.unwrap().unwrap(), ExecutionOutcome::Success);
        assert!(observed.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_signals_released_on_every_path() {
        let signals = ManualSignals::new();
        let policy = ShutdownPolicy::new([SignalKind::Quit], Duration::ZERO, true);
        let lc = lifecycle(policy, &signals);
        let mut rx = lc.subscribe();

        let handle = {
            let lc = lc.clone();
            tokio::spawn(async move { lc.run(&CancellationToken::new(), never_returns()).await })
        };
        wait_for(&mut rx, |e| e.is_state(RunState::Running)).await;
        signals.raise(SignalKind::Quit);
        handle.await.unwrap().unwrap();

        wait_for(&mut rx, |e| e.kind == EventKind::SignalsDisarmed).await;
        // Forwarders are aborted; once they are gone a raise reaches nobody.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(signals.raise(SignalKind::Quit), 0);
    }
}
