//! # Result of one controller run.
//!
//! [`ExecutionOutcome`] is produced exactly once per [`Lifecycle::run`](crate::Lifecycle::run)
//! and tells the caller whether the task finished on its own or was abandoned.
//!
//! | Outcome                    | Exit code |
//! |----------------------------|-----------|
//! | `Success`                  | 0         |
//! | `Failure(TaskError)`       | 1         |
//! | `Terminated(reason)`       | 2         |

use std::fmt;
use std::process::ExitCode;
use std::time::Duration;

use crate::error::TaskError;
use crate::policies::SignalKind;

/// Why the controller returned without the task's outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerminationReason {
    /// Policy is not graceful; the first signal ended the run.
    Immediate,
    /// The graceful window elapsed before the task finished.
    DeadlineExceeded {
        /// The window that was exceeded.
        timeout: Duration,
    },
    /// A second signal arrived during the graceful window.
    Overridden {
        /// The signal that forced the exit.
        signal: SignalKind,
    },
}

impl TerminationReason {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            TerminationReason::Immediate => "immediate",
            TerminationReason::DeadlineExceeded { .. } => "deadline_exceeded",
            TerminationReason::Overridden { .. } => "overridden",
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::Immediate => f.write_str("immediate shutdown"),
            TerminationReason::DeadlineExceeded { .. } => {
                f.write_str("graceful shutdown deadline exceeded")
            }
            TerminationReason::Overridden { .. } => {
                f.write_str("shutdown overridden by repeated signal")
            }
        }
    }
}

/// Outcome of a controller run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The task returned `Ok(())`.
    Success,
    /// The task returned an error (passed through unmodified).
    Failure(TaskError),
    /// The controller stopped waiting for the task.
    Terminated(TerminationReason),
}

impl ExecutionOutcome {
    /// `true` only for [`ExecutionOutcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Success)
    }

    /// Numeric process exit status for this outcome.
    pub fn code(&self) -> u8 {
        match self {
            ExecutionOutcome::Success => 0,
            ExecutionOutcome::Failure(_) => 1,
            ExecutionOutcome::Terminated(_) => 2,
        }
    }

    /// Process exit status for this outcome.
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }

    /// Termination reason, if the run was terminated.
    pub fn termination(&self) -> Option<TerminationReason> {
        match self {
            ExecutionOutcome::Terminated(reason) => Some(*reason),
            _ => None,
        }
    }
}

impl From<Result<(), TaskError>> for ExecutionOutcome {
    fn from(res: Result<(), TaskError>) -> Self {
        match res {
            Ok(()) => ExecutionOutcome::Success,
            Err(e) => ExecutionOutcome::Failure(e),
        }
    }
}

impl fmt::Display for ExecutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionOutcome::Success => f.write_str("success"),
            ExecutionOutcome::Failure(e) => write!(f, "failure: {e}"),
            ExecutionOutcome::Terminated(reason) => write!(f, "terminated: {reason}"),
        }
    }
}
