use std::fmt;

/// Lifecycle controller state.
///
/// ```text
/// Running ──► Completed
///    │
///    └──► SignalReceived ──► ForcedExit                     (not graceful)
///                 │
///                 └──► GracefulWindow ──► Completed         (task finished)
///                                    ├──► ForcedExit        (deadline)
///                                    └──► ForcedExit        (second signal)
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RunState {
    /// Task started, signals armed.
    Running,
    /// A tracked signal (or parent cancellation) arrived before the task finished.
    SignalReceived,
    /// Waiting for the task within the graceful window.
    GracefulWindow,
    /// Returned without waiting for the task.
    ForcedExit,
    /// The task's own outcome was returned.
    Completed,
}

impl RunState {
    /// Short stable label (snake_case).
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Running => "running",
            RunState::SignalReceived => "signal_received",
            RunState::GracefulWindow => "graceful_window",
            RunState::ForcedExit => "forced_exit",
            RunState::Completed => "completed",
        }
    }

    /// `true` for `ForcedExit` and `Completed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::ForcedExit | RunState::Completed)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
