//! Error types used by the taskwarden runtime, tasks and handler registry.
//!
//! - [`ConfigError`] invalid construction input, reported before anything runs.
//! - [`RuntimeError`] failures of the lifecycle controller itself.
//! - [`TaskError`] errors raised by a task; passed through unmodified.
//! - [`RegistryError`] rejected handler registrations.
//! - [`DispatchError`] a message could not be queued for its handler.
//! - [`PoolError`] misuse of a worker pool.
//!
//! Every enum provides `as_label` (stable snake_case string for logs/metrics).

use thiserror::Error;

/// # Configuration errors.
///
/// Surfaced synchronously by builders; never retried.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The lifecycle was built without a shutdown policy.
    #[error("shutdown policy is required")]
    MissingPolicy,

    /// The instance name is empty.
    #[error("name is required")]
    InvalidName,
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::MissingPolicy => "config_missing_policy",
            ConfigError::InvalidName => "config_invalid_name",
        }
    }
}

/// # Errors produced by the lifecycle controller.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The OS refused a signal subscription.
    #[error("failed to register signal handler: {0}")]
    SignalRegistration(#[from] std::io::Error),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use taskwarden::RuntimeError;
    ///
    /// let err = RuntimeError::SignalRegistration(std::io::Error::other("denied"));
    /// assert_eq!(err.as_label(), "runtime_signal_registration");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::SignalRegistration(_) => "runtime_signal_registration",
        }
    }
}

/// # Errors produced by task execution.
///
/// The controller never retries or rewraps these: whatever a task returns
/// is what the caller receives in
/// [`ExecutionOutcome::Failure`](crate::ExecutionOutcome::Failure).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Task execution failed.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Task observed cancellation and gave up.
    #[error("context cancelled")]
    Canceled,

    /// Task panicked; the panic was caught by the runner.
    #[error("task panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },
}

impl TaskError {
    /// Shorthand for [`TaskError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        TaskError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use taskwarden::TaskError;
    ///
    /// assert_eq!(TaskError::fail("boom").as_label(), "task_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Canceled => "task_canceled",
            TaskError::Panicked { .. } => "task_panicked",
        }
    }
}

/// # Handler registration errors.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A handler is already bound to this exact subject in the module.
    #[error("subject handler already exists in module: {subject}")]
    DuplicateSubject {
        /// The contested subject.
        subject: String,
    },

    /// The handler's declared shape is unusable.
    #[error("invalid handler {handler:?}: {reason}")]
    InvalidHandler {
        /// Handler name.
        handler: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// The module was shut down and takes no new handlers.
    #[error("module is shut down: {module}")]
    ModuleShutDown {
        /// Module name.
        module: String,
    },
}

impl RegistryError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RegistryError::DuplicateSubject { .. } => "registry_duplicate_subject",
            RegistryError::InvalidHandler { .. } => "registry_invalid_handler",
            RegistryError::ModuleShutDown { .. } => "registry_module_shut_down",
        }
    }
}

/// # Dispatch errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// No handler is bound to the message subject.
    #[error("no handler for subject {0:?}")]
    NoHandler(String),

    /// The handler queue is full (only from `try_dispatch`).
    #[error("handler queue full for subject {0:?}")]
    Full(String),

    /// The handler queue has been closed.
    #[error("handler queue closed for subject {0:?}")]
    Closed(String),
}

impl DispatchError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            DispatchError::NoHandler(_) => "dispatch_no_handler",
            DispatchError::Full(_) => "dispatch_full",
            DispatchError::Closed(_) => "dispatch_closed",
        }
    }
}

/// # Worker pool misuse.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// `start` was called on a pool that is already running.
    #[error("worker pool already started")]
    AlreadyStarted,

    /// `start` was called after `shutdown`.
    #[error("worker pool is shut down")]
    ShutDown,
}

impl PoolError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            PoolError::AlreadyStarted => "pool_already_started",
            PoolError::ShutDown => "pool_shut_down",
        }
    }
}
