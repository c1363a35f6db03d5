//! Lifecycle and application errors.

use core::fmt;
use core::time::Duration;
use trellis_graph::error::DynError;
use trellis_graph::key::TypeKey;

/// The lifecycle phase a hook ran in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// A [`Starter::start`](trellis_graph::capability::Starter::start) call.
    Start,
    /// A [`Stopper::stop`](trellis_graph::capability::Stopper::stop) call,
    /// including stops issued during rollback.
    Stop,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Start => f.write_str("start"),
            Phase::Stop => f.write_str("stop"),
        }
    }
}

/// The state of an [`App`](crate::App).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppState {
    /// Built, never started.
    Created,
    /// `start` is running.
    Starting,
    /// Every start hook succeeded.
    Running,
    /// `stop` is running.
    Stopping,
    /// `stop` has finished.
    Stopped,
    /// `start` failed and the started services were rolled back.
    Failed,
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AppState::Created => "created",
            AppState::Starting => "starting",
            AppState::Running => "running",
            AppState::Stopping => "stopping",
            AppState::Stopped => "stopped",
            AppState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Errors from starting or stopping services.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// A hook returned an error.
    #[error("{phase} of '{service}' failed: {source}")]
    Failed {
        /// The service whose hook failed.
        service: TypeKey,
        /// The phase the hook ran in.
        phase: Phase,
        /// The error the hook returned.
        #[source]
        source: DynError,
    },

    /// A hook did not finish before the phase deadline.
    #[error("{phase} of '{service}' timed out after {timeout:?}")]
    TimedOut {
        /// The service whose hook timed out.
        service: TypeKey,
        /// The phase the hook ran in.
        phase: Phase,
        /// The phase timeout.
        timeout: Duration,
    },

    /// A hook panicked.
    #[error("{phase} of '{service}' panicked")]
    Panicked {
        /// The service whose hook panicked.
        service: TypeKey,
        /// The phase the hook ran in.
        phase: Phase,
    },

    /// The operation is not allowed in the current state.
    #[error("cannot {operation} an application that is {state}")]
    InvalidState {
        /// The state the application was in.
        state: AppState,
        /// The rejected operation.
        operation: &'static str,
    },
}

impl LifecycleError {
    /// Returns the service the error is about, if any.
    #[must_use]
    pub fn service(&self) -> Option<TypeKey> {
        match self {
            LifecycleError::Failed { service, .. }
            | LifecycleError::TimedOut { service, .. }
            | LifecycleError::Panicked { service, .. } => Some(*service),
            LifecycleError::InvalidState { .. } => None,
        }
    }

    /// Returns the phase the error happened in, if any.
    #[must_use]
    pub fn phase(&self) -> Option<Phase> {
        match self {
            LifecycleError::Failed { phase, .. }
            | LifecycleError::TimedOut { phase, .. }
            | LifecycleError::Panicked { phase, .. } => Some(*phase),
            LifecycleError::InvalidState { .. } => None,
        }
    }
}

/// Errors from [`App::run`](crate::App::run).
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Starting failed. Started services were already rolled back.
    #[error("failed to start: {0}")]
    Start(#[source] LifecycleError),

    /// Stopping failed.
    #[error("failed to stop: {0}")]
    Stop(#[source] LifecycleError),

    /// Waiting for the shutdown signal failed.
    #[error("failed to wait for shutdown signal: {0}")]
    Signal(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Database;

    #[test]
    fn failed_message_names_service_and_phase() {
        let err = LifecycleError::Failed {
            service: TypeKey::of::<Database>(),
            phase: Phase::Start,
            source: "port in use".into(),
        };
        let message = err.to_string();
        assert!(message.starts_with("start of '"));
        assert!(message.contains("Database"));
        assert!(message.ends_with("failed: port in use"));
        assert_eq!(err.service(), Some(TypeKey::of::<Database>()));
        assert_eq!(err.phase(), Some(Phase::Start));
    }

    #[test]
    fn timed_out_message_includes_timeout() {
        let err = LifecycleError::TimedOut {
            service: TypeKey::of::<Database>(),
            phase: Phase::Stop,
            timeout: Duration::from_millis(250),
        };
        assert!(err.to_string().ends_with("timed out after 250ms"));
    }

    #[test]
    fn invalid_state_has_no_service() {
        let err = LifecycleError::InvalidState {
            state: AppState::Running,
            operation: "start",
        };
        assert_eq!(err.to_string(), "cannot start an application that is running");
        assert!(err.service().is_none());
        assert!(err.phase().is_none());
    }

    #[test]
    fn app_error_keeps_source() {
        let err = AppError::Stop(LifecycleError::Panicked {
            service: TypeKey::of::<Database>(),
            phase: Phase::Stop,
        });
        assert!(err.to_string().starts_with("failed to stop: stop of '"));
        assert!(core::error::Error::source(&err).is_some());
    }
}
