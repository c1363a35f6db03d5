//! Application lifecycle for trellis object graphs.
//!
//! `trellis_app` wraps a [`Graph`](trellis_graph::graph::Graph) in an [`App`]
//! that starts services in dependency order, stops them in reverse, rolls
//! back a partial start, and waits for a shutdown signal:
//!
//! - [`app`] - the [`App`] runner
//! - [`config`] - phase timeouts
//! - [`error`] - lifecycle errors and states
//! - [`signal`] - Ctrl-C / SIGTERM handling
//! - [`tracing_setup`] - global subscriber installation
//!
//! Services opt in to lifecycle hooks when they are provided, by
//! implementing [`Starter`] or [`Stopper`] and calling `with_start`,
//! `with_stop` or `with_lifecycle` on the registration.

/// The application runner.
pub mod app;

/// Application configuration.
pub mod config;

/// Lifecycle errors and states.
pub mod error;

/// Shutdown signal handling.
pub mod signal;

/// Global subscriber installation.
pub mod tracing_setup;

pub use app::App;
pub use config::{AppConfig, DEFAULT_START_TIMEOUT, DEFAULT_STOP_TIMEOUT};
pub use error::{AppError, AppState, LifecycleError, Phase};
pub use tracing_setup::{TracingFormat, TracingSetup};
pub use trellis_graph::capability::{Starter, Stopper};

/// Re-export all common types for easy access, including the
/// `trellis_graph` prelude.
pub mod prelude {
    pub use crate::app::App;
    pub use crate::config::AppConfig;
    pub use crate::error::{AppError, AppState, LifecycleError, Phase};
    pub use crate::signal::shutdown_signal;
    pub use crate::tracing_setup::{TracingFormat, TracingSetup};
    pub use trellis_graph::prelude::*;
}
