//! Application lifecycle over a built object graph.
//!
//! An [`App`] owns a [`Graph`] and drives the start and stop hooks registered
//! on its providers:
//!
//! - **`start`** runs start hooks in instantiation order, so a service starts
//!   after everything it depends on. The first failure stops every service
//!   started so far, in reverse, and the app becomes [`AppState::Failed`].
//! - **`stop`** runs stop hooks in reverse instantiation order, so a service
//!   stops before its dependencies. All hooks run even if some fail; the
//!   first failure is returned.
//!
//! Each phase has one deadline covering all of its hooks. Every hook runs on
//! its own tokio task; a hook still running at the deadline is reported as
//! [`LifecycleError::TimedOut`] and left to finish in the background.
//!
//! Dropping a `start` future before it completes leaves the app
//! [`AppState::Failed`] with the services started so far still running; a
//! later `stop` stops exactly those.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use std::time::Duration;
//! use trellis_app::prelude::*;
//!
//! #[derive(Default)]
//! struct Server {
//!     running: AtomicBool,
//! }
//!
//! #[async_trait]
//! impl Starter for Server {
//!     async fn start(&self) -> Result<(), DynError> {
//!         self.running.store(true, Ordering::SeqCst);
//!         Ok(())
//!     }
//! }
//!
//! #[async_trait]
//! impl Stopper for Server {
//!     async fn stop(&self) -> Result<(), DynError> {
//!         self.running.store(false, Ordering::SeqCst);
//!         Ok(())
//!     }
//! }
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let app = App::new(module_fn("server", |m| {
//!     m.provide(Server::default)?.with_lifecycle();
//!     Ok(())
//! }))
//! .unwrap();
//!
//! app.start(Duration::from_secs(1)).await.unwrap();
//! assert!(app.graph().must_get::<Server>().running.load(Ordering::SeqCst));
//!
//! app.stop(Duration::from_secs(1)).await.unwrap();
//! assert_eq!(app.state(), AppState::Stopped);
//! # });
//! ```

use crate::config::AppConfig;
use crate::error::{AppError, AppState, LifecycleError, Phase};
use crate::signal;
use crate::tracing_setup::TracingSetup;
use core::future::Future;
use core::time::Duration;
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use tokio::time::Instant;
use trellis_graph::capability::Hook;
use trellis_graph::error::BuildError;
use trellis_graph::graph::{Graph, GraphEntry};
use trellis_graph::key::TypeKey;
use trellis_graph::module::Modules;

// ─────────────────────────────────────────────────────────────────────────────
// App
// ─────────────────────────────────────────────────────────────────────────────

/// A built object graph together with its lifecycle state.
pub struct App {
    graph: Arc<Graph>,
    config: AppConfig,
    tracing: Option<TracingSetup>,
    state: Mutex<AppState>,
    /// Indices into `graph.ordered()` of the services currently started.
    started: Mutex<Vec<usize>>,
}

impl App {
    /// Resolves `modules` and builds the graph.
    ///
    /// # Errors
    ///
    /// Returns the [`BuildError`] from resolution or instantiation.
    pub fn new(modules: impl Modules) -> Result<Self, BuildError> {
        let graph = trellis_graph::build_graph(modules)?;
        Ok(Self::from_graph(graph))
    }

    /// Wraps an already built graph.
    pub fn from_graph(graph: impl Into<Arc<Graph>>) -> Self {
        Self {
            graph: graph.into(),
            config: AppConfig::default(),
            tracing: None,
            state: Mutex::new(AppState::Created),
            started: Mutex::new(Vec::new()),
        }
    }

    /// Sets the timeouts used by [`run`](Self::run).
    #[must_use]
    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    /// Installs `setup` as the global subscriber when [`run`](Self::run)
    /// begins.
    #[must_use]
    pub fn with_tracing(mut self, setup: TracingSetup) -> Self {
        self.tracing = Some(setup);
        self
    }

    /// Returns the object graph.
    #[must_use]
    pub fn graph(&self) -> &Arc<Graph> {
        &self.graph
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> AppState {
        *self.state.lock()
    }

    /// Returns the services whose start hook has completed and which have
    /// not been stopped since, in start order.
    #[must_use]
    pub fn started(&self) -> Vec<TypeKey> {
        let ordered = self.graph.ordered();
        self.started
            .lock()
            .iter()
            .filter_map(|&index| ordered.get(index))
            .map(GraphEntry::key)
            .collect()
    }

    /// Starts every service with a start hook, in dependency order.
    ///
    /// All hooks share one deadline, `timeout` from now. On the first
    /// failure, every service already started is stopped in reverse order
    /// under a fresh deadline of the same duration. Failures during that
    /// rollback are logged, not returned.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::InvalidState`] unless the app is
    ///   [`AppState::Created`].
    /// - The first [`LifecycleError`] raised by a start hook.
    pub async fn start(&self, timeout: Duration) -> Result<(), LifecycleError> {
        self.transition(&[AppState::Created], AppState::Starting, "start")?;
        let _unfinished = StartGuard(&self.state);

        let deadline = Instant::now() + timeout;
        self.started.lock().clear();
        tracing::info!(services = self.graph.len(), ?timeout, "starting application");

        for (index, entry) in self.graph.ordered().iter().enumerate() {
            let Some(hook) = entry.capabilities().start() else {
                continue;
            };

            match invoke(entry, hook, Phase::Start, deadline, timeout).await {
                Ok(()) => {
                    tracing::debug!(service = %entry.key(), "service started");
                    self.started.lock().push(index);
                }
                Err(err) => {
                    tracing::error!(error = %err, "start failed");
                    let started = core::mem::take(&mut *self.started.lock());
                    if !started.is_empty() {
                        self.rollback(&started, timeout).await;
                    }
                    *self.state.lock() = AppState::Failed;
                    return Err(err);
                }
            }
        }

        let started = self.started.lock().len();
        tracing::info!(started, "application started");
        *self.state.lock() = AppState::Running;
        Ok(())
    }

    /// Stops every service with a stop hook, in reverse dependency order.
    ///
    /// Every hook runs even if an earlier one fails. All hooks share one
    /// deadline, `timeout` from now. Stopping a [`AppState::Stopped`] app, or
    /// a [`AppState::Failed`] one whose start was rolled back, does nothing.
    /// A [`AppState::Failed`] app whose start was cancelled stops only the
    /// services that start had already started.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::InvalidState`] while a start or stop is running.
    /// - The first [`LifecycleError`] raised by a stop hook. Later failures
    ///   are logged.
    pub async fn stop(&self, timeout: Duration) -> Result<(), LifecycleError> {
        let targets: Vec<usize> = {
            let mut state = self.state.lock();
            match *state {
                AppState::Stopped => {
                    tracing::debug!(state = %*state, "stop skipped");
                    return Ok(());
                }
                AppState::Failed => {
                    let leftover = self.started.lock().clone();
                    if leftover.is_empty() {
                        tracing::debug!(state = %*state, "stop skipped");
                        return Ok(());
                    }
                    *state = AppState::Stopping;
                    leftover
                }
                AppState::Starting | AppState::Stopping => {
                    return Err(LifecycleError::InvalidState {
                        state: *state,
                        operation: "stop",
                    });
                }
                AppState::Created | AppState::Running => {
                    *state = AppState::Stopping;
                    (0..self.graph.ordered().len()).collect()
                }
            }
        };

        let deadline = Instant::now() + timeout;
        let mut first_error = None;
        tracing::info!(?timeout, "stopping application");

        for &index in targets.iter().rev() {
            let Some(entry) = self.graph.ordered().get(index) else {
                continue;
            };
            let Some(hook) = entry.capabilities().stop() else {
                continue;
            };

            match invoke(entry, hook, Phase::Stop, deadline, timeout).await {
                Ok(()) => tracing::debug!(service = %entry.key(), "service stopped"),
                Err(err) if first_error.is_none() => {
                    tracing::error!(error = %err, "stop failed");
                    first_error = Some(err);
                }
                Err(err) => tracing::warn!(error = %err, "additional stop failure"),
            }
        }

        self.started.lock().clear();
        *self.state.lock() = AppState::Stopped;

        match first_error {
            Some(err) => Err(err),
            None => {
                tracing::info!("application stopped");
                Ok(())
            }
        }
    }

    /// Starts the app, waits for Ctrl-C or SIGTERM, then stops it.
    ///
    /// Uses the timeouts from [`AppConfig`] and installs the
    /// [`TracingSetup`], if one was given.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error; see [`run_until`](Self::run_until).
    pub async fn run(&self) -> Result<(), AppError> {
        self.run_until(signal::shutdown_signal()).await
    }

    /// Starts the app, waits for `shutdown` to complete, then stops it.
    ///
    /// If starting fails, the started services have already been rolled back
    /// and `stop` is not called again. The app is stopped even when
    /// `shutdown` resolves to an error.
    ///
    /// # Errors
    ///
    /// - [`AppError::Start`] if starting failed.
    /// - [`AppError::Signal`] if `shutdown` resolved to an error.
    /// - [`AppError::Stop`] if stopping failed.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<(), AppError>
    where
        F: Future<Output = io::Result<()>>,
    {
        if let Some(setup) = &self.tracing {
            setup.init();
        }

        self.start(self.config.start_timeout)
            .await
            .map_err(AppError::Start)?;

        let signal = shutdown.await;
        if let Err(err) = &signal {
            tracing::error!(error = %err, "shutdown signal failed");
        }

        let stopped = self.stop(self.config.stop_timeout).await;
        signal.map_err(AppError::Signal)?;
        stopped.map_err(AppError::Stop)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal
    // ─────────────────────────────────────────────────────────────────────────

    fn transition(
        &self,
        from: &[AppState],
        to: AppState,
        operation: &'static str,
    ) -> Result<(), LifecycleError> {
        let mut state = self.state.lock();
        if !from.contains(&*state) {
            return Err(LifecycleError::InvalidState {
                state: *state,
                operation,
            });
        }
        *state = to;
        Ok(())
    }

    /// Stops the given started services in reverse order. Failures are
    /// logged.
    async fn rollback(&self, started: &[usize], timeout: Duration) {
        let deadline = Instant::now() + timeout;
        tracing::warn!(services = started.len(), "rolling back started services");

        for &index in started.iter().rev() {
            let Some(entry) = self.graph.ordered().get(index) else {
                continue;
            };
            let Some(hook) = entry.capabilities().stop() else {
                continue;
            };
            if let Err(err) = invoke(entry, hook, Phase::Stop, deadline, timeout).await {
                tracing::warn!(error = %err, "rollback stop failed");
            }
        }
    }
}

impl core::fmt::Debug for App {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("App")
            .field("services", &self.graph.len())
            .field("config", &self.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Marks an unfinished start as failed when its future is dropped.
struct StartGuard<'a>(&'a Mutex<AppState>);

impl Drop for StartGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.0.lock();
        if *state == AppState::Starting {
            tracing::warn!("start cancelled before completion");
            *state = AppState::Failed;
        }
    }
}

/// Runs one hook on its own task, bounded by `deadline`.
async fn invoke(
    entry: &GraphEntry,
    hook: &Hook,
    phase: Phase,
    deadline: Instant,
    timeout: Duration,
) -> Result<(), LifecycleError> {
    let service = entry.key();
    let task = tokio::spawn(hook(Arc::clone(entry.instance())));

    match tokio::time::timeout_at(deadline, task).await {
        Ok(Ok(Ok(()))) => Ok(()),
        Ok(Ok(Err(source))) => Err(LifecycleError::Failed {
            service,
            phase,
            source,
        }),
        Ok(Err(join)) if join.is_panic() => Err(LifecycleError::Panicked { service, phase }),
        Ok(Err(join)) => Err(LifecycleError::Failed {
            service,
            phase,
            source: Box::new(join),
        }),
        Err(_elapsed) => Err(LifecycleError::TimedOut {
            service,
            phase,
            timeout,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_graph::module::module_fn;

    struct Plain;

    fn plain_app() -> App {
        App::new(module_fn("plain", |m| m.provide(|| Plain).map(|_| ()))).unwrap()
    }

    #[tokio::test]
    async fn services_without_hooks_are_skipped() {
        let app = plain_app();
        app.start(Duration::from_secs(1)).await.unwrap();
        assert_eq!(app.state(), AppState::Running);
        app.stop(Duration::from_secs(1)).await.unwrap();
        assert_eq!(app.state(), AppState::Stopped);
    }

    #[tokio::test]
    async fn start_twice_is_invalid() {
        let app = plain_app();
        app.start(Duration::from_secs(1)).await.unwrap();

        let err = app.start(Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::InvalidState {
                state: AppState::Running,
                operation: "start"
            }
        ));
    }

    #[tokio::test]
    async fn stop_after_stop_is_a_no_op() {
        let app = plain_app();
        app.stop(Duration::from_secs(1)).await.unwrap();
        app.stop(Duration::from_secs(1)).await.unwrap();
        assert_eq!(app.state(), AppState::Stopped);

        let err = app.start(Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidState { .. }));
    }

    #[test]
    fn builders_and_debug() {
        let app = plain_app()
            .with_config(AppConfig::default().with_start_timeout(Duration::from_secs(2)))
            .with_tracing(TracingSetup::default());

        assert_eq!(app.config().start_timeout, Duration::from_secs(2));
        assert_eq!(app.state(), AppState::Created);
        assert!(app.graph().contains::<Plain>());
        assert!(format!("{app:?}").contains("services: 1"));
    }
}
