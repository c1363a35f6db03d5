//! Example service built with Trellis.
//!
//! A heartbeat that logs a beat on a fixed interval. Its settings come from
//! the environment, the beat counter is shared through the object graph, and
//! the background task is started and stopped by the application lifecycle.

use core::time::Duration;
use std::num::ParseIntError;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use trellis_graph::prelude::*;

/// Environment variable holding the beat interval in milliseconds.
pub const INTERVAL_VAR: &str = "HEARTBEAT_INTERVAL_MS";

/// Environment variable holding the heartbeat name.
pub const NAME_VAR: &str = "HEARTBEAT_NAME";

// ─────────────────────────────────────────────────────────────────────────────
// Settings
// ─────────────────────────────────────────────────────────────────────────────

/// Errors raised while reading [`Settings`].
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The interval is not a whole number of milliseconds.
    #[error("invalid {INTERVAL_VAR} '{value}': {source}")]
    InvalidInterval {
        /// The raw value.
        value: String,
        /// The parse failure.
        #[source]
        source: ParseIntError,
    },
    /// The interval is zero.
    #[error("{INTERVAL_VAR} must be greater than zero")]
    ZeroInterval,
}

/// Heartbeat settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Name included in every beat.
    pub name: String,
    /// Time between beats.
    pub interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            name: "heartbeat".to_owned(),
            interval: Duration::from_secs(1),
        }
    }
}

impl Settings {
    /// Reads settings from the environment, keeping defaults for unset
    /// variables.
    ///
    /// # Errors
    ///
    /// Returns a [`SettingsError`] if the interval is malformed or zero.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let mut settings = Self::default();

        if let Some(name) = lookup(NAME_VAR) {
            settings.name = name;
        }
        if let Some(value) = lookup(INTERVAL_VAR) {
            let millis: u64 = value
                .trim()
                .parse()
                .map_err(|source| SettingsError::InvalidInterval { value, source })?;
            if millis == 0 {
                return Err(SettingsError::ZeroInterval);
            }
            settings.interval = Duration::from_millis(millis);
        }

        Ok(settings)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Heartbeat
// ─────────────────────────────────────────────────────────────────────────────

/// Counts beats.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    /// Returns the number of beats so far.
    #[must_use]
    pub fn beats(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    fn tick(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

struct Running {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Logs a beat every [`Settings::interval`] while running.
pub struct Heartbeat {
    settings: Arc<Settings>,
    counter: Arc<Counter>,
    running: Mutex<Option<Running>>,
}

impl Heartbeat {
    /// Creates a stopped heartbeat.
    #[must_use]
    pub fn new(settings: Arc<Settings>, counter: Arc<Counter>) -> Self {
        Self {
            settings,
            counter,
            running: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Starter for Heartbeat {
    async fn start(&self) -> Result<(), DynError> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Ok(());
        }

        let (shutdown, mut stopped) = oneshot::channel();
        let settings = Arc::clone(&self.settings);
        let counter = Arc::clone(&self.counter);

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(settings.interval);
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = &mut stopped => break,
                    _ = interval.tick() => {
                        let beat = counter.tick();
                        tracing::info!(name = %settings.name, beat, "beat");
                    }
                }
            }
        });

        tracing::info!(name = %self.settings.name, interval = ?self.settings.interval, "heartbeat started");
        *running = Some(Running { shutdown, task });
        Ok(())
    }
}

#[async_trait]
impl Stopper for Heartbeat {
    async fn stop(&self) -> Result<(), DynError> {
        let Some(Running { shutdown, task }) = self.running.lock().await.take() else {
            return Ok(());
        };

        let _ = shutdown.send(());
        task.await?;
        tracing::info!(beats = self.counter.beats(), "heartbeat stopped");
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Modules
// ─────────────────────────────────────────────────────────────────────────────

/// Provides [`Settings`] read from the environment.
pub fn settings_module(m: &mut ModuleBuilder) -> Result<(), ModuleError> {
    m.try_provide(Settings::from_env)?;
    Ok(())
}

/// Provides the [`Counter`] and the [`Heartbeat`], importing the settings.
pub fn heartbeat_module(m: &mut ModuleBuilder) -> Result<(), ModuleError> {
    m.import(module_fn("settings", settings_module))?;
    m.provide(Counter::default)?;
    m.provide(Heartbeat::new)?.with_lifecycle();
    Ok(())
}

/// Every module of the example.
#[must_use]
pub fn modules() -> ModuleGroup {
    ModuleGroup::new().add(module_fn("heartbeat", heartbeat_module))
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_app::prelude::{App, AppState};

    #[test]
    fn settings_defaults_and_overrides() {
        let settings = Settings::from_lookup(|_| None).unwrap();
        assert_eq!(settings, Settings::default());

        let settings = Settings::from_lookup(|key| match key {
            NAME_VAR => Some("pulse".to_owned()),
            INTERVAL_VAR => Some(" 250 ".to_owned()),
            _ => None,
        })
        .unwrap();
        assert_eq!(settings.name, "pulse");
        assert_eq!(settings.interval, Duration::from_millis(250));
    }

    #[test]
    fn settings_reject_bad_intervals() {
        let err = Settings::from_lookup(|key| (key == INTERVAL_VAR).then(|| "soon".to_owned()))
            .unwrap_err();
        assert!(matches!(err, SettingsError::InvalidInterval { ref value, .. } if value == "soon"));

        let err = Settings::from_lookup(|key| (key == INTERVAL_VAR).then(|| "0".to_owned()))
            .unwrap_err();
        assert!(matches!(err, SettingsError::ZeroInterval));
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_beats_while_running() {
        let settings = Settings {
            name: "test".to_owned(),
            interval: Duration::from_millis(100),
        };
        let app = App::new(module_fn("test", move |m| {
            m.instance(settings.clone())?;
            m.provide(Counter::default)?;
            m.provide(Heartbeat::new)?.with_lifecycle();
            Ok(())
        }))
        .unwrap();

        app.start(Duration::from_secs(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(350)).await;
        app.stop(Duration::from_secs(1)).await.unwrap();

        let beats = app.graph().must_get::<Counter>().beats();
        assert!(beats >= 3, "expected at least 3 beats, got {beats}");
        assert_eq!(app.state(), AppState::Stopped);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(app.graph().must_get::<Counter>().beats(), beats);
    }

    #[test]
    fn example_modules_resolve() {
        let registry = Registry::resolve(modules()).unwrap();
        assert!(registry.provides::<Heartbeat>());
        assert!(registry.provides::<Settings>());
    }
}
