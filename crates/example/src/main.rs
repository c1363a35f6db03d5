//! Heartbeat example.
//!
//! Logs a beat on an interval until Ctrl-C or SIGTERM.
//!
//! # Usage
//!
//! ```bash
//! HEARTBEAT_INTERVAL_MS=500 HEARTBEAT_NAME=pulse heartbeat
//! ```
//!
//! Set `RUST_LOG` to change the log filter and `HEARTBEAT_LOG_FORMAT=json`
//! for structured output.

use core::time::Duration;
use std::process::ExitCode;
use trellis_app::prelude::*;

#[tokio::main]
#[expect(clippy::print_stderr, reason = "build errors are reported before tracing is installed")]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    let format = match std::env::var("HEARTBEAT_LOG_FORMAT").as_deref() {
        Ok("json") => TracingFormat::Json,
        Ok("compact") => TracingFormat::Compact,
        _ => TracingFormat::Pretty,
    };
    let mut setup = TracingSetup::new().with_format(format);
    if let Ok(filter) = std::env::var("RUST_LOG") {
        setup = setup.with_env_filter(filter);
    }

    let app = match App::new(example::modules()) {
        Ok(app) => app,
        Err(err) => {
            // Tracing is not installed until `run`.
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let app = app
        .with_config(
            AppConfig::new()
                .with_start_timeout(Duration::from_secs(5))
                .with_stop_timeout(Duration::from_secs(5)),
        )
        .with_tracing(setup);

    match app.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "heartbeat exited with an error");
            ExitCode::FAILURE
        }
    }
}
