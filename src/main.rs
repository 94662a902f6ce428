//! collation-fixer - Main entry point.
//!
//! Lists and converts the character set and collation of MySQL/MariaDB tables
//! and columns.

use collation_fixer::commands::{self, RunStatus};
use collation_fixer::config::Config;
use collation_fixer::db::ConnectionManager;
use std::process::ExitCode;
use tracing::{debug, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr so listings on stdout stay machine-readable.
fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter()));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let config = Config::parse_args();
    init_tracing(&config);

    if let Some(path) = &config.env_file {
        debug!(path = %path.display(), "Loaded environment file");
    }

    let mut manager = ConnectionManager::new(config.connection_settings());
    debug!(
        target = %manager.settings().display_target(),
        "Starting collation-fixer v{}",
        env!("CARGO_PKG_VERSION")
    );

    let result = commands::run(&config, &mut manager).await;
    manager.disconnect().await;

    match result {
        Ok(RunStatus::Success) => ExitCode::SUCCESS,
        Ok(status) => {
            warn!("Some items failed to convert; see the report above");
            ExitCode::from(status.exit_code())
        }
        Err(e) => {
            debug!(error = ?e, "Command failed");
            eprintln!("Error: {e}");
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Hint: {suggestion}");
            }
            ExitCode::FAILURE
        }
    }
}
