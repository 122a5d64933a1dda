//! HTTP Redirector
//!
//! Answers every request with a redirect chosen by host and path, or hands it to a
//! wrapped backend process.
//!
//! # Architecture Overview
//!
//! ```text
//!                              ┌──────────────────────────────────────────────────┐
//!                              │                   REDIRECTOR                     │
//!                              │                                                  │
//!     Client Request           │  ┌─────────┐    ┌──────────────┐                 │
//!     ─────────────────────────┼─▶│  http   │───▶│   routing    │                 │
//!                              │  │ server  │    │ pattern trie │                 │
//!                              │  └─────────┘    └──────┬───────┘                 │
//!                              │                  match │ miss                    │
//!                              │             ┌──────────┴────────┐                │
//!                              │             ▼                   ▼                │
//!     Client Response          │  ┌──────────────────┐  ┌──────────────┐          │
//!     ◀────────────────────────┼──│ 3xx + Location   │  │ proxy / 404  │──────────┼──── Wrapped
//!                              │  └──────────────────┘  └──────────────┘          │     Process
//!                              │                                                  │
//!                              │  ┌────────────────────────────────────────────┐  │
//!                              │  │ config · lifecycle · supervisor · metrics  │  │
//!                              │  └────────────────────────────────────────────┘  │
//!                              └──────────────────────────────────────────────────┘
//! ```

use std::process::ExitCode;

use clap::Parser;

use redirector::cli::{normalize_flags, Cli};
use redirector::lifecycle;
use redirector::observability::logging::init_logging;

#[tokio::main]
async fn main() -> ExitCode {
    let args = std::env::args_os().map(|arg| arg.to_string_lossy().into_owned());
    let cli = match Cli::try_parse_from(normalize_flags(args)) {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let cli_log_level = cli.log_level.clone();
    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            init_logging(cli_log_level.as_deref().unwrap_or("info"));
            tracing::error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config.observability.log_level);
    tracing::info!("redirector v{} starting", env!("CARGO_PKG_VERSION"));

    match lifecycle::run(config).await {
        Ok(event) => event.exit_code(),
        Err(e) => {
            e.report();
            ExitCode::FAILURE
        }
    }
}
