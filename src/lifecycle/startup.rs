//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration
//! - Initialize subsystems in dependency order
//! - Start the wrapped process and its supervisor (wrap mode)
//! - Bind the listener and serve until a terminal event
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Signal handlers are installed before the child is spawned
//! - The child is spawned before the listener binds; if binding fails, dropping the
//!   supervisor kills it
//! - Listeners start last (traffic only when ready)

use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::{validate_config, RedirectorConfig, ValidationError};
use crate::http::proxy::{ProxyError, ReverseProxy};
use crate::http::HttpServer;
use crate::lifecycle::shutdown::{Shutdown, TerminalEvent};
use crate::lifecycle::signals::spawn_signal_shutdown;
use crate::observability::metrics;
use crate::routing::Redirector;
use crate::supervisor::{SignalRelay, SupervisorError};

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {} error(s)", .0.len())]
    Config(Vec<ValidationError>),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Supervisor(#[from] SupervisorError),

    #[error(transparent)]
    Proxy(#[from] ProxyError),

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

impl StartupError {
    /// Log this error, one line per configuration problem.
    pub fn report(&self) {
        match self {
            StartupError::Config(errors) => {
                for error in errors {
                    tracing::error!(error = %error, "Invalid configuration");
                }
            }
            other => tracing::error!(error = %other, "Startup failed"),
        }
    }
}

/// Run the service until its terminal event.
pub async fn run(config: RedirectorConfig) -> Result<TerminalEvent, StartupError> {
    let validated = validate_config(&config).map_err(StartupError::Config)?;

    for route in validated.routes.values() {
        tracing::info!(
            pattern = %route.pattern,
            destination = %route.destination,
            status = route.status.as_u16(),
            carry_path = route.carry_path,
            carry_query = route.carry_query,
            "Route configured"
        );
    }

    if let Some(addr) = validated.metrics_address {
        metrics::init_metrics(addr)?;
    }

    let shutdown = Shutdown::new();
    let mut redirector = Redirector::new(validated.routes);

    match validated.wrap {
        Some(process) => {
            let proxy = ReverseProxy::new(process.port())?;
            let relay = SignalRelay::install().map_err(SupervisorError::Relay)?;
            let running = process.start()?;
            running.spawn_supervision(relay, shutdown.clone());
            redirector = redirector.with_fallback(proxy);
        }
        None => {
            spawn_signal_shutdown(shutdown.clone());
        }
    }

    let address = config.listener.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.clone(),
            source,
        })?;

    tracing::info!(
        address = %address,
        routes = redirector.routes().len(),
        fallback = redirector.has_fallback(),
        request_timeout_secs = config.timeouts.request_secs,
        shutdown_timeout_secs = config.timeouts.shutdown_secs,
        "Listening for connections"
    );

    let server = HttpServer::new(Arc::new(redirector), &config.timeouts);
    let waiter = shutdown.clone();
    server
        .run(listener, async move {
            waiter.wait().await;
        })
        .await
        .map_err(StartupError::Serve)?;

    let event = shutdown.event().unwrap_or(TerminalEvent::Signal);
    tracing::info!(?event, "Shutdown complete");
    Ok(event)
}
