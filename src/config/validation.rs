//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Compile route specs into the route table, rejecting duplicates
//! - Validate value ranges (timeouts > 0, distinct ports)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RedirectorConfig → Result<ValidatedConfig, Vec<ValidationError>>
//! - Runs before any socket is bound or process spawned

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{RedirectorConfig, RouteSource};
use crate::routing::router::{insert_route, RouteTable};
use crate::routing::{Route, RouteError, TrieError};
use crate::supervisor::{SupervisorError, WrappedProcess};

/// A single semantic problem with the configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("error parsing route {origin} = {spec:?}: {error}")]
    Route {
        origin: RouteSource,
        spec: String,
        #[source]
        error: RouteError,
    },

    #[error("error adding route {origin}: {error}")]
    Pattern {
        origin: RouteSource,
        #[source]
        error: TrieError,
    },

    #[error("wrap port {port} must differ from the service port")]
    PortConflict { port: u16 },

    #[error(transparent)]
    Wrap(#[from] SupervisorError),

    #[error("request timeout must be greater than zero")]
    ZeroTimeout,

    #[error("invalid metrics address {address:?}: {source}")]
    MetricsAddress {
        address: String,
        #[source]
        source: std::net::AddrParseError,
    },
}

/// Everything startup needs, checked and compiled.
#[derive(Debug)]
pub struct ValidatedConfig {
    pub routes: RouteTable,
    pub wrap: Option<WrappedProcess>,
    pub metrics_address: Option<SocketAddr>,
}

/// Validate `config`, collecting every problem found.
pub fn validate_config(config: &RedirectorConfig) -> Result<ValidatedConfig, Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut routes = RouteTable::new();
    for entry in &config.routes {
        let route = match Route::parse(&entry.spec) {
            Ok(route) => route,
            Err(error) => {
                errors.push(ValidationError::Route {
                    origin: entry.source.clone(),
                    spec: entry.spec.clone(),
                    error,
                });
                continue;
            }
        };
        if let Err(error) = insert_route(&mut routes, route) {
            errors.push(ValidationError::Pattern {
                origin: entry.source.clone(),
                error,
            });
        }
    }

    let wrap = match &config.wrap {
        Some(wrap_config) => {
            if wrap_config.port == config.listener.port {
                errors.push(ValidationError::PortConflict {
                    port: wrap_config.port,
                });
            }
            match WrappedProcess::new(wrap_config) {
                Ok(process) => Some(process),
                Err(e) => {
                    errors.push(e.into());
                    None
                }
            }
        }
        None => None,
    };

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    let metrics_address = match &config.observability.metrics_address {
        Some(address) => match address.parse() {
            Ok(addr) => Some(addr),
            Err(source) => {
                errors.push(ValidationError::MetricsAddress {
                    address: address.clone(),
                    source,
                });
                None
            }
        },
        None => None,
    };

    if errors.is_empty() {
        Ok(ValidatedConfig {
            routes,
            wrap,
            metrics_address,
        })
    } else {
        Err(errors)
    }
}
