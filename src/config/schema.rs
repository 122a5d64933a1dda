//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the redirector.
//! All types derive Serde traits for deserialization from config files.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Root configuration for the redirector.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct RedirectorConfig {
    /// Listener configuration (bind host, port).
    pub listener: ListenerConfig,

    /// Route specs, one route per entry.
    pub routes: Vec<RouteEntry>,

    /// Wrapped process serving unmatched requests.
    pub wrap: Option<WrapConfig>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub bind_host: String,

    /// Service port.
    pub port: u16,
}

impl ListenerConfig {
    /// `host:port` socket address to bind.
    pub fn bind_address(&self) -> String {
        if self.bind_host.contains(':') {
            format!("[{}]:{}", self.bind_host, self.port)
        } else {
            format!("{}:{}", self.bind_host, self.port)
        }
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Where a route spec came from, for error reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteSource {
    File,
    Env(String),
    Flag(usize),
}

impl fmt::Display for RouteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteSource::File => write!(f, "config file"),
            RouteSource::Env(name) => write!(f, "{name}"),
            RouteSource::Flag(index) => write!(f, "-route #{}", index + 1),
        }
    }
}

/// A route spec and its origin.
///
/// Deserializes from a bare string; entries read from a file are tagged [`RouteSource::File`].
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(from = "String", into = "String")]
pub struct RouteEntry {
    pub source: RouteSource,
    pub spec: String,
}

impl RouteEntry {
    pub fn new(source: RouteSource, spec: impl Into<String>) -> Self {
        Self {
            source,
            spec: spec.into(),
        }
    }
}

impl From<String> for RouteEntry {
    fn from(spec: String) -> Self {
        Self::new(RouteSource::File, spec)
    }
}

impl From<RouteEntry> for String {
    fn from(entry: RouteEntry) -> Self {
        entry.spec
    }
}

/// Wrapped process configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct WrapConfig {
    /// Port handed to the child via `PORT`; must differ from the service port.
    pub port: u16,

    /// Program followed by its arguments.
    pub command: Vec<String>,
}

impl Default for WrapConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            command: Vec::new(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// How long open connections may drain after the terminal event, in seconds.
    pub shutdown_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            shutdown_secs: 5,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Prometheus endpoint bind address; metrics are not exported when unset.
    pub metrics_address: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_address: None,
        }
    }
}
