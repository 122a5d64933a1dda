//! Configuration loading from disk and the environment.

use std::fs;
use std::num::ParseIntError;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::{RedirectorConfig, RouteEntry, RouteSource};

/// Environment variable holding the service port.
pub const PORT_VAR: &str = "PORT";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid {PORT_VAR} {value:?}: {source}")]
    InvalidPort {
        value: String,
        #[source]
        source: ParseIntError,
    },
}

/// Load configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<RedirectorConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Whether `name` declares a route: `ROUTE_` followed by digits, in any case.
pub fn is_route_var(name: &str) -> bool {
    name.trim_end_matches(|c: char| c.is_ascii_digit())
        .eq_ignore_ascii_case("route_")
}

/// Route entries declared in the environment, ordered by variable name.
pub fn routes_from_env<I>(vars: I) -> Vec<RouteEntry>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut routes: Vec<RouteEntry> = vars
        .into_iter()
        .filter(|(name, _)| is_route_var(name))
        .map(|(name, spec)| RouteEntry::new(RouteSource::Env(name), spec))
        .collect();
    routes.sort_by(|a, b| a.source.to_string().cmp(&b.source.to_string()));
    routes
}

/// Parse a `PORT` value; a leading `:` is tolerated.
pub fn parse_port(value: &str) -> Result<u16, ConfigError> {
    value
        .trim_start_matches(':')
        .parse()
        .map_err(|source| ConfigError::InvalidPort {
            value: value.to_string(),
            source,
        })
}

/// Overlay `PORT` and `ROUTE_*` variables onto `config`.
pub fn apply_env<I>(config: &mut RedirectorConfig, vars: I) -> Result<(), ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    let vars: Vec<(String, String)> = vars.into_iter().collect();

    if let Some((_, value)) = vars.iter().find(|(name, value)| name == PORT_VAR && !value.is_empty()) {
        config.listener.port = parse_port(value)?;
    }
    config.routes.extend(routes_from_env(vars));
    Ok(())
}

/// The process environment, skipping entries that are not valid UTF-8.
pub fn process_env() -> impl Iterator<Item = (String, String)> {
    std::env::vars_os()
        .filter_map(|(name, value)| Some((name.into_string().ok()?, value.into_string().ok()?)))
}
