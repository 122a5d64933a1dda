//! Route definitions and the route spec parser.
//!
//! # Responsibilities
//! - Parse one route spec (`<pattern> <destination> [path] [query] [code=<int>]`)
//! - Normalize destinations (default scheme, bare hosts)
//! - Hold the immutable redirect rule used by the executor
//!
//! # Design Decisions
//! - Tokens follow shell quoting rules so patterns or destinations may contain spaces
//! - Destinations without a scheme default to `https`
//! - Unknown flag tokens are ignored with a warning rather than rejected

use std::fmt;

use axum::http::StatusCode;
use url::{Position, Url};

/// Default redirect status when no `code=` flag is given.
pub const DEFAULT_STATUS: StatusCode = StatusCode::FOUND;

/// Error type for route spec parsing.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("malformed route spec: {0}")]
    Malformed(#[from] shell_words::ParseError),

    #[error("route must have at least a source and a destination")]
    MissingField,

    #[error("parsing destination {destination:?}: {source}")]
    InvalidDestination {
        destination: String,
        #[source]
        source: url::ParseError,
    },

    #[error("parsing code {value:?}: not a valid HTTP status code")]
    InvalidCode { value: String },
}

/// Redirect target of a route.
///
/// Kept as separate components rather than a `Url` so that a destination written without a path
/// (`example.com`) renders without a trailing slash and path joins behave like POSIX paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub scheme: String,
    /// `userinfo@host:port`, as written.
    pub authority: String,
    /// Percent-encoded path; empty when the destination had none.
    pub path: String,
    pub query: Option<String>,
    pub fragment: Option<String>,
}

impl Destination {
    /// Parse a destination, defaulting the scheme to `https`.
    ///
    /// `example.com/blog` is read as host `example.com` with path `/blog`.
    pub fn parse(raw: &str) -> Result<Self, url::ParseError> {
        if raw.is_empty() {
            return Err(url::ParseError::EmptyHost);
        }

        let url = match Url::parse(raw) {
            // `localhost:3000/x` parses as an opaque URL with scheme `localhost`.
            Ok(url) if url.has_host() => url,
            Ok(_) | Err(url::ParseError::RelativeUrlWithoutBase) => {
                Url::parse(&format!("https://{raw}"))?
            }
            Err(e) => return Err(e),
        };

        let path = if url.path() == "/" && !has_explicit_path(raw) {
            String::new()
        } else {
            url.path().to_string()
        };

        Ok(Self {
            scheme: url.scheme().to_string(),
            authority: url[Position::BeforeUsername..Position::AfterPort].to_string(),
            path,
            query: url.query().map(str::to_string),
            fragment: url.fragment().map(str::to_string),
        })
    }
}

/// Whether the raw destination spells out a path after its authority.
fn has_explicit_path(raw: &str) -> bool {
    let rest = raw.split_once("://").map_or(raw, |(_, rest)| rest);
    rest.split(['?', '#']).next().is_some_and(|s| s.contains('/'))
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.authority)?;
        if !self.path.is_empty() && !self.path.starts_with('/') {
            f.write_str("/")?;
        }
        f.write_str(&self.path)?;
        if let Some(query) = self.query.as_deref().filter(|q| !q.is_empty()) {
            write!(f, "?{query}")?;
        }
        if let Some(fragment) = &self.fragment {
            write!(f, "#{fragment}")?;
        }
        Ok(())
    }
}

/// A single redirect rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Source pattern, `<host>/<path>` with an optional trailing `*`.
    pub pattern: String,
    pub destination: Destination,
    pub status: StatusCode,
    /// Append the request path to the destination path.
    pub carry_path: bool,
    /// Replace the destination query with the request query.
    pub carry_query: bool,
}

impl Route {
    /// Parse a route from its string form.
    pub fn parse(spec: &str) -> Result<Self, RouteError> {
        let parts = shell_words::split(spec)?;
        if parts.len() < 2 {
            return Err(RouteError::MissingField);
        }

        let destination =
            Destination::parse(&parts[1]).map_err(|source| RouteError::InvalidDestination {
                destination: parts[1].clone(),
                source,
            })?;

        let mut route = Route {
            pattern: parts[0].clone(),
            destination,
            status: DEFAULT_STATUS,
            carry_path: false,
            carry_query: false,
        };

        for flag in &parts[2..] {
            match flag.as_str() {
                "path" => route.carry_path = true,
                "query" => route.carry_query = true,
                other => match other.strip_prefix("code=") {
                    Some(value) => route.status = parse_code(value)?,
                    None => {
                        tracing::warn!(pattern = %route.pattern, flag = %other, "Ignoring unknown route flag");
                    }
                },
            }
        }

        Ok(route)
    }
}

fn parse_code(value: &str) -> Result<StatusCode, RouteError> {
    value
        .parse::<u16>()
        .ok()
        .and_then(|code| StatusCode::from_u16(code).ok())
        .ok_or_else(|| RouteError::InvalidCode {
            value: value.to_string(),
        })
}
