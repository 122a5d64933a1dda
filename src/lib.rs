//! Pattern-based HTTP redirect router.

pub mod cli;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod supervisor;

pub use config::schema::RedirectorConfig;
pub use http::HttpServer;
pub use lifecycle::{Shutdown, TerminalEvent};
pub use routing::Redirector;
