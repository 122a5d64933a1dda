//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID, effective host)
//!     → [routing layer redirects or misses]
//!     → proxy.rs (forward misses to the wrapped process)
//!     → response.rs (plain-text errors, hop-by-hop filtering)
//!     → Send to client
//! ```

pub mod proxy;
pub mod request;
pub mod response;
pub mod server;

pub use proxy::{ProxyError, ReverseProxy};
pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::HttpServer;
