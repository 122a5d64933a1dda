//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     route spec strings
//!     → route.rs (tokenize, parse destination and flags)
//!     → matcher.rs (insert into pattern trie, reject duplicates)
//!     → Freeze as immutable Redirector
//!
//! Incoming Request (host, path, query)
//!     → router.rs (build `host/path` key, look up)
//!     → matcher.rs (most specific pattern wins)
//!     → redirect.rs (compute Location from a copy of the destination)
//!     → miss: proxy fallback or 404
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (segment trie only)
//! - Deterministic: same input always matches same route

pub mod matcher;
pub mod redirect;
pub mod route;
pub mod router;

pub use matcher::{PatternTrie, TrieError};
pub use route::{Destination, Route, RouteError};
pub use router::{Redirector, RouteTable};
