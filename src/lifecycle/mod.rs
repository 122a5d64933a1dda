//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validate config → Metrics → Wrapped process → Bind listener → Serve
//!
//! Shutdown (shutdown.rs):
//!     First terminal event → Stop accepting → Drain connections (bounded) → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Terminal event (default mode only)
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then listeners
//! - Exactly one terminal event; its exit code becomes the process exit code
//! - Shutdown has timeout: connections still open after `timeouts.shutdown_secs` are abandoned

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{Shutdown, TerminalEvent};
pub use startup::{run, StartupError};
