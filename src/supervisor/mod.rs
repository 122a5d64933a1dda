//! Wrapped process supervision ("wrap" mode).
//!
//! # Data Flow
//! ```text
//! Startup:
//!     WrapConfig → process.rs (validate) → relay.rs (install handlers) → spawn child
//!
//! Running:
//!     OS signal → relay task → channel → supervisor task → kill(child)
//!     child exit → supervisor task → Shutdown::trigger(ChildExited(code))
//! ```
//!
//! # Design Decisions
//! - The supervisor task is the only owner of the child handle
//! - The child's lifetime bounds the service's lifetime
//! - The child's exit code becomes the service's exit code

pub mod process;
pub mod relay;

pub use process::{ProcessState, RunningProcess, SupervisorError, WrappedProcess};
pub use relay::{ForwardedSignal, SignalRelay};
