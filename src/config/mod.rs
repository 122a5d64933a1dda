//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → environment overlay (PORT, ROUTE_*)
//!     → command-line overlay (-route, wrap)
//!     → validation.rs (compile routes, semantic checks)
//!     → ValidatedConfig (immutable, handed to startup)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once validated; there is no reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{apply_env, load_config, ConfigError};
pub use schema::{
    ListenerConfig, ObservabilityConfig, RedirectorConfig, RouteEntry, RouteSource, TimeoutConfig,
    WrapConfig,
};
pub use validation::{validate_config, ValidatedConfig, ValidationError};
