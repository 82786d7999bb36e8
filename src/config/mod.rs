//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → NavigationConfig (validated, immutable)
//!     → registration.rs: flatten nested states → register_all(registry)
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Child patterns extend the nearest ancestor's pattern unless overridden

pub mod loader;
pub mod registration;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use registration::{flatten, register_all, FlatState};
pub use schema::{AddressConfig, NavigationConfig, ObservabilityConfig, StateConfig, StateMap};
pub use validation::ValidationError;
