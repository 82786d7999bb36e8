//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! registry / controller tree produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (transition counters)
//!
//! Consumers:
//!     → whatever subscriber / recorder the host installs
//! ```
//!
//! # Design Decisions
//! - The library never installs a metrics recorder; the host decides
//! - Transition ids flow through log events as a correlation field
//! - Metrics are cheap counter increments

pub mod logging;
pub mod metrics;
