//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Address value ("/shop/42")
//!     → router.rs (walk routes in priority order)
//!     → route.rs (pattern match, decode captures)
//!     → matcher.rs (placeholder constraints)
//!     → probe (optional, sync or async veto)
//!     → Return: (state name, params) or no match
//!
//! State → address:
//!     route.rs generate_url(params)
//!     → substitute placeholders in pattern order, URL-encoded
//! ```
//!
//! # Design Decisions
//! - Routes compiled at registration, immutable afterwards
//! - Deterministic: higher priority first, then registration order
//! - First match wins
//! - Constraints are anchored: `\d+` must match the whole segment

pub mod matcher;
pub mod route;
pub mod router;

pub use matcher::{Constraint, PatternMatcher};
pub use route::{Probe, Route, RouteError};
pub use router::{RouteEntry, RouteTable};
