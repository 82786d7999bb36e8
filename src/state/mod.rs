//! Hierarchical state subsystem.
//!
//! # Data Flow
//! ```text
//! "shop.show" + { id: "42" }
//!     → name.rs (validate dotted name, split into segments)
//!     → dotted.rs (State: parts + cursor + params)
//!     → params.rs (regular values vs `$`-prefixed metadata)
//!
//! Propagation down the controller tree:
//!     cursor 0 → name() = "shop"  (root controller)
//!     cursor 1 → name() = "show"  (child controller)
//!     cursor 2 → name() = None    (terminal)
//! ```
//!
//! # Design Decisions
//! - Names are validated once, at construction
//! - Metadata entries are shared on clone, regular values are copied
//! - Equality ignores metadata entries

pub mod dotted;
pub mod name;
pub mod params;

pub use dotted::State;
pub use name::{is_valid_segment, validate_name, StateError};
pub use params::{Params, Special};
