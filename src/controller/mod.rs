//! Controller tree.
//!
//! # Data Flow
//! ```text
//! Registry commits "shop.show" {id: 42}
//!     → tree.sync(): hand the state to the root controller (cursor 0)
//!     → root: segment "shop" unchanged → cursor 1 → forward to one child
//!     → shop controller: segment "show", id changed → run "show" handler
//!     → terminal, stop
//!
//! Controller calls set_state("show", {id: 43})
//!     → resolve "show" to "shop.show" by walking up active ancestors
//!     → registry.set_current → sync()
//! ```
//!
//! # Design Decisions
//! - Generational arena: ids are stable, stale ids are detected
//! - Views are downlinks without state handling; propagation passes through them
//! - Handlers are resolved when a controller is built, never at dispatch
//! - A branch no child claims is a warning, the global state is kept

pub mod node;
pub mod declare;
pub mod tree;

pub use node::Controller;
pub use declare::{parse_state_key, ControllerBuilder, ControllerSpec, Handler, HandlerTable, StateDecl};
pub use tree::{ControllerError, ControllerId, ControllerTree, Scope, StateTarget};
