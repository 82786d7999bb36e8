//! Transition engine.
//!
//! # Data Flow
//! ```text
//! Address change ("/shop/42")             set_current(state, options)
//!     → normalize, drop own echoes                  │
//!     → RouteTable: first matching route            │
//!     → State("shop.show", {id: "42"})  ────────────┤
//!                                                   ▼
//!                                  merge registration + caller options
//!                                  full-equal to current? → no-op (false)
//!                                  interceptors (run / skip(N) / reset)
//!                                        │                    │
//!                                   rejected              approved
//!                                        │                    │
//!                        restore address, emit       commit: stamp metadata,
//!                        Cancelled                   write URL, cursor = 0,
//!                                                    emit Changed
//! ```
//!
//! # Design Decisions
//! - One pipeline at a time; nested calls fail with `Reentrant`, never queue
//! - The address adapter is disabled while a pipeline runs
//! - The current state is only replaced in the commit step
//! - Soft outcomes (cancel, unknown address) are events, not errors

pub mod engine;
pub mod events;
pub mod interceptor;
pub mod link;
pub mod options;

pub use events::RegistryEvent;
pub use interceptor::{Interceptor, InterceptorChain};
pub use link::LinkOutcome;
pub use options::{InterceptorMode, ResolvedOptions, TransitionOptions};
pub use engine::{AddressOutcome, Registration, RegistryError, StateRegistry};
