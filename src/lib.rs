//! Hierarchical client-side navigation.
//!
//! Dotted states (`shop.show`) are matched from URLs, gated by interceptors,
//! committed by the [`StateRegistry`] and handed down a [`ControllerTree`],
//! one segment per controller.

pub mod address;
pub mod config;
pub mod controller;
pub mod observability;
pub mod registry;
pub mod routing;
pub mod state;
pub mod verdict;

pub use address::{Address, AddressChange, AddressMode, MemoryAddress};
pub use config::{load_config, NavigationConfig};
pub use controller::{Controller, ControllerId, ControllerTree, StateTarget};
pub use registry::{InterceptorMode, RegistryEvent, StateRegistry, TransitionOptions};
pub use routing::Route;
pub use state::{Params, State};
pub use verdict::{Advance, Verdict};
