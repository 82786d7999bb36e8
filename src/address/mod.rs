//! Address adapters.
//!
//! # Data Flow
//! ```text
//! External navigation (back/forward, link, manual edit)
//!     → adapter emits AddressChange on its broadcast channel
//!     → StateRegistry listener → transition pipeline
//!
//! Committed transition:
//!     StateRegistry → adapter.set_value(url, replace?)   (no change event)
//! ```
//!
//! # Design Decisions
//! - The registry only sees the [`Address`] trait; hosts plug in the back-end
//! - A disabled adapter keeps its value but emits no change events
//! - [`MemoryAddress`] is the in-process back-end (tests, headless hosts)

pub mod memory;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

pub use memory::MemoryAddress;

/// What produced an address change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeSource {
    /// New entry (link, manual edit).
    Navigation,
    /// History traversal (back/forward).
    Pop,
    /// Synthesised by `StateRegistry::parse`.
    Synthetic,
}

/// A change notification from an adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressChange {
    pub value: String,
    pub previous: Option<String>,
    pub source: ChangeSource,
}

/// How a programmatic write lands in history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    pub replace: bool,
}

/// Fragment-based (`#/path`) or path-based addresses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressMode {
    #[default]
    Path,
    Fragment,
}

/// The navigable location consumed by the registry.
pub trait Address: Send + Sync {
    fn value(&self) -> String;

    /// Write a value. Must not emit a change event.
    fn set_value(&self, value: &str, options: WriteOptions);

    fn enable(&self);

    fn disable(&self);

    fn is_enabled(&self) -> bool;

    /// Turn a route path into a link target.
    fn generate_url(&self, path: &str, absolute: bool) -> String;

    /// Change events, emitted only while enabled.
    fn subscribe(&self) -> broadcast::Receiver<AddressChange>;
}
