//! Notifications emitted by the registry.

use std::sync::Arc;

use crate::state::State;

/// Outcome notifications. Soft conditions are reported here, never as errors.
#[derive(Debug, Clone)]
pub enum RegistryEvent {
    /// A transition committed.
    Changed {
        new: Arc<State>,
        previous: Option<Arc<State>>,
    },
    /// An interceptor rejected the candidate; the current state is untouched.
    Cancelled { rejected: Arc<State> },
    /// No route matched an address value.
    Unknown { raw: String },
}

impl RegistryEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            RegistryEvent::Changed { .. } => "change",
            RegistryEvent::Cancelled { .. } => "cancel",
            RegistryEvent::Unknown { .. } => "unknown",
        }
    }
}
