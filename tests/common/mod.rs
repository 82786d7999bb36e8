//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use statenav::config::{parse_config, register_all};
use statenav::{MemoryAddress, RegistryEvent, StateRegistry};

/// Shop navigation used across the integration tests.
pub const SHOP_CONFIG: &str = r#"
[observability]
log_level = "debug"

[states.home]
pattern = "/"

[states.shop]

[states.shop.children.index]
override = "/shop"

[states.shop.children.show]
override = "/shop/{id}"
constraints = { id = "\\d+" }

[states.shop.children.search]
override = "/shop/{query}"
priority = -1

[states.about]
"#;

/// Registry with [`SHOP_CONFIG`] registered.
pub fn shop_registry() -> Arc<StateRegistry> {
    let config = parse_config(SHOP_CONFIG).unwrap();
    let registry = Arc::new(StateRegistry::new());
    register_all(&registry, &config).unwrap();
    registry
}

/// Registry plus an in-memory address wired to it.
pub fn shop_registry_with_address() -> (Arc<StateRegistry>, Arc<MemoryAddress>) {
    let registry = shop_registry();
    let address = Arc::new(MemoryAddress::default());
    registry.set_address(address.clone());
    (registry, address)
}

/// Wait for the next registry event, failing the test after a second.
pub async fn next_event(rx: &mut broadcast::Receiver<RegistryEvent>) -> RegistryEvent {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for registry event")
        .expect("event channel closed")
}

/// Everything already queued, without waiting.
pub fn drain(rx: &mut broadcast::Receiver<RegistryEvent>) -> Vec<RegistryEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Event kinds, for compact assertions.
pub fn kinds(events: &[RegistryEvent]) -> Vec<&'static str> {
    events.iter().map(RegistryEvent::kind).collect()
}
