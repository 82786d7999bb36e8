//! In-memory address back-end with a history stack.

use std::sync::Mutex;

use tokio::sync::broadcast;
use url::Url;

use crate::address::{Address, AddressChange, AddressMode, ChangeSource, WriteOptions};

#[derive(Debug)]
struct History {
    entries: Vec<String>,
    index: usize,
    enabled: bool,
}

/// Address adapter backed by a history stack.
#[derive(Debug)]
pub struct MemoryAddress {
    mode: AddressMode,
    base: String,
    origin: Url,
    history: Mutex<History>,
    tx: broadcast::Sender<AddressChange>,
}

impl MemoryAddress {
    pub fn new(mode: AddressMode) -> Self {
        let (tx, _) = broadcast::channel(64);
        Self {
            mode,
            base: String::new(),
            origin: Url::parse("http://localhost").expect("static origin parses"),
            history: Mutex::new(History {
                entries: vec!["/".to_string()],
                index: 0,
                enabled: true,
            }),
            tx,
        }
    }

    /// Prefix for generated URLs (e.g. `/app`).
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into().trim_end_matches('/').to_string();
        self
    }

    /// Origin used for absolute URLs.
    pub fn with_origin(mut self, origin: &str) -> Result<Self, url::ParseError> {
        self.origin = Url::parse(origin)?;
        Ok(self)
    }

    pub fn mode(&self) -> AddressMode {
        self.mode
    }

    /// Simulate a user navigation to `value`: push an entry and notify.
    pub fn navigate(&self, value: &str) {
        let change = {
            let mut history = self.lock();
            let previous = history.entries[history.index].clone();
            let index = history.index;
            history.entries.truncate(index + 1);
            history.entries.push(value.to_string());
            history.index += 1;
            history.enabled.then(|| AddressChange {
                value: value.to_string(),
                previous: Some(previous),
                source: ChangeSource::Navigation,
            })
        };
        self.emit(change);
    }

    /// Step back one entry. Returns false at the start of history.
    pub fn back(&self) -> bool {
        self.traverse(-1)
    }

    /// Step forward one entry. Returns false at the end of history.
    pub fn forward(&self) -> bool {
        self.traverse(1)
    }

    /// All history entries, oldest first.
    pub fn entries(&self) -> Vec<String> {
        self.lock().entries.clone()
    }

    fn traverse(&self, delta: isize) -> bool {
        let change = {
            let mut history = self.lock();
            let Some(target) = history.index.checked_add_signed(delta) else {
                return false;
            };
            if target >= history.entries.len() {
                return false;
            }
            let previous = history.entries[history.index].clone();
            history.index = target;
            history.enabled.then(|| AddressChange {
                value: history.entries[target].clone(),
                previous: Some(previous),
                source: ChangeSource::Pop,
            })
        };
        self.emit(change);
        true
    }

    fn emit(&self, change: Option<AddressChange>) {
        if let Some(change) = change {
            tracing::debug!(value = %change.value, source = ?change.source, "Address changed");
            // No subscribers is fine: nothing is listening yet.
            let _ = self.tx.send(change);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, History> {
        self.history.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MemoryAddress {
    fn default() -> Self {
        Self::new(AddressMode::Path)
    }
}

impl Address for MemoryAddress {
    fn value(&self) -> String {
        let history = self.lock();
        history.entries[history.index].clone()
    }

    fn set_value(&self, value: &str, options: WriteOptions) {
        let mut history = self.lock();
        let index = history.index;
        if options.replace {
            history.entries[index] = value.to_string();
        } else {
            history.entries.truncate(index + 1);
            history.entries.push(value.to_string());
            history.index += 1;
        }
    }

    fn enable(&self) {
        self.lock().enabled = true;
    }

    fn disable(&self) {
        self.lock().enabled = false;
    }

    fn is_enabled(&self) -> bool {
        self.lock().enabled
    }

    fn generate_url(&self, path: &str, absolute: bool) -> String {
        let relative = match self.mode {
            AddressMode::Path => format!("{}{}", self.base, path),
            AddressMode::Fragment => format!("{}/#{}", self.base, path),
        };
        if absolute {
            format!("{}{}", self.origin.origin().ascii_serialization(), relative)
        } else {
            relative
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<AddressChange> {
        self.tx.subscribe()
    }
}
