//! State parameter bag.
//!
//! Keys starting with [`SPECIAL_MARKER`] are metadata. They are stamped by the
//! registry (transition ids, previous state, address changes), shared by
//! reference when the bag is cloned, and never take part in equality.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::address::AddressChange;
use crate::state::State;

/// Prefix marking a metadata key.
pub const SPECIAL_MARKER: char = '$';

/// Metadata key holding the state being entered.
pub const NEW_STATE: &str = "$newState";
/// Metadata key holding the state being left.
pub const PREVIOUS_STATE: &str = "$previousState";
/// Metadata key holding the address change that caused the transition.
pub const ADDRESS_CHANGE: &str = "$address";
/// Metadata key holding the transition id.
pub const TRANSITION_ID: &str = "$transition";

/// A metadata value.
#[derive(Debug, Clone)]
pub enum Special {
    State(State),
    Address(AddressChange),
    TransitionId(Uuid),
    Value(Value),
}

/// Regular parameters plus metadata entries.
#[derive(Debug, Clone, Default)]
pub struct Params {
    values: BTreeMap<String, Value>,
    special: BTreeMap<String, Arc<Special>>,
}

/// Returns true if `key` names a metadata entry.
pub fn is_special(key: &str) -> bool {
    key.starts_with(SPECIAL_MARKER)
}

/// String form of a parameter value, as used in URLs.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Compare two optional values, treating scalars with the same string form as equal.
pub fn loosely_equal(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (None | Some(Value::Null), None | Some(Value::Null)) => true,
        (Some(a), Some(b)) => {
            a == b || (is_scalar(a) && is_scalar(b) && value_to_string(a) == value_to_string(b))
        }
        _ => false,
    }
}

fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a value. Metadata keys are stored as shared entries.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        if is_special(&key) {
            self.special.insert(key, Arc::new(Special::Value(value.into())));
        } else {
            self.values.insert(key, value.into());
        }
    }

    pub fn set_special(&mut self, key: impl Into<String>, value: Special) {
        self.special.insert(key.into(), Arc::new(value));
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Regular value rendered as a string.
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.values.get(key).map(value_to_string)
    }

    pub fn special(&self, key: &str) -> Option<&Special> {
        self.special.get(key).map(|s| s.as_ref())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        if is_special(key) {
            self.special.remove(key);
            None
        } else {
            self.values.remove(key)
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key) || self.special.contains_key(key)
    }

    /// Iterate regular entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copy of the regular entries only.
    pub fn without_special(&self) -> Self {
        Self {
            values: self.values.clone(),
            special: BTreeMap::new(),
        }
    }

    /// Compare regular entries.
    ///
    /// With `keys`, only those keys are compared; otherwise every regular key
    /// present on either side is.
    pub fn equal_on(&self, other: &Params, keys: Option<&[String]>) -> bool {
        match keys {
            Some(keys) => keys
                .iter()
                .all(|k| loosely_equal(self.values.get(k), other.values.get(k))),
            None => self
                .values
                .keys()
                .chain(other.values.keys())
                .all(|k| loosely_equal(self.values.get(k), other.values.get(k))),
        }
    }

    pub fn new_state(&self) -> Option<&State> {
        match self.special(NEW_STATE) {
            Some(Special::State(s)) => Some(s),
            _ => None,
        }
    }

    pub fn previous_state(&self) -> Option<&State> {
        match self.special(PREVIOUS_STATE) {
            Some(Special::State(s)) => Some(s),
            _ => None,
        }
    }

    pub fn address_change(&self) -> Option<&AddressChange> {
        match self.special(ADDRESS_CHANGE) {
            Some(Special::Address(a)) => Some(a),
            _ => None,
        }
    }

    pub fn transition_id(&self) -> Option<Uuid> {
        match self.special(TRANSITION_ID) {
            Some(Special::TransitionId(id)) => Some(*id),
            _ => None,
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

impl From<BTreeMap<String, Value>> for Params {
    fn from(values: BTreeMap<String, Value>) -> Self {
        values.into_iter().collect()
    }
}
