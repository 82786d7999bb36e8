//! State declarations and handler tables.
//!
//! A controller declares its local states as keys such as `show(id)`. The
//! parenthesised names restrict which parameters count when deciding whether
//! the state changed. Each key maps to a handler, given directly or by name
//! from a [`HandlerTable`]; names are checked when the controller is built.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::controller::node::Controller;
use crate::controller::tree::{ControllerError, Scope};
use crate::state::is_valid_segment;

/// Callback run when a controller enters one of its states.
pub type Handler = Arc<dyn Fn(&mut Scope<'_>) + Send + Sync>;

/// Named handlers available to declarations.
#[derive(Clone, Default)]
pub struct HandlerTable {
    handlers: BTreeMap<String, Handler>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<F>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&mut Scope<'_>) + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), Arc::new(handler));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Handler> {
        self.handlers.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}

/// One declared local state.
#[derive(Clone)]
pub struct StateDecl {
    pub name: String,
    /// Parameters compared for change detection; `None` compares all.
    pub params: Option<Vec<String>>,
    pub handler: Handler,
}

impl std::fmt::Debug for StateDecl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateDecl")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Split `show(id, page)` into `("show", Some(["id", "page"]))`.
pub fn parse_state_key(key: &str) -> Result<(String, Option<Vec<String>>), ControllerError> {
    let invalid = || ControllerError::InvalidStateKey(key.to_string());
    let key = key.trim();

    let (name, params) = match key.split_once('(') {
        None => (key, None),
        Some((name, rest)) => {
            let inner = rest.strip_suffix(')').ok_or_else(invalid)?;
            let params: Vec<String> = inner
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
            if params.iter().any(|p| p.contains(['(', ')'])) {
                return Err(invalid());
            }
            (name.trim(), Some(params))
        }
    };

    if !is_valid_segment(name) {
        return Err(invalid());
    }
    Ok((name.to_string(), params))
}

enum HandlerRef {
    Direct(Handler),
    Named(String),
}

/// Builds a [`Controller`], validating every declaration.
pub struct ControllerBuilder {
    label: String,
    entries: Vec<(String, HandlerRef)>,
    default_state: Option<String>,
}

impl ControllerBuilder {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            entries: Vec::new(),
            default_state: None,
        }
    }

    /// Declare a state with an inline handler.
    pub fn state<F>(mut self, key: &str, handler: F) -> Self
    where
        F: Fn(&mut Scope<'_>) + Send + Sync + 'static,
    {
        self.entries
            .push((key.to_string(), HandlerRef::Direct(Arc::new(handler))));
        self
    }

    /// Declare a state whose handler comes from the table passed to `build`.
    pub fn state_named(mut self, key: &str, handler: &str) -> Self {
        self.entries
            .push((key.to_string(), HandlerRef::Named(handler.to_string())));
        self
    }

    pub fn default_state(mut self, name: &str) -> Self {
        self.default_state = Some(name.to_string());
        self
    }

    pub fn build(self, table: &HandlerTable) -> Result<Controller, ControllerError> {
        let mut states = BTreeMap::new();
        for (key, handler) in self.entries {
            let (name, params) = parse_state_key(&key)?;
            let handler = match handler {
                HandlerRef::Direct(h) => h,
                HandlerRef::Named(n) => table.get(&n).cloned().ok_or_else(|| {
                    ControllerError::UnknownHandler {
                        controller: self.label.clone(),
                        handler: n,
                    }
                })?,
            };
            states.insert(
                name.clone(),
                StateDecl {
                    name,
                    params,
                    handler,
                },
            );
        }

        if let Some(default) = &self.default_state {
            if !states.contains_key(default) {
                return Err(ControllerError::InvalidDefault {
                    controller: self.label,
                    state: default.clone(),
                });
            }
        }

        Ok(Controller::new(self.label, states, self.default_state))
    }
}

/// Serializable controller declaration: state key → handler name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSpec {
    pub label: String,
    pub states: BTreeMap<String, String>,
    pub default_state: Option<String>,
}

impl ControllerSpec {
    pub fn builder(&self) -> ControllerBuilder {
        let mut builder = ControllerBuilder::new(self.label.clone());
        for (key, handler) in &self.states {
            builder = builder.state_named(key, handler);
        }
        if let Some(default) = &self.default_state {
            builder = builder.default_state(default);
        }
        builder
    }

    pub fn build(&self, table: &HandlerTable) -> Result<Controller, ControllerError> {
        self.builder().build(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_state_key() {
        assert_eq!(parse_state_key("index").unwrap(), ("index".to_string(), None));
        assert_eq!(
            parse_state_key("show(id)").unwrap(),
            ("show".to_string(), Some(vec!["id".to_string()]))
        );
        assert_eq!(
            parse_state_key("list( page , sort )").unwrap(),
            ("list".to_string(), Some(vec!["page".to_string(), "sort".to_string()]))
        );
        assert_eq!(parse_state_key("all()").unwrap(), ("all".to_string(), Some(vec![])));
    }

    #[test]
    fn test_parse_state_key_rejects() {
        for bad in ["", "Show", "show(id", "show(a(b))", "(id)", "a.b"] {
            assert!(
                matches!(parse_state_key(bad), Err(ControllerError::InvalidStateKey(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_unknown_named_handler_fails_fast() {
        let err = ControllerBuilder::new("shop")
            .state_named("index", "render_index")
            .build(&HandlerTable::new())
            .unwrap_err();
        assert!(matches!(err, ControllerError::UnknownHandler { .. }));
    }

    #[test]
    fn test_default_must_be_declared() {
        let err = ControllerBuilder::new("shop")
            .state("index", |_| {})
            .default_state("missing")
            .build(&HandlerTable::new())
            .unwrap_err();
        assert!(matches!(err, ControllerError::InvalidDefault { .. }));
    }

    #[test]
    fn test_spec_build() {
        let mut table = HandlerTable::new();
        table.insert("noop", |_| {});
        let spec = ControllerSpec {
            label: "shop".into(),
            states: [("index".to_string(), "noop".to_string()), ("show(id)".to_string(), "noop".to_string())]
                .into_iter()
                .collect(),
            default_state: Some("index".into()),
        };
        let controller = spec.build(&table).unwrap();
        assert_eq!(controller.default_state(), Some("index"));
        assert_eq!(controller.declared("show").unwrap().params.as_deref(), Some(&["id".to_string()][..]));
    }
}
