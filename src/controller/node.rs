//! Per-node controller data.

use std::collections::BTreeMap;

use crate::controller::declare::{ControllerBuilder, StateDecl};
use crate::controller::tree::ControllerId;
use crate::state::State;

/// Declared local states plus what the controller last handled.
#[derive(Debug)]
pub struct Controller {
    label: String,
    states: BTreeMap<String, StateDecl>,
    default_state: Option<String>,
    pub(crate) current: Option<State>,
    pub(crate) origin: Option<ControllerId>,
}

impl Controller {
    pub(crate) fn new(
        label: String,
        states: BTreeMap<String, StateDecl>,
        default_state: Option<String>,
    ) -> Self {
        Self {
            label,
            states,
            default_state,
            current: None,
            origin: None,
        }
    }

    pub fn builder(label: impl Into<String>) -> ControllerBuilder {
        ControllerBuilder::new(label)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn default_state(&self) -> Option<&str> {
        self.default_state.as_deref()
    }

    pub fn declares(&self, name: &str) -> bool {
        self.states.contains_key(name)
    }

    pub fn declared(&self, name: &str) -> Option<&StateDecl> {
        self.states.get(name)
    }

    pub fn declared_names(&self) -> impl Iterator<Item = &str> {
        self.states.keys().map(String::as_str)
    }

    /// Last state handed to this controller, cursor on its own segment.
    pub fn current(&self) -> Option<&State> {
        self.current.as_ref()
    }

    /// Local name this controller is in, if any.
    pub fn active_name(&self) -> Option<&str> {
        self.current.as_ref().and_then(State::name)
    }

    /// Local name used when resolving names below this controller.
    pub(crate) fn active_or_default(&self) -> Option<&str> {
        self.active_name().or(self.default_state.as_deref())
    }

    pub(crate) fn record(&mut self, state: &State) {
        self.current = Some(state.clone());
    }
}
