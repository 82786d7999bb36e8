//! Arena of controllers and views, and state propagation through it.
//!
//! Nodes live in a generational arena. A removed node's slot is reused with a
//! bumped generation, so a stale [`ControllerId`] is rejected instead of
//! addressing the wrong node.

use std::fmt::Write as _;
use std::sync::Arc;

use thiserror::Error;

use crate::controller::node::Controller;
use crate::observability::metrics;
use crate::registry::{RegistryError, RegistryEvent, StateRegistry, TransitionOptions};
use crate::state::{validate_name, Params, State, StateError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("invalid state key '{0}'")]
    InvalidStateKey(String),

    #[error("controller '{controller}' references unknown handler '{handler}'")]
    UnknownHandler { controller: String, handler: String },

    #[error("controller '{controller}' default state '{state}' is not declared")]
    InvalidDefault { controller: String, state: String },

    #[error("controller '{controller}' does not declare state '{state}'")]
    UnknownState { controller: String, state: String },

    #[error("controller '{0}' has no default state")]
    NoDefaultState(String),

    #[error("controller '{0}' has neither an active nor a default state")]
    NoActiveState(String),

    #[error("'{0}' walks above the root controller")]
    WalkPastRoot(String),

    #[error("unknown or removed node {0}")]
    UnknownNode(ControllerId),

    #[error("node {0} is a view, not a controller")]
    NotAController(ControllerId),

    #[error("tree already has a root controller")]
    RootExists,

    #[error("linking {child} under {parent} would create a cycle")]
    Cycle {
        child: ControllerId,
        parent: ControllerId,
    },

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Generational handle to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControllerId(u32, u32);

impl ControllerId {
    fn new(index: usize, generation: u32) -> Self {
        Self(index as u32, generation)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for ControllerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}v{}", self.0, self.1)
    }
}

/// What a controller asks to transition to.
#[derive(Debug, Clone)]
pub enum StateTarget {
    /// The controller's declared default local state.
    Default,
    /// A name resolved against the controller's position. `/a.b` is
    /// absolute, `../x` is relative to an ancestor, anything else is local.
    Named(String, Params),
    /// A fully qualified state, used as is.
    State(State),
}

impl From<&str> for StateTarget {
    fn from(name: &str) -> Self {
        StateTarget::Named(name.to_string(), Params::new())
    }
}

impl From<(&str, Params)> for StateTarget {
    fn from((name, params): (&str, Params)) -> Self {
        StateTarget::Named(name.to_string(), params)
    }
}

impl From<State> for StateTarget {
    fn from(state: State) -> Self {
        StateTarget::State(state)
    }
}

enum NodeKind {
    Controller(Controller),
    View(String),
}

struct Node {
    generation: u32,
    parent: Option<ControllerId>,
    children: Vec<ControllerId>,
    kind: NodeKind,
}

/// Handed to a state handler while it runs.
///
/// The state's cursor already points past the handler's own segment, so
/// `state().name()` is what the next controller down will see.
pub struct Scope<'a> {
    tree: &'a mut ControllerTree,
    controller: ControllerId,
    state: &'a State,
}

impl<'a> Scope<'a> {
    pub fn controller(&self) -> ControllerId {
        self.controller
    }

    pub fn state(&self) -> &State {
        self.state
    }

    pub fn params(&self) -> &Params {
        self.state.params()
    }

    /// Segment this handler was entered for.
    pub fn local_name(&self) -> &str {
        let cursor = self.state.cursor().saturating_sub(1);
        self.state.parts().get(cursor).map(String::as_str).unwrap_or("")
    }

    pub fn tree(&mut self) -> &mut ControllerTree {
        self.tree
    }

    pub fn add_child(&mut self, controller: Controller) -> Result<ControllerId, ControllerError> {
        self.tree.insert(self.controller, controller)
    }

    pub fn add_view(&mut self, label: &str) -> Result<ControllerId, ControllerError> {
        self.tree.insert_view(self.controller, label)
    }

    /// Remove every child of this controller, with their subtrees.
    pub fn clear_children(&mut self) {
        for child in self.tree.children(self.controller).to_vec() {
            self.tree.remove(child);
        }
    }
}

/// Controllers and views arranged as a tree, fed by a [`StateRegistry`].
pub struct ControllerTree {
    registry: Arc<StateRegistry>,
    nodes: Vec<Option<Node>>,
    generations: Vec<u32>,
    free_list: Vec<usize>,
    root: Option<ControllerId>,
    applied: Option<Arc<State>>,
}

impl ControllerTree {
    pub fn new(registry: Arc<StateRegistry>) -> Self {
        Self {
            registry,
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            root: None,
            applied: None,
        }
    }

    pub fn registry(&self) -> &Arc<StateRegistry> {
        &self.registry
    }

    pub fn root(&self) -> Option<ControllerId> {
        self.root.filter(|id| self.is_alive(*id))
    }

    pub fn is_alive(&self, id: ControllerId) -> bool {
        self.node(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn node(&self, id: ControllerId) -> Option<&Node> {
        self.nodes
            .get(id.index())?
            .as_ref()
            .filter(|n| n.generation == id.1)
    }

    fn node_mut(&mut self, id: ControllerId) -> Option<&mut Node> {
        self.nodes
            .get_mut(id.index())?
            .as_mut()
            .filter(|n| n.generation == id.1)
    }

    pub fn controller(&self, id: ControllerId) -> Option<&Controller> {
        match &self.node(id)?.kind {
            NodeKind::Controller(c) => Some(c),
            NodeKind::View(_) => None,
        }
    }

    fn controller_mut(&mut self, id: ControllerId) -> Option<&mut Controller> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Controller(c) => Some(c),
            NodeKind::View(_) => None,
        }
    }

    fn require_controller(&self, id: ControllerId) -> Result<&Controller, ControllerError> {
        match &self.node(id).ok_or(ControllerError::UnknownNode(id))?.kind {
            NodeKind::Controller(c) => Ok(c),
            NodeKind::View(_) => Err(ControllerError::NotAController(id)),
        }
    }

    pub fn parent(&self, id: ControllerId) -> Option<ControllerId> {
        self.node(id)?.parent
    }

    pub fn children(&self, id: ControllerId) -> &[ControllerId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    // --- structure ---

    /// Install the root controller.
    pub fn set_root(&mut self, controller: Controller) -> Result<ControllerId, ControllerError> {
        if self.root().is_some() {
            return Err(ControllerError::RootExists);
        }
        let id = self.alloc(None, NodeKind::Controller(controller));
        self.root = Some(id);
        Ok(id)
    }

    /// Add a controller under `parent`.
    pub fn insert(
        &mut self,
        parent: ControllerId,
        controller: Controller,
    ) -> Result<ControllerId, ControllerError> {
        if !self.is_alive(parent) {
            return Err(ControllerError::UnknownNode(parent));
        }
        let id = self.alloc(Some(parent), NodeKind::Controller(controller));
        self.attach(parent, id);
        Ok(id)
    }

    /// Add a view under `parent`. Views carry no states; propagation passes
    /// through them to the controllers they contain.
    pub fn insert_view(
        &mut self,
        parent: ControllerId,
        label: &str,
    ) -> Result<ControllerId, ControllerError> {
        if !self.is_alive(parent) {
            return Err(ControllerError::UnknownNode(parent));
        }
        let id = self.alloc(Some(parent), NodeKind::View(label.to_string()));
        self.attach(parent, id);
        Ok(id)
    }

    fn alloc(&mut self, parent: Option<ControllerId>, kind: NodeKind) -> ControllerId {
        let node = |generation| Node {
            generation,
            parent,
            children: Vec::new(),
            kind,
        };
        if let Some(index) = self.free_list.pop() {
            self.generations[index] = self.generations[index].wrapping_add(1);
            let generation = self.generations[index];
            self.nodes[index] = Some(node(generation));
            ControllerId::new(index, generation)
        } else {
            let index = self.nodes.len();
            self.nodes.push(Some(node(0)));
            self.generations.push(0);
            ControllerId::new(index, 0)
        }
    }

    fn attach(&mut self, parent: ControllerId, child: ControllerId) {
        if let Some(p) = self.node_mut(parent) {
            p.children.push(child);
        }
    }

    /// Move `child` (and its subtree) under `parent`.
    pub fn link(&mut self, child: ControllerId, parent: ControllerId) -> Result<(), ControllerError> {
        if !self.is_alive(child) {
            return Err(ControllerError::UnknownNode(child));
        }
        if !self.is_alive(parent) {
            return Err(ControllerError::UnknownNode(parent));
        }
        let mut cursor = Some(parent);
        while let Some(id) = cursor {
            if id == child {
                return Err(ControllerError::Cycle { child, parent });
            }
            cursor = self.parent(id);
        }

        self.detach(child);
        if self.root == Some(child) {
            self.root = None;
        }
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
        self.attach(parent, child);
        Ok(())
    }

    /// Detach `child` from its parent. The subtree stays alive but no longer
    /// receives states until linked again.
    pub fn unlink(&mut self, child: ControllerId) -> Result<(), ControllerError> {
        if !self.is_alive(child) {
            return Err(ControllerError::UnknownNode(child));
        }
        self.detach(child);
        Ok(())
    }

    fn detach(&mut self, child: ControllerId) {
        let Some(parent) = self.node_mut(child).and_then(|n| n.parent.take()) else {
            return;
        };
        if let Some(p) = self.node_mut(parent) {
            p.children.retain(|c| *c != child);
        }
    }

    /// Remove a node and its whole subtree, children first.
    pub fn remove(&mut self, id: ControllerId) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        self.detach(id);
        self.destroy(id);
        if self.root == Some(id) {
            self.root = None;
        }
        true
    }

    fn destroy(&mut self, id: ControllerId) {
        let children = match self.node_mut(id) {
            Some(node) => std::mem::take(&mut node.children),
            None => return,
        };
        for child in children {
            self.destroy(child);
        }
        self.nodes[id.index()] = None;
        self.free_list.push(id.index());
    }

    /// Nearest controller ancestor, skipping views.
    pub fn parent_controller(&self, id: ControllerId) -> Option<ControllerId> {
        let mut cursor = self.parent(id);
        while let Some(p) = cursor {
            if self.controller(p).is_some() {
                return Some(p);
            }
            cursor = self.parent(p);
        }
        None
    }

    /// Nearest controller descendants, looking through views.
    pub fn child_controllers(&self, id: ControllerId) -> Vec<ControllerId> {
        let mut out = Vec::new();
        for &child in self.children(id) {
            match self.node(child).map(|n| &n.kind) {
                Some(NodeKind::Controller(_)) => out.push(child),
                Some(NodeKind::View(_)) => out.extend(self.child_controllers(child)),
                None => {}
            }
        }
        out
    }

    // --- naming ---

    /// Expand a controller-relative name into a full state name.
    ///
    /// - `/a.b` is taken as is; a lone `/` means the root's default state
    /// - each leading `../` moves one controller up; a bare `../` targets
    ///   that ancestor's default state
    /// - anything else must be declared by the controller
    ///
    /// The prefix comes from each ancestor's active local state, or its
    /// default when it has none.
    pub fn resolve_name(&self, id: ControllerId, name: &str) -> Result<String, ControllerError> {
        if let Some(absolute) = name.strip_prefix('/') {
            if !absolute.is_empty() {
                validate_name(absolute)?;
                return Ok(absolute.to_string());
            }
            let root = self.root().ok_or(ControllerError::UnknownNode(id))?;
            let root = self.require_controller(root)?;
            return root
                .default_state()
                .map(str::to_string)
                .ok_or_else(|| ControllerError::NoDefaultState(root.label().to_string()));
        }

        let mut target = id;
        let mut local = name;
        while let Some(rest) = local.strip_prefix("../") {
            target = self
                .parent_controller(target)
                .ok_or_else(|| ControllerError::WalkPastRoot(name.to_string()))?;
            local = rest;
        }

        let controller = self.require_controller(target)?;
        let local = if local.is_empty() {
            controller
                .default_state()
                .ok_or_else(|| ControllerError::NoDefaultState(controller.label().to_string()))?
        } else {
            local
        };
        if !controller.declares(local) {
            return Err(ControllerError::UnknownState {
                controller: controller.label().to_string(),
                state: local.to_string(),
            });
        }

        let mut parts = vec![local.to_string()];
        let mut cursor = target;
        while let Some(parent) = self.parent_controller(cursor) {
            let controller = self.require_controller(parent)?;
            let active = controller
                .active_or_default()
                .ok_or_else(|| ControllerError::NoActiveState(controller.label().to_string()))?;
            parts.push(active.to_string());
            cursor = parent;
        }
        parts.reverse();
        Ok(parts.join("."))
    }

    fn target_state(&self, id: ControllerId, target: StateTarget) -> Result<State, ControllerError> {
        match target {
            StateTarget::State(state) => Ok(state),
            StateTarget::Default => {
                let controller = self.require_controller(id)?;
                let default = controller
                    .default_state()
                    .ok_or_else(|| ControllerError::NoDefaultState(controller.label().to_string()))?
                    .to_string();
                Ok(State::new(&self.resolve_name(id, &default)?)?)
            }
            StateTarget::Named(name, params) => {
                Ok(State::with_params(&self.resolve_name(id, &name)?, params)?)
            }
        }
    }

    // --- transitions ---

    /// Ask the registry to move to `target`, resolved from `id`'s position.
    ///
    /// Returns the registry's answer. When the registry reports no global
    /// change, the current state is pushed down the tree again so branches
    /// that were never entered catch up.
    pub async fn set_state(
        &mut self,
        id: ControllerId,
        target: impl Into<StateTarget>,
        options: TransitionOptions,
    ) -> Result<bool, ControllerError> {
        let state = self.target_state(id, target.into())?;
        tracing::debug!(controller = %id, state = %state, "Controller requested state");
        self.mark_origin(id);

        let changed = self.registry.set_current(state, options).await?;
        if changed {
            self.sync();
        } else if let Some(current) = self.registry.get_current() {
            self.apply(&current);
        }
        Ok(changed)
    }

    fn mark_origin(&mut self, id: ControllerId) {
        let mut child = id;
        while let Some(parent) = self.parent_controller(child) {
            if let Some(c) = self.controller_mut(parent) {
                c.origin = Some(child);
            }
            child = parent;
        }
    }

    /// Apply the registry's current state if it has not been applied yet.
    pub fn sync(&mut self) -> bool {
        let Some(current) = self.registry.get_current() else {
            return false;
        };
        if self
            .applied
            .as_ref()
            .is_some_and(|applied| Arc::ptr_eq(applied, &current))
        {
            return false;
        }
        self.applied = Some(current.clone());
        self.apply(&current);
        true
    }

    /// React to a registry event. Only committed transitions matter here.
    pub fn handle_event(&mut self, event: &RegistryEvent) -> bool {
        match event {
            RegistryEvent::Changed { .. } => self.sync(),
            RegistryEvent::Cancelled { .. } | RegistryEvent::Unknown { .. } => false,
        }
    }

    /// Push `state` down from the root controller.
    pub fn apply(&mut self, state: &State) {
        let Some(root) = self.root() else {
            tracing::debug!(state = %state, "No root controller, state not propagated");
            return;
        };
        let mut state = state.clone();
        state.set_cursor(0);
        self.receive(root, &mut state);
    }

    fn receive(&mut self, id: ControllerId, state: &mut State) {
        let Some(controller) = self.controller(id) else {
            return;
        };
        let Some(segment) = state.name().map(str::to_string) else {
            return;
        };
        let label = controller.label().to_string();
        let Some(decl) = controller.declared(&segment) else {
            tracing::warn!(
                controller = %label,
                state = %state,
                segment = %segment,
                "Controller does not declare this state"
            );
            metrics::record_dead_end();
            return;
        };

        let handler = decl.handler.clone();
        let unchanged = controller
            .current()
            .is_some_and(|old| old.shallow_equal(state, decl.params.as_deref()));
        let previous = controller.current().map(|old| old.full_name().to_string());

        if let Some(c) = self.controller_mut(id) {
            c.record(state);
        }
        state.next();

        if !unchanged {
            tracing::debug!(controller = %label, state = %segment, "Entering local state");
            let mut scope = Scope {
                tree: self,
                controller: id,
                state: &*state,
            };
            handler(&mut scope);
            if !self.is_alive(id) {
                return;
            }
        }

        if state.is_terminal() {
            return;
        }

        match self.branch_child(id, previous.as_deref(), state.name()) {
            Some(child) => self.receive(child, state),
            None if self.child_controllers(id).is_empty() => {
                tracing::debug!(
                    controller = %label,
                    branch = %state.branch_name(),
                    "Leaf controller, remaining branch not propagated"
                );
            }
            None => {
                tracing::warn!(
                    controller = %label,
                    state = %state,
                    branch = %state.branch_name(),
                    "No child controller takes the remaining branch"
                );
                metrics::record_dead_end();
            }
        }
    }

    /// Pick the one child that continues the branch: the child that handled
    /// the previous state, else the child that started this transition, else
    /// the first child declaring the next segment.
    fn branch_child(
        &mut self,
        id: ControllerId,
        previous: Option<&str>,
        next: Option<&str>,
    ) -> Option<ControllerId> {
        let children = self.child_controllers(id);
        let origin = self.controller_mut(id).and_then(|c| c.origin.take());

        if let Some(previous) = previous {
            let found = children.iter().copied().find(|c| {
                self.controller(*c)
                    .and_then(Controller::current)
                    .is_some_and(|s| s.full_name() == previous)
            });
            if found.is_some() {
                return found;
            }
        }

        if let Some(origin) = origin.filter(|o| children.contains(o)) {
            return Some(origin);
        }

        let next = next?;
        children
            .into_iter()
            .find(|c| self.controller(*c).is_some_and(|c| c.declares(next)))
    }

    // --- introspection ---

    /// Controllers on the active branch with the local state each is in.
    pub fn active_path(&self) -> Vec<(ControllerId, String)> {
        let mut path = Vec::new();
        let mut cursor = self.root();
        while let Some(id) = cursor {
            let Some(state) = self.controller(id).and_then(Controller::current) else {
                break;
            };
            let Some(name) = state.name() else {
                break;
            };
            path.push((id, name.to_string()));

            let depth = state.cursor() + 1;
            cursor = self.child_controllers(id).into_iter().find(|c| {
                self.controller(*c)
                    .and_then(Controller::current)
                    .is_some_and(|s| s.full_name() == state.full_name() && s.cursor() == depth)
            });
        }
        path
    }

    /// Indented text rendering of the tree.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        if let Some(root) = self.root() {
            self.describe_node(root, 0, &mut out);
        }
        out
    }

    fn describe_node(&self, id: ControllerId, depth: usize, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        let indent = "  ".repeat(depth);
        let _ = match &node.kind {
            NodeKind::Controller(c) => writeln!(
                out,
                "{indent}{} [{}]",
                c.label(),
                c.active_name().unwrap_or("-")
            ),
            NodeKind::View(label) => writeln!(out, "{indent}<{label}>"),
        };
        for &child in &node.children {
            self.describe_node(child, depth + 1, out);
        }
    }
}

impl std::fmt::Debug for ControllerTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerTree")
            .field("nodes", &self.len())
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}
