//! The state registry: registrations, current state, and the transition pipeline.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::address::{Address, AddressChange, ChangeSource, WriteOptions};
use crate::observability::metrics;
use crate::registry::events::RegistryEvent;
use crate::registry::interceptor::{self, Interceptor, InterceptorChain, Plan};
use crate::registry::link::{self, LinkOutcome};
use crate::registry::options::{ResolvedOptions, TransitionOptions};
use crate::routing::{Route, RouteError, RouteTable};
use crate::state::params::{ADDRESS_CHANGE, NEW_STATE, PREVIOUS_STATE, TRANSITION_ID};
use crate::state::{Params, Special, State, StateError};

/// Errors returned by the registry. Soft outcomes are events instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("state '{0}' is already registered")]
    DuplicateState(String),

    #[error("route '{route}' cannot be registered for state '{state}'")]
    RouteMismatch { state: String, route: String },

    #[error("a transition is in progress; nested transitions and interceptor changes are not allowed")]
    Reentrant,

    #[error("no address adapter is set")]
    NoAddress,

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Route(#[from] RouteError),
}

/// Result of feeding an address value through the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressOutcome {
    /// The value is the registry's own last write.
    Ignored,
    /// No route matched; an `Unknown` event was emitted.
    Unknown,
    /// A route matched; the flag is the `set_current` result.
    Transition(bool),
}

/// A registered state.
#[derive(Debug, Clone)]
pub struct Registration {
    pub route: Option<Arc<Route>>,
    pub priority: i32,
    pub options: TransitionOptions,
}

#[derive(Default)]
struct Inner {
    states: BTreeMap<String, Registration>,
    routes: RouteTable,
    interceptors: InterceptorChain,
    current: Option<Arc<State>>,
    last_url: Option<String>,
    address: Option<Arc<dyn Address>>,
    listener: Option<JoinHandle<()>>,
}

/// Owns registrations and the current state, and runs transitions.
pub struct StateRegistry {
    inner: Mutex<Inner>,
    running: AtomicBool,
    events: broadcast::Sender<RegistryEvent>,
}

/// Held for the duration of a transition. Clears the reentrancy flag and
/// re-enables the address adapter however the transition ends.
struct PipelineGuard<'a> {
    running: &'a AtomicBool,
    address: Option<Arc<dyn Address>>,
}

impl Drop for PipelineGuard<'_> {
    fn drop(&mut self) {
        if let Some(address) = &self.address {
            address.enable();
        }
        self.running.store(false, Ordering::SeqCst);
    }
}

impl StateRegistry {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            inner: Mutex::new(Inner::default()),
            running: AtomicBool::new(false),
            events,
        }
    }

    /// Receive `Changed`, `Cancelled` and `Unknown` notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    // --- Registration ---

    /// Register a state with an optional route at priority 0.
    pub fn register(
        &self,
        name: &str,
        route: Option<Route>,
        options: TransitionOptions,
    ) -> Result<(), RegistryError> {
        self.register_with_priority(name, route, 0, options)
    }

    /// Register a state. Higher priority routes are matched first.
    pub fn register_with_priority(
        &self,
        name: &str,
        route: Option<Route>,
        priority: i32,
        options: TransitionOptions,
    ) -> Result<(), RegistryError> {
        State::new(name)?;
        if let Some(route) = &route {
            if route.name() != name {
                return Err(RegistryError::RouteMismatch {
                    state: name.to_string(),
                    route: route.name().to_string(),
                });
            }
        }

        let mut inner = self.lock();
        if inner.states.contains_key(name) {
            return Err(RegistryError::DuplicateState(name.to_string()));
        }

        let route = route.map(Arc::new);
        if let Some(route) = &route {
            inner.routes.insert(route.clone(), priority);
        }
        tracing::debug!(
            state = name,
            pattern = route.as_ref().map(|r| r.pattern()),
            priority,
            "State registered"
        );
        inner.states.insert(
            name.to_string(),
            Registration {
                route,
                priority,
                options,
            },
        );
        Ok(())
    }

    /// Remove a state and its route. Returns whether it was registered.
    pub fn unregister(&self, name: &str) -> bool {
        let mut inner = self.lock();
        inner.routes.remove(name);
        inner.states.remove(name).is_some()
    }

    pub fn unregister_all(&self) {
        let mut inner = self.lock();
        inner.routes.clear();
        inner.states.clear();
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.lock().states.contains_key(name)
    }

    /// Registered states in name order.
    pub fn registered(&self) -> Vec<(String, Registration)> {
        self.lock()
            .states
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Routes in match order.
    pub fn routes(&self) -> Vec<Arc<Route>> {
        self.lock().routes.snapshot()
    }

    pub fn route_for(&self, name: &str) -> Option<Arc<Route>> {
        self.lock().states.get(name).and_then(|r| r.route.clone())
    }

    // --- Address wiring ---

    /// Use `address` as the navigable location and route its change events
    /// through the transition pipeline. Replaces any previous adapter.
    pub fn set_address(self: &Arc<Self>, address: Arc<dyn Address>) {
        self.unset_address();

        let listener = match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let rx = address.subscribe();
                Some(handle.spawn(listen(Arc::downgrade(self), rx)))
            }
            Err(_) => {
                tracing::warn!("No async runtime; address changes must be fed via handle_address_change");
                None
            }
        };

        let mut inner = self.lock();
        inner.address = Some(address);
        inner.listener = listener;
        tracing::debug!("Address adapter set");
    }

    /// Detach the adapter and stop listening to it.
    pub fn unset_address(&self) {
        let mut inner = self.lock();
        if let Some(listener) = inner.listener.take() {
            listener.abort();
        }
        if inner.address.take().is_some() {
            tracing::debug!("Address adapter unset");
        }
    }

    pub fn address(&self) -> Option<Arc<dyn Address>> {
        self.lock().address.clone()
    }

    /// Feed a value (or the adapter's current value) through the address
    /// handler. This is how navigation starts from a cold start.
    pub async fn parse(
        &self,
        value: Option<&str>,
        options: TransitionOptions,
    ) -> Result<AddressOutcome, RegistryError> {
        let (value, previous) = {
            let inner = self.lock();
            let value = match (value, &inner.address) {
                (Some(v), _) => v.to_string(),
                (None, Some(address)) => address.value(),
                (None, None) => return Err(RegistryError::NoAddress),
            };
            (value, inner.last_url.clone())
        };
        let change = AddressChange {
            value,
            previous,
            source: ChangeSource::Synthetic,
        };
        self.handle_change(change, options).await
    }

    /// Handle an address change as produced by an adapter.
    pub async fn handle_address_change(
        &self,
        change: AddressChange,
    ) -> Result<AddressOutcome, RegistryError> {
        self.handle_change(change, TransitionOptions::new()).await
    }

    async fn handle_change(
        &self,
        change: AddressChange,
        options: TransitionOptions,
    ) -> Result<AddressOutcome, RegistryError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(RegistryError::Reentrant);
        }

        let value = normalize(&change.value);
        let routes = {
            let inner = self.lock();
            if inner.last_url.as_deref() == Some(value.as_str()) {
                tracing::debug!(value = %value, "Ignoring own address write");
                return Ok(AddressOutcome::Ignored);
            }
            inner.routes.snapshot()
        };

        let Some((route, mut params)) = RouteTable::resolve(&routes, &value).await else {
            tracing::warn!(value = %change.value, "No route matches address");
            metrics::record_unknown_address();
            self.emit(RegistryEvent::Unknown { raw: change.value });
            return Ok(AddressOutcome::Unknown);
        };

        let previous = change.previous.as_deref().map(normalize);
        params.set_special(
            ADDRESS_CHANGE,
            Special::Address(AddressChange {
                value: value.clone(),
                ..change
            }),
        );
        let state = State::with_params(route.name(), params)?;

        // The adapter already shows this value; a canonical rewrite must not add history.
        let options = options.merged_over(&TransitionOptions::new().replace(true));
        let changed = self.transition(state, options, previous.as_deref()).await?;
        Ok(AddressOutcome::Transition(changed))
    }

    // --- Transitions ---

    /// Build a state from `name` and `params`, then [`set_current`](Self::set_current).
    pub async fn navigate(
        &self,
        name: &str,
        params: Params,
        options: TransitionOptions,
    ) -> Result<bool, RegistryError> {
        let state = State::with_params(name, params)?;
        self.set_current(state, options).await
    }

    /// Transition to `state`.
    ///
    /// Returns `false` when `state` equals the current state and `force` is
    /// not set. Otherwise returns `true`; whether the transition committed or
    /// was cancelled is reported through [`RegistryEvent`]s.
    pub async fn set_current(
        &self,
        state: State,
        options: TransitionOptions,
    ) -> Result<bool, RegistryError> {
        self.transition(state, options, None).await
    }

    /// `fallback` is what the address showed before the candidate, used on
    /// rejection when the current state has no URL of its own.
    async fn transition(
        &self,
        state: State,
        options: TransitionOptions,
        fallback: Option<&str>,
    ) -> Result<bool, RegistryError> {
        let _guard = self.enter()?;

        let (route, resolved, current) = {
            let inner = self.lock();
            let registration = inner.states.get(state.full_name());
            let defaults = registration.map(|r| r.options.clone()).unwrap_or_default();
            let resolved = options.merged_over(&defaults).resolve(inner.current.is_none());
            (
                registration.and_then(|r| r.route.clone()),
                resolved,
                inner.current.clone(),
            )
        };

        if !resolved.force {
            if let Some(current) = &current {
                if current.full_equal(&state) {
                    tracing::debug!(state = %state, "Already current, nothing to do");
                    metrics::record_transition("unchanged");
                    return Ok(false);
                }
            }
        }

        let plan = self.lock().interceptors.plan(resolved.interceptors);
        let approved = match plan {
            Plan::Approve => true,
            Plan::Run(list) => {
                metrics::record_interceptor_run(list.len());
                interceptor::run_all(&list, &state).await
            }
        };

        if !approved {
            self.restore_address(current.as_deref(), fallback);
            tracing::info!(state = %state, "Transition cancelled");
            metrics::record_transition("cancelled");
            self.emit(RegistryEvent::Cancelled {
                rejected: Arc::new(state),
            });
            return Ok(true);
        }

        self.commit(state, current, route, resolved)?;
        Ok(true)
    }

    fn commit(
        &self,
        mut state: State,
        previous: Option<Arc<State>>,
        route: Option<Arc<Route>>,
        options: ResolvedOptions,
    ) -> Result<(), RegistryError> {
        let url = match (&route, options.route) {
            (Some(route), true) => Some(route.generate_url(state.params())?),
            _ => None,
        };

        let id = Uuid::new_v4();
        let entering = state.detached();
        let params = state.params_mut();
        params.set_special(NEW_STATE, Special::State(entering));
        if let Some(previous) = &previous {
            params.set_special(PREVIOUS_STATE, Special::State(previous.detached()));
        }
        params.set_special(TRANSITION_ID, Special::TransitionId(id));
        state.set_cursor(0);
        let new = Arc::new(state);

        {
            let mut inner = self.lock();
            inner.current = Some(new.clone());
            if let (Some(url), Some(address)) = (&url, &inner.address) {
                if address.value() != *url {
                    address.set_value(url, WriteOptions { replace: options.replace });
                }
            }
            // A routeless state owns no URL, so nothing the address shows is an echo.
            inner.last_url = url.clone();
        }

        tracing::info!(
            transition = %id,
            state = %new,
            previous = previous.as_ref().map(|p| p.full_name()),
            url = url.as_deref(),
            "Transition committed"
        );
        metrics::record_transition("committed");

        if !options.silent {
            self.emit(RegistryEvent::Changed { new, previous });
        }
        Ok(())
    }

    /// Put the address back to what the current state shows, else to the
    /// registry's last write, else to `fallback`. `last_url` is left alone:
    /// only a commit changes what the registry owns.
    fn restore_address(&self, current: Option<&State>, fallback: Option<&str>) {
        let inner = self.lock();
        let Some(address) = inner.address.clone() else {
            return;
        };

        let target = current
            .and_then(|state| {
                let route = inner.states.get(state.full_name())?.route.clone()?;
                match route.generate_url(state.params()) {
                    Ok(url) => Some(url),
                    Err(e) => {
                        tracing::warn!(error = %e, "Cannot regenerate current URL");
                        None
                    }
                }
            })
            .or_else(|| inner.last_url.clone())
            .or_else(|| fallback.map(str::to_string));

        if let Some(url) = target {
            if address.value() != url {
                address.set_value(&url, WriteOptions { replace: true });
            }
        }
    }

    pub fn get_current(&self) -> Option<Arc<State>> {
        self.lock().current.clone()
    }

    /// Full equality with the current state.
    pub fn is_current(&self, state: &State) -> bool {
        self.lock()
            .current
            .as_ref()
            .is_some_and(|current| current.full_equal(state))
    }

    /// Name-and-params form of [`is_current`](Self::is_current).
    pub fn is_current_name(&self, name: &str, params: &Params) -> Result<bool, RegistryError> {
        let state = State::with_params(name, params.clone())?;
        Ok(self.is_current(&state))
    }

    /// Link target for a state.
    ///
    /// Uses the state's route, or the first descendant route in match order
    /// that `params` satisfy. States without either get a `state://` URL.
    pub fn generate_url(
        &self,
        name: &str,
        params: &Params,
        absolute: bool,
    ) -> Result<String, RegistryError> {
        State::new(name)?;
        let (route, address) = {
            let inner = self.lock();
            let prefix = format!("{}.", name);
            let route = inner
                .states
                .get(name)
                .and_then(|r| r.route.clone())
                .or_else(|| {
                    inner
                        .routes
                        .entries()
                        .iter()
                        .map(|e| &e.route)
                        .find(|r| r.name().starts_with(&prefix) && r.satisfies(params))
                        .cloned()
                });
            (route, inner.address.clone())
        };

        match route {
            Some(route) => {
                let path = route.generate_url(params)?;
                Ok(match address {
                    Some(address) => address.generate_url(&path, absolute),
                    None => path,
                })
            }
            None => Ok(link::state_url(name, params)),
        }
    }

    /// Handle a click on `href`. `state://` links become transitions unless
    /// the element is internal, in which case navigation is only suppressed.
    pub async fn follow_link(&self, href: &str, internal: bool) -> Result<LinkOutcome, RegistryError> {
        let Some(parsed) = link::parse_state_url(href) else {
            return Ok(LinkOutcome::Native);
        };
        if internal {
            return Ok(LinkOutcome::Suppressed);
        }
        let state = parsed?;
        let changed = self.set_current(state, TransitionOptions::new()).await?;
        Ok(LinkOutcome::Navigated(changed))
    }

    // --- Interceptors ---

    pub fn add_interceptor(&self, interceptor: Arc<dyn Interceptor>) -> Result<(), RegistryError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(RegistryError::Reentrant);
        }
        self.lock().interceptors.add(interceptor);
        Ok(())
    }

    pub fn remove_interceptor(&self, interceptor: &Arc<dyn Interceptor>) -> Result<bool, RegistryError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(RegistryError::Reentrant);
        }
        Ok(self.lock().interceptors.remove(interceptor))
    }

    pub fn interceptor_count(&self) -> usize {
        self.lock().interceptors.len()
    }

    /// True while a transition is being decided.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Drop the adapter, interceptors, registrations and current state.
    pub fn teardown(&self) {
        self.unset_address();
        let mut inner = self.lock();
        inner.interceptors.reset();
        inner.routes.clear();
        inner.states.clear();
        inner.current = None;
        inner.last_url = None;
        tracing::debug!("Registry torn down");
    }

    fn enter(&self) -> Result<PipelineGuard<'_>, RegistryError> {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| RegistryError::Reentrant)?;

        let address = self.lock().address.clone().filter(|a| a.is_enabled());
        if let Some(address) = &address {
            address.disable();
        }
        Ok(PipelineGuard {
            running: &self.running,
            address,
        })
    }

    fn emit(&self, event: RegistryEvent) {
        tracing::trace!(kind = event.kind(), "Registry event");
        // Nobody subscribed is not an error.
        let _ = self.events.send(event);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for StateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("StateRegistry")
            .field("states", &inner.states.len())
            .field("routes", &inner.routes.len())
            .field("interceptors", &inner.interceptors)
            .field("current", &inner.current.as_ref().map(|s| s.full_name().to_string()))
            .field("running", &self.running.load(Ordering::SeqCst))
            .finish()
    }
}

impl Drop for StateRegistry {
    fn drop(&mut self) {
        if let Some(listener) = self.lock().listener.take() {
            listener.abort();
        }
    }
}

fn normalize(value: &str) -> String {
    if value.starts_with('/') {
        value.to_string()
    } else {
        format!("/{}", value)
    }
}

async fn listen(registry: Weak<StateRegistry>, mut rx: broadcast::Receiver<AddressChange>) {
    loop {
        match rx.recv().await {
            Ok(change) => {
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                if let Err(e) = registry.handle_address_change(change).await {
                    tracing::error!(error = %e, "Address change failed");
                }
            }
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                tracing::warn!(missed, "Address listener lagged, changes dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
