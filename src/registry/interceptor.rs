//! Transition interceptors.
//!
//! An interceptor sees the candidate state before it is committed and
//! answers with a [`Verdict`]. The chain keeps registration order and a skip
//! counter; running the chain is done by the registry so that the reentrancy
//! guard and the address adapter are handled in one place.

use std::sync::Arc;

use crate::registry::options::InterceptorMode;
use crate::state::State;
use crate::verdict::Verdict;

/// A guard consulted before a transition commits.
pub trait Interceptor: Send + Sync {
    fn intercept(&self, candidate: &State) -> Verdict;
}

impl<F> Interceptor for F
where
    F: Fn(&State) -> Verdict + Send + Sync,
{
    fn intercept(&self, candidate: &State) -> Verdict {
        self(candidate)
    }
}

/// What the pipeline should do for one transition.
#[derive(Clone)]
pub enum Plan {
    /// Approve without running anything.
    Approve,
    /// Run these interceptors in order.
    Run(Vec<Arc<dyn Interceptor>>),
}

/// Ordered interceptors plus the skip counter.
#[derive(Default)]
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn Interceptor>>,
    skip: u32,
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append, replacing an earlier registration of the same interceptor.
    pub fn add(&mut self, interceptor: Arc<dyn Interceptor>) {
        self.remove(&interceptor);
        self.interceptors.push(interceptor);
    }

    /// Remove by identity. Returns whether anything was removed.
    pub fn remove(&mut self, interceptor: &Arc<dyn Interceptor>) -> bool {
        let before = self.interceptors.len();
        self.interceptors.retain(|i| !same(i, interceptor));
        before != self.interceptors.len()
    }

    pub fn reset(&mut self) {
        self.interceptors.clear();
        self.skip = 0;
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    pub fn pending_skips(&self) -> u32 {
        self.skip
    }

    /// Apply `mode` and decide what runs for the current transition.
    pub fn plan(&mut self, mode: InterceptorMode) -> Plan {
        match mode {
            InterceptorMode::Reset => {
                self.reset();
                return Plan::Approve;
            }
            InterceptorMode::Skip(n) => self.skip = self.skip.saturating_add(n),
            InterceptorMode::Run => {}
        }

        if self.skip > 0 {
            self.skip -= 1;
            tracing::debug!(remaining = self.skip, "Skipping interceptors");
            return Plan::Approve;
        }
        if self.interceptors.is_empty() {
            Plan::Approve
        } else {
            Plan::Run(self.interceptors.clone())
        }
    }
}

impl std::fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("len", &self.interceptors.len())
            .field("skip", &self.skip)
            .finish()
    }
}

/// Identity comparison on the data pointer only.
fn same(a: &Arc<dyn Interceptor>, b: &Arc<dyn Interceptor>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// Run `interceptors` in order, stopping at the first rejection.
pub async fn run_all(interceptors: &[Arc<dyn Interceptor>], candidate: &State) -> bool {
    for (i, interceptor) in interceptors.iter().enumerate() {
        if !interceptor.intercept(candidate).resolve().await {
            tracing::debug!(index = i, state = %candidate.full_name(), "Interceptor rejected transition");
            return false;
        }
    }
    true
}
