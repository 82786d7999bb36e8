//! Ordered match list.
//!
//! # Responsibilities
//! - Store compiled routes with their priority
//! - Keep them sorted: priority descending, registration order on ties
//! - Resolve an address to the first matching route
//!
//! # Design Decisions
//! - Lookup is a linear scan (route counts are small)
//! - Resolution works on a snapshot so no lock is held across a probe
//! - Explicit no-match rather than a silent default

use std::sync::Arc;

use crate::routing::route::Route;
use crate::state::Params;

/// A route plus its ordering keys.
#[derive(Debug, Clone)]
pub struct RouteEntry {
    pub route: Arc<Route>,
    pub priority: i32,
    seq: u64,
}

/// Priority-ordered routes.
#[derive(Debug, Default)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
    next_seq: u64,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route, keeping match order stable.
    pub fn insert(&mut self, route: Arc<Route>, priority: i32) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(RouteEntry { route, priority, seq });
        self.entries
            .sort_by(|a, b| b.priority.cmp(&a.priority).then(a.seq.cmp(&b.seq)));
    }

    /// Remove the route bound to `name`.
    pub fn remove(&mut self, name: &str) -> Option<Arc<Route>> {
        let idx = self.entries.iter().position(|e| e.route.name() == name)?;
        Some(self.entries.remove(idx).route)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Route>> {
        self.entries
            .iter()
            .find(|e| e.route.name() == name)
            .map(|e| &e.route)
    }

    /// Entries in match order.
    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    /// Routes in match order, detached from the table.
    pub fn snapshot(&self) -> Vec<Arc<Route>> {
        self.entries.iter().map(|e| e.route.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First route in `routes` that matches `url`.
    pub async fn resolve(routes: &[Arc<Route>], url: &str) -> Option<(Arc<Route>, Params)> {
        for route in routes {
            if let Some(params) = route.match_url(url).await {
                tracing::debug!(route = %route.name(), url, "Route matched");
                return Some((route.clone(), params));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(name: &str, pattern: &str) -> Arc<Route> {
        Arc::new(Route::new(name, pattern).unwrap())
    }

    #[test]
    fn test_priority_then_registration_order() {
        let mut table = RouteTable::new();
        table.insert(route("a", "/a"), 0);
        table.insert(route("b", "/b"), 5);
        table.insert(route("c", "/c"), 0);
        table.insert(route("d", "/d"), 5);

        let order: Vec<_> = table.entries().iter().map(|e| e.route.name().to_string()).collect();
        assert_eq!(order, ["b", "d", "a", "c"]);
    }

    #[test]
    fn test_remove() {
        let mut table = RouteTable::new();
        table.insert(route("a", "/a"), 0);
        table.insert(route("b", "/b"), 0);
        assert!(table.remove("a").is_some());
        assert!(table.remove("a").is_none());
        assert_eq!(table.len(), 1);
        assert!(table.get("b").is_some());
    }

    #[tokio::test]
    async fn test_resolve_first_match_wins() {
        let mut table = RouteTable::new();
        table.insert(route("generic", "/shop/{slug}"), 0);
        table.insert(route("special", "/shop/{id}"), 1);

        let (matched, params) = RouteTable::resolve(&table.snapshot(), "/shop/42").await.unwrap();
        assert_eq!(matched.name(), "special");
        assert_eq!(params.get_str("id").as_deref(), Some("42"));

        assert!(RouteTable::resolve(&table.snapshot(), "/nope").await.is_none());
    }
}
