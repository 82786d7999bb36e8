//! Flattening the nested state tree into registrations.

use std::collections::BTreeMap;

use crate::config::loader::ConfigError;
use crate::config::schema::{NavigationConfig, StateMap};
use crate::registry::{StateRegistry, TransitionOptions};
use crate::routing::{Constraint, Route, RouteError};

/// One state ready to be registered.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatState {
    /// Full dotted name.
    pub name: String,
    /// Effective route pattern, `None` for route-less states.
    pub pattern: Option<String>,
    pub constraints: BTreeMap<String, String>,
    pub priority: i32,
    pub options: TransitionOptions,
}

impl FlatState {
    /// Compile the route, if the state has one.
    pub fn route(&self) -> Result<Option<Route>, RouteError> {
        let Some(pattern) = &self.pattern else {
            return Ok(None);
        };
        let mut route = Route::new(self.name.clone(), pattern)?;
        for (placeholder, regex) in &self.constraints {
            route = route.with_constraint(placeholder, Constraint::pattern(regex)?)?;
        }
        Ok(Some(route))
    }
}

/// Walk the state tree depth-first, parents before children.
pub fn flatten(config: &NavigationConfig) -> Vec<FlatState> {
    let mut out = Vec::new();
    walk(&config.states, None, None, &mut out);
    out
}

fn walk(states: &StateMap, parent: Option<&str>, prefix: Option<&str>, out: &mut Vec<FlatState>) {
    for (segment, state) in states.iter() {
        let name = match parent {
            Some(parent) => format!("{parent}.{segment}"),
            None => segment.to_string(),
        };

        let effective = match (&state.override_pattern, &state.pattern) {
            (Some(full), _) => Some(full.clone()),
            (None, Some(own)) => Some(join_pattern(prefix, own)),
            (None, None) => None,
        };

        out.push(FlatState {
            name: name.clone(),
            pattern: effective.clone().filter(|_| state.route),
            constraints: state.constraints.clone(),
            priority: state.priority,
            options: state.options.clone(),
        });

        let child_prefix = effective.as_deref().or(prefix);
        walk(&state.children, Some(&name), child_prefix, out);
    }
}

fn join_pattern(prefix: Option<&str>, own: &str) -> String {
    match prefix {
        None | Some("/") => own.to_string(),
        Some(prefix) if own == "/" => prefix.to_string(),
        Some(prefix) => format!("{}{}", prefix.trim_end_matches('/'), own),
    }
}

/// Register every configured state. Returns how many were registered.
pub fn register_all(registry: &StateRegistry, config: &NavigationConfig) -> Result<usize, ConfigError> {
    let states = flatten(config);
    for state in &states {
        let route = state.route()?;
        registry.register_with_priority(&state.name, route, state.priority, state.options.clone())?;
    }
    tracing::info!(states = states.len(), "Registered configured states");
    Ok(states.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(src: &str) -> NavigationConfig {
        toml::from_str(src).unwrap()
    }

    #[test]
    fn test_flatten_prefixes_and_overrides() {
        let flat = flatten(&config(
            r#"
            [states.shop]
            pattern = "/shop"
            route = false

            [states.shop.children.index]
            pattern = "/"

            [states.shop.children.show]
            pattern = "/{id}"

            [states.shop.children.show.children.reviews]
            pattern = "/reviews"

            [states.shop.children.legacy]
            override = "/store/{id}"

            [states.home]
            pattern = "/"
            "#,
        ));

        let pairs: Vec<_> = flat.iter().map(|s| (s.name.as_str(), s.pattern.as_deref())).collect();
        assert_eq!(
            pairs,
            vec![
                ("shop", None),
                ("shop.index", Some("/shop")),
                ("shop.show", Some("/shop/{id}")),
                ("shop.show.reviews", Some("/shop/{id}/reviews")),
                ("shop.legacy", Some("/store/{id}")),
                ("home", Some("/")),
            ]
        );
    }

    #[test]
    fn test_routeless_parent_without_pattern() {
        let flat = flatten(&config(
            r#"
            [states.admin.children.users]
            pattern = "/users"
            "#,
        ));
        assert_eq!(flat[0].pattern, None);
        assert_eq!(flat[1].pattern.as_deref(), Some("/users"));
    }

    #[test]
    fn test_register_all() {
        let registry = StateRegistry::new();
        let count = register_all(
            &registry,
            &config(
                r#"
                [states.shop]
                pattern = "/shop"
                [states.shop.children.show]
                pattern = "/{id}"
                constraints = { id = "\\d+" }
                priority = 3
                "#,
            ),
        )
        .unwrap();

        assert_eq!(count, 2);
        let route = registry.route_for("shop.show").unwrap();
        assert_eq!(route.pattern(), "/shop/{id}");
        assert!(route.captures("/shop/12").is_some());
        assert!(route.captures("/shop/abc").is_none());
    }
}
