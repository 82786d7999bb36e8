//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.
//! States nest: `[states.shop.children.show]` declares `shop.show`.

use std::collections::BTreeMap;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::address::AddressMode;
use crate::registry::TransitionOptions;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct NavigationConfig {
    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Address adapter settings.
    pub address: AddressConfig,

    /// Top-level states, in declaration order.
    pub states: StateMap,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level used when `RUST_LOG` is not set.
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// How URLs are written to the address.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AddressConfig {
    pub mode: AddressMode,

    /// Prefix for generated URLs (e.g. "/app").
    pub base: String,
}

/// One state in the tree.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StateConfig {
    /// Pattern appended to the nearest ancestor's pattern.
    pub pattern: Option<String>,

    /// Pattern used as is, ignoring ancestors.
    #[serde(rename = "override")]
    pub override_pattern: Option<String>,

    /// Register a route for this state (default: true). With `false` the
    /// pattern still prefixes the children.
    pub route: bool,

    /// Placeholder name → regex the decoded value must fully match.
    pub constraints: BTreeMap<String, String>,

    /// Route priority (higher = checked first).
    pub priority: i32,

    /// Registration defaults for transitions into this state.
    pub options: TransitionOptions,

    /// Child states.
    pub children: StateMap,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            pattern: None,
            override_pattern: None,
            route: true,
            constraints: BTreeMap::new(),
            priority: 0,
            options: TransitionOptions::default(),
            children: StateMap::default(),
        }
    }
}

/// Ordered mapping of segment name → state.
///
/// Order matters: routes with equal priority are tried in declaration order.
#[derive(Debug, Clone, Default)]
pub struct StateMap(pub Vec<(String, StateConfig)>);

impl StateMap {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StateConfig)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, name: &str) -> Option<&StateConfig> {
        self.0.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for StateMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for StateMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct StateMapVisitor;

        impl<'de> Visitor<'de> for StateMapVisitor {
            type Value = StateMap;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a table of states")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<StateMap, A::Error> {
                let mut entries = Vec::new();
                while let Some((key, value)) = access.next_entry::<String, StateConfig>()? {
                    entries.push((key, value));
                }
                Ok(StateMap(entries))
            }
        }

        deserializer.deserialize_map(StateMapVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::InterceptorMode;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: NavigationConfig = toml::from_str("").unwrap();
        assert_eq!(config.observability.log_level, "info");
        assert_eq!(config.address.mode, AddressMode::Path);
        assert!(config.states.is_empty());
    }

    #[test]
    fn test_nested_states_keep_order() {
        let config: NavigationConfig = toml::from_str(
            r#"
            [address]
            mode = "fragment"
            base = "/app"

            [states.zoo]
            pattern = "/zoo"

            [states.about]
            override = "/about-us"

            [states.shop]
            pattern = "/shop"
            route = false

            [states.shop.children.show]
            pattern = "/{id}"
            constraints = { id = "\\d+" }
            priority = 2

            [states.shop.children.show.options]
            replace = false
            interceptors = "skip(2)"
            "#,
        )
        .unwrap();

        assert_eq!(config.address.mode, AddressMode::Fragment);
        let names: Vec<_> = config.states.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["zoo", "about", "shop"]);

        let shop = config.states.get("shop").unwrap();
        assert!(!shop.route);
        let show = shop.children.get("show").unwrap();
        assert_eq!(show.priority, 2);
        assert_eq!(show.constraints["id"], "\\d+");
        assert_eq!(show.options.replace, Some(false));
        assert_eq!(show.options.interceptors, Some(InterceptorMode::Skip(2)));
        assert_eq!(
            config.states.get("about").unwrap().override_pattern.as_deref(),
            Some("/about-us")
        );
    }

    #[test]
    fn test_unknown_state_field_rejected() {
        let result: Result<NavigationConfig, _> = toml::from_str("[states.shop]\npatern = \"/shop\"\n");
        assert!(result.is_err());
    }
}
