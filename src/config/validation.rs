//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - State segment names, pattern syntax, constraint placeholders and regexes
//! - Detect conflicting routes (same pattern at the same priority)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: NavigationConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::BTreeMap;

use thiserror::Error;

use crate::config::registration::flatten;
use crate::config::schema::{NavigationConfig, StateMap};
use crate::routing::{Constraint, PatternMatcher};
use crate::state::is_valid_segment;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// One semantic problem, located by a dotted config path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}: {message}")]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub fn validate_config(config: &NavigationConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.observability.log_level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", config.observability.log_level),
        ));
    }

    if !config.address.base.is_empty() && !config.address.base.starts_with('/') {
        errors.push(ValidationError::new("address.base", "must start with '/'"));
    }

    check_tree(&config.states, "states", &mut errors);
    if !errors.is_empty() {
        return Err(errors);
    }

    let mut seen: BTreeMap<(String, i32), String> = BTreeMap::new();
    for state in flatten(config) {
        let path = format!("states.{}", state.name);
        let Some(pattern) = &state.pattern else {
            if !state.constraints.is_empty() {
                errors.push(ValidationError::new(path, "constraints on a state without a route"));
            }
            continue;
        };

        let matcher = match PatternMatcher::compile(pattern) {
            Ok(m) => m,
            Err(e) => {
                errors.push(ValidationError::new(path, e.to_string()));
                continue;
            }
        };

        for (placeholder, regex) in &state.constraints {
            if !matcher.placeholders().contains(placeholder) {
                errors.push(ValidationError::new(
                    format!("{path}.constraints.{placeholder}"),
                    format!("'{pattern}' has no placeholder '{placeholder}'"),
                ));
            }
            if let Err(e) = Constraint::pattern(regex) {
                errors.push(ValidationError::new(
                    format!("{path}.constraints.{placeholder}"),
                    e.to_string(),
                ));
            }
        }

        if let Some(other) = seen.insert((pattern.clone(), state.priority), state.name.clone()) {
            errors.push(ValidationError::new(
                path,
                format!(
                    "pattern '{pattern}' already used by '{other}' at priority {}",
                    state.priority
                ),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_tree(states: &StateMap, path: &str, errors: &mut Vec<ValidationError>) {
    for (segment, state) in states.iter() {
        let here = format!("{path}.{segment}");
        if !is_valid_segment(segment) {
            errors.push(ValidationError::new(
                here.clone(),
                "state names use lowercase letters, digits, '_' and '-'",
            ));
        }
        for (field, pattern) in [("pattern", &state.pattern), ("override", &state.override_pattern)] {
            if let Some(pattern) = pattern {
                if !pattern.starts_with('/') {
                    errors.push(ValidationError::new(
                        format!("{here}.{field}"),
                        format!("'{pattern}' must start with '/'"),
                    ));
                }
            }
        }
        check_tree(&state.children, &format!("{here}.children"), errors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn errors(src: &str) -> Vec<ValidationError> {
        let config: NavigationConfig = toml::from_str(src).unwrap();
        validate_config(&config).err().unwrap_or_default()
    }

    #[test]
    fn test_valid_config() {
        assert!(errors(
            r#"
            [states.shop]
            pattern = "/shop"
            [states.shop.children.show]
            pattern = "/{id}"
            constraints = { id = "\\d+" }
            "#
        )
        .is_empty());
    }

    #[test]
    fn test_collects_all_tree_errors() {
        let found = errors(
            r#"
            [observability]
            log_level = "loud"
            [states.Bad]
            pattern = "bad"
            [states.ok.children.x]
            override = "x"
            "#,
        );
        let paths: Vec<_> = found.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "observability.log_level",
                "states.Bad",
                "states.Bad.pattern",
                "states.ok.children.x.override",
            ]
        );
    }

    #[test]
    fn test_constraint_problems() {
        let found = errors(
            r#"
            [states.shop]
            pattern = "/shop/{id}"
            constraints = { id = "(", slug = "\\w+" }
            [states.about]
            constraints = { id = "\\d+" }
            "#,
        );
        assert_eq!(found.len(), 3);
        assert!(found.iter().any(|e| e.path == "states.shop.constraints.slug"));
        assert!(found.iter().any(|e| e.path == "states.shop.constraints.id"));
        assert!(found.iter().any(|e| e.path == "states.about"));
    }

    #[test]
    fn test_bad_pattern_syntax() {
        let found = errors("[states.shop]\npattern = \"/shop/{id\"\n");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, "states.shop");
    }

    #[test]
    fn test_duplicate_pattern_same_priority() {
        let found = errors(
            r#"
            [states.a]
            pattern = "/x"
            [states.b]
            pattern = "/x"
            [states.c]
            pattern = "/x"
            priority = 1
            "#,
        );
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, "states.b");
    }
}
