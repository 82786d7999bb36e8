//! A URL pattern bound to one state name.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use crate::routing::matcher::{Constraint, PatternMatcher};
use crate::state::params::value_to_string;
use crate::state::Params;
use crate::verdict::Verdict;

/// Errors raised while building routes or generating URLs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("invalid route pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("route '{route}' requires parameter '{param}'")]
    MissingParameter { route: String, param: String },

    #[error("route '{route}' has no placeholder '{placeholder}'")]
    UnknownPlaceholder { route: String, placeholder: String },

    #[error("invalid constraint '{source_pattern}': {reason}")]
    InvalidConstraint { source_pattern: String, reason: String },
}

/// Validation run after a structural match.
///
/// The probe may answer right away or later through a deferred [`Verdict`].
/// A rejection voids the match.
pub trait Probe: Send + Sync {
    fn probe(&self, params: &Params) -> Verdict;
}

impl<F> Probe for F
where
    F: Fn(&Params) -> Verdict + Send + Sync,
{
    fn probe(&self, params: &Params) -> Verdict {
        self(params)
    }
}

/// A compiled route.
#[derive(Clone)]
pub struct Route {
    name: String,
    pattern: String,
    matcher: PatternMatcher,
    constraints: BTreeMap<String, Constraint>,
    probe: Option<Arc<dyn Probe>>,
}

impl Route {
    /// Compile `pattern` for the state `name`.
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self, RouteError> {
        Ok(Self {
            name: name.into(),
            pattern: pattern.to_string(),
            matcher: PatternMatcher::compile(pattern)?,
            constraints: BTreeMap::new(),
            probe: None,
        })
    }

    /// Attach a constraint to a placeholder.
    pub fn with_constraint(
        mut self,
        placeholder: &str,
        constraint: Constraint,
    ) -> Result<Self, RouteError> {
        if !self.matcher.placeholders().iter().any(|p| p == placeholder) {
            return Err(RouteError::UnknownPlaceholder {
                route: self.name.clone(),
                placeholder: placeholder.to_string(),
            });
        }
        self.constraints.insert(placeholder.to_string(), constraint);
        Ok(self)
    }

    pub fn with_probe(mut self, probe: impl Probe + 'static) -> Self {
        self.probe = Some(Arc::new(probe));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn placeholders(&self) -> &[String] {
        self.matcher.placeholders()
    }

    pub fn has_probe(&self) -> bool {
        self.probe.is_some()
    }

    /// Structural match plus constraints, without the probe.
    pub fn captures(&self, url: &str) -> Option<Params> {
        let raw = self.matcher.captures(url)?;
        let mut params = Params::new();
        for (key, value) in self.matcher.placeholders().iter().zip(raw) {
            let decoded = urlencoding::decode(value).ok()?.into_owned();
            if let Some(constraint) = self.constraints.get(key) {
                if !constraint.check(&decoded) {
                    return None;
                }
            }
            params.insert(key.clone(), decoded);
        }
        Some(params)
    }

    /// Full match: captures, then the probe if one is configured.
    pub async fn match_url(&self, url: &str) -> Option<Params> {
        let params = self.captures(url)?;
        match &self.probe {
            None => Some(params),
            Some(probe) => {
                if probe.probe(&params).resolve().await {
                    Some(params)
                } else {
                    tracing::debug!(route = %self.name, url, "Route probe rejected match");
                    None
                }
            }
        }
    }

    /// True if every placeholder has a non-null value.
    pub fn satisfies(&self, params: &Params) -> bool {
        self.matcher
            .placeholders()
            .iter()
            .all(|p| params.get(p).is_some_and(|v| !v.is_null()))
    }

    /// Substitute params into the pattern.
    pub fn generate_url(&self, params: &Params) -> Result<String, RouteError> {
        use crate::routing::matcher::Token;

        let mut url = String::with_capacity(self.pattern.len());
        for token in self.matcher.tokens() {
            match token {
                Token::Literal(text) => url.push_str(text),
                Token::Placeholder(key) => {
                    let value = params.get(key).filter(|v| !v.is_null()).ok_or_else(|| {
                        RouteError::MissingParameter {
                            route: self.name.clone(),
                            param: key.clone(),
                        }
                    })?;
                    url.push_str(&urlencoding::encode(&value_to_string(value)));
                }
            }
        }
        Ok(url)
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .field("pattern", &self.pattern)
            .field("constraints", &self.constraints)
            .field("probe", &self.probe.is_some())
            .finish()
    }
}
