//! Pattern compilation and placeholder constraints.
//!
//! # Responsibilities
//! - Parse `/shop/{id}` into literal and placeholder tokens
//! - Compile tokens into an anchored regex with one capture per placeholder
//! - Check captured values against per-placeholder constraints
//!
//! # Design Decisions
//! - A placeholder matches one non-empty path segment (`[^/]+`)
//! - Constraints run on the decoded value, after the structural match
//! - Capture order equals placeholder order in the pattern

use std::sync::Arc;

use regex::Regex;

use crate::routing::route::RouteError;

/// One piece of a parsed pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Literal(String),
    Placeholder(String),
}

/// Compiled form of a route pattern.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    regex: Regex,
    tokens: Vec<Token>,
    placeholders: Vec<String>,
}

impl PatternMatcher {
    /// Compile a pattern. It must start with `/`.
    pub fn compile(pattern: &str) -> Result<Self, RouteError> {
        let invalid = |reason: &str| RouteError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        if !pattern.starts_with('/') {
            return Err(invalid("must start with '/'"));
        }

        let mut tokens = Vec::new();
        let mut placeholders: Vec<String> = Vec::new();
        let mut literal = String::new();
        let mut chars = pattern.chars();

        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        name.push(c);
                    }
                    if !closed {
                        return Err(invalid("unclosed '{'"));
                    }
                    if name.is_empty()
                        || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
                    {
                        return Err(invalid("placeholder names must be [A-Za-z0-9_-]+"));
                    }
                    if placeholders.contains(&name) {
                        return Err(invalid("duplicate placeholder"));
                    }
                    if !literal.is_empty() {
                        tokens.push(Token::Literal(std::mem::take(&mut literal)));
                    }
                    placeholders.push(name.clone());
                    tokens.push(Token::Placeholder(name));
                }
                '}' => return Err(invalid("unmatched '}'")),
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            tokens.push(Token::Literal(literal));
        }

        let mut source = String::from("^");
        for token in &tokens {
            match token {
                Token::Literal(text) => source.push_str(&regex::escape(text)),
                Token::Placeholder(_) => source.push_str("([^/]+)"),
            }
        }
        source.push('$');

        let regex = Regex::new(&source).map_err(|e| invalid(&e.to_string()))?;

        Ok(Self {
            regex,
            tokens,
            placeholders,
        })
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    /// Raw (still encoded) captures in placeholder order.
    pub fn captures<'u>(&self, url: &'u str) -> Option<Vec<&'u str>> {
        let caps = self.regex.captures(url)?;
        (1..caps.len())
            .map(|i| caps.get(i).map(|m| m.as_str()))
            .collect()
    }
}

/// A check applied to one decoded placeholder value.
#[derive(Clone)]
pub enum Constraint {
    Pattern(Regex),
    Predicate(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl Constraint {
    /// Build an anchored regex constraint.
    pub fn pattern(source: &str) -> Result<Self, RouteError> {
        Regex::new(&format!("^(?:{})$", source))
            .map(Constraint::Pattern)
            .map_err(|e| RouteError::InvalidConstraint {
                source_pattern: source.to_string(),
                reason: e.to_string(),
            })
    }

    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Constraint::Predicate(Arc::new(f))
    }

    pub fn check(&self, value: &str) -> bool {
        match self {
            Constraint::Pattern(re) => re.is_match(value),
            Constraint::Predicate(f) => f(value),
        }
    }
}

impl std::fmt::Debug for Constraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Constraint::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            Constraint::Predicate(_) => f.write_str("Predicate"),
        }
    }
}
