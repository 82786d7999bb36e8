//! Dotted state with a traversal cursor.

use crate::state::name::{validate_name, StateError};
use crate::state::params::Params;

/// A hierarchical state such as `shop.show`, plus its parameters.
///
/// The cursor marks how many segments have been consumed while the state
/// travels down the controller tree. `name()` is the segment under the
/// cursor; once every segment is consumed the state is terminal.
#[derive(Debug, Clone)]
pub struct State {
    full_name: String,
    parts: Vec<String>,
    cursor: usize,
    params: Params,
}

impl State {
    /// Create a state with no parameters.
    pub fn new(name: &str) -> Result<Self, StateError> {
        Self::with_params(name, Params::new())
    }

    /// Create a state with parameters.
    pub fn with_params(name: &str, params: Params) -> Result<Self, StateError> {
        let parts = validate_name(name)?;
        Ok(Self {
            full_name: name.to_string(),
            parts,
            cursor: 0,
            params,
        })
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut Params {
        &mut self.params
    }

    /// Segment under the cursor, `None` once terminal.
    pub fn name(&self) -> Option<&str> {
        self.parts.get(self.cursor).map(String::as_str)
    }

    pub fn is_terminal(&self) -> bool {
        self.cursor >= self.parts.len()
    }

    /// Unconsumed suffix of the full name.
    pub fn branch_name(&self) -> String {
        self.parts[self.cursor..].join(".")
    }

    /// Consumed prefix of the full name.
    pub fn consumed_name(&self) -> String {
        self.parts[..self.cursor].join(".")
    }

    /// Advance past the current segment. May reach the terminal position.
    pub fn next(&mut self) -> &mut Self {
        if self.cursor < self.parts.len() {
            self.cursor += 1;
        }
        self
    }

    /// Step back one segment, keeping at least the first segment consumed.
    pub fn previous(&mut self) -> &mut Self {
        if self.cursor > 1 {
            self.cursor -= 1;
        }
        self
    }

    pub fn set_cursor(&mut self, cursor: usize) -> &mut Self {
        self.cursor = cursor.min(self.parts.len());
        self
    }

    /// Same segment under the cursor and same parameters.
    ///
    /// With `keys`, only those parameters are compared; otherwise all regular
    /// parameters are.
    pub fn shallow_equal(&self, other: &State, keys: Option<&[String]>) -> bool {
        self.name() == other.name() && self.params.equal_on(&other.params, keys)
    }

    /// Same full name and same regular parameters.
    pub fn full_equal(&self, other: &State) -> bool {
        self.full_name == other.full_name && self.params.equal_on(&other.params, None)
    }

    /// Copy without metadata entries, cursor preserved.
    pub fn detached(&self) -> State {
        State {
            full_name: self.full_name.clone(),
            parts: self.parts.clone(),
            cursor: self.cursor,
            params: self.params.without_special(),
        }
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.full_name)?;
        if !self.params.is_empty() {
            write!(f, "(")?;
            for (i, (k, v)) in self.params.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}={}", k, v)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_walk() {
        let mut state = State::new("a.b.c").unwrap();
        assert_eq!(state.name(), Some("a"));
        assert_eq!(state.branch_name(), "a.b.c");

        state.next();
        assert_eq!(state.name(), Some("b"));
        assert_eq!(state.branch_name(), "b.c");
        assert_eq!(state.consumed_name(), "a");

        state.next().next();
        assert!(state.is_terminal());
        assert_eq!(state.name(), None);
        assert_eq!(state.branch_name(), "");

        state.next();
        assert_eq!(state.cursor(), 3);
    }

    #[test]
    fn test_previous_keeps_first_segment() {
        let mut state = State::new("a.b").unwrap();
        state.set_cursor(2);
        state.previous();
        assert_eq!(state.cursor(), 1);
        state.previous();
        assert_eq!(state.cursor(), 1);

        let mut fresh = State::new("a.b").unwrap();
        fresh.previous();
        assert_eq!(fresh.cursor(), 0);
    }

    #[test]
    fn test_set_cursor_clamps() {
        let mut state = State::new("a.b").unwrap();
        state.set_cursor(10);
        assert_eq!(state.cursor(), 2);
        state.set_cursor(0);
        assert_eq!(state.name(), Some("a"));
    }

    #[test]
    fn test_empty_state() {
        let state = State::new("").unwrap();
        assert!(state.is_terminal());
        assert_eq!(state.branch_name(), "");
    }

    #[test]
    fn test_shallow_vs_full_equality() {
        let mut a = State::with_params("shop.show", Params::new().with("id", "1")).unwrap();
        let mut b = State::with_params("shop.list", Params::new().with("id", "1")).unwrap();
        assert!(a.shallow_equal(&b, None));
        assert!(!a.full_equal(&b));

        a.next();
        b.next();
        assert!(!a.shallow_equal(&b, None));
    }

    #[test]
    fn test_detached_drops_metadata() {
        let state = State::with_params("a", Params::new().with("id", 1).with("$src", "x")).unwrap();
        let copy = state.detached();
        assert!(copy.params().special("$src").is_none());
        assert!(copy.full_equal(&state));
    }

    #[test]
    fn test_display() {
        let state = State::with_params("shop.show", Params::new().with("id", "42")).unwrap();
        assert_eq!(state.to_string(), "shop.show(id=\"42\")");
    }
}
