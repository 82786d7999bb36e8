//! Dotted state name validation.

use thiserror::Error;

/// Errors raised while building a state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// The name does not match `^([a-z0-9_-]+(\.[a-z0-9_-]+)*)?$`.
    #[error("invalid state name '{0}'")]
    InvalidName(String),
}

/// Returns true if `segment` is a single non-empty state segment.
pub fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

/// Validate a full dotted name and return its segments.
///
/// The empty name is valid and has no segments.
pub fn validate_name(name: &str) -> Result<Vec<String>, StateError> {
    if name.is_empty() {
        return Ok(Vec::new());
    }

    let parts: Vec<String> = name.split('.').map(str::to_string).collect();
    if parts.iter().all(|p| is_valid_segment(p)) {
        Ok(parts)
    } else {
        Err(StateError::InvalidName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert_eq!(validate_name("").unwrap(), Vec::<String>::new());
        assert_eq!(validate_name("shop").unwrap(), vec!["shop"]);
        assert_eq!(validate_name("shop.show_1.x-y").unwrap(), vec!["shop", "show_1", "x-y"]);
    }

    #[test]
    fn test_invalid_names() {
        for bad in ["Shop", "shop.", ".shop", "shop..show", "sh op", "shop/show"] {
            assert_eq!(validate_name(bad), Err(StateError::InvalidName(bad.to_string())), "{bad}");
        }
    }
}
