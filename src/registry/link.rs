//! Synthetic `state://` links.
//!
//! States without a route still get a link target:
//! `state://shop.show/id=42&tab=info`. Clicking such a link is turned back
//! into a `(name, params)` pair instead of a native navigation.

use url::form_urlencoded;

use crate::state::params::value_to_string;
use crate::state::{Params, State, StateError};

pub const STATE_SCHEME: &str = "state://";

/// Build the synthetic URL for a state. Metadata entries are left out.
pub fn state_url(name: &str, params: &Params) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), value_to_string(v))))
        .finish();
    format!("{}{}/{}", STATE_SCHEME, name, query)
}

/// True if `href` uses the synthetic scheme.
pub fn is_state_url(href: &str) -> bool {
    href.starts_with(STATE_SCHEME)
}

/// Recover the state from a synthetic URL. `None` if `href` is not one.
pub fn parse_state_url(href: &str) -> Option<Result<State, StateError>> {
    let rest = href.strip_prefix(STATE_SCHEME)?;
    let (name, query) = rest.split_once('/').unwrap_or((rest, ""));
    let params: Params = form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    Some(State::with_params(name, params))
}

/// What the host should do with a clicked link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// Not a state link: let the native navigation happen.
    Native,
    /// Internal link: navigation suppressed, no transition.
    Suppressed,
    /// Transition requested; the flag is the `set_current` result.
    Navigated(bool),
}
