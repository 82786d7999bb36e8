//! Transition options and interceptor modes.

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// How the interceptor pipeline treats a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterceptorMode {
    /// Run every interceptor in registration order.
    #[default]
    Run,
    /// Bypass interceptors for this and the next `n - 1` transitions.
    Skip(u32),
    /// Drop all interceptors and the skip counter, then approve.
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid interceptor mode '{0}' (expected run, skip, skip(N) or reset)")]
pub struct InterceptorModeError(pub String);

impl FromStr for InterceptorMode {
    type Err = InterceptorModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || InterceptorModeError(s.to_string());
        match s.trim() {
            "run" => Ok(InterceptorMode::Run),
            "reset" => Ok(InterceptorMode::Reset),
            "skip" => Ok(InterceptorMode::Skip(1)),
            other => {
                let n = other
                    .strip_prefix("skip(")
                    .and_then(|rest| rest.strip_suffix(')'))
                    .ok_or_else(err)?;
                n.trim().parse().map(InterceptorMode::Skip).map_err(|_| err())
            }
        }
    }
}

impl std::fmt::Display for InterceptorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InterceptorMode::Run => write!(f, "run"),
            InterceptorMode::Skip(1) => write!(f, "skip"),
            InterceptorMode::Skip(n) => write!(f, "skip({})", n),
            InterceptorMode::Reset => write!(f, "reset"),
        }
    }
}

impl Serialize for InterceptorMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for InterceptorMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Options for one transition. Unset fields fall back to the state's
/// registration options, then to the built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionOptions {
    /// Write the route URL to the address adapter (default: true).
    pub route: Option<bool>,
    /// Replace the history entry instead of pushing (default: first transition only).
    pub replace: Option<bool>,
    /// Suppress the change notification (default: false).
    pub silent: Option<bool>,
    /// Proceed even if the target equals the current state (default: false).
    pub force: Option<bool>,
    /// Interceptor handling (default: run).
    pub interceptors: Option<InterceptorMode>,
}

/// Options with every field decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedOptions {
    pub route: bool,
    pub replace: bool,
    pub silent: bool,
    pub force: bool,
    pub interceptors: InterceptorMode,
}

impl TransitionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, route: bool) -> Self {
        self.route = Some(route);
        self
    }

    pub fn replace(mut self, replace: bool) -> Self {
        self.replace = Some(replace);
        self
    }

    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = Some(silent);
        self
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = Some(force);
        self
    }

    pub fn interceptors(mut self, mode: InterceptorMode) -> Self {
        self.interceptors = Some(mode);
        self
    }

    /// Fill unset fields from `defaults`.
    pub fn merged_over(&self, defaults: &TransitionOptions) -> TransitionOptions {
        TransitionOptions {
            route: self.route.or(defaults.route),
            replace: self.replace.or(defaults.replace),
            silent: self.silent.or(defaults.silent),
            force: self.force.or(defaults.force),
            interceptors: self.interceptors.or(defaults.interceptors),
        }
    }

    /// Apply built-in defaults. `first` is true when no state is current yet.
    pub fn resolve(&self, first: bool) -> ResolvedOptions {
        ResolvedOptions {
            route: self.route.unwrap_or(true),
            replace: self.replace.unwrap_or(first),
            silent: self.silent.unwrap_or(false),
            force: self.force.unwrap_or(false),
            interceptors: self.interceptors.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_modes() {
        assert_eq!("run".parse(), Ok(InterceptorMode::Run));
        assert_eq!("reset".parse(), Ok(InterceptorMode::Reset));
        assert_eq!("skip".parse(), Ok(InterceptorMode::Skip(1)));
        assert_eq!("skip(3)".parse(), Ok(InterceptorMode::Skip(3)));
        assert!("skip(x)".parse::<InterceptorMode>().is_err());
        assert!("walk".parse::<InterceptorMode>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for mode in [InterceptorMode::Run, InterceptorMode::Skip(1), InterceptorMode::Skip(4), InterceptorMode::Reset] {
            assert_eq!(mode.to_string().parse(), Ok(mode));
        }
    }

    #[test]
    fn test_merge_and_resolve() {
        let registered = TransitionOptions::new().replace(false).silent(true);
        let caller = TransitionOptions::new().silent(false);
        let merged = caller.merged_over(&registered);
        assert_eq!(merged.silent, Some(false));
        assert_eq!(merged.replace, Some(false));

        let resolved = TransitionOptions::new().resolve(true);
        assert!(resolved.route);
        assert!(resolved.replace);
        assert!(!resolved.force);
        assert!(!TransitionOptions::new().resolve(false).replace);
    }

    #[test]
    fn test_deserialize_options() {
        let opts: TransitionOptions = toml::from_str("replace = true\ninterceptors = \"skip(2)\"").unwrap();
        assert_eq!(opts.replace, Some(true));
        assert_eq!(opts.interceptors, Some(InterceptorMode::Skip(2)));
    }
}
