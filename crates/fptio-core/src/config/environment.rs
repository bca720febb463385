//! Snapshot of the host process environment.

use std::collections::HashMap;

/// Server of a delegated desktop session.
pub const SERVER_URL_VAR: &str = "FPT_SERVER_URL";
/// Session token of a delegated desktop session.
pub const SESSION_TOKEN_VAR: &str = "FPT_SESSION_TOKEN";
/// Proxy of a delegated desktop session.
pub const HTTP_PROXY_VAR: &str = "FPT_HTTP_PROXY";
/// Project the host was launched for.
pub const PROJECT_ID_VAR: &str = "FPT_PROJECT_ID";
/// Pipeline configuration of a toolkit-launched host.
pub const PIPELINE_CONFIG_VAR: &str = "TANK_CURRENT_PC";

const KNOWN_VARS: [&str; 5] = [
    SERVER_URL_VAR,
    SESSION_TOKEN_VAR,
    HTTP_PROXY_VAR,
    PROJECT_ID_VAR,
    PIPELINE_CONFIG_VAR,
];

/// Environment variables relevant to capability detection.
///
/// Captured once so detection is deterministic for the lifetime of a
/// manager and can be faked in tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostEnvironment {
    vars: HashMap<String, String>,
}

impl HostEnvironment {
    /// An environment with nothing set (plain standalone process).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Capture the known variables from the current process.
    pub fn from_process() -> Self {
        Self::from_vars(
            KNOWN_VARS
                .iter()
                .filter_map(|key| std::env::var(key).ok().map(|value| (*key, value))),
        )
    }

    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Value of a variable; empty values count as unset.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}
