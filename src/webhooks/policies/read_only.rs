//! Read-only setting policy.
//!
//! Validates:
//! - Settings whose value comes from an environment variable cannot be changed
//! - Settings on the read-only list cannot be changed
//!
//! Both rules deny with 405. The environment rule is checked first, so its
//! message wins when both apply.

use std::collections::BTreeSet;

use super::{DenialReason, Verdict};
use crate::crd::Setting;

/// Settings that can never be changed through the API
pub const DEFAULT_READ_ONLY_SETTINGS: &[&str] = &["cacerts"];

/// Immutable set of read-only setting names, built once at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadOnlySettings {
    names: BTreeSet<String>,
}

impl Default for ReadOnlySettings {
    fn default() -> Self {
        Self::new(DEFAULT_READ_ONLY_SETTINGS.iter().copied())
    }
}

impl ReadOnlySettings {
    /// Build the list from exactly these names
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Default list plus `extra` names
    pub fn with_extra<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list = Self::default();
        list.names.extend(extra.into_iter().map(Into::into));
        list
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

/// Deny with 405 if the proposed setting may not be changed
pub fn validate(read_only: &ReadOnlySettings, name: &str, setting: &Setting) -> Verdict {
    if setting.is_env_sourced() {
        return Verdict::denied(
            DenialReason::MethodNotAllowed,
            format!("{name} is readOnly because its value is from environment variable"),
        );
    }

    if read_only.contains(name) {
        return Verdict::denied(DenialReason::MethodNotAllowed, format!("{name} is readOnly"));
    }

    Verdict::allowed()
}
