//! Setting resource.
//!
//! Settings are singleton, cluster-scoped configuration objects owned by
//! Rancher's management API. They are not a `spec`/`status` resource, so the
//! `kube::Resource` impl is written by hand instead of derived.

use std::borrow::Cow;

use k8s_openapi::ClusterResourceScope;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::Resource;
use serde::{Deserialize, Serialize};

/// API group of the Setting resource
pub const SETTING_GROUP: &str = "management.cattle.io";
/// API version of the Setting resource
pub const SETTING_VERSION: &str = "v3";
/// Kind of the Setting resource
pub const SETTING_KIND: &str = "Setting";
/// Plural resource name used for RBAC and URL paths
pub const SETTING_PLURAL: &str = "settings";

/// `source` value marking a setting whose effective value comes from the
/// process environment of the management server.
pub const ENV_SOURCE: &str = "env";

/// A named configuration value.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Setting {
    #[serde(default)]
    pub metadata: ObjectMeta,

    /// Value set through the API. Empty means "use `default`".
    #[serde(default)]
    pub value: String,

    /// Built-in default value.
    #[serde(default)]
    pub default: String,

    /// Whether `value` differs from `default`.
    #[serde(default)]
    pub customized: bool,

    /// Where the effective value comes from (`"env"` when overridden by the
    /// environment, empty otherwise).
    #[serde(default)]
    pub source: String,
}

impl Setting {
    /// Create a setting with the given name and value
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta {
                name: Some(name.into()),
                ..Default::default()
            },
            value: value.into(),
            ..Default::default()
        }
    }

    /// Name of the setting, empty if the object carries none
    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    /// Whether the effective value is pinned by an environment variable
    pub fn is_env_sourced(&self) -> bool {
        self.source == ENV_SOURCE
    }
}

impl Resource for Setting {
    type DynamicType = ();
    type Scope = ClusterResourceScope;

    fn kind(_: &()) -> Cow<'_, str> {
        Cow::Borrowed(SETTING_KIND)
    }

    fn group(_: &()) -> Cow<'_, str> {
        Cow::Borrowed(SETTING_GROUP)
    }

    fn version(_: &()) -> Cow<'_, str> {
        Cow::Borrowed(SETTING_VERSION)
    }

    fn plural(_: &()) -> Cow<'_, str> {
        Cow::Borrowed(SETTING_PLURAL)
    }

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}
