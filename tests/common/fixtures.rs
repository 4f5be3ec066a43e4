//! Test fixtures and builder patterns for Setting admission.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use k8s_openapi::api::authentication::v1::UserInfo;
use setting_admission::crd::{ENV_SOURCE, Setting};
use setting_admission::webhooks::{
    AccessReviewQuery, AccessReviewResult, AccessReviewer, MutationRequest, Operation,
};
use setting_admission::{Error, Result};

/// Builder for creating Setting test fixtures.
///
/// # Example
/// ```
/// let setting = SettingBuilder::new("server-url")
///     .value("https://rancher.example.com")
///     .env_sourced()
///     .build();
/// ```
#[derive(Clone, Debug)]
pub struct SettingBuilder {
    name: String,
    value: String,
    default: String,
    source: String,
}

impl SettingBuilder {
    /// Create a new builder with the given setting name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: String::new(),
            default: String::new(),
            source: String::new(),
        }
    }

    /// Set the proposed value.
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    /// Set the built-in default.
    pub fn default_value(mut self, default: impl Into<String>) -> Self {
        self.default = default.into();
        self
    }

    /// Mark the value as coming from an environment variable.
    pub fn env_sourced(mut self) -> Self {
        self.source = ENV_SOURCE.to_string();
        self
    }

    /// Build the Setting.
    pub fn build(self) -> Setting {
        let customized = !self.value.is_empty() && self.value != self.default;
        let mut setting = Setting::new(self.name, self.value);
        setting.default = self.default;
        setting.customized = customized;
        setting.source = self.source;
        setting
    }
}

/// Identity of a typical authenticated Rancher user.
pub fn user_info(username: &str) -> UserInfo {
    UserInfo {
        username: Some(username.to_string()),
        uid: Some(format!("uid-{}", username)),
        groups: Some(vec![
            "system:authenticated".to_string(),
            "system:cattle:authenticated".to_string(),
        ]),
        extra: Some(BTreeMap::from([
            (
                "principalid".to_string(),
                vec![format!("local://{}", username)],
            ),
            ("username".to_string(), vec![username.to_string()]),
        ])),
    }
}

/// Mutation of `setting` by `user_info`.
pub fn mutation<'a>(
    operation: Operation,
    user_info: &'a UserInfo,
    setting: &'a Setting,
) -> MutationRequest<'a> {
    MutationRequest {
        operation,
        user_info,
        name: setting.name(),
        namespace: None,
        setting: Some(setting),
    }
}

/// What a [`RecordingReviewer`] answers.
#[derive(Clone, Debug)]
pub enum Answer {
    Allow,
    Deny(String),
    Fail,
}

/// Deterministic reviewer that records every query it is asked.
pub struct RecordingReviewer {
    answer: Answer,
    queries: Mutex<Vec<AccessReviewQuery>>,
}

impl RecordingReviewer {
    pub fn new(answer: Answer) -> Self {
        Self {
            answer,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn allowing() -> Self {
        Self::new(Answer::Allow)
    }

    pub fn denying(reason: &str) -> Self {
        Self::new(Answer::Deny(reason.to_string()))
    }

    pub fn failing() -> Self {
        Self::new(Answer::Fail)
    }

    /// Number of queries received so far.
    #[allow(clippy::unwrap_used)]
    pub fn calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    /// Copy of every query received so far.
    #[allow(clippy::unwrap_used)]
    pub fn queries(&self) -> Vec<AccessReviewQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl AccessReviewer for RecordingReviewer {
    #[allow(clippy::unwrap_used)]
    async fn check_access(&self, query: &AccessReviewQuery) -> Result<AccessReviewResult> {
        self.queries.lock().unwrap().push(query.clone());
        match &self.answer {
            Answer::Allow => Ok(AccessReviewResult {
                allowed: true,
                reason: None,
            }),
            Answer::Deny(reason) => Ok(AccessReviewResult {
                allowed: false,
                reason: Some(reason.clone()),
            }),
            Answer::Fail => Err(Error::MalformedAccessReview),
        }
    }
}
