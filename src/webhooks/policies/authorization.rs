//! Authorization check.
//!
//! Every mutation is gated on the actor being able to `get` the setting. The
//! check is delegated to an [`AccessReviewer`] so the engine never talks to
//! the API server directly and can be driven by a fake in tests.
//!
//! A refused review is a 401 denial. A review that could not be performed is
//! an [`Error`](crate::Error), never a denial.

use std::collections::BTreeMap;

use async_trait::async_trait;
use kube::Resource;
use tracing::debug;

use super::{DenialReason, MutationRequest, Verdict};
use crate::Result;
use crate::crd::Setting;

/// Verb checked for every setting mutation
pub const ACCESS_REVIEW_VERB: &str = "get";

/// Question put to the authorization backend
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccessReviewQuery {
    pub verb: String,
    pub group: String,
    pub version: String,
    pub resource: String,
    pub name: String,
    pub namespace: Option<String>,
    pub user: Option<String>,
    pub groups: Vec<String>,
    pub uid: Option<String>,
    pub extra: BTreeMap<String, Vec<String>>,
}

impl AccessReviewQuery {
    /// Build the `get` review for the setting targeted by `req`.
    ///
    /// The actor's identity is copied field for field; every extra key is kept.
    pub fn for_setting(req: &MutationRequest<'_>) -> Self {
        let user_info = req.user_info;
        Self {
            verb: ACCESS_REVIEW_VERB.to_string(),
            group: Setting::group(&()).into_owned(),
            version: Setting::version(&()).into_owned(),
            resource: Setting::plural(&()).into_owned(),
            name: req.name.to_string(),
            namespace: req.namespace.map(str::to_string),
            user: user_info.username.clone(),
            groups: user_info.groups.clone().unwrap_or_default(),
            uid: user_info.uid.clone(),
            extra: user_info.extra.clone().unwrap_or_default(),
        }
    }
}

/// Answer from the authorization backend
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessReviewResult {
    pub allowed: bool,
    /// Why access was refused, if the backend said
    pub reason: Option<String>,
}

/// Capability to answer "may this identity do this verb on this resource".
#[async_trait]
pub trait AccessReviewer: Send + Sync {
    /// Evaluate a single query.
    ///
    /// Implementations own their timeout. Dropping the returned future must
    /// abandon the call.
    async fn check_access(&self, query: &AccessReviewQuery) -> Result<AccessReviewResult>;
}

/// Deny with 401 unless the actor may read the setting
pub async fn validate(reviewer: &dyn AccessReviewer, req: &MutationRequest<'_>) -> Result<Verdict> {
    let query = AccessReviewQuery::for_setting(req);
    let result = reviewer.check_access(&query).await?;

    if result.allowed {
        return Ok(Verdict::allowed());
    }

    debug!(user = ?query.user, setting = %req.name, "Access review refused");
    let message = result
        .reason
        .filter(|reason| !reason.is_empty())
        .unwrap_or_else(|| {
            format!(
                "user {} is not allowed to get setting {}",
                query.user.as_deref().unwrap_or("<unknown>"),
                req.name
            )
        });
    Ok(Verdict::denied(DenialReason::Unauthorized, message))
}
