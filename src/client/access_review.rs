//! SubjectAccessReview-backed authorization.
//!
//! Each query becomes one `SubjectAccessReview` POSTed to the API server.
//! There are no retries; the API server retries the admission call itself
//! according to the webhook's failure policy.

use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::authorization::v1::{
    ResourceAttributes, SubjectAccessReview, SubjectAccessReviewSpec, SubjectAccessReviewStatus,
};
use kube::api::PostParams;
use kube::{Api, Client};
use tracing::debug;

use crate::webhooks::{AccessReviewQuery, AccessReviewResult, AccessReviewer};
use crate::{Error, Result};

/// Default upper bound on a single access review
pub const DEFAULT_ACCESS_REVIEW_TIMEOUT: Duration = Duration::from_secs(10);

/// Authorizes queries through the cluster's SubjectAccessReview API
#[derive(Clone)]
pub struct SubjectAccessReviewer {
    api: Api<SubjectAccessReview>,
    timeout: Duration,
}

impl SubjectAccessReviewer {
    pub fn new(client: Client) -> Self {
        Self {
            api: Api::all(client),
            timeout: DEFAULT_ACCESS_REVIEW_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl AccessReviewer for SubjectAccessReviewer {
    async fn check_access(&self, query: &AccessReviewQuery) -> Result<AccessReviewResult> {
        let review = SubjectAccessReview::from(query);

        let response = tokio::time::timeout(
            self.timeout,
            self.api.create(&PostParams::default(), &review),
        )
        .await
        .map_err(|_| Error::AccessReviewTimeout(self.timeout))??;

        let status = response.status.ok_or(Error::MalformedAccessReview)?;
        if let Some(evaluation_error) = status.evaluation_error.as_deref() {
            debug!(
                user = ?query.user,
                error = %evaluation_error,
                "Access review reported an evaluation error"
            );
        }

        Ok(AccessReviewResult::from(status))
    }
}

impl From<&AccessReviewQuery> for SubjectAccessReview {
    fn from(query: &AccessReviewQuery) -> Self {
        SubjectAccessReview {
            spec: SubjectAccessReviewSpec {
                resource_attributes: Some(ResourceAttributes {
                    verb: Some(query.verb.clone()),
                    group: Some(query.group.clone()),
                    version: Some(query.version.clone()),
                    resource: Some(query.resource.clone()),
                    name: Some(query.name.clone()),
                    namespace: query.namespace.clone(),
                    ..Default::default()
                }),
                user: query.user.clone(),
                groups: (!query.groups.is_empty()).then(|| query.groups.clone()),
                uid: query.uid.clone(),
                extra: (!query.extra.is_empty()).then(|| query.extra.clone()),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

impl From<SubjectAccessReviewStatus> for AccessReviewResult {
    fn from(status: SubjectAccessReviewStatus) -> Self {
        AccessReviewResult {
            allowed: status.allowed && !status.denied.unwrap_or(false),
            reason: status.reason,
        }
    }
}
