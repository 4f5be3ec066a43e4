//! Kubernetes clients used by the webhook.
//!
//! - `access_review`: [`AccessReviewer`](crate::webhooks::AccessReviewer)
//!   backed by the `SubjectAccessReview` API

pub mod access_review;

pub use access_review::{DEFAULT_ACCESS_REVIEW_TIMEOUT, SubjectAccessReviewer};
