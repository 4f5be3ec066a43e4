//! Error types for the admission webhook.
//!
//! Policy denials are never errors; they are encoded as a
//! [`Verdict`](crate::webhooks::Verdict). An `Error` means a request could not
//! be evaluated at all.

use std::time::Duration;
use thiserror::Error;

/// Error type for admission and server operations
#[derive(Error, Debug)]
pub enum Error {
    /// The SubjectAccessReview call failed
    #[error("access review failed: {0}")]
    AccessReview(#[from] kube::Error),

    /// The SubjectAccessReview call did not answer in time
    #[error("access review timed out after {0:?}")]
    AccessReviewTimeout(Duration),

    /// The SubjectAccessReview response carried no status
    #[error("access review returned no status")]
    MalformedAccessReview,

    /// CREATE/UPDATE request without the proposed object
    #[error("admission request for setting {0} carries no object")]
    MissingObject(String),

    /// Invalid process configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// TLS configuration error
    #[error("TLS configuration error: {0}")]
    TlsConfig(String),

    /// Server error
    #[error("webhook server error: {0}")]
    Server(String),
}

impl Error {
    /// Whether the failure came from talking to the authorization backend.
    ///
    /// These are worth a retry by the API server; the rest are not.
    pub fn is_access_review_failure(&self) -> bool {
        matches!(
            self,
            Error::AccessReview(_) | Error::AccessReviewTimeout(_) | Error::MalformedAccessReview
        )
    }
}

/// Result type alias for admission operations
pub type Result<T> = std::result::Result<T, Error>;
