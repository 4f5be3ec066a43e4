//! Validating admission webhook for Setting resources.
//!
//! - `policies`: the decision engine and its ordered checks
//! - `server`: HTTPS transport translating `AdmissionReview`s to and from verdicts

pub mod policies;
mod server;

pub use policies::{
    AccessReviewQuery, AccessReviewResult, AccessReviewer, DEFAULT_SLOW_THRESHOLD, DenialReason,
    MutationRequest, ReadOnlySettings, SettingAdmission, Verdict,
};
pub use server::{WebhookState, create_webhook_router, review_setting, run_webhook_server};

// Re-export kube-rs admission types for contract testing
pub use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation};
