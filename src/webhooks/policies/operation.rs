//! Operation guard.
//!
//! Settings are singletons owned by the management server; they can be
//! created and updated but never deleted through the API. This runs before
//! the access review so a DELETE never costs an authorization round trip.

use kube::core::admission::Operation;

use super::{DenialReason, MutationRequest, Verdict};

/// Refuse DELETE, pass everything else through
pub fn validate(req: &MutationRequest<'_>) -> Verdict {
    if req.operation == Operation::Delete {
        return Verdict::denied(
            DenialReason::BadRequest,
            format!("cannot delete setting {}", req.name),
        );
    }

    Verdict::allowed()
}
