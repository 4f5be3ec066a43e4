//! Admission webhook server.
//!
//! Serves `POST /validate-setting` over TLS. Certificates are expected to be
//! mounted by cert-manager; see [`Config`](crate::Config) for paths and port.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::post};
use axum_server::tls_rustls::RustlsConfig;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview};
use kube::core::{DynamicObject, Status};
use tracing::{debug, error, info, warn};

use crate::crd::Setting;
use crate::webhooks::policies::{MutationRequest, SettingAdmission, Verdict};
use crate::{Error, Result};

/// Reason reported when a request could not be evaluated
const INTERNAL_ERROR_REASON: &str = "InternalError";

/// Shared state for webhook handlers
pub struct WebhookState {
    pub admission: SettingAdmission,
}

impl WebhookState {
    pub fn new(admission: SettingAdmission) -> Self {
        Self { admission }
    }
}

/// Build a denial response carrying code, reason and message
fn deny_with_status<T: kube::Resource<DynamicType = ()>>(
    request: &AdmissionRequest<T>,
    code: u16,
    reason: &str,
    message: &str,
) -> AdmissionReview<DynamicObject> {
    let mut response = AdmissionResponse::from(request);
    response.allowed = false;
    response.result = Status::failure(message, reason).with_code(code);
    response.into_review()
}

/// Translate a verdict into the review sent back to the API server
fn verdict_to_review(
    request: &AdmissionRequest<Setting>,
    verdict: &Verdict,
) -> AdmissionReview<DynamicObject> {
    if verdict.allowed {
        return AdmissionResponse::from(request).into_review();
    }

    let code = verdict.code.unwrap_or(400);
    let reason = verdict.reason.map(|r| r.as_str()).unwrap_or("BadRequest");
    let message = verdict.message.as_deref().unwrap_or("Validation failed");
    deny_with_status(request, code, reason, message)
}

/// Evaluate one admission review.
///
/// Engine errors fail closed: the mutation is denied with a 500 status.
pub async fn review_setting(
    state: &WebhookState,
    review: AdmissionReview<Setting>,
) -> (StatusCode, AdmissionReview<DynamicObject>) {
    let request: AdmissionRequest<Setting> = match review.try_into() {
        Ok(req) => req,
        Err(e) => {
            error!(error = %e, "Failed to extract admission request");
            return (
                StatusCode::BAD_REQUEST,
                AdmissionResponse::invalid(format!("Invalid AdmissionReview: {}", e)).into_review(),
            );
        }
    };

    let uid = &request.uid;
    debug!(
        uid = %uid,
        operation = ?request.operation,
        name = %request.name,
        user = ?request.user_info.username,
        dry_run = request.dry_run,
        "Processing admission request"
    );

    let mutation = MutationRequest::from_admission(&request);
    match state.admission.decide(&mutation).await {
        Ok(verdict) => {
            if verdict.allowed {
                info!(uid = %uid, setting = %mutation.name, "Admission request allowed");
            } else {
                warn!(
                    uid = %uid,
                    setting = %mutation.name,
                    code = ?verdict.code,
                    reason = ?verdict.reason,
                    message = ?verdict.message,
                    "Admission request denied"
                );
            }
            (StatusCode::OK, verdict_to_review(&request, &verdict))
        }
        Err(e) => {
            error!(
                uid = %uid,
                setting = %mutation.name,
                access_review = e.is_access_review_failure(),
                error = %e,
                "Admission request could not be evaluated"
            );
            (
                StatusCode::OK,
                deny_with_status(&request, 500, INTERNAL_ERROR_REASON, &e.to_string()),
            )
        }
    }
}

/// Validate a Setting admission webhook handler
async fn validate_setting(
    State(state): State<Arc<WebhookState>>,
    Json(review): Json<AdmissionReview<Setting>>,
) -> impl IntoResponse {
    let (status, review) = review_setting(&state, review).await;
    (status, Json(review))
}

/// Create the webhook router
pub fn create_webhook_router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route("/validate-setting", post(validate_setting))
        .with_state(state)
}

/// Run the webhook server with TLS
///
/// Binds to 0.0.0.0 on `port` and serves the /validate-setting endpoint.
///
/// # Arguments
/// * `admission` - Decision engine shared by all requests
/// * `port` - Port to listen on
/// * `cert_path` - Path to TLS certificate file (PEM format)
/// * `key_path` - Path to TLS private key file (PEM format)
pub async fn run_webhook_server(
    admission: SettingAdmission,
    port: u16,
    cert_path: &str,
    key_path: &str,
) -> Result<()> {
    let state = Arc::new(WebhookState::new(admission));
    let app = create_webhook_router(state);

    let config = RustlsConfig::from_pem_file(PathBuf::from(cert_path), PathBuf::from(key_path))
        .await
        .map_err(|e| Error::TlsConfig(e.to_string()))?;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(port, "Webhook server listening with TLS");

    axum_server::bind_rustls(addr, config)
        .serve(app.into_make_service())
        .await
        .map_err(|e| Error::Server(e.to_string()))?;

    Ok(())
}
