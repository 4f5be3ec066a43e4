//! Admission policies for Setting mutations.
//!
//! Checks run in a fixed order and the first denial wins:
//! 1. Operation guard: DELETE is refused before anything else
//! 2. Authorization: the actor must be able to `get` the setting
//! 3. Read-only: environment-sourced and listed settings are refused
//! 4. Value format: known settings must hold a parseable value

pub mod authorization;
pub mod operation;
pub mod read_only;
pub mod value;

pub use authorization::{AccessReviewQuery, AccessReviewResult, AccessReviewer};
pub use read_only::{DEFAULT_READ_ONLY_SETTINGS, ReadOnlySettings};
pub use value::{
    CronSchedule, MAX_AGE_LIMIT_SECS, MAX_AGE_SETTING, RESYNC_CRON_SETTING, ValueError, ValueFormat,
};

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use k8s_openapi::api::authentication::v1::UserInfo;
use kube::core::admission::{AdmissionRequest, Operation};
use tracing::{Instrument, debug, info_span, warn};

use crate::crd::Setting;
use crate::{Error, Result};

/// Decisions slower than this are logged as anomalous
pub const DEFAULT_SLOW_THRESHOLD: Duration = Duration::from_secs(2);

/// Why a mutation was denied
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DenialReason {
    /// Operation not permitted, or malformed value
    BadRequest,
    /// Access review refused
    Unauthorized,
    /// Setting is read-only
    MethodNotAllowed,
}

impl DenialReason {
    /// HTTP status code reported to the client
    pub fn code(self) -> u16 {
        match self {
            DenialReason::BadRequest => 400,
            DenialReason::Unauthorized => 401,
            DenialReason::MethodNotAllowed => 405,
        }
    }

    /// Kubernetes `StatusReason` string
    pub fn as_str(self) -> &'static str {
        match self {
            DenialReason::BadRequest => "BadRequest",
            DenialReason::Unauthorized => "Unauthorized",
            DenialReason::MethodNotAllowed => "MethodNotAllowed",
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of an admission decision.
///
/// A denial always carries `code`, `reason` and `message`; an allow carries none.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verdict {
    pub allowed: bool,
    pub code: Option<u16>,
    pub reason: Option<DenialReason>,
    pub message: Option<String>,
}

impl Verdict {
    /// Create an allowed verdict
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            code: None,
            reason: None,
            message: None,
        }
    }

    /// Create a denied verdict
    pub fn denied(reason: DenialReason, message: impl Into<String>) -> Self {
        Self {
            allowed: false,
            code: Some(reason.code()),
            reason: Some(reason),
            message: Some(message.into()),
        }
    }
}

/// A proposed Setting mutation, borrowed from the admission request
#[derive(Clone, Debug)]
pub struct MutationRequest<'a> {
    pub operation: Operation,
    /// Identity of the actor, as authenticated by the API server
    pub user_info: &'a UserInfo,
    /// Name of the targeted setting
    pub name: &'a str,
    pub namespace: Option<&'a str>,
    /// The setting as it should exist after the mutation (absent on DELETE)
    pub setting: Option<&'a Setting>,
}

impl<'a> MutationRequest<'a> {
    /// View an admission request as a mutation request
    pub fn from_admission(request: &'a AdmissionRequest<Setting>) -> Self {
        let setting = request.object.as_ref();
        // Settings are cluster scoped; fall back to the object's own name
        let name = match request.name.as_str() {
            "" => setting.map(Setting::name).unwrap_or_default(),
            name => name,
        };
        Self {
            operation: request.operation.clone(),
            user_info: &request.user_info,
            name,
            namespace: request.namespace.as_deref(),
            setting,
        }
    }
}

/// The admission decision engine.
///
/// Holds no per-request state; one instance is shared by every request.
pub struct SettingAdmission {
    reviewer: Arc<dyn AccessReviewer>,
    read_only: ReadOnlySettings,
    slow_threshold: Duration,
}

impl SettingAdmission {
    /// Create an engine with the default read-only list
    pub fn new(reviewer: Arc<dyn AccessReviewer>) -> Self {
        Self {
            reviewer,
            read_only: ReadOnlySettings::default(),
            slow_threshold: DEFAULT_SLOW_THRESHOLD,
        }
    }

    pub fn with_read_only(mut self, read_only: ReadOnlySettings) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn with_slow_threshold(mut self, slow_threshold: Duration) -> Self {
        self.slow_threshold = slow_threshold;
        self
    }

    pub fn read_only(&self) -> &ReadOnlySettings {
        &self.read_only
    }

    /// Decide whether `req` may be persisted.
    ///
    /// Policy denials come back as `Ok(Verdict)`. `Err` means the request
    /// could not be evaluated (access review failure, missing object).
    /// Dropping the future abandons any in-flight access review.
    pub async fn decide(&self, req: &MutationRequest<'_>) -> Result<Verdict> {
        let span = info_span!(
            "setting_admission",
            user = req.user_info.username.as_deref().unwrap_or_default(),
            setting = %req.name,
            operation = ?req.operation,
        );

        let started = Instant::now();
        let result = self.evaluate(req).instrument(span.clone()).await;
        let elapsed = started.elapsed();

        if elapsed > self.slow_threshold {
            span.in_scope(|| {
                warn!(
                    elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                    threshold_ms = u64::try_from(self.slow_threshold.as_millis()).unwrap_or(u64::MAX),
                    "Setting admission was slow"
                );
            });
        }

        result
    }

    async fn evaluate(&self, req: &MutationRequest<'_>) -> Result<Verdict> {
        let verdict = operation::validate(req);
        if !verdict.allowed {
            return Ok(verdict);
        }

        let verdict = authorization::validate(self.reviewer.as_ref(), req).await?;
        if !verdict.allowed {
            return Ok(verdict);
        }

        let setting = req
            .setting
            .ok_or_else(|| Error::MissingObject(req.name.to_string()))?;

        // The stored object's name decides which rules apply
        let name = match setting.name() {
            "" => req.name,
            name => name,
        };

        let verdict = read_only::validate(&self.read_only, name, setting);
        if !verdict.allowed {
            return Ok(verdict);
        }

        let verdict = value::validate(name, &setting.value);
        if !verdict.allowed {
            return Ok(verdict);
        }

        debug!("Setting mutation passed all policies");
        Ok(Verdict::allowed())
    }
}
