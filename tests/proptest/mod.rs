// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

//! Property-based tests for setting-admission.
//!
//! Uses proptest to generate random inputs and verify invariants.

#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;

use proptest::prelude::*;

use setting_admission::SettingAdmission;
use setting_admission::webhooks::policies::value::{
    MAX_AGE_LIMIT_SECS, MAX_AGE_SETTING, RESYNC_CRON_SETTING, ValueFormat, parse_max_age,
};
use setting_admission::webhooks::{Operation, Verdict};

use common::fixtures::{RecordingReviewer, SettingBuilder, mutation, user_info};

/// Strategy for generating setting names.
fn any_setting_name() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("cacerts".to_string()),
        Just(MAX_AGE_SETTING.to_string()),
        Just(RESYNC_CRON_SETTING.to_string()),
        "[a-z][a-z0-9-]{0,30}",
    ]
}

/// Strategy for generating setting names without a value grammar or read-only entry.
fn unregistered_setting_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,30}".prop_filter("registered setting", |name| {
        ValueFormat::for_setting(name).is_none() && name != "cacerts"
    })
}

fn any_operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        Just(Operation::Create),
        Just(Operation::Update),
        Just(Operation::Delete),
        Just(Operation::Connect),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
}

fn decide(
    reviewer: Arc<RecordingReviewer>,
    operation: Operation,
    name: &str,
    value: &str,
) -> Verdict {
    let engine = SettingAdmission::new(reviewer);
    let user = user_info("prop");
    let setting = SettingBuilder::new(name).value(value).build();
    runtime()
        .block_on(engine.decide(&mutation(operation, &user, &setting)))
        .unwrap()
}

proptest! {
    /// Property: DELETE is always a 400 and never reaches the access review.
    #[test]
    fn test_delete_always_bad_request(name in any_setting_name(), value in ".*") {
        let reviewer = Arc::new(RecordingReviewer::allowing());
        let verdict = decide(reviewer.clone(), Operation::Delete, &name, &value);
        prop_assert!(!verdict.allowed);
        prop_assert_eq!(verdict.code, Some(400));
        prop_assert_eq!(reviewer.calls(), 0);
    }

    /// Property: a refused access review is always a 401, whatever the setting.
    #[test]
    fn test_refused_review_always_unauthorized(name in any_setting_name(), value in ".*") {
        let reviewer = Arc::new(RecordingReviewer::denying("forbidden"));
        let verdict = decide(reviewer, Operation::Update, &name, &value);
        prop_assert!(!verdict.allowed);
        prop_assert_eq!(verdict.code, Some(401));
    }

    /// Property: settings with no registered grammar accept any value.
    #[test]
    fn test_unregistered_names_accept_any_value(
        name in unregistered_setting_name(),
        value in ".*"
    ) {
        let verdict = decide(
            Arc::new(RecordingReviewer::allowing()),
            Operation::Update,
            &name,
            &value,
        );
        prop_assert_eq!(verdict, Verdict::allowed());
    }

    /// Property: the same request with a deterministic reviewer yields the same verdict.
    #[test]
    fn test_decisions_are_idempotent(
        operation in any_operation(),
        name in any_setting_name(),
        value in ".*"
    ) {
        let reviewer = Arc::new(RecordingReviewer::allowing());
        let engine = SettingAdmission::new(reviewer);
        let user = user_info("prop");
        let setting = SettingBuilder::new(name).value(value).build();
        let req = mutation(operation, &user, &setting);

        let rt = runtime();
        let first = rt.block_on(engine.decide(&req)).unwrap();
        let second = rt.block_on(engine.decide(&req)).unwrap();
        prop_assert_eq!(first, second);
    }

    /// Property: every integer up to the limit is a valid max age of that many seconds.
    #[test]
    fn test_max_age_accepts_integers(secs in 0u64..=MAX_AGE_LIMIT_SECS) {
        let duration = parse_max_age(&secs.to_string()).unwrap();
        prop_assert_eq!(duration.as_secs(), secs);
    }

    /// Property: integers past the limit are never a valid max age.
    #[test]
    fn test_max_age_rejects_past_limit(secs in (MAX_AGE_LIMIT_SECS + 1)..=u64::MAX) {
        prop_assert!(parse_max_age(&secs.to_string()).is_err());
    }

    /// Property: negative numbers are never a valid max age.
    #[test]
    fn test_max_age_rejects_negative(secs in 1i64..=i64::from(i32::MAX)) {
        let value = format!("-{}", secs);
        prop_assert!(parse_max_age(&value).is_err());
    }
}
