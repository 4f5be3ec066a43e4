//! setting-admission library crate
//!
//! Validating admission webhook for Rancher `Setting` resources. Every
//! create/update/delete of a setting is run through [`SettingAdmission`],
//! which refuses deletes, checks the actor can read the setting, protects
//! read-only settings, and validates values with a known format.

pub mod client;
pub mod config;
pub mod crd;
pub mod error;
pub mod health;
pub mod webhooks;

pub use config::Config;
pub use error::{Error, Result};
pub use health::HealthState;
pub use webhooks::{
    AccessReviewer, MutationRequest, SettingAdmission, Verdict, run_webhook_server,
};
