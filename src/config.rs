//! Process configuration.
//!
//! Resolved once from environment variables at startup; defaults match a
//! standard in-cluster deployment with cert-manager mounted certificates.

use std::time::Duration;

use crate::client::DEFAULT_ACCESS_REVIEW_TIMEOUT;
use crate::webhooks::{DEFAULT_SLOW_THRESHOLD, ReadOnlySettings};
use crate::{Error, Result};

/// Default path to webhook TLS certificate
pub const WEBHOOK_CERT_PATH: &str = "/etc/webhook/certs/tls.crt";
/// Default path to webhook TLS private key
pub const WEBHOOK_KEY_PATH: &str = "/etc/webhook/certs/tls.key";
/// Default webhook server port
pub const WEBHOOK_PORT: u16 = 9443;
/// Default health server port
pub const HEALTH_PORT: u16 = 8080;

/// Runtime configuration for the webhook binary
#[derive(Clone, Debug)]
pub struct Config {
    pub webhook_port: u16,
    pub health_port: u16,
    pub cert_path: String,
    pub key_path: String,
    /// Upper bound on one SubjectAccessReview call
    pub access_review_timeout: Duration,
    /// Decisions slower than this are logged
    pub slow_threshold: Duration,
    pub read_only: ReadOnlySettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            webhook_port: WEBHOOK_PORT,
            health_port: HEALTH_PORT,
            cert_path: WEBHOOK_CERT_PATH.to_string(),
            key_path: WEBHOOK_KEY_PATH.to_string(),
            access_review_timeout: DEFAULT_ACCESS_REVIEW_TIMEOUT,
            slow_threshold: DEFAULT_SLOW_THRESHOLD,
            read_only: ReadOnlySettings::default(),
        }
    }
}

impl Config {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`, falling back to defaults for
    /// unset or empty variables
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let read_only = match get("EXTRA_READ_ONLY_SETTINGS") {
            Some(names) => ReadOnlySettings::with_extra(
                names
                    .split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty()),
            ),
            None => defaults.read_only,
        };

        Ok(Self {
            webhook_port: parse_or(get("WEBHOOK_PORT"), "WEBHOOK_PORT", defaults.webhook_port)?,
            health_port: parse_or(get("HEALTH_PORT"), "HEALTH_PORT", defaults.health_port)?,
            cert_path: get("WEBHOOK_CERT_PATH").unwrap_or(defaults.cert_path),
            key_path: get("WEBHOOK_KEY_PATH").unwrap_or(defaults.key_path),
            access_review_timeout: get("ACCESS_REVIEW_TIMEOUT_SECS")
                .map(|v| parse::<u64>(&v, "ACCESS_REVIEW_TIMEOUT_SECS"))
                .transpose()?
                .map(Duration::from_secs)
                .unwrap_or(defaults.access_review_timeout),
            slow_threshold: get("SLOW_ADMISSION_THRESHOLD_MS")
                .map(|v| parse::<u64>(&v, "SLOW_ADMISSION_THRESHOLD_MS"))
                .transpose()?
                .map(Duration::from_millis)
                .unwrap_or(defaults.slow_threshold),
            read_only,
        })
    }
}

fn parse<T: std::str::FromStr>(value: &str, key: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Error::Config(format!("{key}={value:?}: {e}")))
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value.map_or(Ok(default), |v| parse(&v, key))
}
