//! Value format policy.
//!
//! Some settings hold values the management server parses at runtime. Those
//! values are checked here so a malformed one is rejected at write time
//! instead of breaking the consumer later.

use std::str::FromStr;
use std::time::Duration;

use croner::Cron;
use thiserror::Error;

use super::{DenialReason, Verdict};

/// How long cached user info stays valid, in seconds
pub const MAX_AGE_SETTING: &str = "auth-user-info-max-age-seconds";
/// When cached user info is refreshed; empty disables refresh
pub const RESYNC_CRON_SETTING: &str = "auth-user-info-resync-cron";

/// Largest max age the consumer can represent (signed 64-bit nanoseconds)
pub const MAX_AGE_LIMIT_SECS: u64 = i64::MAX.unsigned_abs() / NANOS_PER_SEC;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Shorthand schedules and their five-field equivalents
const CRON_DESCRIPTORS: &[(&str, &str)] = &[
    ("@yearly", "0 0 1 1 *"),
    ("@annually", "0 0 1 1 *"),
    ("@monthly", "0 0 1 * *"),
    ("@weekly", "0 0 * * 0"),
    ("@daily", "0 0 * * *"),
    ("@midnight", "0 0 * * *"),
    ("@hourly", "0 * * * *"),
];

/// Prefix of a fixed-interval schedule
const EVERY_PREFIX: &str = "@every ";

/// One position of a standard cron expression
struct CronField {
    name: &'static str,
    min: u32,
    max: u32,
    /// Accepted names, the first one standing for `name_base`
    names: &'static [&'static str],
    name_base: u32,
}

const CRON_FIELDS: [CronField; 5] = [
    CronField {
        name: "minute",
        min: 0,
        max: 59,
        names: &[],
        name_base: 0,
    },
    CronField {
        name: "hour",
        min: 0,
        max: 23,
        names: &[],
        name_base: 0,
    },
    CronField {
        name: "day-of-month",
        min: 1,
        max: 31,
        names: &[],
        name_base: 0,
    },
    CronField {
        name: "month",
        min: 1,
        max: 12,
        names: &[
            "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
        ],
        name_base: 1,
    },
    CronField {
        name: "day-of-week",
        min: 0,
        max: 6,
        names: &["sun", "mon", "tue", "wed", "thu", "fri", "sat"],
        name_base: 0,
    },
];

/// Grammar a setting value has to follow
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueFormat {
    /// Non-negative whole number of seconds
    Seconds,
    /// Empty, or a standard five-field cron expression
    CronSchedule,
}

/// Settings with a known value grammar
const VALUE_FORMATS: &[(&str, ValueFormat)] = &[
    (MAX_AGE_SETTING, ValueFormat::Seconds),
    (RESYNC_CRON_SETTING, ValueFormat::CronSchedule),
];

impl ValueFormat {
    /// Grammar registered for `name`, if any
    pub fn for_setting(name: &str) -> Option<Self> {
        VALUE_FORMATS
            .iter()
            .find(|(setting, _)| *setting == name)
            .map(|(_, format)| *format)
    }

    /// Check `value` against this grammar
    pub fn check(self, value: &str) -> Result<(), ValueError> {
        match self {
            ValueFormat::Seconds => parse_max_age(value).map(|_| ()),
            ValueFormat::CronSchedule => parse_cron(value).map(|_| ()),
        }
    }
}

/// A setting value that does not follow its grammar
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("invalid max age {value:?}: {reason}")]
    MaxAge { value: String, reason: String },

    #[error("invalid cron schedule {value:?}: {reason}")]
    Cron { value: String, reason: String },
}

/// A parsed cron setting value
#[derive(Clone, Debug)]
pub enum CronSchedule {
    /// `@every <duration>`, truncated to whole seconds and at least one second
    Every(Duration),
    /// Calendar schedule from five fields or a descriptor
    Calendar(Cron),
}

/// Parse a whole number of seconds into a duration
pub fn parse_max_age(value: &str) -> Result<Duration, ValueError> {
    let invalid = |reason: String| ValueError::MaxAge {
        value: value.to_string(),
        reason,
    };

    let secs = value.parse::<u64>().map_err(|e| invalid(e.to_string()))?;
    if secs > MAX_AGE_LIMIT_SECS {
        return Err(invalid(format!(
            "must not exceed {MAX_AGE_LIMIT_SECS} seconds"
        )));
    }
    Ok(Duration::from_secs(secs))
}

/// Parse a cron schedule. `Ok(None)` means the schedule is disabled.
///
/// Accepts five standard fields (numbers, month and weekday names, `*`, `?`,
/// lists, ranges and steps), the `@yearly`..`@hourly` descriptors, and
/// `@every <duration>`. Extensions such as `L`, `W` and `#` are rejected.
pub fn parse_cron(value: &str) -> Result<Option<CronSchedule>, ValueError> {
    if value.is_empty() {
        return Ok(None);
    }

    let invalid = |reason: String| ValueError::Cron {
        value: value.to_string(),
        reason,
    };

    if value.starts_with('@') {
        if let Some(interval) = value.strip_prefix(EVERY_PREFIX) {
            let nanos = parse_go_duration(interval).map_err(invalid)?;
            let secs = u64::try_from(nanos).unwrap_or(0) / NANOS_PER_SEC;
            return Ok(Some(CronSchedule::Every(Duration::from_secs(secs.max(1)))));
        }

        let expanded = CRON_DESCRIPTORS
            .iter()
            .find(|(descriptor, _)| *descriptor == value)
            .map(|(_, expanded)| *expanded)
            .ok_or_else(|| invalid("unrecognized descriptor".to_string()))?;
        return calendar(expanded).map_err(invalid);
    }

    let fields: Vec<&str> = value.split_whitespace().collect();
    if fields.len() != CRON_FIELDS.len() {
        return Err(invalid(format!(
            "expected {} fields, found {}",
            CRON_FIELDS.len(),
            fields.len()
        )));
    }

    let normalized = CRON_FIELDS
        .iter()
        .zip(&fields)
        .map(|(field, expr)| normalize_field(field, expr))
        .collect::<Result<Vec<_>, _>>()
        .map_err(invalid)?;

    calendar(&normalized.join(" ")).map_err(invalid)
}

fn calendar(expr: &str) -> Result<Option<CronSchedule>, String> {
    Cron::from_str(expr)
        .map(|cron| Some(CronSchedule::Calendar(cron)))
        .map_err(|e| e.to_string())
}

/// Rewrite one field into plain numeric form, rejecting anything outside the
/// standard grammar
fn normalize_field(field: &CronField, expr: &str) -> Result<String, String> {
    expr.split(',')
        .map(|part| normalize_range(field, part))
        .collect::<Result<Vec<_>, _>>()
        .map(|parts| parts.join(","))
}

fn normalize_range(field: &CronField, expr: &str) -> Result<String, String> {
    let (range, step) = match expr.split_once('/') {
        Some((_, step)) if step.contains('/') => {
            return Err(format!("too many slashes in {} {expr:?}", field.name));
        }
        Some((range, step)) => (range, Some(step)),
        None => (expr, None),
    };

    let step = step
        .map(|step| {
            step.parse::<u32>()
                .map_err(|_| format!("invalid step {step:?} in {} field", field.name))
        })
        .transpose()?;
    if step == Some(0) {
        return Err(format!("step of {} range must be positive", field.name));
    }

    if range == "*" || range == "?" {
        return Ok(match step {
            Some(step) => format!("*/{step}"),
            None => "*".to_string(),
        });
    }

    let (start, end) = match range.split_once('-') {
        Some((_, high)) if high.contains('-') => {
            return Err(format!("too many hyphens in {} {expr:?}", field.name));
        }
        Some((low, high)) => (field_value(field, low)?, field_value(field, high)?),
        None => {
            let start = field_value(field, range)?;
            (start, if step.is_some() { field.max } else { start })
        }
    };

    if start < field.min || end > field.max {
        return Err(format!(
            "{} {expr:?} outside {}-{}",
            field.name, field.min, field.max
        ));
    }
    if start > end {
        return Err(format!("{} range {expr:?} starts after it ends", field.name));
    }

    Ok(match step {
        Some(step) => format!("{start}-{end}/{step}"),
        None if start == end => start.to_string(),
        None => format!("{start}-{end}"),
    })
}

fn field_value(field: &CronField, token: &str) -> Result<u32, String> {
    if let Some(index) = field
        .names
        .iter()
        .position(|name| name.eq_ignore_ascii_case(token))
    {
        return u32::try_from(index)
            .map(|index| field.name_base + index)
            .map_err(|e| e.to_string());
    }

    token
        .parse::<u32>()
        .map_err(|_| format!("invalid {} value {token:?}", field.name))
}

/// Parse a Go-style duration (`1h30m`, `1.5s`, `300ms`, `-2h`) into signed
/// nanoseconds, with the same overflow limit as the consumer.
fn parse_go_duration(input: &str) -> Result<i64, String> {
    let invalid = || format!("invalid duration {input:?}");

    let (negative, mut rest) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input.strip_prefix('+').unwrap_or(input)),
    };
    if rest == "0" {
        return Ok(0);
    }
    if rest.is_empty() {
        return Err(invalid());
    }

    // One past i64::MAX, reachable only by a negative duration
    let limit = u128::from(i64::MAX.unsigned_abs()) + 1;
    let mut total: u128 = 0;

    while !rest.is_empty() {
        let (whole, after) = split_digits(rest);
        let (fraction, after) = match after.strip_prefix('.') {
            Some(after) => split_digits(after),
            None => ("", after),
        };
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }

        let unit_len = after
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(after.len());
        let (unit, after) = after.split_at(unit_len);
        let unit_nanos = match unit {
            "ns" => 1,
            "us" | "\u{b5}s" | "\u{3bc}s" => 1_000,
            "ms" => 1_000_000,
            "s" => u128::from(NANOS_PER_SEC),
            "m" => 60 * u128::from(NANOS_PER_SEC),
            "h" => 3_600 * u128::from(NANOS_PER_SEC),
            "" => return Err(format!("missing unit in duration {input:?}")),
            _ => return Err(format!("unknown unit {unit:?} in duration {input:?}")),
        };

        // More than 20 digits cannot fit the limit in any unit
        if whole.len() > 20 {
            return Err(invalid());
        }
        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let mut nanos = whole.checked_mul(unit_nanos).ok_or_else(invalid)?;

        // Digits past the 18th are below a nanosecond in every unit
        let fraction = fraction.get(..fraction.len().min(18)).unwrap_or_default();
        if !fraction.is_empty() {
            let digits: u128 = fraction.parse().map_err(|_| invalid())?;
            let scale = 10u128.pow(u32::try_from(fraction.len()).map_err(|_| invalid())?);
            nanos += digits * unit_nanos / scale;
        }

        total = total.checked_add(nanos).ok_or_else(invalid)?;
        if total > limit {
            return Err(invalid());
        }
        rest = after;
    }

    let signed = i128::try_from(total).map_err(|_| invalid())?;
    i64::try_from(if negative { -signed } else { signed }).map_err(|_| invalid())
}

/// Split a leading run of ASCII digits off `s`
fn split_digits(s: &str) -> (&str, &str) {
    let len = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s.split_at(len)
}

/// Deny with 400 if the proposed value does not follow its setting's grammar
pub fn validate(name: &str, value: &str) -> Verdict {
    let Some(format) = ValueFormat::for_setting(name) else {
        return Verdict::allowed();
    };

    match format.check(value) {
        Ok(()) => Verdict::allowed(),
        Err(e) => Verdict::denied(DenialReason::BadRequest, format!("{name}: {e}")),
    }
}
