//! Runtime validation helpers.
//!
//! Pattern checks share a process-wide cache of compiled regexes. Value
//! coercion follows lax rules: numbers and strings convert where the result
//! is unambiguous, ISO 8601 strings parse into dates and times, and semantic
//! string types (email, URL, IP address) are checked before being accepted.

use std::collections::HashMap;
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use uuid::Uuid;

use crate::error::{FieldError, ValidationErrorKind};
use crate::field::{ChoiceEnum, FieldType};
use crate::value::Value;

/// Pattern accepted for email fields.
pub const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";

/// Bounds applied to URL fields.
pub const URL_MIN_LENGTH: usize = 1;
pub const URL_MAX_LENGTH: usize = 65_536;

struct RegexCache {
    cache: RwLock<HashMap<String, Regex>>,
}

impl RegexCache {
    fn new() -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn get_or_compile(&self, pattern: &str) -> Result<Regex, regex::Error> {
        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(regex) = cache.get(pattern) {
                return Ok(regex.clone());
            }
        }

        let regex = Regex::new(pattern)?;
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(pattern.to_string(), regex.clone());
        Ok(regex)
    }
}

fn regex_cache() -> &'static RegexCache {
    static CACHE: OnceLock<RegexCache> = OnceLock::new();
    CACHE.get_or_init(RegexCache::new)
}

/// Check if a string matches a regex pattern.
///
/// Compiled patterns are cached for the lifetime of the process. An invalid
/// pattern never matches; the compile error is logged.
pub fn matches_pattern(value: &str, pattern: &str) -> bool {
    match regex_cache().get_or_compile(pattern) {
        Ok(regex) => regex.is_match(value),
        Err(e) => {
            tracing::warn!(
                pattern = pattern,
                error = %e,
                "Invalid regex pattern in validation, treating as non-match"
            );
            false
        }
    }
}

/// Returns an error message if the pattern does not compile.
pub fn validate_pattern(pattern: &str) -> Option<String> {
    Regex::new(pattern)
        .err()
        .map(|e| format!("invalid regex pattern: {e}"))
}

/// True if `value` looks like an email address.
#[must_use]
pub fn is_email(value: &str) -> bool {
    matches_pattern(value, EMAIL_PATTERN)
}

/// Result of coercing one value: the normalized value, or the failures found
/// with locations relative to the value.
pub type CoerceResult = std::result::Result<Value, Vec<FieldError>>;

fn fail(kind: ValidationErrorKind, message: impl Into<String>) -> CoerceResult {
    Err(vec![FieldError::bare(kind, message)])
}

fn type_error(message: &str) -> CoerceResult {
    fail(ValidationErrorKind::Type, message)
}

/// Coerce `value` into the representation of `ty`.
pub fn coerce(ty: &FieldType, value: Value) -> CoerceResult {
    match (ty, value) {
        (FieldType::Any, value) => Ok(value),
        (FieldType::Optional(_), Value::Null) => Ok(Value::Null),
        (FieldType::Optional(inner), value) => coerce(inner, value),
        (_, Value::Null) => fail(
            ValidationErrorKind::NoneNotAllowed,
            "none is not an allowed value",
        ),
        (FieldType::Str, value) => coerce_str(value),
        (FieldType::Int, value) => coerce_int(value),
        (FieldType::Float, value) => coerce_float(value),
        (FieldType::Decimal, value) => coerce_decimal(value),
        (FieldType::Bool, value) => coerce_bool(value),
        (FieldType::Bytes, value) => match value {
            Value::Bytes(b) => Ok(Value::Bytes(b)),
            Value::Text(s) => Ok(Value::Bytes(s.into_bytes())),
            Value::Int(_) | Value::Float(_) | Value::Decimal(_) => {
                Ok(Value::Bytes(value.to_string().into_bytes()))
            }
            _ => type_error("byte type expected"),
        },
        (FieldType::Date, value) => coerce_date(value),
        (FieldType::DateTime, value) => coerce_datetime(value),
        (FieldType::Time, value) => coerce_time(value),
        (FieldType::Duration, value) => coerce_duration(value),
        (FieldType::Uuid, value) => match value {
            Value::Uuid(u) => Ok(Value::Uuid(u)),
            Value::Text(s) => Uuid::parse_str(s.trim())
                .map(Value::Uuid)
                .or_else(|_| fail(ValidationErrorKind::Format, "value is not a valid uuid")),
            Value::Bytes(b) => Uuid::from_slice(&b)
                .map(Value::Uuid)
                .or_else(|_| fail(ValidationErrorKind::Format, "value is not a valid uuid")),
            _ => type_error("value is not a valid uuid"),
        },
        (FieldType::Email, value) => match value {
            Value::Text(s) if is_email(s.trim()) => Ok(Value::Text(s.trim().to_string())),
            Value::Text(_) => fail(
                ValidationErrorKind::Format,
                "value is not a valid email address",
            ),
            _ => type_error("str type expected"),
        },
        (FieldType::Url, value) => coerce_url(value),
        (FieldType::IpAddr, value) => match value {
            Value::Text(s) => IpAddr::from_str(s.trim())
                .map(|ip| Value::Text(ip.to_string()))
                .or_else(|_| {
                    fail(
                        ValidationErrorKind::Format,
                        "value is not a valid IPv4 or IPv6 address",
                    )
                }),
            _ => type_error("value is not a valid IPv4 or IPv6 address"),
        },
        (FieldType::Json, value) => match value {
            Value::Json(doc) => Ok(Value::Json(doc)),
            Value::Text(s) => serde_json::from_str(&s)
                .map(Value::Json)
                .or_else(|_| fail(ValidationErrorKind::Format, "Invalid JSON")),
            Value::Bytes(b) => serde_json::from_slice(&b)
                .map(Value::Json)
                .or_else(|_| fail(ValidationErrorKind::Format, "Invalid JSON")),
            _ => type_error("JSON object must be str, bytes or bytearray"),
        },
        (FieldType::Enum(choices), value) => coerce_enum(choices, &value),
        (FieldType::Schema(schema), value) => match value {
            Value::Record(record) if Arc::ptr_eq(record.schema(), schema) => {
                Ok(Value::Record(record))
            }
            Value::Record(record) => schema
                .validate_entries(record.entries())
                .map(|inst| Value::Record(Box::new(inst)))
                .map_err(|e| e.errors),
            Value::Map(map) => schema
                .validate_entries(map.into_iter().collect())
                .map(|inst| Value::Record(Box::new(inst)))
                .map_err(|e| e.errors),
            _ => type_error("value is not a valid dict"),
        },
        (FieldType::PkRef(inner), value) => match value {
            Value::Record(record) => coerce(inner, record.pk_value().unwrap_or_default()),
            Value::Map(mut map) => coerce(inner, map.remove("pk").unwrap_or_default()),
            value => coerce(inner, value),
        },
        (FieldType::List(inner), value) => match value {
            Value::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                let mut errors = Vec::new();
                for (idx, item) in items.into_iter().enumerate() {
                    match coerce(inner, item) {
                        Ok(v) => out.push(v),
                        Err(errs) => {
                            errors.extend(errs.into_iter().map(|e| e.within(idx.to_string())));
                        }
                    }
                }
                if errors.is_empty() {
                    Ok(Value::List(out))
                } else {
                    Err(errors)
                }
            }
            _ => type_error("value is not a valid list"),
        },
    }
}

fn coerce_str(value: Value) -> CoerceResult {
    match value {
        Value::Text(s) => Ok(Value::Text(s)),
        Value::Int(_) | Value::Float(_) => Ok(Value::Text(value.to_string())),
        Value::Decimal(d) => Ok(Value::Text(d.to_string())),
        _ => type_error("str type expected"),
    }
}

fn coerce_int(value: Value) -> CoerceResult {
    let n = match value {
        Value::Int(n) => Some(n),
        Value::Bool(b) => Some(i64::from(b)),
        Value::Float(f) if f.is_finite() => Some(f.trunc() as i64),
        Value::Decimal(d) => d.trunc().to_i64(),
        Value::Text(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    n.map_or_else(|| type_error("value is not a valid integer"), |n| Ok(Value::Int(n)))
}

fn coerce_float(value: Value) -> CoerceResult {
    let f = match value {
        Value::Float(f) => Some(f),
        Value::Bool(b) => Some(if b { 1.0 } else { 0.0 }),
        Value::Text(s) => s.trim().parse::<f64>().ok(),
        other => other.as_f64(),
    };
    f.map_or_else(|| type_error("value is not a valid float"), |f| Ok(Value::Float(f)))
}

fn coerce_decimal(value: Value) -> CoerceResult {
    let d = match value {
        Value::Decimal(d) => Some(d),
        Value::Int(n) => Some(Decimal::from(n)),
        Value::Float(f) => Decimal::from_f64(f),
        Value::Text(s) => {
            let s = s.trim();
            Decimal::from_str(s)
                .or_else(|_| Decimal::from_scientific(s))
                .ok()
        }
        _ => None,
    };
    d.map_or_else(|| type_error("value is not a valid decimal"), |d| Ok(Value::Decimal(d)))
}

fn coerce_bool(value: Value) -> CoerceResult {
    let b = match value {
        Value::Bool(b) => Some(b),
        Value::Int(0) => Some(false),
        Value::Int(1) => Some(true),
        Value::Text(s) => match s.trim().to_lowercase().as_str() {
            "0" | "off" | "f" | "false" | "n" | "no" => Some(false),
            "1" | "on" | "t" | "true" | "y" | "yes" => Some(true),
            _ => None,
        },
        _ => None,
    };
    b.map_or_else(
        || type_error("value could not be parsed to a boolean"),
        |b| Ok(Value::Bool(b)),
    )
}

fn coerce_date(value: Value) -> CoerceResult {
    match value {
        Value::Date(d) => Ok(Value::Date(d)),
        Value::DateTime(dt) => Ok(Value::Date(dt.date())),
        Value::Text(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Value::Date)
            .or_else(|_| fail(ValidationErrorKind::Format, "invalid date format")),
        _ => type_error("invalid date format"),
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

fn coerce_datetime(value: Value) -> CoerceResult {
    match value {
        Value::DateTime(dt) => Ok(Value::DateTime(dt)),
        Value::Text(s) => {
            let s = s.trim();
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_utc()))
                .map_or_else(
                    || fail(ValidationErrorKind::Format, "invalid datetime format"),
                    |dt| Ok(Value::DateTime(dt)),
                )
        }
        Value::Int(secs) => DateTime::from_timestamp(secs, 0).map_or_else(
            || fail(ValidationErrorKind::Format, "invalid datetime format"),
            |dt| Ok(Value::DateTime(dt.naive_utc())),
        ),
        Value::Float(f) if f.is_finite() => {
            let secs = f.floor();
            let nanos = ((f - secs) * 1e9).round() as u32;
            DateTime::from_timestamp(secs as i64, nanos).map_or_else(
                || fail(ValidationErrorKind::Format, "invalid datetime format"),
                |dt| Ok(Value::DateTime(dt.naive_utc())),
            )
        }
        _ => type_error("invalid datetime format"),
    }
}

fn coerce_time(value: Value) -> CoerceResult {
    match value {
        Value::Time(t) => Ok(Value::Time(t)),
        Value::Text(s) => {
            let s = s.trim();
            NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
                .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
                .map(Value::Time)
                .or_else(|_| fail(ValidationErrorKind::Format, "invalid time format"))
        }
        _ => type_error("invalid time format"),
    }
}

fn coerce_duration(value: Value) -> CoerceResult {
    let d = match value {
        Value::Duration(d) => Some(d),
        Value::Int(secs) => TimeDelta::try_seconds(secs),
        Value::Float(f) => seconds_to_micros(f).map(TimeDelta::microseconds),
        Value::Text(s) => parse_duration(s.trim()),
        _ => None,
    };
    d.map_or_else(
        || fail(ValidationErrorKind::Format, "invalid duration format"),
        |d| Ok(Value::Duration(d)),
    )
}

/// Parse `"[-][D[ days,] ]HH:MM:SS[.ffffff]"` or a plain number of seconds.
///
/// Returns `None` for malformed or out-of-range input.
fn parse_duration(s: &str) -> Option<TimeDelta> {
    if let Ok(secs) = s.parse::<f64>() {
        return seconds_to_micros(secs).map(TimeDelta::microseconds);
    }
    let (negative, rest) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let (days, clock) = match rest.rsplit_once(' ') {
        Some((days, clock)) => {
            let days = days.trim_end_matches(',').trim_end_matches("days").trim_end_matches("day");
            (days.trim().parse::<i64>().ok()?, clock)
        }
        None => (0, rest),
    };
    let mut parts = clock.split(':');
    let hours: i64 = parts.next()?.parse().ok()?;
    let minutes: i64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next().unwrap_or("0").parse().ok()?;
    if parts.next().is_some()
        || days < 0
        || hours < 0
        || !(0..60).contains(&minutes)
        || !(0.0..60.0).contains(&seconds)
    {
        return None;
    }
    let whole = days
        .checked_mul(86_400)?
        .checked_add(hours.checked_mul(3_600)?)?
        .checked_add(minutes * 60)?;
    let micros = whole.checked_mul(1_000_000)?.checked_add(seconds_to_micros(seconds)?)?;
    Some(TimeDelta::microseconds(if negative { -micros } else { micros }))
}

fn seconds_to_micros(secs: f64) -> Option<i64> {
    let micros = (secs * 1e6).round();
    // i64::MAX as f64 rounds up, so the upper bound is exclusive.
    (micros.is_finite() && micros >= i64::MIN as f64 && micros < i64::MAX as f64).then(|| micros as i64)
}

fn coerce_url(value: Value) -> CoerceResult {
    let Value::Text(s) = value else {
        return type_error("str type expected");
    };
    let s = s.trim().to_string();
    if s.len() < URL_MIN_LENGTH {
        return fail(
            ValidationErrorKind::MaxLength,
            format!("ensure this value has at least {URL_MIN_LENGTH} characters"),
        );
    }
    if s.len() > URL_MAX_LENGTH {
        return fail(
            ValidationErrorKind::MaxLength,
            format!("ensure this value has at most {URL_MAX_LENGTH} characters"),
        );
    }
    match url::Url::parse(&s) {
        Ok(parsed) if parsed.has_host() => Ok(Value::Text(s)),
        Ok(_) => fail(ValidationErrorKind::Format, "URL host invalid"),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            fail(ValidationErrorKind::Format, "invalid or missing URL scheme")
        }
        Err(_) => fail(ValidationErrorKind::Format, "invalid or missing URL"),
    }
}

fn coerce_enum(choices: &ChoiceEnum, value: &Value) -> CoerceResult {
    match choices.find_by_value(value) {
        Some(member) => Ok(member.value.clone()),
        None => {
            let permitted = choices
                .members()
                .iter()
                .map(|m| m.value.repr())
                .collect::<Vec<_>>()
                .join(", ");
            fail(
                ValidationErrorKind::Enum,
                format!("value is not a valid enumeration member; permitted: {permitted}"),
            )
        }
    }
}

/// Equality used for enumeration lookups: numbers compare by value across
/// integer, float and decimal representations.
#[must_use]
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(_) | Value::Float(_) | Value::Decimal(_), Value::Int(_) | Value::Float(_) | Value::Decimal(_)) => {
            match (a, b) {
                (Value::Decimal(x), Value::Decimal(y)) => x == y,
                _ => a.as_f64() == b.as_f64(),
            }
        }
        _ => a == b,
    }
}

/// Check a string against a maximum length, counted in characters.
pub fn check_max_length(value: &Value, max_length: usize) -> std::result::Result<(), FieldError> {
    match value {
        Value::Text(s) if s.chars().count() > max_length => Err(FieldError::bare(
            ValidationErrorKind::MaxLength,
            format!("ensure this value has at most {max_length} characters"),
        )),
        _ => Ok(()),
    }
}
