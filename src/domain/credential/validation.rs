//! Credential validation utilities
//!
//! Pure checks shared by the entity and the settings aggregate. Every
//! helper either returns the normalized value or a [`DomainError`] naming
//! the offending field; none of them mutate anything.

use std::net::IpAddr;

use chrono::{DateTime, SecondsFormat, Utc};
use ipnet::IpNet;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::domain::DomainError;

/// Length of a hex-encoded SHA-256 digest
pub const SECRET_HASH_LENGTH: usize = 64;

/// Universal wildcard accepted in the domain whitelist
pub const ANY_DOMAIN: &str = "*";

/// DNS labels (1-63 chars, alphanumeric with internal hyphens), optional
/// leading `*.` label, top-level label of the same shape but at least two chars.
static DOMAIN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\*\.)?([a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z0-9][a-z0-9-]{0,61}[a-z0-9]$")
        .unwrap()
});

/// Trim `value` and reject it if nothing is left
pub fn require_non_empty(field: &str, value: &str) -> Result<String, DomainError> {
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{} cannot be empty", field)));
    }

    Ok(trimmed.to_string())
}

/// Reject blank text but keep it verbatim; used for values read back from storage
pub fn require_present(field: &str, value: String) -> Result<String, DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{} cannot be empty", field)));
    }

    Ok(value)
}

/// Parse ISO 8601 / RFC 3339 text into a UTC instant
pub fn parse_iso_date(field: &str, value: &str) -> Result<DateTime<Utc>, DomainError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| DomainError::format(field, value))
}

/// Render an instant the way it is persisted (millisecond precision, `Z` suffix)
pub fn format_iso_date(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Check that `value` is a lowercase hex SHA-256 digest
pub fn validate_secret_hash(field: &str, value: &str) -> Result<(), DomainError> {
    let well_formed = value.len() == SECRET_HASH_LENGTH
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));

    if !well_formed {
        return Err(DomainError::format(field, value));
    }

    Ok(())
}

/// Check for a plain IPv4 or IPv6 address
pub fn is_valid_ip(value: &str) -> bool {
    value.parse::<IpAddr>().is_ok()
}

/// Check for a CIDR block (`/0`-`/32` for IPv4, `/0`-`/128` for IPv6)
pub fn is_valid_cidr(value: &str) -> bool {
    value.contains('/') && value.parse::<IpNet>().is_ok()
}

/// Validate a whitelist address, returning it trimmed
pub fn validate_ip_entry(value: &str) -> Result<String, DomainError> {
    let trimmed = value.trim();

    if is_valid_ip(trimmed) || is_valid_cidr(trimmed) {
        Ok(trimmed.to_string())
    } else {
        Err(DomainError::format("ipWhitelist.addresses", value))
    }
}

/// Check for a domain, a `*.`-prefixed domain, or the bare wildcard
pub fn is_valid_domain(value: &str) -> bool {
    value == ANY_DOMAIN || DOMAIN_PATTERN.is_match(value)
}

/// Validate a whitelist domain, returning it trimmed and lowercased
pub fn validate_domain_entry(value: &str) -> Result<String, DomainError> {
    let normalized = value.trim().to_ascii_lowercase();

    if is_valid_domain(&normalized) {
        Ok(normalized)
    } else {
        Err(DomainError::format("domainWhitelist.domains", value))
    }
}

/// Validate a whole list of entries, failing on the first bad or repeated one
pub fn validate_entries<F>(
    field: &str,
    entries: &[String],
    validate: F,
) -> Result<Vec<String>, DomainError>
where
    F: Fn(&str) -> Result<String, DomainError>,
{
    let mut out: Vec<String> = Vec::with_capacity(entries.len());

    for entry in entries {
        let normalized = validate(entry)?;
        if out.contains(&normalized) {
            return Err(DomainError::range(format!(
                "{} contains duplicate entry '{}'",
                field, normalized
            )));
        }
        out.push(normalized);
    }

    Ok(out)
}

/// Metadata keys must be non-empty strings
pub fn validate_metadata_key(key: &str) -> Result<(), DomainError> {
    if key.is_empty() {
        return Err(DomainError::validation("metadata key cannot be empty"));
    }

    Ok(())
}

/// Short description of a JSON value for type errors
pub fn describe_json(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean {}", b),
        Value::Number(n) => format!("number {}", n),
        Value::String(s) => format!("string {:?}", s),
        Value::Array(_) => "array".to_string(),
        Value::Object(_) => "object".to_string(),
    }
}
