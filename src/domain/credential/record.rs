//! Storable form of a credential
//!
//! This is the shape handed to and read back from the relational store.
//! It is deliberately a separate type from the entity: there is no field
//! that could carry the plaintext secret.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::settings::{
    DomainWhitelist, Frequency, HttpMethod, IpWhitelist, RateLimit, Settings, SettingsPatch,
};
use super::validation::describe_json;
use crate::domain::DomainError;

/// Persisted credential record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    /// Hex SHA-256 of the secret
    pub api_key: String,
    /// ISO 8601 time of creation or last rotation
    pub timestamp: String,
    pub restricted: bool,
    /// ISO 8601, or null for no expiry
    pub valid_until: Option<String>,
    #[serde(default)]
    pub settings: Settings,
}

impl CredentialRecord {
    /// Check the primitive type of every field, failing on the first bad one.
    ///
    /// Content checks (non-empty, ISO dates, hash format, whitelist entries)
    /// happen in [`super::Credential::from_record`].
    pub fn from_json(value: &Value) -> Result<Self, DomainError> {
        let obj = value
            .as_object()
            .ok_or_else(|| DomainError::invalid_type("record", describe_json(value)))?;

        let id = expect_string(obj, "id", "id")?;
        let owner_id = expect_string(obj, "owner_id", "owner_id")?;
        let name = expect_string(obj, "name", "name")?;
        let api_key = expect_string(obj, "api_key", "api_key")?;
        let timestamp = expect_string(obj, "timestamp", "timestamp")?;

        let restricted = match obj.get("restricted") {
            Some(Value::Bool(b)) => *b,
            other => return Err(type_error("restricted", other)),
        };

        let valid_until = match obj.get("valid_until") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            other => return Err(type_error("valid_until", other)),
        };

        let settings = match obj.get("settings") {
            None => Settings::default(),
            Some(Value::Object(settings)) => parse_settings(settings)?,
            other => return Err(type_error("settings", other)),
        };

        Ok(Self {
            id,
            owner_id,
            name,
            api_key,
            timestamp,
            restricted,
            valid_until,
            settings,
        })
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).expect("credential record always serializes")
    }
}

/// Walk the settings object by hand so type errors carry the dotted field path.
/// Absent sections fall back to their defaults; unknown keys are ignored.
fn parse_settings(obj: &Map<String, Value>) -> Result<Settings, DomainError> {
    let mut patch = SettingsPatch::new();

    if let Some(value) = obj.get("rateLimit") {
        let rate = expect_object(value, "rateLimit")?;
        let amount = match rate.get("amount") {
            Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            _ => None,
        }
        .ok_or_else(|| type_error("rateLimit.amount", rate.get("amount")))?;
        let frequency = expect_string(rate, "rateLimit.frequency", "frequency")?
            .parse::<Frequency>()?;
        patch = patch.with_rate_limit(RateLimit::new(amount, frequency));
    }

    if let Some(value) = obj.get("ipWhitelist") {
        let list = expect_object(value, "ipWhitelist")?;
        let enabled = expect_bool(list, "ipWhitelist.enabled", "enabled")?;
        let addresses = expect_strings(list, "ipWhitelist.addresses", "addresses")?;
        patch = patch.with_ip_whitelist(IpWhitelist::new(enabled, addresses));
    }

    if let Some(value) = obj.get("domainWhitelist") {
        let list = expect_object(value, "domainWhitelist")?;
        let enabled = expect_bool(list, "domainWhitelist.enabled", "enabled")?;
        let domains = expect_strings(list, "domainWhitelist.domains", "domains")?;
        patch = patch.with_domain_whitelist(DomainWhitelist::new(enabled, domains));
    }

    if let Some(value) = obj.get("allowedMethods") {
        let methods = expect_array(value, "allowedMethods")?
            .iter()
            .map(|m| match m {
                Value::String(s) => s
                    .parse::<HttpMethod>()
                    .map_err(|_| DomainError::format("allowedMethods", s.as_str())),
                other => Err(type_error("allowedMethods", Some(other))),
            })
            .collect::<Result<Vec<_>, _>>()?;
        patch = patch.with_allowed_methods(methods);
    }

    if let Some(value) = obj.get("metadata") {
        let metadata: BTreeMap<String, Value> = expect_object(value, "metadata")?
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        patch = patch.with_metadata(metadata);
    }

    Ok(Settings::merged(patch))
}

fn expect_string(
    obj: &Map<String, Value>,
    field: &str,
    key: &str,
) -> Result<String, DomainError> {
    match obj.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        other => Err(type_error(field, other)),
    }
}

fn expect_bool(obj: &Map<String, Value>, field: &str, key: &str) -> Result<bool, DomainError> {
    match obj.get(key) {
        Some(Value::Bool(b)) => Ok(*b),
        other => Err(type_error(field, other)),
    }
}

fn expect_object<'a>(
    value: &'a Value,
    field: &str,
) -> Result<&'a Map<String, Value>, DomainError> {
    value.as_object().ok_or_else(|| type_error(field, Some(value)))
}

fn expect_array<'a>(value: &'a Value, field: &str) -> Result<&'a Vec<Value>, DomainError> {
    value.as_array().ok_or_else(|| type_error(field, Some(value)))
}

fn expect_strings(
    obj: &Map<String, Value>,
    field: &str,
    key: &str,
) -> Result<Vec<String>, DomainError> {
    let items = match obj.get(key) {
        Some(value) => expect_array(value, field)?,
        None => return Err(type_error(field, None)),
    };

    items
        .iter()
        .map(|item| match item {
            Value::String(s) => Ok(s.clone()),
            other => Err(type_error(field, Some(other))),
        })
        .collect()
}

fn type_error(field: &str, received: Option<&Value>) -> DomainError {
    let received = received.map_or_else(|| "nothing".to_string(), describe_json);
    DomainError::invalid_type(field, received)
}
