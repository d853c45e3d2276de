//! Credential entity and related types

use std::collections::BTreeMap;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::record::CredentialRecord;
use super::secret::{generate_identifier, verify_secret, PlaintextSecret};
use super::settings::{
    DomainWhitelist, Frequency, HttpMethod, IpWhitelist, RateLimit, Settings, SettingsPatch,
};
use super::validation::{
    format_iso_date, parse_iso_date, require_non_empty, require_present, validate_secret_hash,
};
use crate::domain::DomainError;

/// Label given to credentials created without a name
pub const DEFAULT_CREDENTIAL_NAME: &str = "Unnamed API Key";

/// Expiry value marking a credential as permanently revoked (the Unix epoch)
pub fn revoked_sentinel() -> DateTime<Utc> {
    DateTime::<Utc>::default()
}

/// Credential identifier; stable across secret rotation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CredentialId(String);

impl CredentialId {
    /// Wrap an existing identifier verbatim (must not be blank)
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = require_present("id", id.into())?;
        Ok(Self(id))
    }

    /// Fresh random identifier
    pub fn generate() -> Self {
        Self(generate_identifier())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CredentialId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CredentialId> for String {
    fn from(id: CredentialId) -> Self {
        id.0
    }
}

impl std::fmt::Display for CredentialId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of a credential, derived from its expiry and restriction flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialStatus {
    Active,
    Restricted,
    Expired,
    Revoked,
}

impl CredentialStatus {
    /// Check if the key is usable
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl std::fmt::Display for CredentialStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Restricted => write!(f, "restricted"),
            Self::Expired => write!(f, "expired"),
            Self::Revoked => write!(f, "revoked"),
        }
    }
}

/// Optional inputs to [`Credential::create`]
#[derive(Debug, Clone, Default)]
pub struct CreateCredentialOptions {
    name: Option<String>,
    restricted: bool,
    valid_until: Option<DateTime<Utc>>,
    settings: SettingsPatch,
    bypass_rate_ceiling: bool,
}

impl CreateCredentialOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_restricted(mut self, restricted: bool) -> Self {
        self.restricted = restricted;
        self
    }

    /// Must be in the future when `create` runs
    pub fn with_valid_until(mut self, valid_until: DateTime<Utc>) -> Self {
        self.valid_until = Some(valid_until);
        self
    }

    /// Overrides merged onto the default settings
    pub fn with_settings(mut self, settings: SettingsPatch) -> Self {
        self.settings = settings;
        self
    }

    /// Accept a rate limit above the ceiling for this call
    pub fn with_bypass_rate_ceiling(mut self, bypass: bool) -> Self {
        self.bypass_rate_ceiling = bypass;
        self
    }
}

/// API credential entity
///
/// Never serialized directly: [`Credential::to_record`] projects it onto
/// [`CredentialRecord`], which has no field for the plaintext secret.
#[derive(Debug, Clone, PartialEq)]
pub struct Credential {
    id: CredentialId,
    owner_id: String,
    name: String,
    /// Hex SHA-256 of the current secret
    secret_hash: String,
    /// Creation or last rotation, millisecond precision
    timestamp: DateTime<Utc>,
    restricted: bool,
    /// `None` never expires; [`revoked_sentinel`] marks revocation
    valid_until: Option<DateTime<Utc>>,
    settings: Settings,
    /// Only set on the instance returned by `create` or after `rotate`
    plaintext_secret: Option<PlaintextSecret>,
}

impl Credential {
    /// Create a new credential for `owner_id`.
    ///
    /// `secret` is trimmed and used as-is when supplied; otherwise a random
    /// one is generated. The returned instance is the only place the plaintext
    /// is ever observable.
    pub fn create(
        owner_id: &str,
        secret: Option<&str>,
        options: CreateCredentialOptions,
    ) -> Result<Self, DomainError> {
        let owner_id = require_non_empty("owner_id", owner_id)?;
        let secret = PlaintextSecret::resolve(secret)?;

        let name = match options.name {
            Some(name) => require_non_empty("name", &name)?,
            None => DEFAULT_CREDENTIAL_NAME.to_string(),
        };

        let now = now_millis();
        let valid_until = options.valid_until.map(|v| v.trunc_subsecs(3));
        if let Some(valid_until) = valid_until {
            ensure_future(valid_until, Utc::now())?;
        }

        let settings = Settings::merged(options.settings);
        settings.rate_limit().validate(options.bypass_rate_ceiling)?;
        let settings = settings.into_validated()?;

        let credential = Self {
            id: CredentialId::generate(),
            owner_id,
            name,
            secret_hash: secret.hash(),
            timestamp: now,
            restricted: options.restricted,
            valid_until,
            settings,
            plaintext_secret: Some(secret),
        };

        info!(
            "Credential created: id={}, owner_id={}",
            credential.id, credential.owner_id
        );

        Ok(credential)
    }

    /// Rebuild a credential from its stored record.
    ///
    /// Every field is re-validated but stored text is kept as-is; the result
    /// never carries a plaintext secret.
    pub fn from_record(record: CredentialRecord) -> Result<Self, DomainError> {
        let id = CredentialId::new(record.id)?;
        let owner_id = require_present("owner_id", record.owner_id)?;
        let name = require_present("name", record.name)?;
        validate_secret_hash("api_key", &record.api_key)?;
        let timestamp = parse_iso_date("timestamp", &record.timestamp)?.trunc_subsecs(3);
        let valid_until = record
            .valid_until
            .as_deref()
            .map(|v| parse_iso_date("valid_until", v).map(|dt| dt.trunc_subsecs(3)))
            .transpose()?;
        let settings = record.settings.into_validated()?;

        debug!("Credential reconstructed: id={}", id);

        Ok(Self {
            id,
            owner_id,
            name,
            secret_hash: record.api_key,
            timestamp,
            restricted: record.restricted,
            valid_until,
            settings,
            plaintext_secret: None,
        })
    }

    /// Structurally validate a JSON record and rebuild the credential from it
    pub fn from_json(value: &Value) -> Result<Self, DomainError> {
        Self::from_record(CredentialRecord::from_json(value)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self, DomainError> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| DomainError::format("record", e.to_string()))?;
        Self::from_json(&value)
    }

    /// Project onto the storable record; never includes the plaintext secret
    pub fn to_record(&self) -> CredentialRecord {
        CredentialRecord {
            id: self.id.to_string(),
            owner_id: self.owner_id.clone(),
            name: self.name.clone(),
            api_key: self.secret_hash.clone(),
            timestamp: format_iso_date(&self.timestamp),
            restricted: self.restricted,
            valid_until: self.valid_until.as_ref().map(format_iso_date),
            settings: self.settings.clone(),
        }
    }

    pub fn to_json(&self) -> Value {
        self.to_record().to_json()
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.to_record())
    }

    // Getters

    pub fn id(&self) -> &CredentialId {
        &self.id
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn secret_hash(&self) -> &str {
        &self.secret_hash
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn is_restricted(&self) -> bool {
        self.restricted
    }

    pub fn valid_until(&self) -> Option<DateTime<Utc>> {
        self.valid_until
    }

    /// Independent copy of the settings
    pub fn settings(&self) -> Settings {
        self.settings.clone()
    }

    /// Plaintext secret, if this instance was just created or rotated
    pub fn plaintext_secret(&self) -> Option<&str> {
        self.plaintext_secret.as_ref().map(PlaintextSecret::as_str)
    }

    /// Remove the plaintext secret from this instance, handing it to the caller
    pub fn take_plaintext_secret(&mut self) -> Option<PlaintextSecret> {
        self.plaintext_secret.take()
    }

    // Secret

    /// Compare `candidate` (trimmed) with the stored hash in constant time
    pub fn verify(&self, candidate: &str) -> Result<bool, DomainError> {
        let candidate = require_non_empty("secret", candidate)?;
        Ok(verify_secret(&candidate, &self.secret_hash))
    }

    /// Replace the secret, keeping `id` and `owner_id`.
    ///
    /// Anything keyed by the previous hash (e.g. a cache entry) is stale
    /// afterwards and must be invalidated by the caller.
    pub fn rotate(&mut self, secret: Option<&str>) -> Result<(), DomainError> {
        let secret = PlaintextSecret::resolve(secret)?;

        self.secret_hash = secret.hash();
        self.timestamp = now_millis();
        self.plaintext_secret = Some(secret);

        info!("Credential rotated: id={}", self.id);
        Ok(())
    }

    // Lifecycle

    pub fn rename(&mut self, name: &str) -> Result<(), DomainError> {
        self.name = require_non_empty("name", name)?;
        Ok(())
    }

    /// `None` removes the expiry; a date must be strictly in the future.
    /// Revoked credentials cannot have their expiry changed.
    pub fn set_expiry(&mut self, valid_until: Option<DateTime<Utc>>) -> Result<(), DomainError> {
        if self.is_revoked() {
            return Err(DomainError::range(format!(
                "credential '{}' is revoked; its expiry cannot be changed",
                self.id
            )));
        }

        let valid_until = valid_until.map(|v| v.trunc_subsecs(3));
        if let Some(valid_until) = valid_until {
            ensure_future(valid_until, Utc::now())?;
        }

        self.valid_until = valid_until;
        debug!(
            "Credential expiry set: id={}, valid_until={:?}",
            self.id, self.valid_until
        );
        Ok(())
    }

    pub fn restrict(&mut self) {
        self.restricted = true;
    }

    pub fn unrestrict(&mut self) {
        self.restricted = false;
    }

    /// Permanently revoke: restricts the credential and sets the epoch sentinel
    pub fn revoke(&mut self) {
        self.valid_until = Some(revoked_sentinel());
        self.restricted = true;
        info!("Credential revoked: id={}", self.id);
    }

    pub fn is_revoked(&self) -> bool {
        self.valid_until == Some(revoked_sentinel())
    }

    // Status checks

    pub fn status(&self) -> CredentialStatus {
        self.status_at(Utc::now())
    }

    /// Revoked, then expired, then restricted, then active
    pub fn status_at(&self, now: DateTime<Utc>) -> CredentialStatus {
        match self.valid_until {
            Some(valid_until) if valid_until == revoked_sentinel() => CredentialStatus::Revoked,
            Some(valid_until) if now >= valid_until => CredentialStatus::Expired,
            _ if self.restricted => CredentialStatus::Restricted,
            _ => CredentialStatus::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status().is_usable()
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status_at(now).is_usable()
    }

    /// Milliseconds left before expiry: -1 without expiry, 0 once passed
    pub fn ms_until_expiry(&self) -> i64 {
        self.ms_until_expiry_at(Utc::now())
    }

    pub fn ms_until_expiry_at(&self, now: DateTime<Utc>) -> i64 {
        match self.valid_until {
            None => -1,
            Some(valid_until) => (valid_until - now).num_milliseconds().max(0),
        }
    }

    // Rate limit

    pub fn rate_limit(&self) -> RateLimit {
        self.settings.rate_limit()
    }

    pub fn set_rate_limit(
        &mut self,
        amount: u32,
        frequency: Frequency,
        bypass_ceiling: bool,
    ) -> Result<(), DomainError> {
        self.settings.set_rate_limit(amount, frequency, bypass_ceiling)
    }

    pub fn reset_rate_limit(&mut self) {
        self.settings.reset_rate_limit();
    }

    // IP whitelist

    pub fn ip_whitelist(&self) -> IpWhitelist {
        self.settings.ip_whitelist()
    }

    pub fn enable_ip_whitelist(&mut self) {
        self.settings.enable_ip_whitelist();
    }

    pub fn disable_ip_whitelist(&mut self) {
        self.settings.disable_ip_whitelist();
    }

    pub fn add_ip(&mut self, address: &str) -> Result<(), DomainError> {
        self.settings.add_ip(address)
    }

    pub fn remove_ip(&mut self, address: &str) {
        self.settings.remove_ip(address);
    }

    pub fn set_ip_whitelist(&mut self, addresses: &[String]) -> Result<(), DomainError> {
        self.settings.set_ip_whitelist(addresses)
    }

    // Domain whitelist

    pub fn domain_whitelist(&self) -> DomainWhitelist {
        self.settings.domain_whitelist()
    }

    pub fn enable_domain_whitelist(&mut self) {
        self.settings.enable_domain_whitelist();
    }

    pub fn disable_domain_whitelist(&mut self) {
        self.settings.disable_domain_whitelist();
    }

    pub fn add_domain(&mut self, domain: &str) -> Result<(), DomainError> {
        self.settings.add_domain(domain)
    }

    pub fn remove_domain(&mut self, domain: &str) {
        self.settings.remove_domain(domain);
    }

    pub fn set_domain_whitelist(&mut self, domains: &[String]) -> Result<(), DomainError> {
        self.settings.set_domain_whitelist(domains)
    }

    // Allowed methods

    pub fn allowed_methods(&self) -> Vec<HttpMethod> {
        self.settings.allowed_methods()
    }

    pub fn set_allowed_methods<S: AsRef<str>>(&mut self, methods: &[S]) -> Result<(), DomainError> {
        self.settings.set_allowed_methods(methods)
    }

    // Metadata

    pub fn metadata(&self) -> BTreeMap<String, Value> {
        self.settings.metadata()
    }

    pub fn metadata_value(&self, key: &str) -> Option<Value> {
        self.settings.metadata_value(key)
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: Value) -> Result<(), DomainError> {
        self.settings.set_metadata(key, value)
    }

    pub fn delete_metadata(&mut self, key: &str) -> Option<Value> {
        self.settings.delete_metadata(key)
    }

    pub fn clear_metadata(&mut self) {
        self.settings.clear_metadata();
    }
}

fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

fn ensure_future(valid_until: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), DomainError> {
    if valid_until <= now {
        return Err(DomainError::range(format!(
            "expiry {} is not in the future",
            format_iso_date(&valid_until)
        )));
    }

    Ok(())
}
