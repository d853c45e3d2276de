//! Access constraints attached to a credential

use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::validation::{
    validate_domain_entry, validate_entries, validate_ip_entry, validate_metadata_key, ANY_DOMAIN,
};
use crate::domain::DomainError;

/// Amount used by the default rate limit (per minute)
pub const DEFAULT_RATE_LIMIT_AMOUNT: u32 = 100;

/// Highest normalized rate accepted without an explicit bypass
pub const RATE_LIMIT_CEILING: RateLimit = RateLimit {
    amount: 500,
    frequency: Frequency::Minutes,
};

/// Time unit of a rate limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Seconds,
    Minutes,
    Hours,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seconds => "seconds",
            Self::Minutes => "minutes",
            Self::Hours => "hours",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "seconds" => Ok(Self::Seconds),
            "minutes" => Ok(Self::Minutes),
            "hours" => Ok(Self::Hours),
            other => Err(DomainError::invalid_type(
                "rateLimit.frequency",
                format!("{:?}", other),
            )),
        }
    }
}

/// Rate limit configuration (`amount` requests per `frequency`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    pub amount: u32,
    pub frequency: Frequency,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            amount: DEFAULT_RATE_LIMIT_AMOUNT,
            frequency: Frequency::Minutes,
        }
    }
}

impl RateLimit {
    pub fn new(amount: u32, frequency: Frequency) -> Self {
        Self { amount, frequency }
    }

    /// The rate normalized to requests per minute
    pub fn requests_per_minute(&self) -> f64 {
        let amount = f64::from(self.amount);

        match self.frequency {
            Frequency::Seconds => amount * 60.0,
            Frequency::Minutes => amount,
            Frequency::Hours => amount / 60.0,
        }
    }

    /// Check shape, and the ceiling unless `bypass_ceiling` is set
    pub fn validate(&self, bypass_ceiling: bool) -> Result<(), DomainError> {
        if self.amount == 0 {
            return Err(DomainError::range(
                "rateLimit.amount must be a positive integer",
            ));
        }

        let requested = self.requests_per_minute();
        let ceiling = RATE_LIMIT_CEILING.requests_per_minute();

        if !bypass_ceiling && requested > ceiling {
            return Err(DomainError::range(format!(
                "rate limit of {} requests/minute exceeds the ceiling of {} requests/minute",
                requested, ceiling
            )));
        }

        Ok(())
    }
}

/// HTTP verbs a credential may be restricted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = DomainError;

    /// Case-insensitive
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            _ => Err(DomainError::range(format!(
                "'{}' is not an allowed HTTP method",
                s
            ))),
        }
    }
}

/// IP allow-list; the flag is independent of the stored addresses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IpWhitelist {
    enabled: bool,
    addresses: Vec<String>,
}

impl IpWhitelist {
    /// Build without validation; validated when merged into [`Settings`]
    pub fn new(enabled: bool, addresses: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            enabled,
            addresses: addresses.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn addresses(&self) -> Vec<String> {
        self.addresses.clone()
    }

    /// Whether `ip` matches the configuration (always true while disabled)
    pub fn permits(&self, ip: IpAddr) -> bool {
        if !self.enabled {
            return true;
        }

        self.addresses.iter().any(|entry| match entry.parse::<IpNet>() {
            Ok(net) => net.contains(&ip),
            Err(_) => entry.parse::<IpAddr>().map_or(false, |addr| addr == ip),
        })
    }
}

/// Domain allow-list; entries may be `*`, `*.example.com` or `example.com`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainWhitelist {
    enabled: bool,
    domains: Vec<String>,
}

impl DomainWhitelist {
    /// Build without validation; validated when merged into [`Settings`]
    pub fn new(enabled: bool, domains: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            enabled,
            domains: domains.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn domains(&self) -> Vec<String> {
        self.domains.clone()
    }

    /// Whether `host` matches the configuration (always true while disabled).
    /// `*.example.com` matches subdomains only, not `example.com` itself.
    pub fn permits(&self, host: &str) -> bool {
        if !self.enabled {
            return true;
        }

        let host = host.trim().to_ascii_lowercase();

        self.domains.iter().any(|entry| {
            if entry == ANY_DOMAIN {
                true
            } else if let Some(suffix) = entry.strip_prefix('*') {
                host.ends_with(suffix) && host.len() > suffix.len()
            } else {
                *entry == host
            }
        })
    }
}

/// All access constraints of a credential
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    rate_limit: RateLimit,
    ip_whitelist: IpWhitelist,
    domain_whitelist: DomainWhitelist,
    allowed_methods: Vec<HttpMethod>,
    metadata: BTreeMap<String, Value>,
}

/// Partial settings, applied on top of the defaults
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsPatch {
    pub rate_limit: Option<RateLimit>,
    pub ip_whitelist: Option<IpWhitelist>,
    pub domain_whitelist: Option<DomainWhitelist>,
    pub allowed_methods: Option<Vec<HttpMethod>>,
    pub metadata: Option<BTreeMap<String, Value>>,
}

impl SettingsPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate_limit(mut self, rate_limit: RateLimit) -> Self {
        self.rate_limit = Some(rate_limit);
        self
    }

    pub fn with_ip_whitelist(mut self, whitelist: IpWhitelist) -> Self {
        self.ip_whitelist = Some(whitelist);
        self
    }

    pub fn with_domain_whitelist(mut self, whitelist: DomainWhitelist) -> Self {
        self.domain_whitelist = Some(whitelist);
        self
    }

    pub fn with_allowed_methods(mut self, methods: Vec<HttpMethod>) -> Self {
        self.allowed_methods = Some(methods);
        self
    }

    pub fn with_metadata(mut self, metadata: BTreeMap<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

impl Settings {
    /// Defaults overlaid with whatever the patch supplies (not yet validated)
    pub fn merged(patch: SettingsPatch) -> Self {
        let defaults = Self::default();

        Self {
            rate_limit: patch.rate_limit.unwrap_or(defaults.rate_limit),
            ip_whitelist: patch.ip_whitelist.unwrap_or(defaults.ip_whitelist),
            domain_whitelist: patch.domain_whitelist.unwrap_or(defaults.domain_whitelist),
            allowed_methods: patch.allowed_methods.unwrap_or(defaults.allowed_methods),
            metadata: patch.metadata.unwrap_or(defaults.metadata),
        }
    }

    /// Re-check every constraint, normalizing whitelist entries.
    ///
    /// Applied on every construction path so a corrupted or hand-edited record
    /// cannot be loaded. The rate ceiling is not checked here: a stored rate
    /// may have been set with an explicit bypass.
    pub fn into_validated(mut self) -> Result<Self, DomainError> {
        self.rate_limit.validate(true)?;

        self.ip_whitelist.addresses = validate_entries(
            "ipWhitelist.addresses",
            &self.ip_whitelist.addresses,
            validate_ip_entry,
        )?;
        self.domain_whitelist.domains = validate_entries(
            "domainWhitelist.domains",
            &self.domain_whitelist.domains,
            validate_domain_entry,
        )?;

        for key in self.metadata.keys() {
            validate_metadata_key(key)?;
        }

        Ok(self)
    }

    /// Check without consuming
    pub fn validate(&self) -> Result<(), DomainError> {
        self.clone().into_validated().map(|_| ())
    }

    // Rate limit

    pub fn rate_limit(&self) -> RateLimit {
        self.rate_limit
    }

    pub fn set_rate_limit(
        &mut self,
        amount: u32,
        frequency: Frequency,
        bypass_ceiling: bool,
    ) -> Result<(), DomainError> {
        let rate_limit = RateLimit::new(amount, frequency);
        rate_limit.validate(bypass_ceiling)?;
        self.rate_limit = rate_limit;
        Ok(())
    }

    pub fn reset_rate_limit(&mut self) {
        self.rate_limit = RateLimit::default();
    }

    // IP whitelist

    pub fn ip_whitelist(&self) -> IpWhitelist {
        self.ip_whitelist.clone()
    }

    pub fn enable_ip_whitelist(&mut self) {
        self.ip_whitelist.enabled = true;
    }

    pub fn disable_ip_whitelist(&mut self) {
        self.ip_whitelist.enabled = false;
    }

    /// Idempotent: an address already listed is not added twice
    pub fn add_ip(&mut self, address: &str) -> Result<(), DomainError> {
        let address = validate_ip_entry(address)?;
        if !self.ip_whitelist.addresses.contains(&address) {
            self.ip_whitelist.addresses.push(address);
        }
        Ok(())
    }

    pub fn remove_ip(&mut self, address: &str) {
        let address = address.trim();
        self.ip_whitelist.addresses.retain(|a| a != address);
    }

    /// Replace the whole list; nothing changes unless every entry is valid
    pub fn set_ip_whitelist(&mut self, addresses: &[String]) -> Result<(), DomainError> {
        let addresses = validate_entries("ipWhitelist.addresses", addresses, validate_ip_entry)?;
        self.ip_whitelist.addresses = addresses;
        Ok(())
    }

    // Domain whitelist

    pub fn domain_whitelist(&self) -> DomainWhitelist {
        self.domain_whitelist.clone()
    }

    pub fn enable_domain_whitelist(&mut self) {
        self.domain_whitelist.enabled = true;
    }

    pub fn disable_domain_whitelist(&mut self) {
        self.domain_whitelist.enabled = false;
    }

    /// Idempotent: a domain already listed is not added twice
    pub fn add_domain(&mut self, domain: &str) -> Result<(), DomainError> {
        let domain = validate_domain_entry(domain)?;
        if !self.domain_whitelist.domains.contains(&domain) {
            self.domain_whitelist.domains.push(domain);
        }
        Ok(())
    }

    pub fn remove_domain(&mut self, domain: &str) {
        let domain = domain.trim().to_ascii_lowercase();
        self.domain_whitelist.domains.retain(|d| *d != domain);
    }

    /// Replace the whole list; nothing changes unless every entry is valid
    pub fn set_domain_whitelist(&mut self, domains: &[String]) -> Result<(), DomainError> {
        let domains =
            validate_entries("domainWhitelist.domains", domains, validate_domain_entry)?;
        self.domain_whitelist.domains = domains;
        Ok(())
    }

    // Allowed methods

    pub fn allowed_methods(&self) -> Vec<HttpMethod> {
        self.allowed_methods.clone()
    }

    /// Empty list lifts the restriction
    pub fn set_allowed_methods<S: AsRef<str>>(&mut self, methods: &[S]) -> Result<(), DomainError> {
        let methods = methods
            .iter()
            .map(|m| m.as_ref().parse::<HttpMethod>())
            .collect::<Result<Vec<_>, _>>()?;
        self.allowed_methods = methods;
        Ok(())
    }

    pub fn permits_method(&self, method: &str) -> bool {
        if self.allowed_methods.is_empty() {
            return true;
        }

        method
            .parse::<HttpMethod>()
            .map_or(false, |m| self.allowed_methods.contains(&m))
    }

    // Metadata

    pub fn metadata(&self) -> BTreeMap<String, Value> {
        self.metadata.clone()
    }

    pub fn metadata_value(&self, key: &str) -> Option<Value> {
        self.metadata.get(key).cloned()
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: Value) -> Result<(), DomainError> {
        let key = key.into();
        validate_metadata_key(&key)?;
        self.metadata.insert(key, value);
        Ok(())
    }

    pub fn delete_metadata(&mut self, key: &str) -> Option<Value> {
        self.metadata.remove(key)
    }

    pub fn clear_metadata(&mut self) {
        self.metadata.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();

        assert_eq!(settings.rate_limit(), RateLimit::new(100, Frequency::Minutes));
        assert!(!settings.ip_whitelist().is_enabled());
        assert!(settings.ip_whitelist().addresses().is_empty());
        assert!(!settings.domain_whitelist().is_enabled());
        assert!(settings.allowed_methods().is_empty());
        assert!(settings.metadata().is_empty());
    }

    #[test]
    fn test_frequency_parsing() {
        assert_eq!("seconds".parse::<Frequency>().unwrap(), Frequency::Seconds);
        assert_eq!("hours".parse::<Frequency>().unwrap(), Frequency::Hours);
        assert_eq!(Frequency::Minutes.to_string(), "minutes");
        assert_eq!(
            "days".parse::<Frequency>().unwrap_err().kind(),
            ErrorKind::InvalidType
        );
    }

    #[test]
    fn test_requests_per_minute() {
        assert_eq!(RateLimit::new(8, Frequency::Seconds).requests_per_minute(), 480.0);
        assert_eq!(RateLimit::new(120, Frequency::Minutes).requests_per_minute(), 120.0);
        assert_eq!(RateLimit::new(600, Frequency::Hours).requests_per_minute(), 10.0);
    }

    #[test]
    fn test_rate_limit_ceiling() {
        let mut settings = Settings::default();

        let err = settings.set_rate_limit(1000, Frequency::Minutes, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Range);
        assert!(err.to_string().contains("1000"));
        assert!(err.to_string().contains("500"));
        assert_eq!(settings.rate_limit(), RateLimit::default());

        settings.set_rate_limit(1000, Frequency::Minutes, true).unwrap();
        assert_eq!(settings.rate_limit(), RateLimit::new(1000, Frequency::Minutes));
    }

    #[test]
    fn test_rate_limit_seconds_normalization() {
        let mut settings = Settings::default();

        assert!(settings.set_rate_limit(10, Frequency::Seconds, false).is_err());
        settings.set_rate_limit(8, Frequency::Seconds, false).unwrap();
        assert_eq!(settings.rate_limit(), RateLimit::new(8, Frequency::Seconds));

        settings.set_rate_limit(30_000, Frequency::Hours, false).unwrap();
        assert!(settings.set_rate_limit(30_001, Frequency::Hours, false).is_err());
    }

    #[test]
    fn test_rate_limit_zero_amount() {
        let mut settings = Settings::default();
        let err = settings.set_rate_limit(0, Frequency::Minutes, true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Range);
    }

    #[test]
    fn test_reset_rate_limit() {
        let mut settings = Settings::default();
        settings.set_rate_limit(5, Frequency::Hours, false).unwrap();
        settings.reset_rate_limit();
        assert_eq!(settings.rate_limit(), RateLimit::new(100, Frequency::Minutes));
    }

    #[test]
    fn test_add_ip_idempotent() {
        let mut settings = Settings::default();
        settings.add_ip("10.0.0.0/24").unwrap();
        settings.add_ip("10.0.0.0/24").unwrap();
        assert_eq!(settings.ip_whitelist().addresses(), vec!["10.0.0.0/24"]);
    }

    #[test]
    fn test_add_invalid_ip() {
        let mut settings = Settings::default();
        let err = settings.add_ip("999.1.1.1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(settings.ip_whitelist().addresses().is_empty());
    }

    #[test]
    fn test_remove_ip() {
        let mut settings = Settings::default();
        settings.add_ip("10.0.0.1").unwrap();
        settings.add_ip("::1").unwrap();

        settings.remove_ip("192.168.0.1");
        assert_eq!(settings.ip_whitelist().addresses().len(), 2);

        settings.remove_ip("10.0.0.1");
        assert_eq!(settings.ip_whitelist().addresses(), vec!["::1"]);
    }

    #[test]
    fn test_ip_toggle_keeps_addresses() {
        let mut settings = Settings::default();
        settings.add_ip("10.0.0.1").unwrap();

        settings.enable_ip_whitelist();
        assert!(settings.ip_whitelist().is_enabled());

        settings.disable_ip_whitelist();
        assert!(!settings.ip_whitelist().is_enabled());
        assert_eq!(settings.ip_whitelist().addresses(), vec!["10.0.0.1"]);
    }

    #[test]
    fn test_set_ip_whitelist_all_or_nothing() {
        let mut settings = Settings::default();
        settings.add_ip("10.0.0.1").unwrap();

        let bad = vec!["192.168.0.0/16".to_string(), "not-an-ip".to_string()];
        assert!(settings.set_ip_whitelist(&bad).is_err());
        assert_eq!(settings.ip_whitelist().addresses(), vec!["10.0.0.1"]);

        let good = vec!["192.168.0.0/16".to_string(), "2001:db8::/32".to_string()];
        settings.set_ip_whitelist(&good).unwrap();
        assert_eq!(settings.ip_whitelist().addresses(), good);
    }

    #[test]
    fn test_ip_whitelist_permits() {
        let disabled = IpWhitelist::new(false, Vec::<String>::new());
        assert!(disabled.permits("8.8.8.8".parse().unwrap()));

        let list = IpWhitelist::new(true, vec!["10.0.0.0/24", "192.168.1.5"]);
        assert!(list.permits("10.0.0.77".parse().unwrap()));
        assert!(list.permits("192.168.1.5".parse().unwrap()));
        assert!(!list.permits("10.0.1.1".parse().unwrap()));
        assert!(!list.permits("192.168.1.6".parse().unwrap()));
    }

    #[test]
    fn test_add_domain() {
        let mut settings = Settings::default();
        settings.add_domain("*.example.com").unwrap();
        settings.add_domain("*.Example.com").unwrap();
        assert_eq!(settings.domain_whitelist().domains(), vec!["*.example.com"]);

        let err = settings.add_domain("bad_domain").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn test_remove_domain_and_toggle() {
        let mut settings = Settings::default();
        settings.add_domain("api.example.com").unwrap();
        settings.enable_domain_whitelist();
        settings.remove_domain("other.example.com");
        assert_eq!(settings.domain_whitelist().domains().len(), 1);

        settings.remove_domain("API.example.com");
        assert!(settings.domain_whitelist().domains().is_empty());
        assert!(settings.domain_whitelist().is_enabled());

        settings.disable_domain_whitelist();
        assert!(!settings.domain_whitelist().is_enabled());
    }

    #[test]
    fn test_set_domain_whitelist_all_or_nothing() {
        let mut settings = Settings::default();

        let bad = vec!["example.com".to_string(), "bad_domain".to_string()];
        assert!(settings.set_domain_whitelist(&bad).is_err());
        assert!(settings.domain_whitelist().domains().is_empty());

        let good = vec!["*".to_string(), "Example.org".to_string()];
        settings.set_domain_whitelist(&good).unwrap();
        assert_eq!(settings.domain_whitelist().domains(), vec!["*", "example.org"]);
    }

    #[test]
    fn test_domain_whitelist_permits() {
        let list = DomainWhitelist::new(true, vec!["*.example.com", "example.org"]);
        assert!(list.permits("api.example.com"));
        assert!(list.permits("a.b.example.com"));
        assert!(!list.permits("example.com"));
        assert!(!list.permits("badexample.com"));
        assert!(list.permits("EXAMPLE.org"));
        assert!(!list.permits("www.example.org"));

        let any = DomainWhitelist::new(true, vec!["*"]);
        assert!(any.permits("anything.test"));
    }

    #[test]
    fn test_set_allowed_methods() {
        let mut settings = Settings::default();
        settings.set_allowed_methods(&["get", "Post"]).unwrap();
        assert_eq!(
            settings.allowed_methods(),
            vec![HttpMethod::Get, HttpMethod::Post]
        );
        assert!(settings.permits_method("GET"));
        assert!(!settings.permits_method("DELETE"));

        let err = settings.set_allowed_methods(&["GET", "TRACE"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Range);
        assert_eq!(settings.allowed_methods().len(), 2);

        settings.set_allowed_methods::<&str>(&[]).unwrap();
        assert!(settings.permits_method("DELETE"));
    }

    #[test]
    fn test_metadata() {
        let mut settings = Settings::default();
        settings.set_metadata("team", json!("payments")).unwrap();
        settings.set_metadata("tier", json!({"level": 2})).unwrap();

        assert_eq!(settings.metadata_value("team"), Some(json!("payments")));
        assert!(settings.set_metadata("", json!(1)).is_err());

        assert_eq!(settings.delete_metadata("team"), Some(json!("payments")));
        assert_eq!(settings.delete_metadata("team"), None);

        settings.clear_metadata();
        assert!(settings.metadata().is_empty());
    }

    #[test]
    fn test_merged_patch() {
        let patch = SettingsPatch::new()
            .with_rate_limit(RateLimit::new(10, Frequency::Seconds))
            .with_allowed_methods(vec![HttpMethod::Get]);
        let settings = Settings::merged(patch);

        assert_eq!(settings.rate_limit(), RateLimit::new(10, Frequency::Seconds));
        assert_eq!(settings.allowed_methods(), vec![HttpMethod::Get]);
        assert_eq!(settings.ip_whitelist(), IpWhitelist::default());
    }

    #[test]
    fn test_into_validated() {
        let settings = Settings::merged(
            SettingsPatch::new()
                .with_domain_whitelist(DomainWhitelist::new(true, vec!["API.Example.com"])),
        )
        .into_validated()
        .unwrap();
        assert_eq!(settings.domain_whitelist().domains(), vec!["api.example.com"]);

        let corrupted = Settings::merged(
            SettingsPatch::new().with_ip_whitelist(IpWhitelist::new(true, vec!["300.0.0.1"])),
        );
        assert_eq!(corrupted.validate().unwrap_err().kind(), ErrorKind::Format);

        let duplicated = Settings::merged(
            SettingsPatch::new().with_ip_whitelist(IpWhitelist::new(true, vec!["::1", "::1"])),
        );
        assert_eq!(duplicated.validate().unwrap_err().kind(), ErrorKind::Range);
    }

    #[test]
    fn test_serialized_shape() {
        let mut settings = Settings::default();
        settings.add_ip("10.0.0.1").unwrap();
        settings.set_allowed_methods(&["get"]).unwrap();

        let value = serde_json::to_value(&settings).unwrap();
        assert_eq!(
            value,
            json!({
                "rateLimit": {"amount": 100, "frequency": "minutes"},
                "ipWhitelist": {"enabled": false, "addresses": ["10.0.0.1"]},
                "domainWhitelist": {"enabled": false, "domains": []},
                "allowedMethods": ["GET"],
                "metadata": {}
            })
        );
    }

    #[test]
    fn test_partial_deserialization_uses_defaults() {
        let settings: Settings =
            serde_json::from_value(json!({"rateLimit": {"amount": 5, "frequency": "hours"}}))
                .unwrap();
        assert_eq!(settings.rate_limit(), RateLimit::new(5, Frequency::Hours));
        assert_eq!(settings.domain_whitelist(), DomainWhitelist::default());
        assert!(settings.metadata().is_empty());
    }
}
