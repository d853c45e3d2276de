use serde::Deserialize;

use crate::domain::credential::{
    CreateCredentialOptions, RateLimit, SettingsPatch, DEFAULT_CREDENTIAL_NAME,
};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub credentials: CredentialDefaults,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Values applied to credentials created through [`CredentialDefaults::create_options`]
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CredentialDefaults {
    pub default_name: String,
    pub rate_limit: RateLimit,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for CredentialDefaults {
    fn default() -> Self {
        Self {
            default_name: DEFAULT_CREDENTIAL_NAME.to_string(),
            rate_limit: RateLimit::default(),
        }
    }
}

impl CredentialDefaults {
    /// Creation options pre-filled with the configured name and rate limit.
    /// The rate limit is still checked against the ceiling at creation.
    pub fn create_options(&self) -> CreateCredentialOptions {
        CreateCredentialOptions::new()
            .with_name(self.default_name.clone())
            .with_settings(SettingsPatch::new().with_rate_limit(self.rate_limit))
    }
}

impl AppConfig {
    /// Load from `config/default`, `config/local` and `APP__*` environment variables
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Parse a TOML document, falling back to defaults for anything omitted
    pub fn from_toml(text: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(text, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}
