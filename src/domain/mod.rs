//! Domain layer - Core business logic and entities

pub mod credential;
pub mod error;

pub use credential::{
    CreateCredentialOptions, Credential, CredentialId, CredentialRecord, CredentialStatus,
    DomainWhitelist, Frequency, HttpMethod, IpWhitelist, RateLimit, Settings, SettingsPatch,
};
pub use error::{DomainError, ErrorKind};
