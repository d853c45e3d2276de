//! API credential domain
//!
//! The credential entity, its access-constraint settings, and the pure
//! validation helpers both rely on. Persistence, caching and runtime
//! enforcement of the stored constraints live outside this module.

mod entity;
mod record;
mod secret;
mod settings;
pub mod validation;

pub use entity::{
    CreateCredentialOptions, Credential, CredentialId, CredentialStatus, DEFAULT_CREDENTIAL_NAME,
    revoked_sentinel,
};
pub use record::CredentialRecord;
pub use secret::{generate_identifier, hash_secret, verify_secret, PlaintextSecret};
pub use settings::{
    DomainWhitelist, Frequency, HttpMethod, IpWhitelist, RateLimit, Settings, SettingsPatch,
    DEFAULT_RATE_LIMIT_AMOUNT, RATE_LIMIT_CEILING,
};
