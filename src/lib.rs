//! API credential core
//!
//! An in-memory and serialization model for API keys:
//! - Identity that survives secret rotation
//! - SHA-256 hashed secrets, with the plaintext exposed only once
//! - Status derived from expiry, revocation and a manual restriction flag
//! - Validated access constraints (rate limit, IP and domain whitelists,
//!   allowed HTTP methods, metadata)
//!
//! Persistence, caching and runtime enforcement are left to the caller.

pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
pub use domain::{
    CreateCredentialOptions, Credential, CredentialId, CredentialRecord, CredentialStatus,
    DomainError, ErrorKind, Frequency, HttpMethod, Settings, SettingsPatch,
};
