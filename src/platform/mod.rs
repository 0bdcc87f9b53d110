//! Platform seams for Sundial Heartbeat.
//!
//! Credential storage and login-item registration are injected at
//! startup. None of this participates in heartbeat reduction.

pub mod autostart;
pub mod credentials;

// Re-export commonly used types
pub use autostart::{Autostart, AutostartEntry, AutostartError, NoopAutostart};
pub use credentials::{
    CredentialCache, CredentialError, Credentials, MemorySecretStore, SecretStore,
    DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL,
};
