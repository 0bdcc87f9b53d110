//! Credential storage seam.
//!
//! The application never talks to a keychain directly. It is handed a
//! [`SecretStore`] at startup and reads credentials through a
//! [`CredentialCache`] that keeps decoded values for a limited time.

use moka::sync::Cache;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Decoded credentials for one service.
pub type Credentials = serde_json::Map<String, serde_json::Value>;

/// Default number of cached services.
pub const DEFAULT_CACHE_CAPACITY: u64 = 100;

/// Default lifetime of a cached entry.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// A platform secret store (keychain, credential manager, ...).
pub trait SecretStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, CredentialError>;
    fn set(&self, key: &str, secret: &str) -> Result<(), CredentialError>;
    /// Returns whether a secret was removed.
    fn delete(&self, key: &str) -> Result<bool, CredentialError>;
}

/// Process-local secret store.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: Mutex<HashMap<String, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, CredentialError> {
        self.secrets
            .lock()
            .map_err(|_| CredentialError::Backend("secret store lock poisoned".to_string()))
    }
}

impl SecretStore for MemorySecretStore {
    fn get(&self, key: &str) -> Result<Option<String>, CredentialError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, secret: &str) -> Result<(), CredentialError> {
        self.lock()?.insert(key.to_string(), secret.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, CredentialError> {
        Ok(self.lock()?.remove(key).is_some())
    }
}

/// TTL cache of JSON credentials backed by a [`SecretStore`].
pub struct CredentialCache<S> {
    store: S,
    entries: Cache<String, Credentials>,
}

impl<S: SecretStore> CredentialCache<S> {
    pub fn new(store: S) -> Self {
        Self::with_limits(store, DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL)
    }

    pub fn with_limits(store: S, capacity: u64, ttl: Duration) -> Self {
        Self {
            store,
            entries: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Credentials for `service`, loading them from the store on a miss.
    ///
    /// Returns `Ok(None)` when the store has nothing for the service.
    pub fn credentials(&self, service: &str) -> Result<Option<Credentials>, CredentialError> {
        if let Some(cached) = self.entries.get(service) {
            return Ok(Some(cached));
        }

        let Some(raw) = self.store.get(service)? else {
            tracing::warn!(service, "No credentials found");
            return Ok(None);
        };

        let credentials: Credentials = serde_json::from_str(&raw).map_err(|e| {
            tracing::error!(service, "Error decoding credentials: {e}");
            CredentialError::Decode(e.to_string())
        })?;

        self.entries.insert(service.to_string(), credentials.clone());
        Ok(Some(credentials))
    }

    /// Put credentials straight into the cache.
    pub fn cache(&self, service: &str, credentials: Credentials) {
        self.entries.insert(service.to_string(), credentials);
    }

    /// Drop one service from the cache. The store is untouched.
    pub fn clear(&self, service: &str) -> bool {
        let removed = self.entries.remove(service).is_some();
        if removed {
            tracing::info!(service, "Cleared cached credentials");
        } else {
            tracing::info!(service, "No cached credentials to clear");
        }
        removed
    }

    pub fn clear_all(&self) {
        tracing::info!("Clearing all cached credentials");
        self.entries.invalidate_all();
    }

    /// Number of live entries, after pending evictions have been applied.
    pub fn len(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Credential errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    Backend(String),
    Decode(String),
}

impl std::fmt::Display for CredentialError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialError::Backend(e) => write!(f, "Secret store error: {e}"),
            CredentialError::Decode(e) => write!(f, "Could not decode credentials: {e}"),
        }
    }
}

impl std::error::Error for CredentialError {}
