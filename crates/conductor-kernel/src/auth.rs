//! `AuthStore` — the credential collaborator named in spec §6:
//! `get(provider) -> Credential?`, `set`, `delete`, backed by a TOML file on
//! disk with the same file-permission discipline the teacher's secret store
//! uses.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use conductor_core::SystemError;
use serde::{Deserialize, Serialize};

/// A stored credential for one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "_tag")]
pub enum Credential {
    /// A static API key.
    ApiKey {
        /// The key value.
        key: String,
    },
    /// An OAuth token set.
    OAuth {
        /// Current access token.
        access: String,
        /// Refresh token, if the provider issues one.
        refresh: Option<String>,
        /// Unix timestamp the access token expires at.
        expires: Option<i64>,
    },
}

/// Thread-safe, disk-backed credential store keyed by provider name.
#[derive(Clone, Default)]
pub struct AuthStore {
    inner: Arc<RwLock<HashMap<String, Credential>>>,
}

impl std::fmt::Debug for AuthStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthStore").field("providers", &self.providers()).finish()
    }
}

impl AuthStore {
    /// Create an empty, in-memory credential store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load credentials from a TOML file, rejecting files with
    /// group/world-readable permissions.
    ///
    /// # Errors
    ///
    /// Returns [`SystemError`] if the file cannot be read, has insecure
    /// permissions, or fails to parse.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SystemError> {
        let path = path.as_ref();
        let mut file = std::fs::File::open(path)
            .map_err(|e| SystemError::new("auth", "load", e.to_string()).with_path(path.display().to_string()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let metadata = file
                .metadata()
                .map_err(|e| SystemError::new("auth", "load", e.to_string()).with_path(path.display().to_string()))?;
            let mode = metadata.permissions().mode();
            if mode & 0o077 != 0 {
                return Err(SystemError::new(
                    "auth",
                    "load",
                    format!("credentials file has insecure permissions {:o}, should be 0600", mode & 0o777),
                )
                .with_path(path.display().to_string()));
            }
        }

        let mut contents = String::new();
        std::io::Read::read_to_string(&mut file, &mut contents)
            .map_err(|e| SystemError::new("auth", "load", e.to_string()).with_path(path.display().to_string()))?;
        let credentials: HashMap<String, Credential> = toml::from_str(&contents)
            .map_err(|e| SystemError::new("auth", "load", e.to_string()).with_path(path.display().to_string()))?;

        Ok(Self {
            inner: Arc::new(RwLock::new(credentials)),
        })
    }

    /// Persist the current credential set to `path` as TOML, with `0600`
    /// permissions on Unix.
    ///
    /// # Errors
    ///
    /// Returns [`SystemError`] if the file cannot be written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SystemError> {
        let path = path.as_ref();
        let guard = self
            .inner
            .read()
            .map_err(|_| SystemError::new("auth", "save", "lock poisoned"))?;
        let contents = toml::to_string_pretty(&*guard)
            .map_err(|e| SystemError::new("auth", "save", e.to_string()).with_path(path.display().to_string()))?;
        std::fs::write(path, contents)
            .map_err(|e| SystemError::new("auth", "save", e.to_string()).with_path(path.display().to_string()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(path, permissions)
                .map_err(|e| SystemError::new("auth", "save", e.to_string()).with_path(path.display().to_string()))?;
        }

        Ok(())
    }

    /// Fetch the credential stored for `provider`, if any.
    #[must_use]
    pub fn get(&self, provider: &str) -> Option<Credential> {
        self.inner.read().ok()?.get(provider).cloned()
    }

    /// Store (or replace) the credential for `provider`.
    pub fn set(&self, provider: impl Into<String>, credential: Credential) {
        if let Ok(mut guard) = self.inner.write() {
            guard.insert(provider.into(), credential);
        }
    }

    /// Remove the credential stored for `provider`, if any.
    pub fn delete(&self, provider: &str) {
        if let Ok(mut guard) = self.inner.write() {
            guard.remove(provider);
        }
    }

    /// List every provider with a stored credential.
    #[must_use]
    pub fn providers(&self) -> Vec<String> {
        self.inner.read().map_or_else(|_| Vec::new(), |guard| guard.keys().cloned().collect())
    }
}
