//! Daemon state file paths.

use std::path::PathBuf;

use conductor_core::SystemError;
use directories::ProjectDirs;

/// Paths for daemon state files (pid, listening port, logs, mode marker).
pub struct KernelPaths {
    /// Directory for daemon files (e.g. `~/.local/share/conductor/`).
    pub base_dir: PathBuf,
}

impl KernelPaths {
    /// Create paths for the platform's default data directory.
    ///
    /// # Errors
    ///
    /// Returns [`SystemError`] if the home directory cannot be resolved.
    pub fn default_dir() -> Result<Self, SystemError> {
        let dirs = ProjectDirs::from("", "", "conductor")
            .ok_or_else(|| SystemError::new("paths", "default_dir", "could not resolve a home directory"))?;
        Ok(Self::from_dir(dirs.data_dir()))
    }

    /// Create paths from an explicit directory.
    pub fn from_dir(path: impl Into<std::path::PathBuf>) -> Self {
        Self { base_dir: path.into() }
    }

    /// PID file path.
    #[must_use]
    pub fn pid_file(&self) -> PathBuf {
        self.base_dir.join("daemon.pid")
    }

    /// Port file path (written on startup so a client knows where to connect).
    #[must_use]
    pub fn port_file(&self) -> PathBuf {
        self.base_dir.join("daemon.port")
    }

    /// Daemon log file path.
    #[must_use]
    pub fn log_file(&self) -> PathBuf {
        self.base_dir.join("logs").join("daemon.log")
    }

    /// Credential store file path, read by [`crate::auth::AuthStore::load`].
    #[must_use]
    pub fn auth_file(&self) -> PathBuf {
        self.base_dir.join("auth.toml")
    }
}
