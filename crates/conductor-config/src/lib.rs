#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Layered configuration loader for the conductor runtime.
//!
//! Resolves a [`conductor_runtime::RuntimeConfig`] from a base set of
//! embedded defaults, merged with an optional TOML override file and
//! `CONDUCTOR_*` environment variables, validated before the runtime starts.
//!
//! This crate has no notion of CLI argument parsing, interactive editing, or
//! a user-level config directory — those are application-layer concerns.
//! What it owns is the mechanism: defaults → file → env → validate.
//!
//! # Usage
//!
//! ```rust,no_run
//! use conductor_config::Config;
//!
//! let tuning = Config::load(None).unwrap();
//! let runtime_config = tuning.into_runtime_config();
//! ```

/// Configuration error types.
pub mod error;
/// Deep-merge of TOML value trees.
pub mod merge;
/// Embedded defaults, override-file, and environment-variable loading.
pub mod loader;
/// Configuration struct definitions.
pub mod types;
/// Post-merge validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use types::*;

/// Marker type whose associated functions are the crate's public entry
/// points, mirroring how the runtime's own collaborators (e.g.
/// `AgentLoop::new`) are reached through a single constructor surface.
pub struct Config;

impl Config {
    /// Load configuration: embedded defaults, optionally overridden by a
    /// TOML file, then by `CONDUCTOR_*` environment variables, validated.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if `override_path` is set but unreadable or
    /// malformed, if an environment override fails to parse, or if the
    /// final configuration fails validation.
    pub fn load(override_path: Option<&std::path::Path>) -> ConfigResult<RuntimeTuning> {
        loader::load(override_path)
    }

    /// Load configuration from a single file, with no defaults layering or
    /// environment overrides.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed, or
    /// fails validation.
    pub fn load_file(path: &std::path::Path) -> ConfigResult<RuntimeTuning> {
        loader::load_file(path)
    }
}
