//! Configuration loading and validation errors.

/// Errors from loading or validating runtime configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path of the file that could not be read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A config file (or the embedded defaults) could not be parsed as TOML.
    #[error("failed to parse {path}: {source}")]
    ParseError {
        /// Path of the file that failed to parse (`<embedded defaults>` for
        /// the compiled-in baseline).
        path: String,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// An environment variable override could not be parsed into its
    /// target field type.
    #[error("environment variable {var} has an invalid value for {field}: {message}")]
    EnvVarError {
        /// Name of the offending environment variable.
        var: String,
        /// Dotted path of the field it was meant to override.
        field: String,
        /// Description of why the value was rejected.
        message: String,
    },

    /// The fully merged configuration failed a post-load validation check.
    #[error("invalid configuration for {field}: {message}")]
    ValidationError {
        /// Dotted path of the offending field.
        field: String,
        /// Description of why the value was rejected.
        message: String,
    },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
