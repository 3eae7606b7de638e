//! Config file discovery and layered loading.
//!
//! Implements the `Config::load()` algorithm:
//! 1. Parse the embedded `defaults.toml` → base tree.
//! 2. Deep-merge an optional override file, if one was given.
//! 3. Apply `CONDUCTOR_*` environment variable overrides.
//! 4. Deserialize the merged tree → [`RuntimeTuning`].
//! 5. Validate.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::merge::deep_merge;
use crate::types::RuntimeTuning;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed override-file size (1 MB), to avoid reading an
/// unreasonably large file before ever deserializing it.
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Dotted path, in `defaults.toml`'s tree shape, paired with the
/// environment variable that overrides it.
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("retry.initial_delay_ms", "CONDUCTOR_RETRY_INITIAL_DELAY_MS"),
    ("retry.max_delay_ms", "CONDUCTOR_RETRY_MAX_DELAY_MS"),
    ("retry.max_attempts", "CONDUCTOR_RETRY_MAX_ATTEMPTS"),
    ("compaction.budget_tokens", "CONDUCTOR_COMPACTION_BUDGET_TOKENS"),
    ("compaction.prune_protect_tokens", "CONDUCTOR_COMPACTION_PRUNE_PROTECT_TOKENS"),
    ("timeouts.max_turn_iterations", "CONDUCTOR_MAX_TURN_ITERATIONS"),
    ("timeouts.prompt_timeout_secs", "CONDUCTOR_PROMPT_TIMEOUT_SECS"),
    ("timeouts.stream_timeout_secs", "CONDUCTOR_STREAM_TIMEOUT_SECS"),
    ("subagent.timeout_secs", "CONDUCTOR_SUBAGENT_TIMEOUT_SECS"),
    ("subagent.max_attempts", "CONDUCTOR_SUBAGENT_MAX_ATTEMPTS"),
    ("subagent.max_concurrent", "CONDUCTOR_SUBAGENT_MAX_CONCURRENT"),
    ("subagent.max_depth", "CONDUCTOR_SUBAGENT_MAX_DEPTH"),
    ("event_store.ring_capacity", "CONDUCTOR_EVENT_STORE_RING_CAPACITY"),
];

/// Load the runtime configuration: embedded defaults, optionally overridden
/// by `override_path` (a TOML file), then by `CONDUCTOR_*` environment
/// variables, then validated.
///
/// # Errors
///
/// Returns a [`ConfigError`] if `override_path` is set but unreadable or
/// malformed, if an environment override fails to parse, or if the final
/// merged configuration fails validation.
pub fn load(override_path: Option<&Path>) -> ConfigResult<RuntimeTuning> {
    let mut merged: toml::Value = toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
        path: "<embedded defaults>".to_owned(),
        source: e,
    })?;

    if let Some(path) = override_path {
        let overlay = load_file_value(path)?;
        deep_merge(&mut merged, &overlay);
        info!(path = %path.display(), "loaded config override file");
    }

    let env_count = apply_env_overrides(&mut merged, &std::env::vars().collect())?;
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable overrides");
    }

    let tuning: RuntimeTuning = merged.try_into().map_err(|e: toml::de::Error| ConfigError::ParseError {
        path: "<merged config>".to_owned(),
        source: e,
    })?;

    validate::validate(&tuning)?;
    Ok(tuning)
}

/// Load a single TOML file, with no layering or env overrides, and validate
/// it in isolation. Used when an embedding application wants to load a
/// config file directly rather than through the defaults+env pipeline.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
/// validation.
pub fn load_file(path: &Path) -> ConfigResult<RuntimeTuning> {
    let value = load_file_value(path)?;
    let tuning: RuntimeTuning = value.try_into().map_err(|e: toml::de::Error| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;
    validate::validate(&tuning)?;
    Ok(tuning)
}

fn load_file_value(path: &Path) -> ConfigResult<toml::Value> {
    let metadata = std::fs::metadata(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    if metadata.len() > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit",
                metadata.len()
            ),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    toml::from_str(&content).map_err(|e| ConfigError::ParseError { path: path.display().to_string(), source: e })
}

/// Apply `CONDUCTOR_*` environment variable overrides onto the merged tree.
/// Returns the number of fields overridden.
fn apply_env_overrides(merged: &mut toml::Value, env_vars: &HashMap<String, String>) -> ConfigResult<usize> {
    let mut count = 0;
    for (path, var) in ENV_OVERRIDES {
        let Some(raw) = env_vars.get(*var) else { continue };
        let parsed: i64 = raw.parse().map_err(|_| ConfigError::EnvVarError {
            var: (*var).to_owned(),
            field: (*path).to_owned(),
            message: format!("expected an integer, got '{raw}'"),
        })?;
        set_path(merged, path, toml::Value::Integer(parsed));
        count += 1;
    }
    Ok(count)
}

/// Set a dotted path (e.g. `"retry.max_attempts"`) on a TOML value tree,
/// creating intermediate tables as needed.
fn set_path(root: &mut toml::Value, path: &str, value: toml::Value) {
    let mut cursor = root;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        let table = cursor.as_table_mut().get_or_insert_with(toml::map::Map::new);
        if segments.peek().is_none() {
            table.insert(segment.to_owned(), value);
            return;
        }
        cursor = table
            .entry(segment.to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse_and_validate() {
        let tuning: RuntimeTuning = toml::from_str(DEFAULTS_TOML).unwrap();
        assert_eq!(tuning.retry.max_attempts, 3);
        assert_eq!(tuning.compaction.budget_tokens, 100_000);
        assert!(validate::validate(&tuning).is_ok());
    }

    #[test]
    fn load_without_override_or_env_matches_defaults() {
        let tuning = load(None).unwrap();
        assert_eq!(tuning.event_store.ring_capacity, 1000);
    }

    #[test]
    fn override_file_replaces_scalar_and_keeps_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conductor.toml");
        std::fs::write(&path, "[retry]\nmax_attempts = 7\n").unwrap();

        let tuning = load(Some(&path)).unwrap();
        assert_eq!(tuning.retry.max_attempts, 7);
        assert_eq!(tuning.retry.initial_delay_ms, 500);
    }

    #[test]
    fn env_override_wins_over_file_and_defaults() {
        let mut env_vars = HashMap::new();
        env_vars.insert("CONDUCTOR_RETRY_MAX_ATTEMPTS".to_owned(), "9".to_owned());
        let mut merged: toml::Value = toml::from_str(DEFAULTS_TOML).unwrap();
        apply_env_overrides(&mut merged, &env_vars).unwrap();
        let tuning: RuntimeTuning = merged.try_into().unwrap();
        assert_eq!(tuning.retry.max_attempts, 9);
    }

    #[test]
    fn malformed_env_override_is_rejected() {
        let mut env_vars = HashMap::new();
        env_vars.insert("CONDUCTOR_RETRY_MAX_ATTEMPTS".to_owned(), "not-a-number".to_owned());
        let mut merged: toml::Value = toml::from_str(DEFAULTS_TOML).unwrap();
        let err = apply_env_overrides(&mut merged, &env_vars).unwrap_err();
        assert!(matches!(err, ConfigError::EnvVarError { .. }));
    }

    #[test]
    fn load_file_nonexistent() {
        let result = load_file(Path::new("/nonexistent/conductor.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn oversized_override_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.toml");
        let data = "x = \"".to_owned() + &"a".repeat(1_100_000) + "\"";
        std::fs::write(&path, data).unwrap();

        let result = load_file_value(&path);
        assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
    }
}
