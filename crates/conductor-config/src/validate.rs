//! Post-merge configuration validation.
//!
//! Validates that a deserialized [`RuntimeTuning`] is within acceptable
//! ranges and that cross-field invariants hold, before the runtime starts.

use crate::error::{ConfigError, ConfigResult};
use crate::types::RuntimeTuning;

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(tuning: &RuntimeTuning) -> ConfigResult<()> {
    validate_retry(tuning)?;
    validate_compaction(tuning)?;
    validate_timeouts(tuning)?;
    validate_subagent(tuning)?;
    validate_event_store(tuning)?;
    Ok(())
}

fn validate_retry(tuning: &RuntimeTuning) -> ConfigResult<()> {
    let r = &tuning.retry;

    if r.max_attempts == 0 {
        return Err(ConfigError::ValidationError {
            field: "retry.max_attempts".to_owned(),
            message: "must be at least 1".to_owned(),
        });
    }

    if r.initial_delay_ms > r.max_delay_ms {
        return Err(ConfigError::ValidationError {
            field: "retry.initial_delay_ms".to_owned(),
            message: format!(
                "initial_delay_ms ({}) must not exceed max_delay_ms ({})",
                r.initial_delay_ms, r.max_delay_ms
            ),
        });
    }

    Ok(())
}

fn validate_compaction(tuning: &RuntimeTuning) -> ConfigResult<()> {
    let c = &tuning.compaction;

    if c.budget_tokens == 0 {
        return Err(ConfigError::ValidationError {
            field: "compaction.budget_tokens".to_owned(),
            message: "must be greater than 0".to_owned(),
        });
    }

    if c.prune_protect_tokens > c.budget_tokens {
        return Err(ConfigError::ValidationError {
            field: "compaction.prune_protect_tokens".to_owned(),
            message: format!(
                "prune_protect_tokens ({}) must not exceed budget_tokens ({})",
                c.prune_protect_tokens, c.budget_tokens
            ),
        });
    }

    Ok(())
}

fn validate_timeouts(tuning: &RuntimeTuning) -> ConfigResult<()> {
    let t = &tuning.timeouts;

    if t.max_turn_iterations == 0 {
        return Err(ConfigError::ValidationError {
            field: "timeouts.max_turn_iterations".to_owned(),
            message: "must be at least 1".to_owned(),
        });
    }

    if t.prompt_timeout_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "timeouts.prompt_timeout_secs".to_owned(),
            message: "must be greater than 0".to_owned(),
        });
    }

    if t.stream_timeout_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "timeouts.stream_timeout_secs".to_owned(),
            message: "must be greater than 0".to_owned(),
        });
    }

    Ok(())
}

fn validate_subagent(tuning: &RuntimeTuning) -> ConfigResult<()> {
    let s = &tuning.subagent;

    if s.max_attempts == 0 {
        return Err(ConfigError::ValidationError {
            field: "subagent.max_attempts".to_owned(),
            message: "must be at least 1".to_owned(),
        });
    }

    if s.timeout_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "subagent.timeout_secs".to_owned(),
            message: "must be greater than 0".to_owned(),
        });
    }

    if s.max_concurrent == 0 {
        return Err(ConfigError::ValidationError {
            field: "subagent.max_concurrent".to_owned(),
            message: "must be at least 1".to_owned(),
        });
    }

    if s.max_depth == 0 {
        return Err(ConfigError::ValidationError {
            field: "subagent.max_depth".to_owned(),
            message: "must be at least 1".to_owned(),
        });
    }

    Ok(())
}

fn validate_event_store(tuning: &RuntimeTuning) -> ConfigResult<()> {
    if tuning.event_store.ring_capacity == 0 {
        return Err(ConfigError::ValidationError {
            field: "event_store.ring_capacity".to_owned(),
            message: "must be greater than 0".to_owned(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate(&RuntimeTuning::default()).is_ok());
    }

    #[test]
    fn zero_retry_attempts_rejected() {
        let mut tuning = RuntimeTuning::default();
        tuning.retry.max_attempts = 0;
        let err = validate(&tuning).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { field, .. } if field == "retry.max_attempts"));
    }

    #[test]
    fn initial_delay_above_max_delay_rejected() {
        let mut tuning = RuntimeTuning::default();
        tuning.retry.initial_delay_ms = 10_000;
        tuning.retry.max_delay_ms = 1_000;
        assert!(validate(&tuning).is_err());
    }

    #[test]
    fn prune_protect_above_budget_rejected() {
        let mut tuning = RuntimeTuning::default();
        tuning.compaction.prune_protect_tokens = tuning.compaction.budget_tokens + 1;
        assert!(validate(&tuning).is_err());
    }

    #[test]
    fn zero_subagent_concurrency_rejected() {
        let mut tuning = RuntimeTuning::default();
        tuning.subagent.max_concurrent = 0;
        assert!(validate(&tuning).is_err());
    }

    #[test]
    fn zero_ring_capacity_rejected() {
        let mut tuning = RuntimeTuning::default();
        tuning.event_store.ring_capacity = 0;
        assert!(validate(&tuning).is_err());
    }
}
