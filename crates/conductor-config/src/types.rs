//! Serde-friendly mirrors of the runtime tunables, merged from layered TOML
//! and environment sources before being converted into a
//! [`conductor_runtime::RuntimeConfig`] at [`RuntimeTuning::into_runtime_config`].
//!
//! Durations are expressed as plain integers (`_ms` / `_secs` suffixes)
//! rather than `std::time::Duration` directly, since that's what round-trips
//! through TOML and environment variables without a custom (de)serializer.

use conductor_core::RetryConfig;
use conductor_runtime::{CompactionConfig, RuntimeConfig, SubagentConfig};
use serde::{Deserialize, Serialize};

/// Root of the merged runtime configuration tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeTuning {
    /// Provider stream retry policy.
    pub retry: RetrySection,
    /// Context-budget compaction policy.
    pub compaction: CompactionSection,
    /// Wall-clock deadlines for various blocking operations.
    pub timeouts: TimeoutsSection,
    /// Subagent pool sizing and retry policy.
    pub subagent: SubagentSection,
    /// Per-session event store sizing.
    pub event_store: EventStoreSection,
}

impl Default for RuntimeTuning {
    fn default() -> Self {
        let defaults = RuntimeConfig::default();
        Self {
            retry: RetrySection::from(defaults.retry),
            compaction: CompactionSection::from(defaults.compaction),
            timeouts: TimeoutsSection {
                max_turn_iterations: defaults.max_turn_iterations,
                prompt_timeout_secs: defaults.prompt_timeout.as_secs(),
                stream_timeout_secs: defaults.stream_timeout.as_secs(),
            },
            subagent: SubagentSection::from(defaults.subagent),
            event_store: EventStoreSection { ring_capacity: defaults.event_ring_capacity },
        }
    }
}

impl RuntimeTuning {
    /// Resolve into the strongly-typed runtime config the agent loop expects.
    #[must_use]
    pub fn into_runtime_config(self) -> RuntimeConfig {
        RuntimeConfig {
            retry: self.retry.into(),
            compaction: self.compaction.into(),
            max_turn_iterations: self.timeouts.max_turn_iterations,
            prompt_timeout: std::time::Duration::from_secs(self.timeouts.prompt_timeout_secs),
            stream_timeout: std::time::Duration::from_secs(self.timeouts.stream_timeout_secs),
            subagent: self.subagent.into(),
            event_ring_capacity: self.event_store.ring_capacity,
        }
    }
}

/// Provider stream retry policy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    /// Delay before the first retry, in milliseconds.
    pub initial_delay_ms: u64,
    /// Upper bound on any single delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
}

impl From<RetryConfig> for RetrySection {
    fn from(config: RetryConfig) -> Self {
        Self {
            initial_delay_ms: u64::try_from(config.initial_delay.as_millis()).unwrap_or(u64::MAX),
            max_delay_ms: u64::try_from(config.max_delay.as_millis()).unwrap_or(u64::MAX),
            max_attempts: config.max_attempts,
        }
    }
}

impl From<RetrySection> for RetryConfig {
    fn from(section: RetrySection) -> Self {
        Self::new(
            std::time::Duration::from_millis(section.initial_delay_ms),
            std::time::Duration::from_millis(section.max_delay_ms),
            section.max_attempts,
        )
    }
}

impl Default for RetrySection {
    fn default() -> Self {
        Self::from(RetryConfig::default())
    }
}

/// Context-budget compaction policy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CompactionSection {
    /// Estimated-token budget a prompt may occupy before pruning begins.
    pub budget_tokens: usize,
    /// Tool results newer than this many estimated tokens from the end of
    /// the branch are never pruned.
    pub prune_protect_tokens: usize,
}

impl From<CompactionConfig> for CompactionSection {
    fn from(config: CompactionConfig) -> Self {
        Self { budget_tokens: config.budget_tokens, prune_protect_tokens: config.prune_protect_tokens }
    }
}

impl From<CompactionSection> for CompactionConfig {
    fn from(section: CompactionSection) -> Self {
        Self { budget_tokens: section.budget_tokens, prune_protect_tokens: section.prune_protect_tokens }
    }
}

impl Default for CompactionSection {
    fn default() -> Self {
        Self::from(CompactionConfig::default())
    }
}

/// Wall-clock deadlines and per-turn iteration cap.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsSection {
    /// Cap on provider round-trips within a single turn.
    pub max_turn_iterations: u32,
    /// Deadline for a suspended permission/question/plan prompt, in seconds.
    pub prompt_timeout_secs: u64,
    /// Overall deadline for a single provider stream, in seconds.
    pub stream_timeout_secs: u64,
}

impl Default for TimeoutsSection {
    fn default() -> Self {
        let defaults = RuntimeConfig::default();
        Self {
            max_turn_iterations: defaults.max_turn_iterations,
            prompt_timeout_secs: defaults.prompt_timeout.as_secs(),
            stream_timeout_secs: defaults.stream_timeout.as_secs(),
        }
    }
}

/// Subagent pool sizing and retry policy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SubagentSection {
    /// Wall-clock deadline for a single subagent run, in seconds.
    pub timeout_secs: u64,
    /// Maximum attempts (including the first) on transient failure.
    pub max_attempts: u32,
    /// Process-wide concurrent-subagent ceiling.
    pub max_concurrent: usize,
    /// Maximum nesting depth (a subagent spawning a subagent spawning…).
    pub max_depth: usize,
}

impl From<SubagentConfig> for SubagentSection {
    fn from(config: SubagentConfig) -> Self {
        Self {
            timeout_secs: config.timeout.as_secs(),
            max_attempts: config.max_attempts,
            max_concurrent: config.max_concurrent,
            max_depth: config.max_depth,
        }
    }
}

impl From<SubagentSection> for SubagentConfig {
    fn from(section: SubagentSection) -> Self {
        Self {
            timeout: std::time::Duration::from_secs(section.timeout_secs),
            max_attempts: section.max_attempts,
            max_concurrent: section.max_concurrent,
            max_depth: section.max_depth,
        }
    }
}

impl Default for SubagentSection {
    fn default() -> Self {
        Self::from(SubagentConfig::default())
    }
}

/// Per-session event store sizing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct EventStoreSection {
    /// Ring buffer capacity per session (events retained for replay/fan-out).
    pub ring_capacity: usize,
}

impl Default for EventStoreSection {
    fn default() -> Self {
        Self { ring_capacity: RuntimeConfig::default().event_ring_capacity }
    }
}
