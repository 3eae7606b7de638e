//! Runtime tunables (spec §5, §9, §10): retry, compaction, timeouts, subagent
//! pool sizing. A layered loader (`conductor-config`) builds one of these from
//! defaults + TOML + environment; this crate only needs the resolved struct.

use std::time::Duration;

use conductor_core::RetryConfig;

/// Default token budget before compaction kicks in.
pub const DEFAULT_COMPACTION_BUDGET_TOKENS: usize = 100_000;
/// Default byte/turn window protected from tool-output pruning.
pub const DEFAULT_PRUNE_PROTECT_TOKENS: usize = 20_000;
/// Default cap on provider round-trips within a single turn (spec §4.D).
pub const DEFAULT_MAX_TURN_ITERATIONS: u32 = 25;
/// Default deadline for a suspended permission/question/plan prompt (spec §5).
pub const DEFAULT_PROMPT_TIMEOUT: Duration = Duration::from_secs(300);
/// Default overall provider stream deadline (spec §5).
pub const DEFAULT_STREAM_TIMEOUT: Duration = Duration::from_secs(600);
/// Default subagent run deadline (spec §4.E design guideline).
pub const DEFAULT_SUBAGENT_TIMEOUT: Duration = Duration::from_secs(300);
/// Default bound on retry attempts for a transient subagent failure.
pub const DEFAULT_SUBAGENT_MAX_ATTEMPTS: u32 = 2;
/// Default process-wide concurrent-subagent ceiling.
pub const DEFAULT_MAX_CONCURRENT_SUBAGENTS: usize = 4;
/// Default maximum subagent nesting depth.
pub const DEFAULT_MAX_SUBAGENT_DEPTH: usize = 3;

/// Compaction tunables.
#[derive(Debug, Clone, Copy)]
pub struct CompactionConfig {
    /// Estimated-token budget a prompt may occupy before pruning begins.
    pub budget_tokens: usize,
    /// Tool results newer than this many estimated tokens from the end of
    /// the branch are never pruned.
    pub prune_protect_tokens: usize,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            budget_tokens: DEFAULT_COMPACTION_BUDGET_TOKENS,
            prune_protect_tokens: DEFAULT_PRUNE_PROTECT_TOKENS,
        }
    }
}

/// Subagent pool tunables.
#[derive(Debug, Clone, Copy)]
pub struct SubagentConfig {
    /// Wall-clock deadline for a single subagent run.
    pub timeout: Duration,
    /// Maximum attempts (including the first) on transient failure.
    pub max_attempts: u32,
    /// Process-wide concurrent-subagent ceiling.
    pub max_concurrent: usize,
    /// Maximum nesting depth (a subagent spawning a subagent spawning…).
    pub max_depth: usize,
}

impl Default for SubagentConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_SUBAGENT_TIMEOUT,
            max_attempts: DEFAULT_SUBAGENT_MAX_ATTEMPTS,
            max_concurrent: DEFAULT_MAX_CONCURRENT_SUBAGENTS,
            max_depth: DEFAULT_MAX_SUBAGENT_DEPTH,
        }
    }
}

/// Top-level runtime configuration, resolved before any actor is spawned.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Provider stream retry policy (spec §4.D, §8 invariant 6).
    pub retry: RetryConfig,
    /// Compaction policy.
    pub compaction: CompactionConfig,
    /// Cap on provider round-trips per turn.
    pub max_turn_iterations: u32,
    /// Deadline for a suspended permission/question/plan prompt.
    pub prompt_timeout: Duration,
    /// Overall deadline for a single provider stream.
    pub stream_timeout: Duration,
    /// Subagent pool policy.
    pub subagent: SubagentConfig,
    /// Per-session `EventStore` ring buffer capacity.
    pub event_ring_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            compaction: CompactionConfig::default(),
            max_turn_iterations: DEFAULT_MAX_TURN_ITERATIONS,
            prompt_timeout: DEFAULT_PROMPT_TIMEOUT,
            stream_timeout: DEFAULT_STREAM_TIMEOUT,
            subagent: SubagentConfig::default(),
            event_ring_capacity: conductor_events::DEFAULT_RING_CAPACITY,
        }
    }
}

/// Rough token estimator shared by compaction and context-budget checks
/// (spec §4.D design guideline, §8 invariant 7: `⌈char_count/4⌉`, monotone
/// and superadditive under concatenation).
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimator_is_monotone() {
        assert!(estimate_tokens("hello world") >= estimate_tokens("hello"));
    }

    #[test]
    fn estimator_is_superadditive_under_concatenation() {
        let a = "the quick brown fox";
        let b = "jumps over the lazy dog";
        let combined = estimate_tokens(&format!("{a}{b}"));
        assert!(combined + 1 >= estimate_tokens(a) + estimate_tokens(b));
    }

    #[test]
    fn default_config_has_sane_bounds() {
        let config = RuntimeConfig::default();
        assert_eq!(config.max_turn_iterations, 25);
        assert_eq!(config.retry.max_attempts, 3);
    }
}
