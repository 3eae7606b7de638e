//! `CheckpointService` (spec §4.F): `save`/`restore` markers long multi-step
//! tools use to survive a crash mid-turn. Not load-bearing for single-turn
//! correctness.

use async_trait::async_trait;
use conductor_core::BranchId;
use dashmap::DashMap;
use serde_json::Value;
use thiserror::Error;

/// Errors from checkpoint operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CheckpointError {
    /// No checkpoint has been saved for this branch.
    #[error("no checkpoint for branch {0}")]
    NotFound(String),
}

/// Result type for checkpoint operations.
pub type CheckpointResult<T> = Result<T, CheckpointError>;

/// Saves and restores free-form tool-state markers, keyed by branch.
#[async_trait]
pub trait CheckpointService: Send + Sync {
    /// Persist `state` as the latest checkpoint for `branch_id`, replacing
    /// any prior one.
    async fn save(&self, branch_id: BranchId, state: Value) -> CheckpointResult<()>;

    /// Fetch the latest checkpoint for `branch_id`, if one exists.
    async fn restore(&self, branch_id: BranchId) -> CheckpointResult<Option<Value>>;
}

/// In-memory `CheckpointService`, sufficient for in-process deployments
/// where cross-turn durability beyond process lifetime isn't required.
#[derive(Debug, Default)]
pub struct InMemoryCheckpointService {
    checkpoints: DashMap<BranchId, Value>,
}

impl InMemoryCheckpointService {
    /// Construct an empty service.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointService for InMemoryCheckpointService {
    async fn save(&self, branch_id: BranchId, state: Value) -> CheckpointResult<()> {
        self.checkpoints.insert(branch_id, state);
        Ok(())
    }

    async fn restore(&self, branch_id: BranchId) -> CheckpointResult<Option<Value>> {
        Ok(self.checkpoints.get(&branch_id).map(|entry| entry.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn restore_before_save_is_none() {
        let service = InMemoryCheckpointService::new();
        let restored = service.restore(BranchId::new()).await.unwrap();
        assert!(restored.is_none());
    }

    #[tokio::test]
    async fn save_then_restore_round_trips() {
        let service = InMemoryCheckpointService::new();
        let branch_id = BranchId::new();
        service
            .save(branch_id, serde_json::json!({"step": 3}))
            .await
            .unwrap();
        let restored = service.restore(branch_id).await.unwrap().unwrap();
        assert_eq!(restored["step"], 3);
    }

    #[tokio::test]
    async fn second_save_replaces_first() {
        let service = InMemoryCheckpointService::new();
        let branch_id = BranchId::new();
        service.save(branch_id, serde_json::json!(1)).await.unwrap();
        service.save(branch_id, serde_json::json!(2)).await.unwrap();
        let restored = service.restore(branch_id).await.unwrap().unwrap();
        assert_eq!(restored, serde_json::json!(2));
    }
}
