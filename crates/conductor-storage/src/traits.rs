//! The `Storage` trait: durable CRUD of sessions, branches, messages and todos.

use async_trait::async_trait;
use conductor_core::{BranchId, MessageId, SessionId};

use crate::error::StorageResult;
use crate::types::{Branch, BranchTreeNode, Message, Session, Todo};

/// Typed CRUD surface keyed by ids (spec §4.A).
///
/// `create*` fails with [`crate::StorageError::AlreadyExists`] if the id is
/// already present. `get*` returns `Ok(None)` rather than failing on miss.
/// `list*` is lexicographic-stable (`created_at`, then id on ties).
#[async_trait]
pub trait Storage: Send + Sync {
    /// Insert a new session. Fails if `session.id` already exists.
    async fn create_session(&self, session: Session) -> StorageResult<()>;
    /// Fetch a session by id.
    async fn get_session(&self, id: SessionId) -> StorageResult<Option<Session>>;
    /// Replace an existing session's fields in place.
    async fn update_session(&self, session: Session) -> StorageResult<()>;
    /// Remove a session. Callers must ensure no actor still references it.
    async fn delete_session(&self, id: SessionId) -> StorageResult<()>;
    /// List all sessions.
    async fn list_sessions(&self) -> StorageResult<Vec<Session>>;

    /// Insert a new branch. Fails if `branch.id` already exists.
    async fn create_branch(&self, branch: Branch) -> StorageResult<()>;
    /// Fetch a branch by id.
    async fn get_branch(&self, id: BranchId) -> StorageResult<Option<Branch>>;
    /// Replace an existing branch's fields in place (model override, summary, name).
    async fn update_branch(&self, branch: Branch) -> StorageResult<()>;
    /// List all branches belonging to a session.
    async fn list_branches(&self, session_id: SessionId) -> StorageResult<Vec<Branch>>;
    /// Build the branch forest for a session, with per-node message counts.
    async fn get_branch_tree(&self, session_id: SessionId) -> StorageResult<Vec<BranchTreeNode>>;

    /// Insert a new message. Fails if `message.id` already exists.
    async fn create_message(&self, message: Message) -> StorageResult<()>;
    /// Fetch a message by id.
    async fn get_message(&self, id: MessageId) -> StorageResult<Option<Message>>;
    /// List all messages on a branch, in `created_at` order (stable by id on ties).
    async fn list_messages(&self, branch_id: BranchId) -> StorageResult<Vec<Message>>;

    /// Atomically replace the full todo list for a branch.
    async fn replace_todos(&self, branch_id: BranchId, todos: Vec<Todo>) -> StorageResult<()>;
    /// List the current todos for a branch.
    async fn list_todos(&self, branch_id: BranchId) -> StorageResult<Vec<Todo>>;
}
