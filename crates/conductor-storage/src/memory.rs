//! In-process `Storage` implementation backed by `DashMap`s.
//!
//! Intended for tests and single-process deployments that don't need
//! cross-restart durability; see [`crate::surreal::SurrealStorage`] for the
//! embedded-database implementation.

use async_trait::async_trait;
use conductor_core::{BranchId, MessageId, SessionId};
use dashmap::DashMap;

use crate::error::{StorageError, StorageResult};
use crate::traits::Storage;
use crate::types::{Branch, BranchTreeNode, Message, Session, Todo};

/// `Storage` backed entirely by in-memory maps.
#[derive(Default)]
pub struct MemoryStorage {
    sessions: DashMap<SessionId, Session>,
    branches: DashMap<BranchId, Branch>,
    messages: DashMap<MessageId, Message>,
    todos: DashMap<BranchId, Vec<Todo>>,
}

impl MemoryStorage {
    /// Construct an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn build_tree(&self, session_id: SessionId, parent: Option<BranchId>) -> Vec<BranchTreeNode> {
        let mut children: Vec<Branch> = self
            .branches
            .iter()
            .filter(|entry| {
                entry.value().session_id == session_id && entry.value().parent_branch_id == parent
            })
            .map(|entry| entry.value().clone())
            .collect();
        children.sort_by_key(|b| b.id.as_uuid());

        children
            .into_iter()
            .map(|branch| {
                let message_count = self
                    .messages
                    .iter()
                    .filter(|entry| entry.value().branch_id == branch.id)
                    .count();
                let node_children = self.build_tree(session_id, Some(branch.id));
                BranchTreeNode {
                    branch,
                    message_count,
                    children: node_children,
                }
            })
            .collect()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn create_session(&self, session: Session) -> StorageResult<()> {
        if self.sessions.contains_key(&session.id) {
            return Err(StorageError::AlreadyExists(session.id.to_string()));
        }
        self.sessions.insert(session.id, session);
        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> StorageResult<Option<Session>> {
        Ok(self.sessions.get(&id).map(|entry| entry.value().clone()))
    }

    async fn update_session(&self, session: Session) -> StorageResult<()> {
        if !self.sessions.contains_key(&session.id) {
            return Err(StorageError::NotFound(session.id.to_string()));
        }
        self.sessions.insert(session.id, session);
        Ok(())
    }

    async fn delete_session(&self, id: SessionId) -> StorageResult<()> {
        self.sessions.remove(&id);
        Ok(())
    }

    async fn list_sessions(&self) -> StorageResult<Vec<Session>> {
        let mut sessions: Vec<Session> = self
            .sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        sessions.sort_by_key(|s| (s.created_at, s.id.as_uuid()));
        Ok(sessions)
    }

    async fn create_branch(&self, branch: Branch) -> StorageResult<()> {
        if self.branches.contains_key(&branch.id) {
            return Err(StorageError::AlreadyExists(branch.id.to_string()));
        }
        self.branches.insert(branch.id, branch);
        Ok(())
    }

    async fn get_branch(&self, id: BranchId) -> StorageResult<Option<Branch>> {
        Ok(self.branches.get(&id).map(|entry| entry.value().clone()))
    }

    async fn update_branch(&self, branch: Branch) -> StorageResult<()> {
        if !self.branches.contains_key(&branch.id) {
            return Err(StorageError::NotFound(branch.id.to_string()));
        }
        self.branches.insert(branch.id, branch);
        Ok(())
    }

    async fn list_branches(&self, session_id: SessionId) -> StorageResult<Vec<Branch>> {
        let mut branches: Vec<Branch> = self
            .branches
            .iter()
            .filter(|entry| entry.value().session_id == session_id)
            .map(|entry| entry.value().clone())
            .collect();
        branches.sort_by_key(|b| b.id.as_uuid());
        Ok(branches)
    }

    async fn get_branch_tree(&self, session_id: SessionId) -> StorageResult<Vec<BranchTreeNode>> {
        Ok(self.build_tree(session_id, None))
    }

    async fn create_message(&self, message: Message) -> StorageResult<()> {
        if self.messages.contains_key(&message.id) {
            return Err(StorageError::AlreadyExists(message.id.to_string()));
        }
        self.messages.insert(message.id, message);
        Ok(())
    }

    async fn get_message(&self, id: MessageId) -> StorageResult<Option<Message>> {
        Ok(self.messages.get(&id).map(|entry| entry.value().clone()))
    }

    async fn list_messages(&self, branch_id: BranchId) -> StorageResult<Vec<Message>> {
        let mut messages: Vec<Message> = self
            .messages
            .iter()
            .filter(|entry| entry.value().branch_id == branch_id)
            .map(|entry| entry.value().clone())
            .collect();
        messages.sort_by_key(|m| (m.created_at, m.id.as_uuid()));
        Ok(messages)
    }

    async fn replace_todos(&self, branch_id: BranchId, todos: Vec<Todo>) -> StorageResult<()> {
        self.todos.insert(branch_id, todos);
        Ok(())
    }

    async fn list_todos(&self, branch_id: BranchId) -> StorageResult<Vec<Todo>> {
        Ok(self
            .todos
            .get(&branch_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_core::Role;
    use crate::types::MessagePart;

    #[tokio::test]
    async fn create_session_then_get_round_trips() {
        let storage = MemoryStorage::new();
        let session = Session::new("/workspace");
        storage.create_session(session.clone()).await.unwrap();
        let fetched = storage.get_session(session.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, session.id);
    }

    #[tokio::test]
    async fn create_session_twice_fails() {
        let storage = MemoryStorage::new();
        let session = Session::new("/workspace");
        storage.create_session(session.clone()).await.unwrap();
        let err = storage.create_session(session).await.unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn get_missing_session_is_none_not_error() {
        let storage = MemoryStorage::new();
        let result = storage.get_session(SessionId::new()).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn list_messages_is_created_at_ordered() {
        let storage = MemoryStorage::new();
        let session = Session::new("/workspace");
        let branch = Branch::new(session.id);
        storage.create_session(session.clone()).await.unwrap();
        storage.create_branch(branch.clone()).await.unwrap();

        let first = Message::new(
            session.id,
            branch.id,
            Role::User,
            vec![MessagePart::Text { text: "hi".into() }],
        );
        let mut second = Message::new(
            session.id,
            branch.id,
            Role::Assistant,
            vec![MessagePart::Text {
                text: "hello".into(),
            }],
        );
        second.created_at = first.created_at + chrono::Duration::seconds(1);

        storage.create_message(second.clone()).await.unwrap();
        storage.create_message(first.clone()).await.unwrap();

        let messages = storage.list_messages(branch.id).await.unwrap();
        assert_eq!(messages[0].id, first.id);
        assert_eq!(messages[1].id, second.id);
    }

    #[tokio::test]
    async fn replace_todos_is_wholesale() {
        let storage = MemoryStorage::new();
        let branch_id = BranchId::new();
        let now = chrono::Utc::now();
        let initial = vec![Todo {
            id: "1".into(),
            content: "first".into(),
            status: crate::types::TodoStatus::Pending,
            priority: None,
            created_at: now,
            updated_at: now,
        }];
        storage.replace_todos(branch_id, initial).await.unwrap();
        assert_eq!(storage.list_todos(branch_id).await.unwrap().len(), 1);

        storage.replace_todos(branch_id, vec![]).await.unwrap();
        assert!(storage.list_todos(branch_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn branch_tree_reflects_forks_and_message_counts() {
        let storage = MemoryStorage::new();
        let session = Session::new("/workspace");
        storage.create_session(session.clone()).await.unwrap();

        let root = Branch::new(session.id);
        storage.create_branch(root.clone()).await.unwrap();
        let m1 = Message::new(
            session.id,
            root.id,
            Role::User,
            vec![MessagePart::Text { text: "hi".into() }],
        );
        storage.create_message(m1.clone()).await.unwrap();

        let fork = Branch::forked_from(&root, m1.id, Some("fork".into()));
        storage.create_branch(fork.clone()).await.unwrap();

        let tree = storage.get_branch_tree(session.id).await.unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].branch.id, root.id);
        assert_eq!(tree[0].message_count, 1);
        assert_eq!(tree[0].children.len(), 1);
        assert_eq!(tree[0].children[0].branch.id, fork.id);
    }
}
