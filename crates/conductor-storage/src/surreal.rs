//! `Storage` implementation backed by an embedded `SurrealDB`.
//!
//! Session/Branch/Message/Todo records are stored as plain `SurrealQL`
//! records keyed by their id; `Storage`'s own id types serialize to plain
//! strings (`#[serde(transparent)]`), so they pass straight through as
//! record keys.

use async_trait::async_trait;
use conductor_core::{BranchId, MessageId, SessionId};
use serde::Deserialize;

use crate::db::Database;
use crate::error::{StorageError, StorageResult};
use crate::traits::Storage;
use crate::types::{Branch, BranchTreeNode, Message, Session, Todo};

const SESSION_TABLE: &str = "session";
const BRANCH_TABLE: &str = "branch";
const MESSAGE_TABLE: &str = "message";
const TODO_TABLE: &str = "todo_list";

fn query_error(err: surrealdb::Error) -> StorageError {
    StorageError::Internal(err.to_string())
}

/// `Storage` backed by an embedded `SurrealDB` instance (`SurrealKV` on disk,
/// or in-memory for tests).
pub struct SurrealStorage {
    db: Database,
}

impl SurrealStorage {
    /// Open (or create) a durable store at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Connection`] if the database cannot be opened.
    pub async fn connect_embedded(path: &str) -> StorageResult<Self> {
        Ok(Self {
            db: Database::connect_embedded(path).await?,
        })
    }

    /// Open an in-memory store, for tests.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Connection`] if the database cannot be opened.
    pub async fn connect_memory() -> StorageResult<Self> {
        Ok(Self {
            db: Database::connect_memory().await?,
        })
    }

    async fn select_where<T: for<'de> Deserialize<'de>>(
        &self,
        sql: &str,
        bindings: Vec<(&str, String)>,
    ) -> StorageResult<Vec<T>> {
        let mut query = self.db.client().query(sql);
        for (key, value) in bindings {
            query = query.bind((key.to_string(), value));
        }
        let mut response = query.await.map_err(query_error)?;
        response.take(0).map_err(query_error)
    }
}

#[async_trait]
impl Storage for SurrealStorage {
    async fn create_session(&self, session: Session) -> StorageResult<()> {
        let id = session.id.to_string();
        let existing: Option<Session> = self
            .db
            .client()
            .select((SESSION_TABLE, id.as_str()))
            .await
            .map_err(query_error)?;
        if existing.is_some() {
            return Err(StorageError::AlreadyExists(id));
        }
        let _: Option<Session> = self
            .db
            .client()
            .create((SESSION_TABLE, id.as_str()))
            .content(session)
            .await
            .map_err(query_error)?;
        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> StorageResult<Option<Session>> {
        self.db
            .client()
            .select((SESSION_TABLE, id.to_string().as_str()))
            .await
            .map_err(query_error)
    }

    async fn update_session(&self, session: Session) -> StorageResult<()> {
        let id = session.id.to_string();
        let updated: Option<Session> = self
            .db
            .client()
            .update((SESSION_TABLE, id.as_str()))
            .content(session)
            .await
            .map_err(query_error)?;
        updated
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(id))
    }

    async fn delete_session(&self, id: SessionId) -> StorageResult<()> {
        let _: Option<Session> = self
            .db
            .client()
            .delete((SESSION_TABLE, id.to_string().as_str()))
            .await
            .map_err(query_error)?;
        Ok(())
    }

    async fn list_sessions(&self) -> StorageResult<Vec<Session>> {
        let mut sessions: Vec<Session> = self
            .db
            .client()
            .select(SESSION_TABLE)
            .await
            .map_err(query_error)?;
        sessions.sort_by_key(|s| (s.created_at, s.id.as_uuid()));
        Ok(sessions)
    }

    async fn create_branch(&self, branch: Branch) -> StorageResult<()> {
        let id = branch.id.to_string();
        let existing: Option<Branch> = self
            .db
            .client()
            .select((BRANCH_TABLE, id.as_str()))
            .await
            .map_err(query_error)?;
        if existing.is_some() {
            return Err(StorageError::AlreadyExists(id));
        }
        let _: Option<Branch> = self
            .db
            .client()
            .create((BRANCH_TABLE, id.as_str()))
            .content(branch)
            .await
            .map_err(query_error)?;
        Ok(())
    }

    async fn get_branch(&self, id: BranchId) -> StorageResult<Option<Branch>> {
        self.db
            .client()
            .select((BRANCH_TABLE, id.to_string().as_str()))
            .await
            .map_err(query_error)
    }

    async fn update_branch(&self, branch: Branch) -> StorageResult<()> {
        let id = branch.id.to_string();
        let updated: Option<Branch> = self
            .db
            .client()
            .update((BRANCH_TABLE, id.as_str()))
            .content(branch)
            .await
            .map_err(query_error)?;
        updated
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(id))
    }

    async fn list_branches(&self, session_id: SessionId) -> StorageResult<Vec<Branch>> {
        let sql = format!("SELECT * FROM {BRANCH_TABLE} WHERE session_id = $session_id");
        let mut branches: Vec<Branch> = self
            .select_where(&sql, vec![("session_id", session_id.to_string())])
            .await?;
        branches.sort_by_key(|b| b.id.as_uuid());
        Ok(branches)
    }

    async fn get_branch_tree(&self, session_id: SessionId) -> StorageResult<Vec<BranchTreeNode>> {
        let branches = self.list_branches(session_id).await?;

        async fn build(
            storage: &SurrealStorage,
            branches: &[Branch],
            parent: Option<BranchId>,
        ) -> StorageResult<Vec<BranchTreeNode>> {
            let mut nodes = Vec::new();
            for branch in branches.iter().filter(|b| b.parent_branch_id == parent) {
                let message_count = storage.list_messages(branch.id).await?.len();
                let children = Box::pin(build(storage, branches, Some(branch.id))).await?;
                nodes.push(BranchTreeNode {
                    branch: branch.clone(),
                    message_count,
                    children,
                });
            }
            Ok(nodes)
        }

        build(self, &branches, None).await
    }

    async fn create_message(&self, message: Message) -> StorageResult<()> {
        let id = message.id.to_string();
        let existing: Option<Message> = self
            .db
            .client()
            .select((MESSAGE_TABLE, id.as_str()))
            .await
            .map_err(query_error)?;
        if existing.is_some() {
            return Err(StorageError::AlreadyExists(id));
        }
        let _: Option<Message> = self
            .db
            .client()
            .create((MESSAGE_TABLE, id.as_str()))
            .content(message)
            .await
            .map_err(query_error)?;
        Ok(())
    }

    async fn get_message(&self, id: MessageId) -> StorageResult<Option<Message>> {
        self.db
            .client()
            .select((MESSAGE_TABLE, id.to_string().as_str()))
            .await
            .map_err(query_error)
    }

    async fn list_messages(&self, branch_id: BranchId) -> StorageResult<Vec<Message>> {
        let sql = format!(
            "SELECT * FROM {MESSAGE_TABLE} WHERE branch_id = $branch_id ORDER BY created_at"
        );
        let mut messages: Vec<Message> = self
            .select_where(&sql, vec![("branch_id", branch_id.to_string())])
            .await?;
        messages.sort_by_key(|m| (m.created_at, m.id.as_uuid()));
        Ok(messages)
    }

    async fn replace_todos(&self, branch_id: BranchId, todos: Vec<Todo>) -> StorageResult<()> {
        let key = branch_id.to_string();
        let _: Option<TodoList> = self
            .db
            .client()
            .update((TODO_TABLE, key.as_str()))
            .content(TodoList { todos })
            .await
            .map_err(query_error)?;
        Ok(())
    }

    async fn list_todos(&self, branch_id: BranchId) -> StorageResult<Vec<Todo>> {
        let key = branch_id.to_string();
        let stored: Option<TodoList> = self
            .db
            .client()
            .select((TODO_TABLE, key.as_str()))
            .await
            .map_err(query_error)?;
        Ok(stored.map(|list| list.todos).unwrap_or_default())
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct TodoList {
    todos: Vec<Todo>,
}
