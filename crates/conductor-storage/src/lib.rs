//! Conductor Storage — durable CRUD of sessions, branches, messages and todos.
//!
//! The [`Storage`] trait (spec §4.A) is the one persistence seam the rest of
//! the runtime depends on. Two implementations are provided:
//!
//! - [`MemoryStorage`] — in-process maps, used by tests and ephemeral runs.
//! - [`SurrealStorage`] — an embedded `SurrealDB` instance (`SurrealKV` on
//!   disk, or `mem://` for tests), enabled with the **`db`** feature.
//!
//! # Scaling
//!
//! | Deployment | Backend |
//! |------------|---------|
//! | Dev / single-agent | `SurrealDB` embedded, `SurrealKV` storage engine |
//! | Production / multi-node | `SurrealDB` over `TiKV` (Raft) |
//!
//! Same `Storage` API at both tiers; scaling is a connection-string change,
//! not a code change.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod memory;
pub mod traits;
pub mod types;

#[cfg(feature = "db")]
pub mod db;
#[cfg(feature = "db")]
pub mod surreal;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryStorage;
pub use traits::Storage;
pub use types::{
    Branch, BranchTreeNode, Message, MessageKind, MessagePart, Session, Todo, TodoStatus,
    ToolOutput,
};

#[cfg(feature = "db")]
pub use db::Database;
#[cfg(feature = "db")]
pub use surreal::SurrealStorage;
