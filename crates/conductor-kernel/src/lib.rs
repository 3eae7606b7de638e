#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]

//! JSON-RPC surface over the conductor agent runtime core.
//!
//! This crate wires the storage, event-store, and agent-loop crates into a
//! single daemon process: a `jsonrpsee` server exposing session/branch/
//! message CRUD, turn submission, steering, and suspended-request response
//! methods, plus a `subscribeEvents` subscription for per-session event
//! fan-out. It owns nothing the runtime doesn't hand it: [`KernelState`]
//! holds `Arc`s to collaborators constructed by the embedding application,
//! and the credential store ([`AuthStore`]) is exposed for that application
//! to consult when building its own `ProviderFactory`.

pub mod auth;
pub mod daemon;
pub mod error;
pub mod paths;
pub mod prelude;
pub mod rpc;
pub mod server;

pub use auth::{AuthStore, Credential};
pub use daemon::KernelServer;
pub use error::{KernelError, KernelResult, error_codes};
pub use paths::KernelPaths;
pub use rpc::{ConductorRpcClient, ConductorRpcServer};
pub use server::KernelState;
