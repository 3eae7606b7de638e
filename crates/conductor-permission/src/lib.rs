//! Conductor Permission — the `Permission` collaborator named in spec §6:
//! `check(tool, input) -> allow | deny | ask`, plus the suspend/resume
//! bookkeeping for `ask` verdicts.
//!
//! The tool runner consults a [`PermissionHandler`] before every tool call.
//! `Allow` and `Deny` resolve immediately; `Ask` suspends the call — the
//! runtime emits `PermissionRequested{requestId}` and registers the request
//! with [`PendingPermissions`], which some other task resolves once the
//! client answers (or which times out and is treated as a denial).
//!
//! ```
//! # use conductor_permission::prelude::*;
//! # use serde_json::json;
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let policy = PolicyHandler::default();
//! let decision = policy.check("read_file", &json!({ "path": "/tmp/x" })).await;
//! assert!(decision.is_allow());
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod decision;
pub mod error;
pub mod handler;
pub mod pending;
pub mod prelude;

pub use decision::{PermissionDecision, PermissionVerdict};
pub use error::{PermissionError, PermissionResult};
pub use handler::{AllowAll, DenyAll, PermissionHandler, PolicyHandler};
pub use pending::PendingPermissions;
