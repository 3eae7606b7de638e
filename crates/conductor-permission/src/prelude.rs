//! Prelude module - commonly used types for convenient import.
//!
//! Use `use conductor_permission::prelude::*;` to import all essential types.

pub use crate::{
    AllowAll, DenyAll, PendingPermissions, PermissionDecision, PermissionError, PermissionHandler,
    PermissionResult, PermissionVerdict, PolicyHandler,
};
