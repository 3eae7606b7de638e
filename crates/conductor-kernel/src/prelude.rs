//! Prelude module - commonly used types for convenient import.
//!
//! Use `use conductor_kernel::prelude::*;` to import all essential types.

// Errors
pub use crate::{KernelError, KernelResult, error_codes};

// Daemon bootstrap
pub use crate::{KernelPaths, KernelServer};

// Credentials
pub use crate::{AuthStore, Credential};

// RPC surface
pub use crate::rpc::{
    BranchIdResult, BranchInfo, BranchTreeNode, ConductorRpcClient, ConductorRpcServer, CreateBranchParams,
    CreateSessionParams, CreateSessionResult, ForkBranchParams, MessageInfo, ModelInfo, PermissionDecisionWire,
    RespondPermissionParams, RespondPlanParams, RespondQuestionsParams, SendMessageParams, SessionBranchParams,
    SessionInfo, SessionStateSnapshot, SteerCommandWire, SteerParams, SubmitModeWire, SubscribeEventsParams,
    SwitchBranchParams, UpdateSessionBypassParams, UpdateSessionBypassResult,
};

// Shared daemon state
pub use crate::server::KernelState;
