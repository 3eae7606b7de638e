//! Daemon bootstrap: bind the JSON-RPC server and write the PID/port marker
//! files a client auto-starting the daemon looks for.
//!
//! Locking design carries over from the runtime layer: `KernelState` holds
//! only `Arc`s to collaborators that lock internally at a per-actor
//! granularity (`AgentLoop`'s `DashMap`, each `AgentActor`'s own `RwLock`s).
//! No lock here is ever held across an `.await`, so a slow turn on one
//! session can never block an RPC call addressed to another.

use std::net::SocketAddr;
use std::sync::Arc;

use jsonrpsee::server::{Server, ServerHandle};

use crate::error::KernelError;
use crate::paths::KernelPaths;
use crate::rpc::ConductorRpcServer;
use crate::server::KernelState;

/// A bound, running kernel RPC server.
pub struct KernelServer {
    handle: ServerHandle,
    local_addr: SocketAddr,
    paths: KernelPaths,
}

impl KernelServer {
    /// Bind `127.0.0.1:{port}` (`0` lets the OS choose a free port), start
    /// serving `state`, and write the PID/port marker files under `paths`.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::System`] if the address cannot be bound or the
    /// marker files cannot be written.
    pub async fn start(state: Arc<KernelState>, port: u16, paths: KernelPaths) -> Result<Self, KernelError> {
        let server = Server::builder()
            .build(SocketAddr::from(([127, 0, 0, 1], port)))
            .await
            .map_err(|e| {
                conductor_core::SystemError::new("daemon", "start", format!("failed to bind server: {e}"))
            })?;

        let local_addr = server
            .local_addr()
            .map_err(|e| conductor_core::SystemError::new("daemon", "start", format!("failed to read bound address: {e}")))?;

        let handle = server.start(state.into_rpc());

        std::fs::create_dir_all(&paths.base_dir).map_err(|e| {
            conductor_core::SystemError::new("daemon", "start", e.to_string())
                .with_path(paths.base_dir.display().to_string())
        })?;
        std::fs::write(paths.pid_file(), std::process::id().to_string())
            .map_err(|e| conductor_core::SystemError::new("daemon", "start", e.to_string()).with_path(paths.pid_file().display().to_string()))?;
        std::fs::write(paths.port_file(), local_addr.port().to_string())
            .map_err(|e| conductor_core::SystemError::new("daemon", "start", e.to_string()).with_path(paths.port_file().display().to_string()))?;

        Ok(Self { handle, local_addr, paths })
    }

    /// The address the server actually bound to.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Wait for the server to stop (client disconnect, `stop()`, or
    /// process shutdown signal).
    pub async fn stopped(&self) {
        self.handle.clone().stopped().await;
    }

    /// Stop the server and remove the PID/port marker files.
    pub fn stop(&self) {
        let _ = self.handle.stop();
        let _ = std::fs::remove_file(self.paths.pid_file());
        let _ = std::fs::remove_file(self.paths.port_file());
    }
}
