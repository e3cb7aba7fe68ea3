//! Per-connection operation registry.
//!
//! A session runs at most one operation at a time. Starting a new one
//! replaces the live operation, and stopping cancels whatever is live no
//! matter which id the client named.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::bridge::{ExecutionBridge, Operation};

/// How long a stopped operation may take to wind down before it is aborted.
pub const STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// The operation currently running on a session.
#[derive(Debug)]
struct LiveOperation {
    id: String,
    scope: CancellationToken,
    task: JoinHandle<()>,
}

/// Tracks the live operation of a single connection.
#[derive(Debug)]
pub struct OperationRegistry {
    bridge: ExecutionBridge,
    /// Session scope; every operation scope is a child of it.
    scope: CancellationToken,
    live: Option<LiveOperation>,
}

impl OperationRegistry {
    /// Creates an empty registry whose operations derive from `scope`.
    #[must_use]
    pub fn new(bridge: ExecutionBridge, scope: CancellationToken) -> Self {
        Self {
            bridge,
            scope,
            live: None,
        }
    }

    /// Starts `operation`, replacing any live one.
    ///
    /// The previous bridge is cancelled and joined before the new one is
    /// spawned, so frames of the two operations never interleave. Does not
    /// wait for the new operation to produce anything.
    pub async fn start_operation(&mut self, operation: Operation) {
        if self.stop_and_wait().await {
            tracing::debug!(operation_id = %operation.id, "replaced live operation");
        }

        let scope = self.scope.child_token();
        let id = operation.id.clone();
        let task = self.bridge.spawn(operation, scope.clone());
        tracing::debug!(operation_id = %id, "operation started");
        self.live = Some(LiveOperation { id, scope, task });
    }

    /// Cancels the live operation without waiting for its task.
    ///
    /// Returns the task handle so the caller may await quiescence, or
    /// `None` if nothing was live.
    pub fn stop_operation(&mut self) -> Option<JoinHandle<()>> {
        let live = self.live.take()?;
        live.scope.cancel();
        tracing::debug!(operation_id = %live.id, "operation stopped");
        Some(live.task)
    }

    /// Cancels the live operation and waits for its bridge to finish.
    ///
    /// A bridge that has not exited within [`STOP_TIMEOUT`] is aborted.
    /// Returns `true` if an operation was live.
    pub async fn stop_and_wait(&mut self) -> bool {
        let Some(mut task) = self.stop_operation() else {
            return false;
        };
        match tokio::time::timeout(STOP_TIMEOUT, &mut task).await {
            Ok(Err(err)) if err.is_panic() => {
                tracing::error!(error = %err, "operation task panicked");
            }
            Ok(_) => {}
            Err(_) => {
                tracing::warn!("operation did not stop in time, aborting");
                task.abort();
            }
        }
        true
    }

    /// Id of the live operation, if any.
    ///
    /// An operation whose stream has already ended stays registered until
    /// it is stopped or replaced.
    #[must_use]
    pub fn live_operation_id(&self) -> Option<&str> {
        self.live.as_ref().map(|live| live.id.as_str())
    }

    /// Returns `true` if an operation is registered and its bridge is
    /// still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.live
            .as_ref()
            .is_some_and(|live| !live.task.is_finished())
    }
}
