//! Execution bridge: one task per live operation.
//!
//! The bridge opens the engine's subscription stream and relays each result
//! as a `data` envelope until the stream ends, the operation's scope is
//! cancelled, or the socket closes.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::messages::Envelope;
use super::outbound::Outbound;
use crate::engine::{ExecutionEngine, GraphQLRequest};
use crate::error::TransportError;

/// One subscription request received on a session.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    /// Identifier chosen by the client.
    pub id: String,
    /// Query, variables and operation name from the `start` payload.
    pub request: GraphQLRequest,
}

impl Operation {
    /// Creates an operation.
    #[must_use]
    pub fn new(id: impl Into<String>, request: GraphQLRequest) -> Self {
        Self {
            id: id.into(),
            request,
        }
    }
}

/// Relays engine results for operations of one session.
#[derive(Debug, Clone)]
pub struct ExecutionBridge {
    engine: Arc<dyn ExecutionEngine>,
    outbound: Outbound,
    complete_on_exhaustion: bool,
}

impl ExecutionBridge {
    /// Creates a bridge writing to `outbound`.
    #[must_use]
    pub fn new(
        engine: Arc<dyn ExecutionEngine>,
        outbound: Outbound,
        complete_on_exhaustion: bool,
    ) -> Self {
        Self {
            engine,
            outbound,
            complete_on_exhaustion,
        }
    }

    /// Runs `operation` on its own task.
    pub fn spawn(&self, operation: Operation, scope: CancellationToken) -> JoinHandle<()> {
        let span = tracing::debug_span!("ws.operation", operation_id = %operation.id);
        tokio::spawn(self.clone().run(operation, scope).instrument(span))
    }

    /// Relays results until the stream ends or `scope` is cancelled.
    ///
    /// No frame is written for this operation once cancellation has been
    /// observed.
    pub async fn run(self, operation: Operation, scope: CancellationToken) {
        let Operation { id, request } = operation;
        let mut results = self.engine.subscribe(request, scope.clone());

        loop {
            let next = tokio::select! {
                biased;
                () = scope.cancelled() => {
                    tracing::debug!("operation cancelled");
                    return;
                }
                next = results.next() => next,
            };

            let Some(result) = next else {
                tracing::debug!("subscription stream exhausted");
                if self.complete_on_exhaustion {
                    self.deliver(&scope, &Envelope::complete(id.as_str())).await;
                }
                return;
            };

            let envelope = match Envelope::data(id.as_str(), &result) {
                Ok(envelope) => envelope,
                Err(err) => {
                    tracing::warn!(error = %err, "dropping unencodable result");
                    continue;
                }
            };
            if !self.deliver(&scope, &envelope).await {
                return;
            }
        }
    }

    /// Writes one envelope; returns `false` when the operation must stop.
    async fn deliver(&self, scope: &CancellationToken, envelope: &Envelope) -> bool {
        match self.outbound.send_within(scope, envelope).await {
            Ok(()) => true,
            Err(TransportError::Cancelled) => {
                tracing::debug!("operation cancelled before write");
                false
            }
            Err(TransportError::Closed) => {
                tracing::debug!("connection closed, cancelling operation");
                scope.cancel();
                false
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to write envelope");
                true
            }
        }
    }
}
