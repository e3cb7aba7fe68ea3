//! Subscription session state machine.
//!
//! A [`Session`] owns one upgraded socket. Its read loop is the only reader;
//! it routes `start`/`stop` envelopes to the [`OperationRegistry`] and tears
//! everything down when the socket stops producing frames.

use std::fmt;
use std::sync::Arc;

use axum::extract::ws::Message;
use futures_util::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use super::bridge::{ExecutionBridge, Operation};
use super::messages::{Envelope, MessageType};
use super::outbound::Outbound;
use super::subscription::OperationRegistry;
use crate::config::SubscriptionConfig;
use crate::engine::ExecutionEngine;

/// State of one upgraded connection.
#[derive(Debug)]
pub struct Session {
    outbound: Outbound,
    scope: CancellationToken,
    registry: OperationRegistry,
}

impl Session {
    /// Creates a session writing through `outbound`.
    #[must_use]
    pub fn new(
        engine: Arc<dyn ExecutionEngine>,
        outbound: Outbound,
        config: &SubscriptionConfig,
    ) -> Self {
        let scope = CancellationToken::new();
        let bridge = ExecutionBridge::new(engine, outbound.clone(), config.complete_on_exhaustion);
        Self {
            outbound,
            registry: OperationRegistry::new(bridge, scope.clone()),
            scope,
        }
    }

    #[cfg(test)]
    pub(crate) fn scope(&self) -> CancellationToken {
        self.scope.clone()
    }

    /// Runs the read loop until the peer disconnects or a read fails, then
    /// cancels the live operation and closes the socket.
    pub async fn run<R, E>(mut self, mut inbound: R)
    where
        R: Stream<Item = Result<Message, E>> + Unpin,
        E: fmt::Display,
    {
        tracing::debug!("session started");
        loop {
            let frame = match inbound.next().await {
                Some(Ok(frame)) => frame,
                Some(Err(err)) => {
                    tracing::debug!(error = %err, "read failed");
                    break;
                }
                None => break,
            };

            let envelope = match &frame {
                Message::Text(text) => Envelope::decode(text.as_str().as_bytes()),
                Message::Binary(bytes) => Envelope::decode(bytes),
                Message::Close(_) => break,
                Message::Ping(_) | Message::Pong(_) => continue,
            };
            match envelope {
                Ok(envelope) => self.dispatch(envelope).await,
                Err(err) => tracing::trace!(error = %err, "discarding malformed envelope"),
            }
        }
        self.teardown().await;
    }

    async fn dispatch(&mut self, envelope: Envelope) {
        match envelope.kind {
            MessageType::Start => {
                let request = match envelope.start_request() {
                    Ok(request) => request,
                    Err(err) => {
                        tracing::trace!(error = %err, "discarding start with invalid payload");
                        return;
                    }
                };
                if self.registry.is_running() {
                    tracing::debug!(
                        operation_id = %envelope.operation_id(),
                        "start replaces a running operation"
                    );
                }
                let operation = Operation::new(envelope.operation_id(), request);
                self.registry.start_operation(operation).await;
            }
            MessageType::Stop => {
                // Single live operation per session: the id is not matched.
                if let Some(live) = self.registry.live_operation_id()
                    && live != envelope.operation_id()
                {
                    tracing::trace!(
                        requested = %envelope.operation_id(),
                        live,
                        "stop names another id, stopping the live operation"
                    );
                }
                self.registry.stop_and_wait().await;
            }
            kind => tracing::trace!(?kind, "ignoring envelope"),
        }
    }

    async fn teardown(mut self) {
        self.scope.cancel();
        self.registry.stop_and_wait().await;
        if let Err(err) = self.outbound.close().await {
            tracing::debug!(error = %err, "socket close failed");
        }
        tracing::debug!("session closed");
    }
}
