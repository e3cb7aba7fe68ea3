//! Subscription acceptor and the Axum upgrade handler.

use std::fmt;
use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocketUpgrade};
use axum::response::Response;
use futures_util::{Sink, Stream, StreamExt};
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

use super::connection::Session;
use super::messages::Envelope;
use super::outbound::Outbound;
use crate::app_state::AppState;
use crate::config::SubscriptionConfig;
use crate::engine::ExecutionEngine;
use crate::error::{GatewayError, TransportError};

/// Accepts upgraded sockets and launches a [`Session`] for each.
#[derive(Debug, Clone)]
pub struct SessionAcceptor {
    engine: Arc<dyn ExecutionEngine>,
    config: SubscriptionConfig,
}

impl SessionAcceptor {
    /// Creates an acceptor with explicit upgrade settings.
    #[must_use]
    pub fn new(engine: Arc<dyn ExecutionEngine>, config: SubscriptionConfig) -> Self {
        Self { engine, config }
    }

    /// Completes an HTTP upgrade and hands the socket to [`Self::accept`].
    ///
    /// Returns the `101 Switching Protocols` response immediately; the
    /// session runs on its own task.
    pub fn upgrade(&self, ws: WebSocketUpgrade) -> Response {
        let acceptor = self.clone();
        ws.protocols([self.config.subprotocol.clone()])
            .read_buffer_size(self.config.read_buffer_size)
            .write_buffer_size(self.config.write_buffer_size)
            .max_message_size(self.config.max_message_size)
            .on_failed_upgrade(|err| tracing::warn!(error = %err, "websocket upgrade failed"))
            .on_upgrade(move |socket| async move {
                let (sink, stream) = socket.split();
                if let Err(err) = acceptor.accept(sink, stream).await {
                    tracing::warn!(error = %err, "subscription handshake failed");
                }
            })
    }

    /// Sends `connection_ack` and spawns the session read loop.
    ///
    /// The returned handle resolves when the session ends; dropping it
    /// detaches the session.
    ///
    /// # Errors
    ///
    /// Returns the write error if the acknowledgement could not be sent. No
    /// session is started in that case.
    pub async fn accept<S, R, E>(&self, sink: S, inbound: R) -> Result<JoinHandle<()>, TransportError>
    where
        S: Sink<Message> + Send + 'static,
        S::Error: fmt::Display,
        R: Stream<Item = Result<Message, E>> + Unpin + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let connection_id = Uuid::new_v4();
        let outbound = Outbound::new(sink);
        outbound.send(&Envelope::connection_ack()).await?;

        let session = Session::new(Arc::clone(&self.engine), outbound, &self.config);
        let span = tracing::info_span!("ws.session", %connection_id);
        tracing::info!(parent: &span, "subscription session accepted");
        Ok(tokio::spawn(session.run(inbound).instrument(span)))
    }
}

/// `GET /subscriptions` — Upgrade to a `graphql-ws` subscription socket.
///
/// # Errors
///
/// Returns [`GatewayError::UpgradeFailed`] (500) if the request cannot be
/// upgraded.
pub async fn subscription_handler(
    State(state): State<AppState>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, GatewayError> {
    let ws = ws.map_err(|rejection| GatewayError::UpgradeFailed(rejection.body_text()))?;
    Ok(state.acceptor.upgrade(ws))
}
