//! Serialized write half of a subscription socket.
//!
//! The handshake and every execution bridge write through the same
//! [`Outbound`]. A single async mutex serializes them, so frames from two
//! writers never interleave mid-send.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message;
use futures_util::{Sink, SinkExt};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use super::messages::Envelope;
use crate::error::TransportError;

/// Upper bound on the close handshake of a stalled socket.
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

type BoxSink = Pin<Box<dyn Sink<Message, Error = TransportError> + Send>>;

struct WriteState {
    sink: BoxSink,
    /// Set once `close` ran.
    closed: bool,
    /// Set after a write failed; the sink is not written to again.
    broken: bool,
}

/// Shared, lock-protected writer for one socket.
#[derive(Clone)]
pub struct Outbound {
    state: Arc<Mutex<WriteState>>,
}

impl fmt::Debug for Outbound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Outbound").finish_non_exhaustive()
    }
}

impl Outbound {
    /// Wraps the write half of a socket.
    pub fn new<S>(sink: S) -> Self
    where
        S: Sink<Message> + Send + 'static,
        S::Error: fmt::Display,
    {
        let sink = sink.sink_map_err(|err| TransportError::Socket(err.to_string()));
        Self {
            state: Arc::new(Mutex::new(WriteState {
                sink: Box::pin(sink),
                closed: false,
                broken: false,
            })),
        }
    }

    /// Writes one envelope.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Closed`] if the socket is already closed,
    /// or the encoding/socket error for this write. A failed socket write
    /// marks the socket closed for every later caller.
    pub async fn send(&self, envelope: &Envelope) -> Result<(), TransportError> {
        let text = envelope.encode()?;
        let mut state = self.state.lock().await;
        Self::write(&mut state, text).await
    }

    /// Writes one envelope unless `scope` has been cancelled.
    ///
    /// Waiting for the lock and the write itself both race the scope: a
    /// write stuck on a slow peer is abandoned as soon as the scope fires,
    /// releasing the lock. Cancellation is also checked once the lock is
    /// held, so after a writer observes its scope cancelled no frame of its
    /// own follows.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Cancelled`] if `scope` fired, otherwise the
    /// same errors as [`Outbound::send`].
    pub async fn send_within(
        &self,
        scope: &CancellationToken,
        envelope: &Envelope,
    ) -> Result<(), TransportError> {
        let text = envelope.encode()?;
        let write = async {
            let mut state = self.state.lock().await;
            if scope.is_cancelled() {
                return Err(TransportError::Cancelled);
            }
            Self::write(&mut state, text).await
        };
        tokio::select! {
            biased;
            () = scope.cancelled() => Err(TransportError::Cancelled),
            result = write => result,
        }
    }

    /// Closes the socket exactly once; repeated calls are no-ops and later
    /// writes fail with [`TransportError::Closed`].
    ///
    /// The close handshake is given [`CLOSE_TIMEOUT`] to complete.
    ///
    /// # Errors
    ///
    /// Returns the socket error if the close handshake could not be sent,
    /// or [`TransportError::Socket`] if it did not finish in time.
    pub async fn close(&self) -> Result<(), TransportError> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Ok(());
        }
        state.closed = true;
        tokio::time::timeout(CLOSE_TIMEOUT, state.sink.close())
            .await
            .unwrap_or_else(|_| Err(TransportError::Socket("close timed out".to_string())))
    }

    async fn write(state: &mut WriteState, text: String) -> Result<(), TransportError> {
        if state.closed || state.broken {
            return Err(TransportError::Closed);
        }
        let result = state.sink.send(Message::text(text)).await;
        if result.is_err() {
            state.broken = true;
        }
        result
    }
}
