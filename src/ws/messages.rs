//! `graphql-ws` envelope codec.
//!
//! Every frame on a subscription socket is one JSON [`Envelope`]:
//! a `type` discriminator, an optional operation `id` and a type-dependent
//! `payload`. Decoding is pure and never panics; callers treat a decode
//! failure as "ignore the frame".

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::{ExecutionResult, GraphQLRequest};

/// One protocol message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message type discriminator.
    #[serde(rename = "type")]
    pub kind: MessageType,
    /// Operation identifier chosen by the client on `start`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Type-dependent payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

/// Discriminator for envelope types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// Client → Server connection request.
    ConnectionInit,
    /// Server → Client handshake acknowledgement.
    ConnectionAck,
    /// Client → Server subscription request.
    Start,
    /// Client → Server cancellation of the live operation.
    Stop,
    /// Server → Client result of a live operation.
    Data,
    /// Server → Client operation failure. Reserved.
    Error,
    /// Server → Client end of a finished operation.
    Complete,
    /// Any type this server does not recognize.
    #[serde(other)]
    Unknown,
}

impl Envelope {
    fn new(kind: MessageType, id: Option<String>, payload: Option<Value>) -> Self {
        Self { kind, id, payload }
    }

    /// Decodes a frame.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if `bytes` is not a valid envelope.
    pub fn decode(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Encodes the envelope as JSON text.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if the payload cannot be serialized.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Handshake acknowledgement, sent once right after the upgrade.
    #[must_use]
    pub fn connection_ack() -> Self {
        Self::new(MessageType::ConnectionAck, None, None)
    }

    /// `start` envelope for `request` under `id`.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if the request cannot be serialized.
    pub fn start(id: impl Into<String>, request: &GraphQLRequest) -> Result<Self, serde_json::Error> {
        let payload = serde_json::to_value(request)?;
        Ok(Self::new(MessageType::Start, Some(id.into()), Some(payload)))
    }

    /// `stop` envelope for `id`.
    #[must_use]
    pub fn stop(id: impl Into<String>) -> Self {
        Self::new(MessageType::Stop, Some(id.into()), None)
    }

    /// `data` envelope carrying one engine result.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if the result cannot be serialized.
    pub fn data(id: impl Into<String>, result: &ExecutionResult) -> Result<Self, serde_json::Error> {
        let payload = serde_json::to_value(result)?;
        Ok(Self::new(MessageType::Data, Some(id.into()), Some(payload)))
    }

    /// `complete` envelope marking the end of an operation.
    #[must_use]
    pub fn complete(id: impl Into<String>) -> Self {
        Self::new(MessageType::Complete, Some(id.into()), None)
    }

    /// Operation id, or the empty string when the peer omitted it.
    #[must_use]
    pub fn operation_id(&self) -> &str {
        self.id.as_deref().unwrap_or_default()
    }

    /// Interprets the payload of a `start` envelope.
    ///
    /// A missing payload yields an empty request, which the engine rejects
    /// through its own result.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if the payload is present but is not a
    /// request object.
    pub fn start_request(&self) -> Result<GraphQLRequest, serde_json::Error> {
        match &self.payload {
            Some(payload) => GraphQLRequest::deserialize(payload),
            None => Ok(GraphQLRequest::default()),
        }
    }
}
