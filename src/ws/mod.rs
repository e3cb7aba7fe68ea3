//! WebSocket layer: the `graphql-ws` subscription transport.
//!
//! ```text
//! SessionAcceptor (handler)      upgrade, connection_ack, spawn
//!     └── Session (connection)   single read loop per socket
//!           └── OperationRegistry (subscription)   at most one live operation
//!                 └── ExecutionBridge (bridge)     one task per operation
//! ```
//!
//! Every write goes through [`Outbound`], which serializes the handshake and
//! bridge writers on one lock.

pub mod bridge;
pub mod connection;
pub mod handler;
pub mod messages;
pub mod outbound;
pub mod subscription;

#[cfg(test)]
pub(crate) mod testing;

pub use bridge::{ExecutionBridge, Operation};
pub use connection::Session;
pub use handler::SessionAcceptor;
pub use messages::{Envelope, MessageType};
pub use outbound::Outbound;
pub use subscription::OperationRegistry;
