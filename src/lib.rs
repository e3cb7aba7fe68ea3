//! # graphql-ws-gateway
//!
//! GraphQL gateway exposing a pluggable execution engine over two
//! transports: plain HTTP queries and `graphql-ws` subscriptions on an
//! upgraded WebSocket.
//!
//! The crate never parses or resolves GraphQL. Everything is delegated to an
//! [`engine::ExecutionEngine`]; this service is the protocol layer.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── Query Handler (api/)         request options → execute
//!     ├── SessionAcceptor (ws/)        upgrade → connection_ack
//!     │     └── Session                read loop, start/stop routing
//!     │           └── OperationRegistry → ExecutionBridge
//!     │
//!     └── ExecutionEngine (engine/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod engine;
pub mod error;
pub mod ws;
