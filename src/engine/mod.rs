//! Execution engine capability consumed by the HTTP and WebSocket layers.
//!
//! The gateway does not parse, validate or resolve GraphQL itself. Both
//! transports hand a [`GraphQLRequest`] to an [`ExecutionEngine`] and relay
//! whatever [`ExecutionResult`]s it produces.

pub mod request;
pub mod ticker;

use std::fmt;

use futures_util::future::BoxFuture;
use futures_util::stream::BoxStream;
use tokio_util::sync::CancellationToken;

pub use request::{ExecutionResult, GraphQLError, GraphQLRequest};
pub use ticker::TickerEngine;

/// An engine able to execute queries and open subscriptions.
///
/// Implementations are shared across every connection behind an `Arc`, so
/// they must be cheap to call concurrently.
pub trait ExecutionEngine: fmt::Debug + Send + Sync + 'static {
    /// Executes a query or mutation and resolves to a single result.
    fn execute(&self, request: GraphQLRequest) -> BoxFuture<'static, ExecutionResult>;

    /// Opens a subscription.
    ///
    /// The returned stream is lazy, ordered and not restartable. Once
    /// `cancel` fires the engine must stop producing within a bounded time;
    /// dropping the stream has the same effect.
    fn subscribe(
        &self,
        request: GraphQLRequest,
        cancel: CancellationToken,
    ) -> BoxStream<'static, ExecutionResult>;
}
