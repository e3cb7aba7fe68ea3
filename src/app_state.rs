//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::api::hooks::QueryHooks;
use crate::config::GatewayConfig;
use crate::engine::ExecutionEngine;
use crate::ws::SessionAcceptor;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Engine executing HTTP queries.
    pub engine: Arc<dyn ExecutionEngine>,
    /// Acceptor for subscription upgrades.
    pub acceptor: SessionAcceptor,
    /// Tab-indent JSON responses.
    pub pretty: bool,
    /// Callbacks around HTTP query execution.
    pub hooks: QueryHooks,
}

impl AppState {
    /// Builds the state for `engine` from gateway settings.
    #[must_use]
    pub fn new(engine: Arc<dyn ExecutionEngine>, config: &GatewayConfig) -> Self {
        Self {
            acceptor: SessionAcceptor::new(Arc::clone(&engine), config.subscription.clone()),
            engine,
            pretty: config.pretty,
            hooks: QueryHooks::default(),
        }
    }

    /// Replaces the HTTP query hooks.
    #[must_use]
    pub fn with_hooks(self, hooks: QueryHooks) -> Self {
        Self { hooks, ..self }
    }
}
