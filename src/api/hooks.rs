//! Optional callbacks around HTTP query execution.
//!
//! Each hook is set at most once; a later `with_*` call replaces the
//! earlier callback.

use std::fmt;
use std::sync::Arc;

use axum::http::request::Parts;
use serde_json::{Map, Value};

use crate::engine::{ExecutionResult, GraphQLError, GraphQLRequest};

/// Builds the root value for one request from its HTTP head.
pub type RootValueFn = Arc<dyn Fn(&Parts) -> Map<String, Value> + Send + Sync + 'static>;

/// Rewrites one engine error before the response is serialized.
pub type FormatErrorFn = Arc<dyn Fn(GraphQLError) -> GraphQLError + Send + Sync + 'static>;

/// Observes a finished request with its result and the exact response bytes.
pub type ResultCallbackFn =
    Arc<dyn Fn(&GraphQLRequest, &ExecutionResult, &[u8]) + Send + Sync + 'static>;

/// Callbacks applied by [`crate::api::handlers::query::graphql_handler`].
#[derive(Clone, Default)]
pub struct QueryHooks {
    root_value: Option<RootValueFn>,
    format_error: Option<FormatErrorFn>,
    on_result: Option<ResultCallbackFn>,
}

impl fmt::Debug for QueryHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryHooks")
            .field("root_value", &self.root_value.is_some())
            .field("format_error", &self.format_error.is_some())
            .field("on_result", &self.on_result.is_some())
            .finish()
    }
}

impl QueryHooks {
    /// Creates an empty hook set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Supplies a per-request root value to the engine.
    #[must_use]
    pub fn with_root_value(
        self,
        callback: impl Fn(&Parts) -> Map<String, Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            root_value: Some(Arc::new(callback)),
            ..self
        }
    }

    /// Rewrites every error of a result before it is sent.
    #[must_use]
    pub fn with_format_error(
        self,
        callback: impl Fn(GraphQLError) -> GraphQLError + Send + Sync + 'static,
    ) -> Self {
        Self {
            format_error: Some(Arc::new(callback)),
            ..self
        }
    }

    /// Runs `callback` after each response body is rendered.
    #[must_use]
    pub fn with_result_callback(
        self,
        callback: impl Fn(&GraphQLRequest, &ExecutionResult, &[u8]) + Send + Sync + 'static,
    ) -> Self {
        Self {
            on_result: Some(Arc::new(callback)),
            ..self
        }
    }

    pub(crate) fn attach_root_value(&self, parts: &Parts, request: &mut GraphQLRequest) {
        if let Some(root_value) = &self.root_value {
            request.root_value = Some(root_value(parts));
        }
    }

    pub(crate) fn format_errors(&self, result: &mut ExecutionResult) {
        let Some(format) = &self.format_error else {
            return;
        };
        result.errors = std::mem::take(&mut result.errors)
            .into_iter()
            .map(|err| format(err))
            .collect();
    }

    pub(crate) fn report(&self, request: &GraphQLRequest, result: &ExecutionResult, body: &[u8]) {
        if let Some(on_result) = &self.on_result {
            on_result(request, result, body);
        }
    }
}
