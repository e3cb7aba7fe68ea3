//! Plain HTTP query endpoint.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::api::request_options;
use crate::app_state::AppState;
use crate::engine::ExecutionResult;
use crate::error::GatewayError;

/// Content type of every query response.
pub const JSON_UTF8: &str = "application/json; charset=utf-8";

/// `GET|POST /graphql` — Execute a query or mutation.
///
/// The result is always returned with `200 OK`; execution errors are
/// reported inside the body. The [`crate::api::hooks::QueryHooks`] in the
/// state supply the root value, rewrite errors and observe the response.
///
/// # Errors
///
/// Returns [`GatewayError::Serialization`] if the result cannot be encoded.
#[utoipa::path(
    method(get, post),
    path = "/graphql",
    tag = "GraphQL",
    summary = "Execute a GraphQL operation",
    description = "Reads the operation from the query string or, for POST, from a JSON, application/graphql or url-encoded body, and returns the engine's result.",
    request_body(content = crate::engine::GraphQLRequest, content_type = "application/json"),
    responses(
        (status = 200, description = "Execution result", body = ExecutionResult),
    )
)]
pub async fn graphql_handler(
    State(state): State<AppState>,
    parts: Parts,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let content_type = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());
    let mut request =
        request_options::parse(&parts.method, parts.uri.query(), content_type, &body);
    state.hooks.attach_root_value(&parts, &mut request);

    let mut result = state.engine.execute(request.clone()).await;
    if result.has_errors() {
        tracing::debug!(errors = result.errors.len(), "query returned errors");
        state.hooks.format_errors(&mut result);
    }

    let body = render(&result, state.pretty)?;
    state.hooks.report(&request, &result, &body);
    Ok(([(header::CONTENT_TYPE, JSON_UTF8)], body).into_response())
}

/// Serializes a result, tab-indented when `pretty` is set.
fn render(result: &ExecutionResult, pretty: bool) -> Result<Vec<u8>, serde_json::Error> {
    if !pretty {
        return serde_json::to_vec(result);
    }
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    result.serialize(&mut serializer)?;
    Ok(buf)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::body::to_bytes;
    use axum::http::{Method, Request};
    use serde_json::{Map, Value, json};

    use super::*;
    use crate::api::hooks::QueryHooks;
    use crate::config::GatewayConfig;
    use crate::engine::{ExecutionEngine, GraphQLError};
    use crate::ws::testing::ScriptedEngine;

    fn state(engine: &Arc<ScriptedEngine>, hooks: QueryHooks) -> AppState {
        let engine: Arc<dyn ExecutionEngine> = Arc::<ScriptedEngine>::clone(engine);
        let config = GatewayConfig {
            pretty: false,
            ..GatewayConfig::default()
        };
        AppState::new(engine, &config).with_hooks(hooks)
    }

    fn get(uri: &str) -> Parts {
        let Ok(request) = Request::builder().method(Method::GET).uri(uri).body(()) else {
            panic!("valid request");
        };
        request.into_parts().0
    }

    async fn run(state: AppState, uri: &str) -> Value {
        let Ok(response) = graphql_handler(State(state), get(uri), Bytes::new()).await else {
            panic!("handler succeeds");
        };
        let Ok(bytes) = to_bytes(response.into_body(), usize::MAX).await else {
            panic!("body readable");
        };
        let Ok(value) = serde_json::from_slice(&bytes) else {
            panic!("body is JSON");
        };
        value
    }

    #[tokio::test]
    async fn root_value_hook_reaches_the_engine() {
        let engine = ScriptedEngine::new();
        let hooks = QueryHooks::new().with_root_value(|parts| {
            let mut root = Map::new();
            root.insert("method".to_string(), json!(parts.method.as_str()));
            root
        });
        run(state(&engine, hooks), "/graphql?query=%7Bme%7D").await;

        let executed = engine.executed();
        let Some(request) = executed.first() else {
            panic!("engine was called");
        };
        assert_eq!(request.query, "{me}");
        assert_eq!(
            request.root_value.as_ref().and_then(|root| root.get("method")),
            Some(&json!("GET"))
        );
    }

    #[tokio::test]
    async fn format_error_hook_rewrites_response_errors() {
        let engine = ScriptedEngine::new();
        let hooks = QueryHooks::new()
            .with_format_error(|err| GraphQLError::new(err.message.to_uppercase()));
        // A blank query makes the scripted engine report an error.
        let body = run(state(&engine, hooks), "/graphql").await;
        assert_eq!(body["errors"][0]["message"], json!("MUST PROVIDE AN OPERATION."));
    }

    #[tokio::test]
    async fn result_callback_sees_the_sent_bytes() {
        let engine = ScriptedEngine::new();
        let seen: Arc<Mutex<Option<(String, Vec<u8>)>>> = Arc::default();
        let hooks = QueryHooks::new().with_result_callback({
            let seen = Arc::clone(&seen);
            move |request, result, body| {
                assert!(!result.has_errors());
                if let Ok(mut seen) = seen.lock() {
                    *seen = Some((request.query.clone(), body.to_vec()));
                }
            }
        });
        let body = run(state(&engine, hooks), "/graphql?query=%7Bping%7D").await;

        let Some((query, bytes)) = seen.lock().ok().and_then(|mut seen| seen.take()) else {
            panic!("callback ran");
        };
        assert_eq!(query, "{ping}");
        assert_eq!(serde_json::from_slice::<Value>(&bytes).ok(), Some(body));
    }

    #[test]
    fn compact_render() {
        let result = ExecutionResult::from_data(json!({ "a": 1 }));
        let Ok(body) = render(&result, false) else {
            panic!("renders");
        };
        assert_eq!(body, br#"{"data":{"a":1}}"#.to_vec());
    }

    #[test]
    fn pretty_render_uses_tabs() {
        let result = ExecutionResult::from_data(json!({ "a": 1 }));
        let Ok(body) = render(&result, true) else {
            panic!("renders");
        };
        assert_eq!(
            String::from_utf8_lossy(&body),
            "{\n\t\"data\": {\n\t\t\"a\": 1\n\t}\n}"
        );
    }
}
