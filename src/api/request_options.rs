//! Extracts a [`GraphQLRequest`] from a plain HTTP request.
//!
//! Lookup order:
//!
//! 1. A non-empty `query` in the URL query string wins, for any method.
//! 2. Non-`POST` requests without one yield an empty request.
//! 3. `POST` bodies are read according to `Content-Type`.
//!
//! Parsing never fails. Anything unreadable becomes an empty request and
//! the engine reports the missing operation in its result.

use axum::http::Method;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::engine::GraphQLRequest;

/// `application/json`
pub const CONTENT_TYPE_JSON: &str = "application/json";
/// `application/graphql`
pub const CONTENT_TYPE_GRAPHQL: &str = "application/graphql";
/// `application/x-www-form-urlencoded`
pub const CONTENT_TYPE_FORM_URL_ENCODED: &str = "application/x-www-form-urlencoded";
/// `multipart/form-data`
pub const CONTENT_TYPE_MULTIPART_FORM_DATA: &str = "multipart/form-data";

/// Form fields shared by query strings and url-encoded bodies.
#[derive(Debug, Deserialize)]
struct FormFields {
    query: Option<String>,
    variables: Option<String>,
    #[serde(rename = "operationName")]
    operation_name: Option<String>,
}

/// JSON body whose `variables` was sent as an encoded string.
#[derive(Debug, Deserialize)]
struct StringVariablesBody {
    #[serde(default)]
    query: String,
    #[serde(default)]
    variables: Option<String>,
    #[serde(default, rename = "operationName")]
    operation_name: Option<String>,
}

/// Builds request options from the parts of an HTTP request.
#[must_use]
pub fn parse(
    method: &Method,
    query_string: Option<&str>,
    content_type: Option<&str>,
    body: &[u8],
) -> GraphQLRequest {
    if let Some(request) = query_string.and_then(from_form) {
        return request;
    }
    if method != Method::POST {
        return GraphQLRequest::default();
    }

    let media_type = content_type
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_ascii_lowercase())
        .unwrap_or_default();

    match media_type.as_str() {
        CONTENT_TYPE_GRAPHQL => GraphQLRequest::new(String::from_utf8_lossy(body)),
        CONTENT_TYPE_FORM_URL_ENCODED => std::str::from_utf8(body)
            .ok()
            .and_then(from_form)
            .unwrap_or_default(),
        CONTENT_TYPE_MULTIPART_FORM_DATA => {
            tracing::debug!("multipart requests are not supported");
            GraphQLRequest::default()
        }
        _ => from_json(body),
    }
}

/// Reads url-encoded fields; `None` unless a non-empty `query` is present.
fn from_form(encoded: &str) -> Option<GraphQLRequest> {
    let fields: FormFields = serde_urlencoded::from_str(encoded).ok()?;
    let query = fields.query.filter(|q| !q.is_empty())?;
    Some(GraphQLRequest {
        query,
        variables: fields.variables.as_deref().and_then(decode_variables),
        operation_name: fields.operation_name.filter(|name| !name.is_empty()),
        root_value: None,
    })
}

/// Reads a JSON body, accepting `variables` either as an object or as a
/// string holding one.
fn from_json(body: &[u8]) -> GraphQLRequest {
    if let Ok(request) = serde_json::from_slice::<GraphQLRequest>(body) {
        return request;
    }
    match serde_json::from_slice::<StringVariablesBody>(body) {
        Ok(compat) => GraphQLRequest {
            query: compat.query,
            variables: compat.variables.as_deref().and_then(decode_variables),
            operation_name: compat.operation_name,
            root_value: None,
        },
        Err(err) => {
            tracing::debug!(error = %err, "unreadable JSON request body");
            GraphQLRequest::default()
        }
    }
}

fn decode_variables(raw: &str) -> Option<Map<String, Value>> {
    serde_json::from_str(raw).ok()
}
