//! Response shaping and the uniform error responder.

use std::sync::Arc;

use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};

use crate::dispatch::error::ApiError;
use crate::dispatch::logger::RequestLogger;

/// Custom formatter replacing the default envelope for a handler.
pub type ResponseFormatter = Arc<dyn Fn(Value, StatusCode) -> Value + Send + Sync>;

/// Wrap a value in the default envelope.
///
/// Statuses up to 299 succeed; anything else fails with the status echoed
/// in `with` and the value in `because`.
pub fn envelope(value: Value, status: StatusCode) -> Value {
    if status.as_u16() <= 299 {
        json!({ "this": "succeeded", "with": value })
    } else {
        json!({ "this": "failed", "with": status.as_u16(), "because": value })
    }
}

/// Build the success response for a handler result.
pub fn render(
    value: Value,
    status: StatusCode,
    formatter: Option<&ResponseFormatter>,
    content_type: Option<&str>,
    extra_headers: &HeaderMap,
) -> Response {
    let body = match formatter {
        Some(format) => format(value, status),
        None => envelope(value, status),
    };

    let mut response = match (content_type, body) {
        // Non-JSON content types get string bodies verbatim
        (Some(ct), Value::String(text)) if !ct.contains("json") => {
            (status, [(header::CONTENT_TYPE, ct.to_string())], text).into_response()
        }
        (Some(ct), body) => {
            (status, [(header::CONTENT_TYPE, ct.to_string())], body.to_string()).into_response()
        }
        (None, body) => (status, axum::Json(body)).into_response(),
    };

    for (name, value) in extra_headers {
        response.headers_mut().insert(name.clone(), value.clone());
    }
    response
}

/// Send the failure envelope for `err`, logging the raw error first.
///
/// Only the friendly message reaches the client.
pub fn error_response(err: &ApiError, logger: Option<&RequestLogger>) -> Response {
    let status = err.status();
    let message = err.friendly_message();

    match logger {
        Some(logger) => {
            let _guard = logger.span().enter();
            tracing::error!(status = status.as_u16(), error = %err, details = ?err, "Request failed");
        }
        None => tracing::error!(status = status.as_u16(), error = %err, details = ?err, "Request failed"),
    }

    let mut response = (status, axum::Json(envelope(Value::String(message), status))).into_response();
    if status == StatusCode::UNAUTHORIZED {
        response
            .headers_mut()
            .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("ApiKey"));
    }
    response
}
