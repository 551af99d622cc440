//! Per-request contextual logging.
//!
//! Each request gets a `tracing` span carrying its id, method and url plus
//! a JSON context that is attached to every event the handler logs through
//! [`RequestLogger`]. Sensitive keys are redacted before the context is
//! stored anywhere.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::Span;

use crate::dispatch::context::IncomingRequest;

/// Keys whose values never reach the logs.
pub const SENSITIVE_KEYS: &[&str] = &[
    "authorization",
    "proxy-authorization",
    "cookie",
    "set-cookie",
    "x-api-key",
    "api_key",
    "apikey",
    "password",
    "secret",
    "token",
];

const REDACTED: &str = "[REDACTED]";

/// Hook that may add fields to a request's log context.
pub type LogContextHook = Arc<dyn Fn(&IncomingRequest, &mut Map<String, Value>) + Send + Sync>;

/// Logger bound to one request.
#[derive(Debug, Clone)]
pub struct RequestLogger {
    id: String,
    span: Span,
    context: Map<String, Value>,
}

impl RequestLogger {
    /// Create a logger; the context is sanitized first.
    pub fn new(id: &str, context: Map<String, Value>) -> Self {
        let context = sanitize(context);
        let method = context.get("method").and_then(Value::as_str).unwrap_or("-");
        let url = context.get("url").and_then(Value::as_str).unwrap_or("-");
        let span = tracing::info_span!("request", request_id = %id, method = %method, url = %url);

        Self {
            id: id.to_string(),
            span,
            context,
        }
    }

    /// Build the logger for an incoming request, running the optional hook.
    pub fn for_request(request: &IncomingRequest, hook: Option<&LogContextHook>) -> Self {
        let mut context = Map::new();
        context.insert("method".into(), Value::String(request.method.to_string()));
        context.insert(
            "url".into(),
            Value::String(
                request
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str().to_string())
                    .unwrap_or_else(|| request.uri.path().to_string()),
            ),
        );
        if let Some(hook) = hook {
            hook(request, &mut context);
        }
        Self::new(&request.request_id, context)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn context(&self) -> &Map<String, Value> {
        &self.context
    }

    /// The logger as it appears under `response.locals.logger`.
    pub fn to_value(&self) -> Value {
        let mut value = self.context.clone();
        value.insert("id".into(), Value::String(self.id.clone()));
        Value::Object(value)
    }

    fn context_json(&self) -> String {
        Value::Object(self.context.clone()).to_string()
    }

    pub fn debug(&self, message: &str) {
        let _guard = self.span.enter();
        tracing::debug!(context = %self.context_json(), "{}", message);
    }

    pub fn info(&self, message: &str) {
        let _guard = self.span.enter();
        tracing::info!(context = %self.context_json(), "{}", message);
    }

    pub fn warn(&self, message: &str) {
        let _guard = self.span.enter();
        tracing::warn!(context = %self.context_json(), "{}", message);
    }

    pub fn error(&self, message: &str) {
        let _guard = self.span.enter();
        tracing::error!(context = %self.context_json(), "{}", message);
    }
}

/// Redact sensitive keys, recursively.
pub fn sanitize(context: Map<String, Value>) -> Map<String, Value> {
    context
        .into_iter()
        .map(|(key, value)| {
            if is_sensitive(&key) {
                (key, Value::String(REDACTED.to_string()))
            } else {
                (key, sanitize_value(value))
            }
        })
        .collect()
}

fn sanitize_value(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(sanitize(map)),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize_value).collect()),
        other => other,
    }
}

fn is_sensitive(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    SENSITIVE_KEYS.contains(&lower.as_str())
}
