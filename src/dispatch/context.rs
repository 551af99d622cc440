//! Per-request context.
//!
//! # Responsibilities
//! - Hold the request as one addressable JSON namespace
//! - Hold response state (status, extra headers, locals)
//! - Resolve [`SourcePath`]s for parameter lookup
//!
//! # Design Decisions
//! - JSON values throughout so any source path can address any part
//! - Created at request start, dropped once the response is built
//! - Header names are lower-cased; repeated headers are joined with ", "

use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use serde_json::{Map, Value};

use crate::dispatch::logger::RequestLogger;
use crate::registry::requirement::{Namespace, SourcePath};
use crate::routing::table::PathParams;

/// Request data handed to the dispatcher by the HTTP entry point.
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    /// Parsed `Cookie` header, when cookie parsing is enabled.
    pub cookies: Option<Map<String, Value>>,
    /// Parsed body, when body parsing is enabled.
    pub body: Option<Value>,
    pub request_id: String,
}

impl IncomingRequest {
    /// A bare request with no headers, cookies or body.
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            cookies: None,
            body: None,
            request_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_cookies(mut self, cookies: Map<String, Value>) -> Self {
        self.cookies = Some(cookies);
        self
    }
}

/// Unified view over request data and response state.
#[derive(Debug)]
pub struct RequestContext {
    request: Value,
    response: Value,
    status: StatusCode,
    headers: HeaderMap,
    logger: RequestLogger,
}

impl RequestContext {
    pub fn new(incoming: IncomingRequest, params: PathParams, logger: RequestLogger) -> Self {
        let mut request = Map::new();
        request.insert("method".into(), Value::String(incoming.method.to_string()));
        request.insert("path".into(), Value::String(incoming.uri.path().to_string()));
        request.insert(
            "url".into(),
            Value::String(
                incoming
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str().to_string())
                    .unwrap_or_else(|| incoming.uri.path().to_string()),
            ),
        );
        request.insert(
            "params".into(),
            Value::Object(
                params
                    .into_iter()
                    .map(|(k, v)| (k, Value::String(v)))
                    .collect(),
            ),
        );
        request.insert(
            "query".into(),
            Value::Object(parse_urlencoded(incoming.uri.query().unwrap_or(""))),
        );
        request.insert("headers".into(), Value::Object(headers_to_map(&incoming.headers)));
        if let Some(cookies) = incoming.cookies {
            request.insert("cookies".into(), Value::Object(cookies));
        }
        if let Some(body) = incoming.body {
            request.insert("body".into(), body);
        }

        let mut locals = Map::new();
        locals.insert("logger".into(), logger.to_value());
        let mut response = Map::new();
        response.insert("locals".into(), Value::Object(locals));

        Self {
            request: Value::Object(request),
            response: Value::Object(response),
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            logger,
        }
    }

    /// Look up the value at `path`; `None` when any segment is absent.
    pub fn lookup(&self, path: &SourcePath) -> Option<&Value> {
        let root = match path.namespace() {
            Namespace::Request => &self.request,
            Namespace::Response => &self.response,
        };

        path.segments().iter().try_fold(root, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }

    /// The whole request namespace.
    pub fn request(&self) -> &Value {
        &self.request
    }

    pub fn method(&self) -> &str {
        self.request["method"].as_str().unwrap_or_default()
    }

    pub fn path(&self) -> &str {
        self.request["path"].as_str().unwrap_or_default()
    }

    /// A request header by (case-insensitive) name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.request["headers"]
            .get(name.to_ascii_lowercase())
            .and_then(Value::as_str)
    }

    pub fn local(&self, key: &str) -> Option<&Value> {
        self.response["locals"].get(key)
    }

    /// Store per-request scratch data under `response.locals.<key>`.
    pub fn set_local(&mut self, key: impl Into<String>, value: Value) {
        if let Some(locals) = self.response["locals"].as_object_mut() {
            locals.insert(key.into(), value);
        }
    }

    /// Mutable access to `response.locals.<key>`, creating an empty object.
    pub fn local_object_mut(&mut self, key: &str) -> Option<&mut Map<String, Value>> {
        let locals = self.response["locals"].as_object_mut()?;
        let entry = locals
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        entry.as_object_mut()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Extra headers added to the success response.
    pub fn response_headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn insert_response_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    pub fn logger(&self) -> &RequestLogger {
        &self.logger
    }
}

/// Parse an urlencoded string into an object; repeated keys become arrays.
pub fn parse_urlencoded(input: &str) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, value) in url::form_urlencoded::parse(input.as_bytes()) {
        let value = Value::String(value.into_owned());
        match out.get_mut(key.as_ref()) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                out.insert(key.into_owned(), value);
            }
        }
    }
    out
}

fn headers_to_map(headers: &HeaderMap) -> Map<String, Value> {
    let mut out = Map::new();
    for name in headers.keys() {
        let joined = headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect::<Vec<_>>()
            .join(", ");
        out.insert(name.as_str().to_string(), Value::String(joined));
    }
    out
}
