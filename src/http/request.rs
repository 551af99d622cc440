//! Request adaptation.
//!
//! # Responsibilities
//! - Carry the request id (set by `SetRequestIdLayer`) into dispatch
//! - Enforce the body size limit
//! - Parse cookies and bodies when standard parsing is enabled
//!
//! # Design Decisions
//! - Query strings are always parsed later, by the request context
//! - With standard parsing, an empty body becomes `{}` so `body.<name>`
//!   sources simply miss instead of failing
//! - Malformed JSON is a 400 before any handler runs

use axum::body::Body;
use axum::http::{header, HeaderMap, Request, StatusCode};
use serde_json::{Map, Value};

use crate::dispatch::context::{parse_urlencoded, IncomingRequest};
use crate::dispatch::error::ApiError;

/// Request ID header name.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Request ID taken from the header, or a fresh UUID.
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

/// Convert an axum request into an [`IncomingRequest`].
pub async fn adapt_request(
    request: Request<Body>,
    standard_parsing: bool,
    max_body_size: usize,
) -> Result<IncomingRequest, ApiError> {
    let (parts, body) = request.into_parts();

    let bytes = axum::body::to_bytes(body, max_body_size).await.map_err(|e| {
        ApiError::with_source("Request body too large", StatusCode::PAYLOAD_TOO_LARGE, e)
    })?;

    let (cookies, body) = if standard_parsing {
        let cookies = parse_cookies(&parts.headers);
        let content_type = parts
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        (Some(cookies), Some(parse_body(content_type, &bytes)?))
    } else {
        (None, None)
    };

    Ok(IncomingRequest {
        request_id: request_id(&parts.headers),
        method: parts.method,
        uri: parts.uri,
        headers: parts.headers,
        cookies,
        body,
    })
}

/// Parse every `Cookie` header into one object; later values win.
pub fn parse_cookies(headers: &HeaderMap) -> Map<String, Value> {
    let mut cookies = Map::new();
    for value in headers.get_all(header::COOKIE) {
        let Ok(value) = value.to_str() else { continue };
        for pair in value.split(';') {
            let Some((name, raw)) = pair.split_once('=') else { continue };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let raw = raw.trim().trim_matches('"');
            let decoded = urlencoding::decode(raw)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| raw.to_string());
            cookies.insert(name.to_string(), Value::String(decoded));
        }
    }
    cookies
}

/// Parse a body according to its content type.
pub fn parse_body(content_type: &str, bytes: &[u8]) -> Result<Value, ApiError> {
    if bytes.is_empty() {
        return Ok(Value::Object(Map::new()));
    }

    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    if mime == "application/json" || mime.ends_with("+json") {
        return serde_json::from_slice(bytes).map_err(|e| {
            ApiError::with_source("Invalid JSON body", StatusCode::BAD_REQUEST, e)
        });
    }

    if mime == "application/x-www-form-urlencoded" {
        let text = String::from_utf8_lossy(bytes);
        return Ok(Value::Object(parse_urlencoded(&text)));
    }

    if mime.starts_with("text/") {
        return Ok(Value::String(String::from_utf8_lossy(bytes).into_owned()));
    }

    // Unknown content types are left for handlers that read headers
    Ok(Value::Object(Map::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Method};
    use serde_json::json;

    #[test]
    fn test_parse_body_by_content_type() {
        assert_eq!(parse_body("application/json", br#"{"a":1}"#).unwrap(), json!({"a": 1}));
        assert_eq!(
            parse_body("application/json; charset=utf-8", b"[1,2]").unwrap(),
            json!([1, 2])
        );
        assert_eq!(
            parse_body("application/x-www-form-urlencoded", b"a=1&b=two+words").unwrap(),
            json!({"a": "1", "b": "two words"})
        );
        assert_eq!(parse_body("text/plain", b"hi").unwrap(), json!("hi"));
        assert_eq!(parse_body("application/json", b"").unwrap(), json!({}));
        assert_eq!(parse_body("application/octet-stream", b"\x00\x01").unwrap(), json!({}));
    }

    #[test]
    fn test_invalid_json_is_bad_request() {
        let err = parse_body("application/json", b"{nope").unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.friendly_message(), "Invalid JSON body");
    }

    #[test]
    fn test_parse_cookies() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("session=abc; theme=\"dark\""));
        headers.append(header::COOKIE, HeaderValue::from_static("name=j%20doe; broken"));

        let cookies = Value::Object(parse_cookies(&headers));
        assert_eq!(cookies, json!({"session": "abc", "theme": "dark", "name": "j doe"}));
    }

    #[test]
    fn test_request_id_header_is_kept() {
        let mut headers = HeaderMap::new();
        headers.insert(X_REQUEST_ID, HeaderValue::from_static("req-1"));
        assert_eq!(request_id(&headers), "req-1");
        assert_eq!(request_id(&HeaderMap::new()).len(), 36);
    }

    #[tokio::test]
    async fn test_adapt_request() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/users?x=1")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::COOKIE, "a=b")
            .body(Body::from(r#"{"name":"ada"}"#))
            .unwrap();

        let incoming = adapt_request(request, true, 1024).await.unwrap();
        assert_eq!(incoming.method, Method::POST);
        assert_eq!(incoming.body, Some(json!({"name": "ada"})));
        assert_eq!(incoming.cookies.unwrap()["a"], "b");
    }

    #[tokio::test]
    async fn test_adapt_request_without_standard_parsing() {
        let request = Request::builder()
            .uri("/")
            .body(Body::from("{}"))
            .unwrap();
        let incoming = adapt_request(request, false, 1024).await.unwrap();
        assert!(incoming.body.is_none());
        assert!(incoming.cookies.is_none());
    }

    #[tokio::test]
    async fn test_body_limit() {
        let request = Request::builder()
            .uri("/")
            .body(Body::from(vec![b'a'; 64]))
            .unwrap();
        let err = adapt_request(request, true, 16).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
