//! API key authentication.
//!
//! # Responsibilities
//! - Check a request header against a list of root keys
//! - Optionally accept short-lived temporary keys derived from a root key
//! - Record the accepted key under `response.locals.auth.apiKey`
//!
//! # Temporary keys
//! `tmp_<hex(sha256(root_key + expiry))>:<expiry>`, where `expiry` is a
//! unix timestamp in seconds. Valid while `expiry` is in the future.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures_util::future::BoxFuture;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::dispatch::context::RequestContext;
use crate::dispatch::error::ApiError;
use crate::dispatch::middleware::{Flow, Middleware};

/// Header consulted when none is configured.
pub const DEFAULT_API_KEY_HEADER: &str = "X-API-KEY";

/// Prefix marking a temporary key.
pub const TEMP_KEY_PREFIX: &str = "tmp_";

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

fn sha256_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// Derive a temporary key from `root_key` valid for `ttl`.
pub fn generate_temporary_key(root_key: &str, ttl: Duration) -> String {
    temporary_key_at(root_key, now_secs() + ttl.as_secs())
}

fn temporary_key_at(root_key: &str, expiry: u64) -> String {
    format!(
        "{}{}:{}",
        TEMP_KEY_PREFIX,
        sha256_hex(&format!("{}{}", root_key, expiry)),
        expiry
    )
}

/// Check a temporary key against one root key.
pub fn is_valid_temporary_key(temp_key: &str, root_key: &str) -> bool {
    is_valid_temporary_key_at(temp_key, root_key, now_secs())
}

fn is_valid_temporary_key_at(temp_key: &str, root_key: &str, now: u64) -> bool {
    let Some(rest) = temp_key.strip_prefix(TEMP_KEY_PREFIX) else {
        return false;
    };
    let Some((hash, expiry)) = rest.split_once(':') else {
        return false;
    };
    let Ok(expiry_secs) = expiry.parse::<u64>() else {
        return false;
    };

    expiry_secs > now && hash == sha256_hex(&format!("{}{}", root_key, expiry))
}

/// Middleware accepting requests that carry a known API key.
#[derive(Debug, Clone)]
pub struct ApiKeyAuth {
    keys: Vec<String>,
    header: String,
    allow_temporary: bool,
}

impl ApiKeyAuth {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            header: DEFAULT_API_KEY_HEADER.to_string(),
            allow_temporary: true,
        }
    }

    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    pub fn allow_temporary_keys(mut self, allow: bool) -> Self {
        self.allow_temporary = allow;
        self
    }

    /// Whether `key` is a root key or a live temporary key.
    pub fn accepts(&self, key: &str) -> bool {
        if self.keys.iter().any(|k| k == key) {
            return true;
        }
        self.allow_temporary
            && key.starts_with(TEMP_KEY_PREFIX)
            && self.keys.iter().any(|root| is_valid_temporary_key(key, root))
    }

    fn check(&self, ctx: &mut RequestContext) -> Result<Flow, ApiError> {
        let Some(key) = ctx.header(&self.header).map(str::to_string) else {
            return Err(ApiError::unauthorized(format!("missing {} header", self.header)));
        };

        if !self.accepts(&key) {
            return Err(ApiError::unauthorized("unknown API key"));
        }

        if let Some(auth) = ctx.local_object_mut("auth") {
            auth.insert("apiKey".into(), Value::String(key));
        }
        Ok(Flow::Continue)
    }
}

impl Middleware for ApiKeyAuth {
    fn name(&self) -> &'static str {
        "api-key"
    }

    fn handle<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, Result<Flow, ApiError>> {
        let outcome = self.check(ctx);
        Box::pin(std::future::ready(outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::context::IncomingRequest;
    use crate::dispatch::logger::RequestLogger;
    use axum::http::{HeaderName, HeaderValue, Method, StatusCode};
    use serde_json::{json, Map};

    fn ctx(key: Option<&str>) -> RequestContext {
        let mut incoming = IncomingRequest::new(Method::GET, "/".parse().unwrap());
        if let Some(key) = key {
            incoming = incoming.with_header(
                HeaderName::from_static("x-api-key"),
                HeaderValue::from_str(key).unwrap(),
            );
        }
        let logger = RequestLogger::new(&incoming.request_id, Map::new());
        RequestContext::new(incoming, Vec::new(), logger)
    }

    #[test]
    fn test_temporary_key_roundtrip() {
        let key = temporary_key_at("root", 2_000);
        assert!(key.starts_with(TEMP_KEY_PREFIX));
        assert!(key.ends_with(":2000"));
        assert!(is_valid_temporary_key_at(&key, "root", 1_999));
        assert!(!is_valid_temporary_key_at(&key, "root", 2_000));
        assert!(!is_valid_temporary_key_at(&key, "other-root", 1_000));
        assert!(!is_valid_temporary_key_at("tmp_garbage", "root", 0));
    }

    #[test]
    fn test_hash_matches_sha256_of_root_and_expiry() {
        let key = temporary_key_at("abc", 42);
        let expected = format!("tmp_{}:42", hex::encode(Sha256::digest(b"abc42")));
        assert_eq!(key, expected);
    }

    #[tokio::test]
    async fn test_accepts_root_key_and_records_it() {
        let auth = ApiKeyAuth::new(["secret"]);
        let mut ctx = ctx(Some("secret"));
        assert!(matches!(auth.handle(&mut ctx).await, Ok(Flow::Continue)));
        assert_eq!(ctx.local("auth"), Some(&json!({"apiKey": "secret"})));
    }

    #[tokio::test]
    async fn test_accepts_live_temporary_key() {
        let auth = ApiKeyAuth::new(["secret"]);
        let temp = generate_temporary_key("secret", Duration::from_secs(300));
        let mut ctx = ctx(Some(&temp));
        assert!(matches!(auth.handle(&mut ctx).await, Ok(Flow::Continue)));

        let strict = ApiKeyAuth::new(["secret"]).allow_temporary_keys(false);
        let mut ctx = self::ctx(Some(&temp));
        assert!(strict.handle(&mut ctx).await.is_err());
    }

    #[tokio::test]
    async fn test_rejects_missing_or_unknown_key() {
        let auth = ApiKeyAuth::new(["secret"]);
        for key in [None, Some("wrong")] {
            let mut ctx = ctx(key);
            let err = auth.handle(&mut ctx).await.unwrap_err();
            assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn test_custom_header() {
        let auth = ApiKeyAuth::new(["secret"]).with_header("X-Other");
        let mut ctx = ctx(Some("secret"));
        assert!(auth.handle(&mut ctx).await.is_err());
    }
}
