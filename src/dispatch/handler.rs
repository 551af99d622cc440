//! Handler functions and their arguments.
//!
//! A handler receives [`Args`]: the resolved parameter values in the order
//! the handler declared them at registration. It never sees the raw request.

use std::future::Future;

use axum::http::StatusCode;
use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::dispatch::error::ApiError;
use crate::dispatch::logger::RequestLogger;

/// Resolved, positional handler arguments.
#[derive(Debug, Clone)]
pub struct Args {
    values: Vec<(String, Option<Value>)>,
    logger: RequestLogger,
}

impl Args {
    pub fn new(values: Vec<(String, Option<Value>)>, logger: RequestLogger) -> Self {
        Self { values, logger }
    }

    /// Value at a position; `None` for an absent optional parameter.
    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index).and_then(|(_, v)| v.as_ref())
    }

    /// Raw value by parameter name.
    pub fn raw(&self, name: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.as_ref())
    }

    /// Deserialize a parameter. Absent values deserialize from `null`, so
    /// optional parameters should be read as `Option<T>`.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<T, ApiError> {
        let value = self.raw(name).cloned().unwrap_or(Value::Null);
        serde_json::from_value(value).map_err(|e| {
            ApiError::with_source(
                format!("Parameter '{}' has an unexpected type", name),
                StatusCode::BAD_REQUEST,
                e,
            )
        })
    }

    /// Parameter names in declared order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The request's contextual logger.
    pub fn logger(&self) -> &RequestLogger {
        &self.logger
    }
}

/// An endpoint implementation.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, args: Args) -> BoxFuture<'static, Result<Value, ApiError>>;
}

/// Handler wrapping an async function.
pub struct FnHandler<F> {
    func: F,
}

/// Wrap an async function returning any serializable value.
///
/// # Example
///
/// ```
/// use api_dispatch::dispatch::{handler_fn, ApiError, Args};
///
/// let get_user = handler_fn(|args: Args| async move {
///     let id: u64 = args.get("id")?;
///     Ok::<_, ApiError>(serde_json::json!({ "id": id }))
/// });
/// # let _ = get_user;
/// ```
pub fn handler_fn<F, Fut, T>(func: F) -> FnHandler<F>
where
    F: Fn(Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    T: Serialize,
{
    FnHandler { func }
}

impl<F, Fut, T> Handler for FnHandler<F>
where
    F: Fn(Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    T: Serialize,
{
    fn call(&self, args: Args) -> BoxFuture<'static, Result<Value, ApiError>> {
        let fut = (self.func)(args);
        Box::pin(async move {
            let output = fut.await?;
            Ok(serde_json::to_value(output)?)
        })
    }
}

/// Handler wrapping a synchronous function.
pub struct SyncHandler<F> {
    func: F,
}

/// Wrap a synchronous function returning any serializable value.
pub fn sync_handler<F, T>(func: F) -> SyncHandler<F>
where
    F: Fn(Args) -> Result<T, ApiError> + Send + Sync + 'static,
    T: Serialize,
{
    SyncHandler { func }
}

impl<F, T> Handler for SyncHandler<F>
where
    F: Fn(Args) -> Result<T, ApiError> + Send + Sync + 'static,
    T: Serialize,
{
    fn call(&self, args: Args) -> BoxFuture<'static, Result<Value, ApiError>> {
        let outcome = (self.func)(args).and_then(|v| serde_json::to_value(v).map_err(ApiError::from));
        Box::pin(std::future::ready(outcome))
    }
}
