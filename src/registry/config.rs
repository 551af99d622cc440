//! Handler configuration records and their merge policy.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::dispatch::middleware::Middleware;
use crate::dispatch::response::ResponseFormatter;
use crate::registry::requirement::ParameterRequirement;

/// Everything known about one handler.
///
/// Built up from fragments: each annotation produces a partial config and
/// [`HandlerConfig::merge`] folds it into the record.
#[derive(Clone, Default)]
pub struct HandlerConfig {
    pub middleware: Vec<Arc<dyn Middleware>>,
    pub params: BTreeMap<String, ParameterRequirement>,
    pub response_formatter: Option<ResponseFormatter>,
    pub response_content_type: Option<String>,
    pub docs: Option<Value>,
}

impl HandlerConfig {
    /// Fold a later fragment into this record.
    ///
    /// - `middleware` appends in registration order
    /// - `params` merge per name (see [`ParameterRequirement::merge`])
    /// - formatter and content type are last-wins
    /// - `docs` merge deeply, arrays appending
    pub fn merge(&mut self, other: HandlerConfig) {
        self.middleware.extend(other.middleware);

        for (name, requirement) in other.params {
            self.params.entry(name).or_default().merge(requirement);
        }

        if other.response_formatter.is_some() {
            self.response_formatter = other.response_formatter;
        }
        if other.response_content_type.is_some() {
            self.response_content_type = other.response_content_type;
        }

        if let Some(docs) = other.docs {
            match self.docs.as_mut() {
                Some(existing) => merge_json(existing, docs),
                None => self.docs = Some(docs),
            }
        }
    }

    /// Builder-style merge.
    pub fn and(mut self, other: HandlerConfig) -> Self {
        self.merge(other);
        self
    }
}

impl fmt::Debug for HandlerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerConfig")
            .field(
                "middleware",
                &self.middleware.iter().map(|m| m.name()).collect::<Vec<_>>(),
            )
            .field("params", &self.params)
            .field("response_formatter", &self.response_formatter.is_some())
            .field("response_content_type", &self.response_content_type)
            .field("docs", &self.docs)
            .finish()
    }
}

/// Deep-merge `src` into `dst`: objects recurse, arrays append, anything
/// else is replaced.
pub fn merge_json(dst: &mut Value, src: Value) {
    match (dst, src) {
        (Value::Object(dst), Value::Object(src)) => {
            for (key, value) in src {
                match dst.get_mut(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        dst.insert(key, value);
                    }
                }
            }
        }
        (Value::Array(dst), Value::Array(src)) => dst.extend(src),
        (dst, src) => *dst = src,
    }
}
