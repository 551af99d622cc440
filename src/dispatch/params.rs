//! Parameter resolution.

use serde_json::Value;

use crate::dispatch::context::RequestContext;
use crate::dispatch::error::ApiError;
use crate::registry::requirement::ParameterRequirement;

/// Resolve every declared parameter against the request context.
///
/// For each parameter the first source path that exists supplies the
/// value. A required parameter whose value is absent or `null` fails the
/// request, naming the parameter. Output keeps the input order.
pub fn resolve_parameters(
    ctx: &RequestContext,
    requirements: &[(String, ParameterRequirement)],
) -> Result<Vec<(String, Option<Value>)>, ApiError> {
    requirements
        .iter()
        .map(|(name, requirement)| {
            let found = requirement
                .effective_sources(name)
                .iter()
                .find_map(|source| ctx.lookup(source))
                .cloned();

            let value = match found {
                Some(v) if requirement.is_auto_convert() => Some(auto_convert(v)),
                other => other,
            };

            match value {
                None | Some(Value::Null) if requirement.is_required() => {
                    Err(ApiError::missing_parameter(name.clone()))
                }
                value => Ok((name.clone(), value)),
            }
        })
        .collect()
}

/// Best-effort coercion of string values into JSON.
///
/// `"42"` becomes `42`, `"true"` becomes `true`, `"{\"a\":1}"` becomes an
/// object. Anything that does not parse is kept as the raw string, and
/// non-string values pass through untouched.
pub fn auto_convert(value: Value) -> Value {
    match value {
        Value::String(raw) => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
        other => other,
    }
}
