//! Request-time errors.
//!
//! Every failure after the route table is built ends up here, and every
//! variant knows its HTTP status and the message a client is allowed to see.
//! The raw error (with its source chain) is only ever logged.

use axum::http::StatusCode;
use thiserror::Error;

/// Boxed error used as the source of handler failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Message sent when an error carries no friendly text.
pub const UNKNOWN_MESSAGE: &str = "unknown";

/// Errors raised while dispatching a request.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No route, module, verb or handler for the request.
    #[error("Not found")]
    NotFound,

    /// A required parameter had no value in any of its sources.
    #[error("Required parameter '{name}' is missing")]
    MissingParameter { name: String },

    /// Authentication middleware rejected the request.
    #[error("Unauthorized: {reason}")]
    Unauthorized { reason: String },

    /// Anything raised by a handler or middleware.
    #[error("{message}")]
    Handler {
        status: StatusCode,
        friendly: Option<String>,
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl ApiError {
    /// An error whose message is safe to show to the client.
    pub fn friendly(message: impl Into<String>, status: StatusCode) -> Self {
        let message = message.into();
        ApiError::Handler {
            status,
            friendly: Some(message.clone()),
            message,
            source: None,
        }
    }

    /// Wrap a raw error; the client only sees "unknown" with a 500.
    pub fn internal(err: impl Into<BoxError>) -> Self {
        let source = err.into();
        ApiError::Handler {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            friendly: None,
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Wrap a raw error with a friendly message and status.
    pub fn with_source(
        friendly: impl Into<String>,
        status: StatusCode,
        err: impl Into<BoxError>,
    ) -> Self {
        let source = err.into();
        ApiError::Handler {
            status,
            friendly: Some(friendly.into()),
            message: source.to_string(),
            source: Some(source),
        }
    }

    pub fn unauthorized(reason: impl Into<String>) -> Self {
        ApiError::Unauthorized {
            reason: reason.into(),
        }
    }

    pub fn missing_parameter(name: impl Into<String>) -> Self {
        ApiError::MissingParameter { name: name.into() }
    }

    /// HTTP status for the error response.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::MissingParameter { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Handler { status, .. } => *status,
        }
    }

    /// Message placed in the `because` field of the failure envelope.
    pub fn friendly_message(&self) -> String {
        match self {
            ApiError::NotFound | ApiError::MissingParameter { .. } => self.to_string(),
            ApiError::Unauthorized { .. } => "Unauthorized".to_string(),
            ApiError::Handler { friendly, .. } => friendly
                .clone()
                .unwrap_or_else(|| UNKNOWN_MESSAGE.to_string()),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::internal(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_and_messages() {
        assert_eq!(ApiError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::NotFound.friendly_message(), "Not found");

        let missing = ApiError::missing_parameter("id");
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
        assert_eq!(missing.friendly_message(), "Required parameter 'id' is missing");

        let denied = ApiError::unauthorized("bad key");
        assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(denied.friendly_message(), "Unauthorized");
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let err = ApiError::internal(std::io::Error::other("disk on fire"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.friendly_message(), UNKNOWN_MESSAGE);
        assert_eq!(err.to_string(), "disk on fire");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_friendly_errors_keep_status() {
        let err = ApiError::friendly("Try again later", StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.friendly_message(), "Try again later");
    }
}
