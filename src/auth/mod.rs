//! Authentication middleware.
//!
//! Auth is just another [`Middleware`](crate::dispatch::Middleware): attach
//! it to a handler with `annotate::use_middleware`.

pub mod api_key;

pub use api_key::{generate_temporary_key, is_valid_temporary_key, ApiKeyAuth, DEFAULT_API_KEY_HEADER, TEMP_KEY_PREFIX};
