//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace, timeout layers)
//!     → request.rs (body limit, cookie and body parsing → IncomingRequest)
//!     → dispatch::Dispatcher
//!     → Send to client
//! ```

pub mod request;
pub mod server;

pub use request::{adapt_request, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
