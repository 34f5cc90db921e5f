//! HTTP middleware stack.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Correlation ID (propagate or generate `X-Correlation-ID`)
//! 4. CORS (origins from `ALLOWED_ORIGINS`)

pub mod correlation_id;
pub mod cors;

pub use correlation_id::{CORRELATION_ID_HEADER, correlation_id_middleware};
pub use cors::cors_layer;
