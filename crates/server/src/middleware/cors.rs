//! CORS policy from `ALLOWED_ORIGINS`.

use axum::http::{HeaderName, HeaderValue};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};

use super::CORRELATION_ID_HEADER;

/// Build the CORS layer.
///
/// `*` allows any origin without credentials. Otherwise only the listed
/// origins are allowed, with credentials; entries that are not valid header
/// values are skipped with a warning. An empty list allows no cross-origin
/// requests.
#[must_use]
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let expose = [HeaderName::from_static(CORRELATION_ID_HEADER)];

    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers(expose);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            HeaderValue::from_str(origin)
                .inspect_err(|_| tracing::warn!(origin = %origin, "Ignoring invalid CORS origin"))
                .ok()
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
        .expose_headers(expose)
}
