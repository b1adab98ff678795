use axum::Router;
use axum::http::{HeaderName, HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::warn;

const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; base-uri 'self'; \
     frame-ancestors 'self'; object-src 'none'; script-src 'self'; \
     style-src 'self' 'unsafe-inline'; img-src 'self' data:";

/// An empty allow-list accepts every origin. A `*` entry is not a wildcard
/// here: it matches no origin and is skipped.
pub(super) fn cors_layer(trusted_origins: &[String]) -> CorsLayer {
    let allow_origin = if trusted_origins.is_empty() {
        AllowOrigin::mirror_request()
    } else {
        let origins = trusted_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) if value == "*" => {
                    warn!("ignoring `*` in TRUSTED_ORIGINS; list origins explicitly or leave it empty");
                    None
                }
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %origin, "ignoring trusted origin that is not a valid header value");
                    None
                }
            })
            .collect::<Vec<_>>();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::HEAD, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

pub(super) fn with_security_headers(router: Router) -> Router {
    router
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static(CONTENT_SECURITY_POLICY),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("cross-origin-opener-policy"),
            HeaderValue::from_static("same-origin"),
        ))
}
