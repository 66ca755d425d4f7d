//! Origin checks for browser callers.
//!
//! Requests without an `Origin` header (curl, server-to-server) always pass.
//! Browser requests pass when the origin is listed verbatim or its host ends
//! with one of the configured suffixes.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tracing::warn;
use url::Url;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OriginPolicy {
    pub allowed_origins: Vec<String>,
    pub allowed_host_suffixes: Vec<String>,
}

impl OriginPolicy {
    pub fn new(allowed_origins: Vec<String>, allowed_host_suffixes: Vec<String>) -> Self {
        Self {
            allowed_origins,
            allowed_host_suffixes,
        }
    }

    /// Whether a request carrying `origin` may reach the handlers.
    pub fn is_allowed(&self, origin: &str) -> bool {
        let Ok(url) = Url::parse(origin) else {
            return false;
        };
        let Some(host) = url.host_str() else {
            return false;
        };

        self.allowed_origins.iter().any(|o| o == origin)
            || self
                .allowed_host_suffixes
                .iter()
                .any(|suffix| host.ends_with(suffix.as_str()))
    }

    fn allows_header(&self, origin: &HeaderValue) -> bool {
        origin.to_str().is_ok_and(|o| self.is_allowed(o))
    }
}

/// Stops requests from disallowed origins with a bare 403 before routing.
pub async fn reject_disallowed_origin(
    State(policy): State<Arc<OriginPolicy>>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(origin) = request.headers().get(header::ORIGIN) {
        if !policy.allows_header(origin) {
            warn!(origin = ?origin, path = %request.uri().path(), "CORS blocked");
            return StatusCode::FORBIDDEN.into_response();
        }
    }
    next.run(request).await
}

/// CORS response headers and preflight handling for allowed origins.
pub fn cors_layer(policy: Arc<OriginPolicy>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin, _parts| {
            policy.allows_header(origin)
        }))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(AllowHeaders::mirror_request())
}
