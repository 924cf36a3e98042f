//! Admin API key middleware
//!
//! When `ADMIN_API_KEY` is configured, `/api/*` requires
//! `Authorization: Bearer <key>`.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::Response,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

use crate::api::DashboardState;

/// API key authentication middleware
pub async fn require_api_key(
    State(state): State<Arc<DashboardState>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim);

    if validate_api_key(provided, state.admin_api_key.as_deref()) {
        Ok(next.run(request).await)
    } else {
        warn!("Rejected admin API request to {}", request.uri().path());
        Err(StatusCode::UNAUTHORIZED)
    }
}

/// API key validation
///
/// Both keys are run through HMAC-SHA256 keyed by the expected key and the
/// digests are compared with `verify_slice`, so the comparison time does not
/// depend on where the keys differ or on their lengths.
pub fn validate_api_key(provided: Option<&str>, expected: Option<&str>) -> bool {
    match (provided, expected) {
        (Some(p), Some(e)) => keys_match(p, e),
        (_, None) => true,
        (None, Some(_)) => false,
    }
}

fn keys_match(provided: &str, expected: &str) -> bool {
    let digest = |value: &str| {
        Hmac::<Sha256>::new_from_slice(expected.as_bytes()).map(|mut mac| {
            mac.update(value.as_bytes());
            mac
        })
    };

    match (digest(expected), digest(provided)) {
        (Ok(expected_mac), Ok(provided_mac)) => {
            provided_mac.verify_slice(&expected_mac.finalize().into_bytes()).is_ok()
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{LogProvider, create_router};
    use axum::body::Body;
    use axum::http::Request;
    use sme_core::LogStore;
    use tower::ServiceExt;

    #[test]
    fn test_validate_api_key_no_key_configured() {
        assert!(validate_api_key(None, None));
        assert!(validate_api_key(Some("any"), None));
    }

    #[test]
    fn test_validate_api_key_with_key_configured() {
        assert!(!validate_api_key(None, Some("secret")));
        assert!(!validate_api_key(Some("wrong"), Some("secret")));
        assert!(validate_api_key(Some("secret"), Some("secret")));
    }

    #[test]
    fn test_validate_api_key_rejects_prefixes_and_extensions() {
        assert!(!validate_api_key(Some("secre"), Some("secret")));
        assert!(!validate_api_key(Some("secret2"), Some("secret")));
        assert!(!validate_api_key(Some(""), Some("secret")));
        assert!(validate_api_key(Some("คีย์ลับ"), Some("คีย์ลับ")));
    }

    fn router_with_key() -> axum::Router {
        let logs: Arc<dyn LogProvider> = Arc::new(LogStore::console_only());
        create_router(DashboardState::new(logs).with_admin_api_key(Some("secret".to_string())))
    }

    async fn status_of(request: Request<Body>) -> StatusCode {
        router_with_key().oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_api_requires_bearer_key() {
        let missing = Request::builder().uri("/api/stats").body(Body::empty()).unwrap();
        assert_eq!(status_of(missing).await, StatusCode::UNAUTHORIZED);

        let wrong = Request::builder()
            .uri("/api/logs")
            .header("authorization", "Bearer nope")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(wrong).await, StatusCode::UNAUTHORIZED);

        let valid = Request::builder()
            .uri("/api/stats")
            .header("authorization", "Bearer secret")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(valid).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_and_admin_page_stay_open() {
        let health = Request::builder().uri("/health").body(Body::empty()).unwrap();
        assert_eq!(status_of(health).await, StatusCode::OK);

        let admin = Request::builder().uri("/admin").body(Body::empty()).unwrap();
        assert_eq!(status_of(admin).await, StatusCode::OK);
    }
}
