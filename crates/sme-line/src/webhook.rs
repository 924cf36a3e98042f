//! Webhook route for the LINE Bot
//!
//! Verifies `x-line-signature` and hands each event to the [`MessageHandler`].

use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::get,
};
use base64::{Engine, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, error, warn};

use crate::handler::MessageHandler;
use crate::types::WebhookBody;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_HEADER: &str = "x-line-signature";

/// Webhook server state
#[derive(Clone)]
pub struct WebhookState {
    pub channel_secret: String,
    pub handler: Arc<MessageHandler>,
}

/// Create webhook router
pub fn create_webhook_router(state: WebhookState) -> Router {
    Router::new()
        .route("/webhook", get(webhook_status).post(handle_webhook))
        .with_state(Arc::new(state))
}

async fn webhook_status() -> &'static str {
    "Webhook endpoint is active"
}

/// Handle incoming webhook
async fn handle_webhook(
    State(state): State<Arc<WebhookState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, StatusCode> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            warn!("Missing x-line-signature header");
            StatusCode::BAD_REQUEST
        })?;

    if !verify_signature(&state.channel_secret, &body, signature) {
        warn!("Invalid signature");
        return Err(StatusCode::BAD_REQUEST);
    }

    let webhook: WebhookBody = serde_json::from_slice(&body).map_err(|e| {
        error!("Failed to parse webhook body: {:?}", e);
        StatusCode::BAD_REQUEST
    })?;

    debug!(
        "Received {} event(s) for destination: {}",
        webhook.events.len(),
        webhook.destination
    );

    for event in &webhook.events {
        // Failures are recorded per event; LINE still gets a 200
        if let Err(e) = state.handler.process_event(event).await {
            debug!("Event {} failed: {}", event.event_type, e);
        }
    }

    Ok(StatusCode::OK)
}

/// Verify a LINE signature in constant time
pub fn verify_signature(channel_secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(expected) = STANDARD.decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(channel_secret.as_bytes()) else {
        return false;
    };

    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Compute the signature LINE would send for `body`
pub fn sign(channel_secret: &str, body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(channel_secret.as_bytes()).ok()?;
    mac.update(body);
    Some(STANDARD.encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use sme_core::{AzureConfig, AzureOpenAiClient, InMemorySessionStore, LineConfig, LogStore};
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::api::LineApiClient;

    const SECRET: &str = "test_secret";

    fn router_for(server: &MockServer) -> Router {
        let line = LineConfig {
            channel_access_token: "token".to_string(),
            channel_secret: SECRET.to_string(),
            api_base_url: server.uri(),
            data_base_url: server.uri(),
        };
        let azure = AzureConfig {
            api_key: "key".to_string(),
            endpoint: server.uri(),
            ..AzureConfig::default()
        };
        let handler = MessageHandler::new(
            LineApiClient::new(&line).unwrap(),
            Arc::new(AzureOpenAiClient::new(&azure).unwrap()),
            Arc::new(InMemorySessionStore::new()),
            LogStore::console_only(),
        );
        create_webhook_router(WebhookState {
            channel_secret: SECRET.to_string(),
            handler: Arc::new(handler),
        })
    }

    fn post(body: &str, signature: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("content-type", "application/json");
        if let Some(sig) = signature {
            builder = builder.header(SIGNATURE_HEADER, sig);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[test]
    fn test_verify_signature() {
        let body = br#"{"destination":"U123","events":[]}"#;
        let valid_signature = sign(SECRET, body).unwrap();

        assert!(verify_signature(SECRET, body, &valid_signature));
        assert!(!verify_signature("other_secret", body, &valid_signature));
        assert!(!verify_signature(SECRET, body, "invalid_signature"));
        assert!(!verify_signature(SECRET, b"tampered", &valid_signature));
    }

    #[tokio::test]
    async fn test_get_webhook_is_active() {
        let server = MockServer::start().await;
        let response = router_for(&server)
            .oneshot(Request::builder().uri("/webhook").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"Webhook endpoint is active");
    }

    #[tokio::test]
    async fn test_invalid_signature_rejected() {
        let server = MockServer::start().await;
        let body = r#"{"destination":"U123","events":[]}"#;

        let response = router_for(&server)
            .oneshot(post(body, Some("bm90LWEtc2lnbmF0dXJl")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_signature_rejected() {
        let server = MockServer::start().await;
        let response = router_for(&server)
            .oneshot(post(r#"{"events":[]}"#, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_invalid_json_rejected() {
        let server = MockServer::start().await;
        let body = "not json";
        let signature = sign(SECRET, body.as_bytes()).unwrap();

        let response = router_for(&server).oneshot(post(body, Some(&signature))).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_signed_text_event_is_answered() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/deployments/gpt-4.1-nano/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "chatcmpl-1",
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "Hi!"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v2/bot/message/reply"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let body = serde_json::json!({
            "destination": "Ubot",
            "events": [{
                "type": "message",
                "replyToken": "r1",
                "timestamp": 1700000000000i64,
                "source": {"type": "user", "userId": "U1"},
                "message": {"type": "text", "id": "m1", "text": "hello"}
            }]
        })
        .to_string();
        let signature = sign(SECRET, body.as_bytes()).unwrap();

        let response = router_for(&server).oneshot(post(&body, Some(&signature))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_failing_event_still_returns_ok() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/bot/message/push"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        // No reply token: the push fails and the event errors
        let body = serde_json::json!({
            "destination": "Ubot",
            "events": [{
                "type": "message",
                "timestamp": 1700000000000i64,
                "source": {"type": "user", "userId": "U1"},
                "message": {"type": "text", "id": "m1", "text": "/help"}
            }]
        })
        .to_string();
        let signature = sign(SECRET, body.as_bytes()).unwrap();

        let response = router_for(&server).oneshot(post(&body, Some(&signature))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
