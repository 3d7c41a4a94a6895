//! Axum router construction.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};

use super::{handlers, middleware, state::AppState};

/// Build the application [`Router`] with all routes and middleware attached.
pub fn build(state: AppState) -> Router {
    Router::new()
        .route("/encrypt", post(handlers::encrypt))
        .route("/decrypt", post(handlers::decrypt))
        .route("/invoke/encrypt", post(handlers::invoke_encrypt))
        .route("/invoke/decrypt", post(handlers::invoke_decrypt))
        .route("/health", get(handlers::health))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(middleware::REQUEST_TIMEOUT))
        .layer(CompressionLayer::new())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Algorithm;
    use crate::envelope::EnvelopeService;
    use crate::crypto::DataKey;
    use crate::kms::fake::StaticKeyService;
    use crate::kms::{DataKeyPair, KeyService, KeyServiceError, KeySpec};
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use std::{sync::Arc, time::Duration};
    use tower::ServiceExt;

    const MASTER: &str = "alias/pii-master";

    fn app_with(kms: StaticKeyService) -> Router {
        let service = EnvelopeService::new(
            Arc::new(kms),
            MASTER,
            Algorithm::default(),
            Duration::from_secs(5),
        );
        build(AppState::new(service))
    }

    struct HangingKeyService;

    #[async_trait]
    impl KeyService for HangingKeyService {
        async fn generate_data_key(
            &self,
            _master_key_id: &str,
            _spec: KeySpec,
        ) -> Result<DataKeyPair, KeyServiceError> {
            std::future::pending().await
        }

        async fn unwrap_key(&self, _wrapped: &[u8]) -> Result<DataKey, KeyServiceError> {
            std::future::pending().await
        }
    }

    fn hanging_app(call_timeout: Duration) -> Router {
        let service = EnvelopeService::new(
            Arc::new(HangingKeyService),
            MASTER,
            Algorithm::default(),
            call_timeout,
        );
        build(AppState::new(service))
    }

    fn app() -> Router {
        app_with(StaticKeyService::new(MASTER))
    }

    fn post_json(uri: &str, body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.into())
            .unwrap()
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let app = app();
        let req = Request::builder()
            .uri("/unknown")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn health_reports_algorithm() {
        let app = app();
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok", "algorithm": "aes-256-gcm"}));
    }

    #[tokio::test]
    async fn encrypt_then_decrypt_over_http() {
        let app = app();
        let (status, envelope) = send(&app, post_json("/encrypt", r#"{"plaintext":"123-45-6789"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        for field in ["encryptedDataKey", "encryptedData", "iv", "algorithm"] {
            assert!(envelope[field].is_string(), "missing {field}");
        }

        let (status, body) = send(&app, post_json("/decrypt", envelope.to_string())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"decrypted": "123-45-6789"}));
    }

    #[tokio::test]
    async fn nested_body_shape_is_accepted() {
        let app = app();
        let inner = json!({"plaintext": "nested"}).to_string();
        let (status, _) = send(&app, post_json("/encrypt", json!({"body": inner}).to_string())).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn empty_body_is_structural_500() {
        let app = app();
        let (status, body) = send(&app, post_json("/encrypt", Body::empty())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "ENCRYPTION_FAILED");
        assert_eq!(body["kind"], "structural");
    }

    #[tokio::test]
    async fn invalid_json_is_structural_500() {
        let app = app();
        let (status, body) = send(&app, post_json("/decrypt", "{not json")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "DECRYPTION_FAILED");
        assert_eq!(body["kind"], "structural");
    }

    #[tokio::test]
    async fn denied_unwrap_is_403() {
        let plain = app();
        let (_, envelope) = send(&plain, post_json("/encrypt", r#"{"plaintext":"secret"}"#)).await;

        let denied = app_with(StaticKeyService::new(MASTER).denying_unwrap());
        let (status, body) = send(&denied, post_json("/decrypt", envelope.to_string())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(
            body,
            json!({
                "error": "ACCESS_DENIED",
                "kind": "access_denied",
                "message": "No permission to decrypt"
            })
        );
    }

    #[tokio::test]
    async fn invoke_routes_always_return_200_with_status_code() {
        let app = app();
        let (status, body) = send(&app, post_json("/invoke/encrypt", r#"{"plaintext":""}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["statusCode"], 500);
        assert_eq!(body["body"]["error"], "ENCRYPTION_FAILED");

        let (status, body) = send(&app, post_json("/invoke/encrypt", r#"{"plaintext":"ok"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["statusCode"], 200);

        let (status, body) = send(&app, post_json("/invoke/decrypt", body["body"].to_string())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"statusCode": 200, "body": {"decrypted": "ok"}}));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_key_service_is_a_classified_500_not_a_408() {
        let app = hanging_app(middleware::REQUEST_TIMEOUT - Duration::from_millis(1));

        let (status, body) = send(&app, post_json("/encrypt", r#"{"plaintext":"x"}"#)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "ENCRYPTION_FAILED");
        assert_eq!(body["kind"], "key_service");

        let (status, body) = send(&app, post_json("/invoke/encrypt", r#"{"plaintext":"x"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["statusCode"], 500);
        assert_eq!(body["body"]["kind"], "key_service");
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_header_bounds_key_service_call() {
        let app = hanging_app(Duration::from_secs(5));
        let req = Request::builder()
            .method("POST")
            .uri("/encrypt")
            .header(handlers::DEADLINE_HEADER, "100")
            .body(Body::from(r#"{"plaintext":"x"}"#))
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["kind"], "key_service");
        assert!(body["message"].as_str().unwrap().contains("100ms"));
    }

    #[tokio::test]
    async fn malformed_deadline_header_is_structural() {
        let app = app();
        let req = Request::builder()
            .method("POST")
            .uri("/decrypt")
            .header(handlers::DEADLINE_HEADER, "later")
            .body(Body::from(r#"{"encryptedDataKey":"a2V5"}"#))
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "DECRYPTION_FAILED");
        assert_eq!(body["kind"], "structural");
        assert!(body["message"].as_str().unwrap().contains(handlers::DEADLINE_HEADER));
    }

    #[tokio::test]
    async fn get_on_operation_route_is_rejected() {
        let app = app();
        let req = Request::builder()
            .uri("/encrypt")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
