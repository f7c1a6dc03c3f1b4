use super::*;
use crate::config::Config;
use axum::body::{Body, to_bytes};
use axum::http::Request;
use tower::ServiceExt;

async fn json_body(response: Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("body is readable");
    serde_json::from_slice(&bytes).expect("body is json")
}

fn not_ready_context() -> Arc<ServingContext> {
    Arc::new(ServingContext::not_ready(
        &Config::default(),
        "hash:trigram-64".to_string(),
        "index not found".to_string(),
    ))
}

#[tokio::test]
async fn bad_request_has_fixed_message() {
    let response = ApiError::BadRequest.into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        serde_json::json!({"error": "Missing 'question' in JSON"})
    );
}

#[tokio::test]
async fn rag_errors_map_to_status_codes() {
    let not_ready = ApiError::from(RagError::NotReady("no index".to_string())).into_response();
    assert_eq!(not_ready.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(
        json_body(not_ready).await["error"]
            .as_str()
            .is_some_and(|e| e.contains("no index"))
    );

    let failed = ApiError::from(RagError::Embedding("timeout".to_string())).into_response();
    assert_eq!(failed.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn health_reports_not_ready() {
    let response = router(not_ready_context())
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("request is served");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        serde_json::json!({"status": "not_ready", "units": 0, "model": "hash:trigram-64"})
    );
}

#[tokio::test]
async fn ask_on_not_ready_service_is_unavailable() {
    let response = router(not_ready_context())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/ask")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"question": "How do I treat a burn?"}"#))
                .expect("request builds"),
        )
        .await
        .expect("request is served");

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn malformed_body_is_rejected_before_readiness() {
    for body in ["{}", r#"{"question": ""}"#, r#"{"question": 42}"#, "not json"] {
        let response = router(not_ready_context())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/ask")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .expect("request builds"),
            )
            .await
            .expect("request is served");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {}", body);
    }
}
