//! Operator API driven through the router without a socket.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use crm_resilience::admin::{setup_admin_router, AdminState};
use crm_resilience::config::ResilienceConfig;
use crm_resilience::jobs::JobOptions;
use crm_resilience::lifecycle::{ContextBuilder, ResilienceContext};
use crm_resilience::queue::MemoryStore;

mod common;
use common::RecordingDispatcher;

const KEY: &str = "ops-secret";

async fn setup() -> (ResilienceContext, Router) {
    let dispatcher = RecordingDispatcher::new();
    let context = ContextBuilder::new(&ResilienceConfig::default())
        .store(Arc::new(MemoryStore::new()))
        .email_transport(dispatcher.clone())
        .notification_gateway(dispatcher)
        .build()
        .await
        .unwrap();
    let router = setup_admin_router(AdminState::new(&context, KEY));
    (context, router)
}

async fn call(router: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", format!("Bearer {KEY}"))
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn test_requests_without_key_are_rejected() {
    let (_, router) = setup().await;

    let missing = Request::builder().uri("/admin/status").body(Body::empty()).unwrap();
    let wrong = Request::builder()
        .uri("/admin/status")
        .header("Authorization", "Bearer nope")
        .body(Body::empty())
        .unwrap();

    assert_eq!(router.clone().oneshot(missing).await.unwrap().status(), StatusCode::UNAUTHORIZED);
    assert_eq!(router.clone().oneshot(wrong).await.unwrap().status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_breaker_listing_and_lookup() {
    let (_, router) = setup().await;

    let (status, body) = call(&router, Method::GET, "/admin/breakers").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["total"], 5);
    assert_eq!(body["summary"]["closed"], 5);
    assert_eq!(body["breakers"]["redis"]["state"], "CLOSED");

    let (status, body) = call(&router, Method::GET, "/admin/breakers/email").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "email");
    assert_eq!(body["totalCalls"], 0);

    let (status, body) = call(&router, Method::GET, "/admin/breakers/unknown").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "circuit breaker not found: unknown");
}

#[tokio::test]
async fn test_force_operations() {
    let (context, router) = setup().await;

    let (status, body) = call(&router, Method::POST, "/admin/breakers/whatsapp-api/open").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["action"], "open");
    assert_eq!(body["stats"]["state"], "OPEN");
    assert!(context.breakers.get("whatsapp-api").unwrap().is_open());

    let (_, body) = call(&router, Method::GET, "/admin/status").await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["breakers"]["open"], 1);

    let (_, body) = call(&router, Method::POST, "/admin/breakers/whatsapp-api/close").await;
    assert_eq!(body["stats"]["state"], "CLOSED");

    let (_, body) = call(&router, Method::POST, "/admin/breakers/whatsapp-api/clear").await;
    assert_eq!(body["stats"]["totalCalls"], 0);

    let (status, _) = call(&router, Method::POST, "/admin/breakers/nope/open").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_worker_overview_and_failed_queue_clear() {
    let (context, router) = setup().await;
    context
        .workers
        .submit("email", "send", serde_json::json!({ "to": "a@b.io", "subject": "s", "text": "t" }), JobOptions::default())
        .await
        .unwrap();

    let (status, body) = call(&router, Method::GET, "/admin/workers").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"]["running"], false);
    assert_eq!(body["email"]["concurrency"], 10);
    assert_eq!(body["email"]["queue"]["pending"], 1);
    assert_eq!(body["notification"]["queue"]["failed"], 0);

    let (status, body) = call(&router, Method::POST, "/admin/workers/email/failed/clear").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["failedQueue"], "cleared");

    let (status, _) = call(&router, Method::POST, "/admin/workers/sms/failed/clear").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
