use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use coral_api::build_app;
use serde_json::json;
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let app = build_app().await.expect("app should build");

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let parsed = body_json(response).await;
    assert_eq!(parsed["status"], "ok");
    assert_eq!(parsed["store"], "memory");
}

#[tokio::test]
async fn messages_require_api_key() {
    let app = build_app().await.expect("app should build");

    let request = Request::builder()
        .method("POST")
        .uri("/v1/messages")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "text": "I need to check my reservation"
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn message_returns_structured_record() {
    let app = build_app().await.expect("app should build");

    let request = Request::builder()
        .method("POST")
        .uri("/v1/messages")
        .header("content-type", "application/json")
        .header("x-api-key", "dev-coral-key")
        .body(Body::from(
            json!({
                "text": "My name is Sarah Johnson, I need to check my reservation"
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let parsed = body_json(response).await;
    assert!(parsed.get("session_id").is_some());
    assert_eq!(parsed["category"], "reservation_lookup");
    assert_eq!(parsed["status"], "found");
    assert_eq!(parsed["payload"]["room"], "205");
}

#[tokio::test]
async fn schedule_endpoint_updates_employee() {
    let app = build_app().await.expect("app should build");

    let request = Request::builder()
        .method("POST")
        .uri("/v1/schedule")
        .header("content-type", "application/json")
        .header("x-api-key", "dev-coral-key")
        .body(Body::from(
            json!({
                "employee_id": "EMP002",
                "shift_type": "Night",
                "date": "2024-11-27"
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let parsed = body_json(response).await;
    assert_eq!(parsed["status"], "success");
    assert_eq!(parsed["payload"]["employee_name"], "Bob Wilson");
    assert_eq!(parsed["payload"]["shift"], "Night");
}

#[tokio::test]
async fn reservation_lookup_by_query_string() {
    let app = build_app().await.expect("app should build");

    let request = Request::builder()
        .method("GET")
        .uri("/v1/reservations?guest=john")
        .header("x-api-key", "dev-coral-key")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let parsed = body_json(response).await;
    assert_eq!(parsed["status"], "found");
    assert_eq!(parsed["payload"]["guest"], "John Smith");
    assert_eq!(parsed["payload"]["room"], "303");
}

#[tokio::test]
async fn policies_search_by_query_string() {
    let app = build_app().await.expect("app should build");

    let request = Request::builder()
        .method("GET")
        .uri("/v1/policies?q=pet")
        .header("x-api-key", "dev-coral-key")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let parsed = body_json(response).await;
    assert_eq!(parsed["count"], 1);
    assert_eq!(parsed["policies"][0]["key"], "pets");
}

#[tokio::test]
async fn activities_search_by_query_string() {
    let app = build_app().await.expect("app should build");

    let request = Request::builder()
        .method("GET")
        .uri("/v1/activities?q=water%20sports")
        .header("x-api-key", "dev-coral-key")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let parsed = body_json(response).await;
    assert_eq!(parsed["status"], "found");
    assert_eq!(parsed["payload"]["count"], 3);
}
