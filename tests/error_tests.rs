// SPDX-License-Identifier: MIT

//! Error envelope shape tests.
//!
//! Every handler error serializes as `{"statusCode": <u16>, "message": <str>}`
//! with the statusCode mirroring the HTTP status.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;

mod common;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_bad_request_envelope() {
    let (app, _) = common::create_test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/user/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "email": "someone@gmail.com", "gender": "male", "password": "Abcd123!" })
                .to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["statusCode"], 400);
    assert_eq!(body["message"], "Invalid email");
}

#[tokio::test]
async fn test_unauthorized_envelope() {
    let (app, _) = common::create_test_app();
    let request = Request::builder()
        .method("GET")
        .uri("/post/")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(response).await;
    assert_eq!(body["statusCode"], 401);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_internal_errors_hide_details() {
    let (app, _) = common::create_test_app();
    // Valid input against the offline store fails internally; the message
    // must not leak the underlying error.
    let request = Request::builder()
        .method("POST")
        .uri("/user/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "email": "someone@cuchd.in", "password": "Abcd123!" }).to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert_eq!(body["statusCode"], 500);
    assert_eq!(body["message"], "Internal server error");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let (app, _) = common::create_test_app();
    let request = Request::builder()
        .method("GET")
        .uri("/no-such-route")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
