// SPDX-License-Identifier: MIT

//! Refresh-token handling at the session refresh endpoint.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;

mod common;

#[tokio::test]
async fn test_refresh_without_any_token_is_unauthorized() {
    let (app, _) = common::create_test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/user/refresh-access-token")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_with_garbage_cookie_is_unauthorized() {
    let (app, _) = common::create_test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/user/refresh-access-token")
        .header(header::COOKIE, "refreshToken=not-a-jwt")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_with_garbage_body_token_is_unauthorized() {
    let (app, _) = common::create_test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/user/refresh-access-token")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "refreshToken": "not-a-jwt" }).to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_rejects_access_token_in_refresh_slot() {
    let (app, state) = common::create_test_app();
    let pair = state.tokens.issue_pair("user-1", "user@cuchd.in").unwrap();

    // Access and refresh tokens are signed with different keys.
    let request = Request::builder()
        .method("POST")
        .uri("/user/refresh-access-token")
        .header(header::COOKIE, format!("refreshToken={}", pair.access_token))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_cookie_takes_precedence_over_body() {
    let (app, state) = common::create_test_app();
    let pair = state.tokens.issue_pair("user-1", "user@cuchd.in").unwrap();

    // Garbage cookie + valid body token: the cookie wins and fails.
    let request = Request::builder()
        .method("POST")
        .uri("/user/refresh-access-token")
        .header(header::COOKIE, "refreshToken=not-a-jwt")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "refreshToken": pair.refresh_token }).to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
