// SPDX-License-Identifier: MIT

//! Firestore integration tests. These run only against the emulator
//! (`FIRESTORE_EMULATOR_HOST` must be set) and are skipped otherwise.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use campool::models::{
    Gender, OtpReason, OtpRecord, Role, User, UserSettings,
};
use chrono::Utc;
use serde_json::json;
use tower::ServiceExt;

mod common;

fn test_user(email: &str) -> User {
    let now = Utc::now().to_rfc3339();
    User {
        id: uuid::Uuid::new_v4().to_string(),
        name: "Test User".to_string(),
        email: email.to_string(),
        gender: Gender::Other,
        avatar: "https://avatar.iran.liara.run/username?username=Test+User".to_string(),
        password_hash: "$2b$08$notarealhashnotarealhashnotarealhash".to_string(),
        role: Role::Student,
        refresh_token: None,
        is_verified: false,
        fcm_token: None,
        settings: UserSettings::default(),
        created_at: now.clone(),
        updated_at: now,
    }
}

fn unique_email() -> String {
    format!("it-{}@cuchd.in", &uuid::Uuid::new_v4().to_string()[..8])
}

#[tokio::test]
async fn test_user_roundtrip_and_email_lookup() {
    require_emulator!();
    let db = common::test_db().await;

    let email = unique_email();
    let user = test_user(&email);
    db.upsert_user(&user).await.unwrap();

    let by_id = db.get_user(&user.id).await.unwrap().unwrap();
    assert_eq!(by_id.email, email);

    let by_email = db.find_user_by_email(&email).await.unwrap().unwrap();
    assert_eq!(by_email.id, user.id);

    assert!(db
        .find_user_by_email("nobody@cuchd.in")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_latest_otp_wins() {
    require_emulator!();
    let db = common::test_db().await;
    let email = unique_email();

    let older = OtpRecord::new(&email, "1111".to_string(), OtpReason::Register, Utc::now());
    db.create_otp(&older).await.unwrap();
    let newer = OtpRecord::new(
        &email,
        "2222".to_string(),
        OtpReason::Register,
        Utc::now() + chrono::Duration::seconds(1),
    );
    db.create_otp(&newer).await.unwrap();

    let latest = db.latest_otp(&email).await.unwrap().unwrap();
    assert_eq!(latest.code, "2222");

    db.delete_otps(&email, OtpReason::Register.as_str())
        .await
        .unwrap();
    assert!(db.latest_otp(&email).await.unwrap().is_none());
}

#[tokio::test]
async fn test_route_merge_accumulates_and_is_idempotent() {
    require_emulator!();
    let db = common::test_db().await;

    // Unique pair per run so reruns start from a clean document.
    let src = format!("Src {}", &uuid::Uuid::new_v4().to_string()[..8]);
    let dest = format!("Dest {}", &uuid::Uuid::new_v4().to_string()[..8]);

    let first = db
        .upsert_route_merged(&src, &dest, &["Ambala".to_string()])
        .await
        .unwrap();
    assert_eq!(first.via, vec!["Ambala"]);

    let merged = db
        .upsert_route_merged(
            &src,
            &dest,
            &["Ambala".to_string(), "Panipat".to_string()],
        )
        .await
        .unwrap();
    assert_eq!(merged.via, vec!["Ambala", "Panipat"]);

    let repeat = db
        .upsert_route_merged(
            &src,
            &dest,
            &["Ambala".to_string(), "Panipat".to_string()],
        )
        .await
        .unwrap();
    assert_eq!(repeat.via, merged.via);
    assert_eq!(repeat.updated_at, merged.updated_at);
}

#[tokio::test]
async fn test_concurrent_route_merges_keep_both_waypoints() {
    require_emulator!();
    let db = common::test_db().await;

    let src = format!("Src {}", &uuid::Uuid::new_v4().to_string()[..8]);
    let dest = format!("Dest {}", &uuid::Uuid::new_v4().to_string()[..8]);

    // Two merges race on the same pair; the transaction retry must keep
    // both waypoints instead of letting one write clobber the other.
    let via_a = ["Ambala".to_string()];
    let via_b = ["Panipat".to_string()];
    let (a, b) = tokio::join!(
        db.upsert_route_merged(&src, &dest, &via_a),
        db.upsert_route_merged(&src, &dest, &via_b),
    );
    a.unwrap();
    b.unwrap();

    let stored = db.get_route(&src, &dest).await.unwrap().unwrap();
    assert!(stored.via.contains(&"Ambala".to_string()));
    assert!(stored.via.contains(&"Panipat".to_string()));
}

fn register_request(email: &str, password: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/user/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "email": email, "gender": "male", "password": password }).to_string(),
        ))
        .unwrap()
}

#[tokio::test]
async fn test_repeat_registration_overwrites_unverified_record() {
    require_emulator!();
    let db = common::test_db().await;
    let (app, _) = common::create_test_app_with_db(db.clone());

    let email = unique_email();

    let first = app
        .clone()
        .oneshot(register_request(&email, "Abcd123!"))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);
    let first_body: serde_json::Value = serde_json::from_slice(
        &axum::body::to_bytes(first.into_body(), 1024 * 1024)
            .await
            .unwrap(),
    )
    .unwrap();
    let first_id = first_body["id"].as_str().unwrap().to_string();

    // Registering again before verification replaces the pending record
    // in place rather than creating a second one.
    let second = app
        .oneshot(register_request(&email, "Wxyz789#"))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CREATED);
    let second_body: serde_json::Value = serde_json::from_slice(
        &axum::body::to_bytes(second.into_body(), 1024 * 1024)
            .await
            .unwrap(),
    )
    .unwrap();
    assert_eq!(second_body["id"].as_str().unwrap(), first_id);

    let stored = db.find_user_by_email(&email).await.unwrap().unwrap();
    assert_eq!(stored.id, first_id);
    assert!(!stored.is_verified);
    assert!(bcrypt::verify("Wxyz789#", &stored.password_hash).unwrap());
}
