// SPDX-License-Identifier: MIT

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (identity records, keyed by uuid)
//! - OTPs (short-lived verification codes)
//! - Posts (trip offers)
//! - Routes (canonical src/dest pairs with merged waypoints)
//! - Keys (external-integration credentials, read-only here)

use crate::db::collections;
use crate::error::AppError;
use crate::models::{Key, OtpRecord, Post, RouteRecord, User};
use futures_util::{stream, FutureExt, StreamExt};

const MAX_CONCURRENT_DB_OPS: usize = 20;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // The emulator needs an unauthenticated connection so local runs
        // do not pick up real credentials.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by document id.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by email (unique across the collection).
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = email.to_string();
        let mut users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.for_all([q.field("email").eq(email.clone())]))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(users.pop())
    }

    /// Create or overwrite a user document.
    pub async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Fetch several users by id with bounded concurrency.
    ///
    /// Missing ids are skipped; the feed drops posts whose owner record is
    /// gone.
    pub async fn get_users_by_ids(&self, user_ids: &[String]) -> Result<Vec<User>, AppError> {
        let users = stream::iter(user_ids.to_vec())
            .map(|id| async move { self.get_user(&id).await })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<Option<User>, AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<Option<User>>, AppError>>()?;

        Ok(users.into_iter().flatten().collect())
    }

    // ─── OTP Operations ──────────────────────────────────────────

    /// Store a freshly issued code.
    pub async fn create_otp(&self, record: &OtpRecord) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::OTPS)
            .document_id(&record.id)
            .object(record)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Most recently created code for an email, across reasons.
    ///
    /// Validation is reason-scoped against this single record, so an older
    /// still-valid code is dead as soon as a newer one is issued.
    pub async fn latest_otp(&self, email: &str) -> Result<Option<OtpRecord>, AppError> {
        let email = email.to_string();
        let mut records: Vec<OtpRecord> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::OTPS)
            .filter(move |q| q.for_all([q.field("email").eq(email.clone())]))
            .order_by([(
                "createdAt",
                firestore::FirestoreQueryDirection::Descending,
            )])
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(records.pop())
    }

    /// Delete every code for an (email, reason) pair after successful
    /// verification.
    pub async fn delete_otps(&self, email: &str, reason: &str) -> Result<(), AppError> {
        let email_filter = email.to_string();
        let reason_filter = reason.to_string();
        let records: Vec<OtpRecord> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::OTPS)
            .filter(move |q| {
                q.for_all([
                    q.field("email").eq(email_filter.clone()),
                    q.field("reason").eq(reason_filter.clone()),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let client = self.get_client()?;
        stream::iter(records)
            .map(|record| async move {
                client
                    .fluent()
                    .delete()
                    .from(collections::OTPS)
                    .document_id(&record.id)
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<(), AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<()>, AppError>>()?;

        Ok(())
    }

    // ─── Post Operations ─────────────────────────────────────────

    /// Store a new post.
    pub async fn create_post(&self, post: &Post) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::POSTS)
            .document_id(&post.id)
            .object(post)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get a post by id.
    pub async fn get_post(&self, post_id: &str) -> Result<Option<Post>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::POSTS)
            .obj()
            .one(post_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a post by id. Ownership is checked by the caller.
    pub async fn delete_post(&self, post_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::POSTS)
            .document_id(post_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Load the full post set.
    ///
    /// The search engine filters, scores, and paginates in memory; the
    /// campus-scale dataset stays small enough for this to hold.
    pub async fn list_posts(&self) -> Result<Vec<Post>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::POSTS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Route Operations ────────────────────────────────────────

    /// Get a route by its (src, dest) pair.
    pub async fn get_route(&self, src: &str, dest: &str) -> Result<Option<RouteRecord>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::ROUTES)
            .obj()
            .one(&RouteRecord::doc_id(src, dest))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Load the full route set for fuzzy search.
    pub async fn list_routes(&self) -> Result<Vec<RouteRecord>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::ROUTES)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a route or merge waypoints into an existing one, inside a
    /// retrying transaction.
    ///
    /// `run_transaction` scopes the read to the transaction, so the
    /// document is registered for conflict detection; when two merges on
    /// the same pair race, the loser's commit aborts and the closure runs
    /// again against the winner's waypoints. No merge is ever lost.
    pub async fn upsert_route_merged(
        &self,
        src: &str,
        dest: &str,
        via: &[String],
    ) -> Result<RouteRecord, AppError> {
        let src = src.trim().to_string();
        let dest = dest.trim().to_string();
        let doc_id = RouteRecord::doc_id(&src, &dest);
        let via = via.to_vec();

        let route = self
            .get_client()?
            .run_transaction(|db, transaction| {
                let src = src.clone();
                let dest = dest.clone();
                let doc_id = doc_id.clone();
                let via = via.clone();
                async move {
                    let existing: Option<RouteRecord> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::ROUTES)
                        .obj()
                        .one(&doc_id)
                        .await?;

                    let now = chrono::Utc::now().to_rfc3339();
                    let mut route = existing.unwrap_or(RouteRecord {
                        src,
                        dest,
                        via: Vec::new(),
                        created_at: now.clone(),
                        updated_at: now.clone(),
                    });

                    let changed = route.merge_via(&via);
                    // A brand-new record is written even with no waypoints;
                    // repeating an already-applied list stages nothing.
                    if changed || route.via.is_empty() {
                        route.updated_at = now;
                        db.fluent()
                            .update()
                            .in_col(collections::ROUTES)
                            .document_id(&doc_id)
                            .object(&route)
                            .add_to_transaction(transaction)?;
                    }

                    Ok(route)
                }
                .boxed()
            })
            .await
            .map_err(|e| AppError::Database(format!("Route merge transaction failed: {}", e)))?;

        tracing::info!(
            src = %route.src,
            dest = %route.dest,
            via_count = route.via.len(),
            "Route upserted"
        );

        Ok(route)
    }

    // ─── Key Operations ──────────────────────────────────────────

    /// Read an external-integration credential. Never written here.
    pub async fn get_key(&self, key_id: &str) -> Result<Option<Key>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::KEYS)
            .obj()
            .one(key_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
