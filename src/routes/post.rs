// SPDX-License-Identifier: MIT

//! Trip post routes: create, delete, and the visibility-scoped feed.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Post, PostOwner, PostView, Transportation, User, Visibility};
use crate::services::search::{
    self, MatchStrategy, PostQuery, SortField, SortOrder, Viewer, DEFAULT_LIMIT,
};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/post/create", post(create_post))
        .route("/post/delete/{postId}", delete(delete_post))
        .route("/post/", get(list_posts))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePostRequest {
    src: String,
    dest: String,
    via: String,
    trip_date: String,
    trip_time: String,
    transportation: Transportation,
    notes: Option<String>,
    /// Overrides the owner's default visibility for this post only.
    visible_to: Option<Visibility>,
}

async fn create_post(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>)> {
    let required = [
        &body.src,
        &body.dest,
        &body.via,
        &body.trip_date,
        &body.trip_time,
    ];
    if required.iter().any(|field| field.trim().is_empty()) {
        return Err(AppError::BadRequest(
            "Please provide all the required fields".to_string(),
        ));
    }

    let post = Post {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: auth.user_id.clone(),
        src: body.src.trim().to_string(),
        dest: body.dest.trim().to_string(),
        via: body.via.trim().to_string(),
        trip_date: body.trip_date.trim().to_string(),
        trip_time: body.trip_time.trim().to_string(),
        transportation: body.transportation,
        notes: body.notes.filter(|n| !n.trim().is_empty()),
        visible_to: body.visible_to.unwrap_or(auth.post_visibility),
        created_at: chrono::Utc::now().to_rfc3339(),
    };

    state.db.create_post(&post).await?;
    tracing::info!(post_id = %post.id, user_id = %auth.user_id, "Post created");

    Ok((StatusCode::CREATED, Json(post)))
}

/// Delete an owned post. A post that exists but belongs to someone else
/// is reported as not found, same as a missing one.
async fn delete_post(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(post_id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let owned = state
        .db
        .get_post(&post_id)
        .await?
        .filter(|post| post.user_id == auth.user_id);

    match owned {
        Some(post) => {
            state.db.delete_post(&post.id).await?;
            tracing::info!(post_id = %post.id, "Post deleted");
            Ok(Json(
                serde_json::json!({ "message": "Post deleted successfully" }),
            ))
        }
        None => Err(AppError::NotFound("Post not found".to_string())),
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ListPostsParams {
    src: Option<String>,
    dest: Option<String>,
    transportation: Option<String>,
    trip_date: Option<String>,
    trip_time: Option<String>,
    posted_by: Option<String>,
    page: Option<u32>,
    limit: Option<u32>,
    sort_by: Option<String>,
    sort_type: Option<String>,
    #[serde(rename = "match")]
    match_strategy: Option<String>,
}

impl ListPostsParams {
    /// Validate the raw query string into a typed query. Unknown sort
    /// fields, orders, or strategies are rejected rather than ignored.
    fn into_query(self) -> Result<PostQuery> {
        let sort_by = match self.sort_by.as_deref() {
            Some(raw) => SortField::parse(raw)
                .ok_or_else(|| AppError::BadRequest(format!("Invalid sort field: {}", raw)))?,
            None => SortField::default(),
        };
        let sort_order = match self.sort_type.as_deref() {
            Some(raw) => SortOrder::parse(raw)
                .ok_or_else(|| AppError::BadRequest(format!("Invalid sort order: {}", raw)))?,
            None => SortOrder::default(),
        };
        let strategy = match self.match_strategy.as_deref() {
            Some(raw) => MatchStrategy::parse(raw)
                .ok_or_else(|| AppError::BadRequest(format!("Invalid match strategy: {}", raw)))?,
            None => MatchStrategy::default(),
        };

        let non_blank = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        Ok(PostQuery {
            src: non_blank(self.src),
            dest: non_blank(self.dest),
            transportation: non_blank(self.transportation),
            trip_date: non_blank(self.trip_date),
            trip_time: non_blank(self.trip_time),
            posted_by: non_blank(self.posted_by),
            strategy,
            sort_by,
            sort_order,
            page: self.page.unwrap_or(1).max(1),
            limit: self.limit.unwrap_or(DEFAULT_LIMIT),
        })
    }
}

/// The feed: visibility-gated, text-filtered, sorted, paginated, with the
/// owner embedded (email redacted) on every post.
async fn list_posts(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<ListPostsParams>,
) -> Result<Json<serde_json::Value>> {
    let query = params.into_query()?;
    let viewer = Viewer {
        user_id: auth.user_id.clone(),
        role: auth.role,
        gender: auth.gender,
    };

    let all_posts = state.db.list_posts().await?;
    let (page, total) = search::run_query(&viewer, all_posts, &query);

    // One owner fetch per distinct poster on the page.
    let mut owner_ids: Vec<String> = page.iter().map(|p| p.user_id.clone()).collect();
    owner_ids.sort();
    owner_ids.dedup();
    let owners: HashMap<String, User> = state
        .db
        .get_users_by_ids(&owner_ids)
        .await?
        .into_iter()
        .map(|user| (user.id.clone(), user))
        .collect();

    // A post whose owner document is missing is dropped from the page
    // while totalPosts still counts it. Accounts are never deleted, so
    // this only shows up on a corrupted store; log it rather than fail
    // the whole listing.
    let views: Vec<PostView> = page
        .into_iter()
        .filter_map(|post| match owners.get(&post.user_id) {
            Some(owner) => Some(build_view(post, owner, &auth.user_id)),
            None => {
                tracing::warn!(
                    post_id = %post.id,
                    user_id = %post.user_id,
                    "Skipping post with missing owner record"
                );
                None
            }
        })
        .collect();

    Ok(Json(
        serde_json::json!({ "posts": views, "totalPosts": total }),
    ))
}

fn build_view(post: Post, owner: &User, viewer_id: &str) -> PostView {
    let email = if owner.id == viewer_id {
        owner.email.clone()
    } else {
        search::redact_email(&owner.email)
    };
    PostView {
        id: post.id,
        src: post.src,
        dest: post.dest,
        via: post.via,
        trip_date: post.trip_date,
        trip_time: post.trip_time,
        transportation: post.transportation,
        notes: post.notes,
        visible_to: post.visible_to,
        created_at: post.created_at,
        posted_by: PostOwner {
            id: owner.id.clone(),
            name: owner.name.clone(),
            email,
            avatar: owner.avatar.clone(),
        },
    }
}
