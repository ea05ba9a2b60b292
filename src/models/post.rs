// SPDX-License-Identifier: MIT

//! Trip post model.

use crate::models::user::Visibility;
use serde::{Deserialize, Serialize};

/// How the poster plans to travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transportation {
    Bike,
    Auto,
    Car,
    Bus,
    Unknown,
}

/// Trip offer stored in the `posts` collection (doc id = `id`).
///
/// Posts are immutable after creation; the only lifecycle operation is
/// deletion by the owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Uuid, also used as the document id
    pub id: String,
    /// Owning user's id
    pub user_id: String,
    pub src: String,
    pub dest: String,
    /// Free-text waypoint description
    pub via: String,
    /// Opaque strings; the server never parses trip date/time
    pub trip_date: String,
    pub trip_time: String,
    pub transportation: Transportation,
    pub notes: Option<String>,
    /// Fixed at creation from the override or the owner's default
    pub visible_to: Visibility,
    /// RFC 3339
    pub created_at: String,
}

/// Post as returned from the feed, with the owner inlined (email already
/// redacted for viewers other than the owner).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: String,
    pub src: String,
    pub dest: String,
    pub via: String,
    pub trip_date: String,
    pub trip_time: String,
    pub transportation: Transportation,
    pub notes: Option<String>,
    pub visible_to: Visibility,
    pub created_at: String,
    pub posted_by: PostOwner,
}

/// Redacted owner summary embedded in feed results.
#[derive(Debug, Clone, Serialize)]
pub struct PostOwner {
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar: String,
}
