// SPDX-License-Identifier: MIT

//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const POSTS: &str = "posts";
    pub const OTPS: &str = "otps";
    pub const ROUTES: &str = "routes";
    /// External-integration credentials, refreshed out-of-band
    pub const KEYS: &str = "keys";
}
