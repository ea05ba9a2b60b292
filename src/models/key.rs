// SPDX-License-Identifier: MIT

//! External-integration credentials.

use serde::{Deserialize, Serialize};

/// Document id of the directory-lookup bearer token in the `keys`
/// collection.
pub const DIRECTORY_KEY_ID: &str = "directory-access-token";

/// Long-lived bearer credential for one external integration.
///
/// Written by an out-of-band refresh process; this service only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Key {
    pub access_token: String,
    /// RFC 3339, set by the refresher
    pub updated_at: String,
}
