// SPDX-License-Identifier: MIT

//! Canonical route records with accumulated waypoints.

use serde::{Deserialize, Serialize};

/// Route document stored in the `routes` collection.
///
/// The document id is `urlencode(src)_urlencode(dest)` over the trimmed
/// endpoints, which keeps the pair unique without a secondary index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRecord {
    pub src: String,
    pub dest: String,
    /// Known waypoints; grows only, exact-string deduplicated
    pub via: Vec<String>,
    /// RFC 3339
    pub created_at: String,
    pub updated_at: String,
}

impl RouteRecord {
    /// Document id for a (src, dest) pair. Inputs are trimmed before
    /// encoding so differing whitespace maps to the same route.
    pub fn doc_id(src: &str, dest: &str) -> String {
        format!(
            "{}_{}",
            urlencoding::encode(src.trim()),
            urlencoding::encode(dest.trim())
        )
    }

    /// Merge new waypoints into the existing list.
    ///
    /// Each candidate is trimmed; only entries not already present (exact
    /// match) are appended. Returns true if anything was added.
    pub fn merge_via(&mut self, incoming: &[String]) -> bool {
        let mut changed = false;
        for raw in incoming {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }
            if !self.via.iter().any(|existing| existing == trimmed) {
                self.via.push(trimmed.to_string());
                changed = true;
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(via: &[&str]) -> RouteRecord {
        RouteRecord {
            src: "Chandigarh".to_string(),
            dest: "Delhi".to_string(),
            via: via.iter().map(|s| s.to_string()).collect(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_merge_appends_only_new_waypoints() {
        let mut r = route(&["Ambala"]);
        let changed = r.merge_via(&[
            "Ambala".to_string(),
            " Kurukshetra ".to_string(),
            "Panipat".to_string(),
        ]);
        assert!(changed);
        assert_eq!(r.via, vec!["Ambala", "Kurukshetra", "Panipat"]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut r = route(&[]);
        r.merge_via(&["Ambala".to_string(), "Panipat".to_string()]);
        let before = r.via.clone();
        // Second application of the same list changes nothing.
        let changed = r.merge_via(&["Ambala".to_string(), "Panipat".to_string()]);
        assert!(!changed);
        assert_eq!(r.via, before);
    }

    #[test]
    fn test_merge_skips_blank_entries() {
        let mut r = route(&[]);
        let changed = r.merge_via(&["  ".to_string(), "".to_string()]);
        assert!(!changed);
        assert!(r.via.is_empty());
    }

    #[test]
    fn test_doc_id_trims_and_encodes() {
        assert_eq!(
            RouteRecord::doc_id(" Sector 17 ", "Elante Mall"),
            "Sector%2017_Elante%20Mall"
        );
    }
}
