// SPDX-License-Identifier: MIT

//! Post visibility, text matching, pagination, and email redaction.
//!
//! Pure policy: everything here operates on in-memory sets so the rules can
//! be exercised without a database. The feed pipeline is
//! gate -> text match -> sort -> count -> slice; the reported total always
//! reflects the fully filtered set, never the raw collection.

use crate::models::{Gender, Post, Role, Visibility};
use std::cmp::Ordering;

/// Default page size for the feed.
pub const DEFAULT_LIMIT: u32 = 10;
/// Hard cap on page size.
pub const MAX_LIMIT: u32 = 100;

/// Minimum score for a fuzzy candidate to count as a match.
const FUZZY_THRESHOLD: u32 = 40;

/// Attributes of the requesting user that drive the visibility gate.
#[derive(Debug, Clone)]
pub struct Viewer {
    pub user_id: String,
    pub role: Role,
    pub gender: Gender,
}

/// Text-matching strategy for src/dest filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchStrategy {
    /// Case-insensitive anchored prefix
    Prefix,
    /// Tiered similarity scoring, typo tolerant
    #[default]
    Fuzzy,
}

impl MatchStrategy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "prefix" => Some(MatchStrategy::Prefix),
            "fuzzy" => Some(MatchStrategy::Fuzzy),
            _ => None,
        }
    }
}

/// Fields the feed may sort on. Anything else is rejected up front instead
/// of being fed to the store as a dynamic field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    CreatedAt,
    TripDate,
    TripTime,
    Src,
    Dest,
}

impl SortField {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "createdAt" => Some(SortField::CreatedAt),
            "tripDate" => Some(SortField::TripDate),
            "tripTime" => Some(SortField::TripTime),
            "src" => Some(SortField::Src),
            "dest" => Some(SortField::Dest),
            _ => None,
        }
    }

    fn key<'a>(&self, post: &'a Post) -> &'a str {
        match self {
            SortField::CreatedAt => &post.created_at,
            SortField::TripDate => &post.trip_date,
            SortField::TripTime => &post.trip_time,
            SortField::Src => &post.src,
            SortField::Dest => &post.dest,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }
}

/// Parsed and validated feed query.
#[derive(Debug, Clone, Default)]
pub struct PostQuery {
    pub src: Option<String>,
    pub dest: Option<String>,
    pub transportation: Option<String>,
    pub trip_date: Option<String>,
    pub trip_time: Option<String>,
    /// Restrict to one owner; absent means "discover others"
    pub posted_by: Option<String>,
    pub strategy: MatchStrategy,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
    /// 1-indexed
    pub page: u32,
    pub limit: u32,
}

/// Visibility scopes the viewer is allowed to see.
///
/// Always `{all}`; employees additionally see employee-only, female viewers
/// additionally see female-only.
pub fn allowed_scopes(viewer: &Viewer) -> Vec<Visibility> {
    let mut scopes = vec![Visibility::All];
    if viewer.role == Role::Employee {
        scopes.push(Visibility::EmployeeOnly);
    }
    if viewer.gender == Gender::Female {
        scopes.push(Visibility::FemaleOnly);
    }
    scopes
}

/// Run the full feed pipeline over the loaded post set.
///
/// Returns the page slice and the total count of the filtered set.
pub fn run_query(viewer: &Viewer, posts: Vec<Post>, query: &PostQuery) -> (Vec<Post>, usize) {
    let scopes = allowed_scopes(viewer);

    let mut eligible: Vec<Post> = posts
        .into_iter()
        .filter(|post| scopes.contains(&post.visible_to))
        .filter(|post| match &query.posted_by {
            // Explicit owner filter wins, including postedBy=self.
            Some(owner) => &post.user_id == owner,
            None => post.user_id != viewer.user_id,
        })
        .filter(|post| field_eq(&query.transportation, transportation_str(post)))
        .filter(|post| field_eq(&query.trip_date, &post.trip_date))
        .filter(|post| field_eq(&query.trip_time, &post.trip_time))
        .collect();

    eligible = match query.strategy {
        MatchStrategy::Prefix => eligible
            .into_iter()
            .filter(|post| prefix_matches(&query.src, &post.src))
            .filter(|post| prefix_matches(&query.dest, &post.dest))
            .collect(),
        MatchStrategy::Fuzzy => fuzzy_filter(eligible, &query.src, &query.dest),
    };

    sort_posts(&mut eligible, query.sort_by, query.sort_order);

    let total = eligible.len();
    (paginate(eligible, query.page, query.limit), total)
}

fn field_eq(filter: &Option<String>, value: &str) -> bool {
    match filter {
        Some(wanted) => wanted == value,
        None => true,
    }
}

fn transportation_str(post: &Post) -> &'static str {
    use crate::models::Transportation::*;
    match post.transportation {
        Bike => "Bike",
        Auto => "Auto",
        Car => "Car",
        Bus => "Bus",
        Unknown => "Unknown",
    }
}

fn prefix_matches(filter: &Option<String>, value: &str) -> bool {
    match filter {
        Some(prefix) => value.to_lowercase().starts_with(&prefix.to_lowercase()),
        None => true,
    }
}

/// Fuzzy path: score every eligible post per queried field and concatenate
/// the per-field match sets. When both src and dest are queried, a post
/// must match on at least one field to survive; posts matching both are
/// kept once (the feed is a set, unlike route search).
fn fuzzy_filter(posts: Vec<Post>, src: &Option<String>, dest: &Option<String>) -> Vec<Post> {
    if src.is_none() && dest.is_none() {
        return posts;
    }

    posts
        .into_iter()
        .filter(|post| {
            let src_hit = src
                .as_deref()
                .map(|q| fuzzy_score(q, &post.src) >= FUZZY_THRESHOLD)
                .unwrap_or(false);
            let dest_hit = dest
                .as_deref()
                .map(|q| fuzzy_score(q, &post.dest) >= FUZZY_THRESHOLD)
                .unwrap_or(false);
            src_hit || dest_hit
        })
        .collect()
}

/// Similarity score between a query and a candidate (higher = better).
///
/// Tiers: exact 100, prefix 90, word-start 75, substring 50, then a
/// length-normalized edit-distance fallback for typos. Case-insensitive.
pub fn fuzzy_score(query: &str, candidate: &str) -> u32 {
    let query = query.trim().to_lowercase();
    let candidate_lower = candidate.trim().to_lowercase();

    if query.is_empty() {
        return 100;
    }
    if candidate_lower == query {
        return 100;
    }
    if candidate_lower.starts_with(&query) {
        return 90;
    }
    if candidate_lower
        .split_whitespace()
        .any(|word| word.starts_with(&query))
    {
        return 75;
    }
    if candidate_lower.contains(&query) {
        return 50;
    }

    // Typo tolerance: distance relative to the longer string.
    let distance = edit_distance(&query, &candidate_lower);
    let longest = query.chars().count().max(candidate_lower.chars().count());
    if longest == 0 {
        return 0;
    }
    let similarity = 100 - (distance * 100 / longest) as u32;
    if similarity >= 60 {
        similarity.min(49)
    } else {
        0
    }
}

/// Classic two-row Levenshtein over chars.
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

fn sort_posts(posts: &mut [Post], field: SortField, order: SortOrder) {
    posts.sort_by(|a, b| {
        let cmp = field.key(a).cmp(field.key(b));
        // Stable tiebreak on id so pagination never straddles duplicates
        // differently between pages.
        let cmp = if cmp == Ordering::Equal {
            a.id.cmp(&b.id)
        } else {
            cmp
        };
        match order {
            SortOrder::Asc => cmp,
            SortOrder::Desc => cmp.reverse(),
        }
    });
}

/// 1-indexed page slice with a clamped limit.
pub fn paginate(posts: Vec<Post>, page: u32, limit: u32) -> Vec<Post> {
    let limit = limit.clamp(1, MAX_LIMIT) as usize;
    let start = (page.max(1) as usize - 1).saturating_mul(limit);
    if start >= posts.len() {
        return Vec::new();
    }
    let end = start.saturating_add(limit).min(posts.len());
    posts[start..end].to_vec()
}

/// Mask the local part of an institutional email address.
///
/// `cumail.in`: keep the text before the first `.`, replace the remainder
/// of the local part with `*` of equal length. `cuchd.in`: keep the first
/// five characters of the local part, mask the rest. Other domains pass
/// through untouched.
pub fn redact_email(email: &str) -> String {
    let Some((local, domain)) = email.rsplit_once('@') else {
        return email.to_string();
    };

    let masked_local = match domain {
        "cumail.in" => match local.split_once('.') {
            Some((keep, rest)) => format!("{}.{}", keep, "*".repeat(rest.chars().count())),
            None => local.to_string(),
        },
        "cuchd.in" => {
            let kept: String = local.chars().take(5).collect();
            let masked = local.chars().count().saturating_sub(5);
            format!("{}{}", kept, "*".repeat(masked))
        }
        _ => return email.to_string(),
    };

    format!("{}@{}", masked_local, domain)
}
