// SPDX-License-Identifier: MIT

//! Campool: carpooling backend for a university community.
//!
//! Users register with institutional emails (verified by directory lookup
//! and OTP), post trip offers, browse a visibility-scoped feed with fuzzy
//! route search, and receive push notifications.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::FirestoreDb;
use services::{DirectoryService, Mailer, PushService, TokenService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub tokens: TokenService,
    pub directory: DirectoryService,
    pub mailer: Mailer,
    pub push: PushService,
}
