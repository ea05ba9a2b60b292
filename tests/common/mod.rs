// SPDX-License-Identifier: MIT

use campool::config::Config;
use campool::db::FirestoreDb;
use campool::routes::create_router;
use campool::services::{DirectoryService, Mailer, PushService, TokenService};
use campool::AppState;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    build_test_app(test_db_offline())
}

/// Create a test app backed by a specific database (e.g. the emulator),
/// with the remaining dependencies mocked.
#[allow(dead_code)]
pub fn create_test_app_with_db(db: FirestoreDb) -> (axum::Router, Arc<AppState>) {
    build_test_app(db)
}

#[allow(dead_code)]
fn build_test_app(db: FirestoreDb) -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();

    let tokens = TokenService::new(&config);
    let directory = DirectoryService::new(db.clone());
    let mailer = Mailer::new_console();
    let push = PushService::new_disabled();

    let state = Arc::new(AppState {
        config,
        db,
        tokens,
        directory,
        mailer,
        push,
    });

    (create_router(state.clone()), state)
}
