// SPDX-License-Identifier: MIT

//! Campool API Server
//!
//! Carpooling backend for a university community: OTP-verified accounts,
//! visibility-scoped trip posts, route registry, and push notifications.

use campool::{
    config::Config,
    db::FirestoreDb,
    services::{DirectoryService, Mailer, PushService, TokenService},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Campool API");

    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    let tokens = TokenService::new(&config);
    let directory = DirectoryService::new(db.clone());
    let mailer = Mailer::new(&config);
    let push = PushService::new(config.fcm_server_key.clone());

    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        tokens,
        directory,
        mailer,
        push,
    });

    let app = campool::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("campool=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
