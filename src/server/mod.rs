mod handlers;
mod middleware;
mod routes;

pub use routes::create_router;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::db::Database;
use crate::schedule::{BookingEngine, EngineConfig};
use crate::webhook::WebhookNotifier;

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub engine: BookingEngine<Database>,
}

impl AppState {
    /// Build state whose engine publishes booking events to shop webhooks
    pub fn new(db: Database, config: EngineConfig) -> Self {
        let notifier = Arc::new(WebhookNotifier::new(db.clone()));
        let engine = BookingEngine::new(db.clone(), config).with_notifier(notifier);
        Self { db, engine }
    }
}

/// Run the API server
pub async fn run_server(addr: SocketAddr, db_path: &str, config: EngineConfig) -> Result<()> {
    config.validate()?;

    // Open database
    let db = Database::open(db_path)?;

    // Create app state
    let state = Arc::new(AppState::new(db, config));

    // Create router
    let app = create_router(state);

    tracing::info!(
        "Server listening on {} (slot step {} min, staff policy {:?})",
        addr,
        config.slot_step_minutes,
        config.staff_policy
    );

    // Run server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
