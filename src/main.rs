//! Verse lookup service.
//!
//! Serves `GET /search` over the verse table for the hover preview. The
//! modules live in the library crate:
//!
//! - `bible`: verse table and search
//! - `books`: book-name table
//! - `handlers`: HTTP routes
//! - `config`: `VERSES_*` environment settings
//! - `logging`: tracing subscriber setup

use std::sync::Arc;
use tracing::info;

use verses::{handlers, logging, AppState, Config};

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    logging::init_logging();

    let config = Config::from_env();
    let state = Arc::new(AppState::new(&config));
    let app = handlers::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to {}: {}", config.bind_addr, e));

    info!("Bible server running at http://{}", config.bind_addr);
    info!("Verse table: {}", config.bible_path.display());

    axum::serve(listener, app).await.expect("Server error");
}
