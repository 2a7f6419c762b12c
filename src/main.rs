//! Voice server control service.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────┐
//!   HTTP request     │  http ──▶ reconcile ──▶ store (sled/memory)   │
//!  ─────────────────▶│              │                                │
//!                    │              └──▶ reload ──▶ query session ───┼──▶ voice server
//!                    │                   (locate worker, notify)     │    query port
//!                    │                                               │
//!                    │  catalog (static)   config   observability    │
//!                    └──────────────────────────────────────────────┘
//! ```

use voice_control::config;
use voice_control::lifecycle::startup;
use voice_control::observability::logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::load_from_env()?;
    logging::init(&config.observability.log_level);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "voice-control starting");
    tracing::info!(
        bind_address = %config.http.bind_address,
        query_host = %config.query.host,
        query_port = config.query.query_port,
        store = ?config.database.backend,
        catalog = %config.catalog.path,
        "Configuration loaded"
    );

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
