// =============================================================================
// TICKET INVENTORY SERVICE - Main Entry Point
// =============================================================================
// Boots the service: environment, logging, metrics, storage, cache, seed
// data, then the HTTP server.
// =============================================================================

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ticket_inventory_service::{
    build_router, cache::TicketCache, config::Config, metrics::setup_metrics, seed, store,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -------------------------------------------------------------------------
    // STEP 1: Load environment variables (.env is optional)
    // -------------------------------------------------------------------------
    dotenvy::dotenv().ok();

    // -------------------------------------------------------------------------
    // STEP 2: Initialize logging/tracing
    // -------------------------------------------------------------------------
    // RUST_LOG controls log levels, e.g. RUST_LOG=info,ticket_inventory_service=debug
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ticket_inventory_service=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting Ticket Inventory Service...");

    // -------------------------------------------------------------------------
    // STEP 3: Load configuration
    // -------------------------------------------------------------------------
    let config = Config::from_env()?;
    info!(
        port = config.port,
        clamp_release = config.seat_policy.clamp_release_to_total,
        reject_closed = config.seat_policy.reject_closed_tickets,
        "Configuration loaded"
    );

    // -------------------------------------------------------------------------
    // STEP 4: Set up Prometheus metrics
    // -------------------------------------------------------------------------
    let metrics_handle = setup_metrics()?;
    info!("Prometheus metrics initialized");

    // -------------------------------------------------------------------------
    // STEP 5: Open the ticket store (runs migrations for Postgres)
    // -------------------------------------------------------------------------
    let store = store::connect(&config).await?;
    info!(backend = store.backend(), "Ticket store ready");

    // -------------------------------------------------------------------------
    // STEP 6: Connect the ticket cache, if configured
    // -------------------------------------------------------------------------
    // REDIS_URL=memory:// selects an in-process cache
    let cache = match &config.redis_url {
        Some(url) => {
            let cache = TicketCache::connect(url, config.cache_ttl_secs).await?;
            info!(backend = cache.backend(), "Ticket cache connected");
            cache
        }
        None => {
            warn!("REDIS_URL not set, ticket cache disabled");
            TicketCache::disabled()
        }
    };

    // -------------------------------------------------------------------------
    // STEP 7: Seed sample data
    // -------------------------------------------------------------------------
    if config.seed_sample_data {
        let added = seed::seed_sample_data(store.as_ref()).await?;
        info!(added, "Sample tickets seeded");
    }

    // -------------------------------------------------------------------------
    // STEP 8: Build the router
    // -------------------------------------------------------------------------
    let state = Arc::new(AppState {
        store,
        cache,
        seat_policy: config.seat_policy,
        metrics_handle,
    });
    let app = build_router(state);

    // -------------------------------------------------------------------------
    // STEP 9: Start the HTTP server
    // -------------------------------------------------------------------------
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(address = %addr, "Ticket Inventory Service is listening");

    axum::serve(listener, app).await?;

    Ok(())
}
