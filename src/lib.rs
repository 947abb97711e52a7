// =============================================================================
// TICKET INVENTORY SERVICE - Library Root
// =============================================================================
// Event ticket listings with atomic seat reservation.
//
// WHAT THIS SERVICE DOES:
// - Stores ticket listings (concerts, movies, sports, ...)
// - Lists them with filters on type, status, price and date
// - Reserves and releases seats without ever overselling
// - Exposes Prometheus metrics and an optional Redis read cache
//
// The binary (main.rs) only wires configuration to `build_router`; tests
// build the same router around an in-memory store.
// =============================================================================

pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod metrics;
pub mod models;
pub mod seed;
pub mod store;
pub mod validation;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::cache::TicketCache;
use crate::ledger::SeatPolicy;
use crate::store::TicketStore;

// -----------------------------------------------------------------------------
// APPLICATION STATE
// -----------------------------------------------------------------------------
// Shared by every handler through State<Arc<AppState>>.
#[derive(Clone)]
pub struct AppState {
    /// Ticket storage (Postgres or in-memory)
    pub store: Arc<dyn TicketStore>,

    /// Read-through cache for single-ticket lookups
    pub cache: TicketCache,

    /// Reserve/release edge-case behavior
    pub seat_policy: SeatPolicy,

    /// Renders the /metrics page
    pub metrics_handle: PrometheusHandle,
}

// -----------------------------------------------------------------------------
// ROUTES
// -----------------------------------------------------------------------------
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // ----- Health & Readiness -----
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_handler))
        // ----- Ticket API -----
        .route(
            "/api/tickets",
            get(handlers::list_tickets).post(handlers::create_ticket),
        )
        .route(
            "/api/tickets/:id",
            get(handlers::get_ticket)
                .put(handlers::update_ticket)
                .delete(handlers::delete_ticket),
        )
        .route("/api/tickets/:id/reserve", post(handlers::reserve_seats))
        .route("/api/tickets/:id/release", post(handlers::release_seats))
        // ----- Middleware -----
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
