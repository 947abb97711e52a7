// =============================================================================
// HANDLERS MODULE
// =============================================================================
// HTTP request handlers (controller layer).
//
// LEARNING NOTES:
// - Handlers are thin: parse/validate input, call the store, keep the cache
//   and metrics up to date, return JSON
// - Business rules live in `validation` and `ledger`; atomicity lives in the
//   store implementations
//
// AXUM EXTRACTORS USED:
// - State<T>: shared application state
// - Path<T>: /api/tickets/:id -> id
// - Query<T>: ?eventType=concert -> ListParams
// - ApiJson<T>: request body (axum's Json, with rejections as ValidationError)
// =============================================================================

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::error::{ApiJson, AppError, AppResult};
use crate::ledger::{self, SeatChange};
use crate::metrics;
use crate::models::*;
use crate::validation;
use crate::AppState;

/// Record request count and latency for a finished handler.
fn observe<T>(
    method: &str,
    endpoint: &str,
    start: Instant,
    result: &AppResult<T>,
    success: StatusCode,
) {
    let status = match result {
        Ok(_) => success,
        Err(e) => e.status_code(),
    };
    metrics::record_http_request(
        method,
        endpoint,
        status.as_u16(),
        start.elapsed().as_secs_f64(),
    );
}

// =============================================================================
// HEALTH CHECK ENDPOINTS
// =============================================================================

/// Liveness check - always 200 while the process is up
///
/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "ticket-inventory-service".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness check - are the store and (if configured) the cache reachable?
///
/// GET /ready
pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let store_healthy = state.store.health_check().await;
    let cache_healthy = state.cache.health_check().await;

    let all_healthy = store_healthy && cache_healthy.unwrap_or(true);
    let (status, label) = if all_healthy {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not_ready")
    };

    let response = ReadinessResponse {
        status: label.to_string(),
        checks: ReadinessChecks {
            store: store_healthy,
            cache: cache_healthy,
        },
    };

    (status, Json(response))
}

/// Prometheus metrics endpoint
///
/// GET /metrics
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> String {
    state.metrics_handle.render()
}

// =============================================================================
// TICKET API ENDPOINTS
// =============================================================================

// -----------------------------------------------------------------------------
// LIST TICKETS
// -----------------------------------------------------------------------------
/// List tickets, optionally filtered, ordered by event date
///
/// GET /api/tickets
/// GET /api/tickets?eventType=concert&status=active&minPrice=20&maxPrice=100&date=2025-07-12
pub async fn list_tickets(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<Vec<Ticket>>> {
    let start = Instant::now();

    let result = async {
        let filter = validation::parse_filter(params)?;
        state.store.list(&filter).await
    }
    .await;

    observe("GET", "/api/tickets", start, &result, StatusCode::OK);

    let tickets = result?;
    metrics::set_tickets_listed(tickets.len());
    Ok(Json(tickets))
}

// -----------------------------------------------------------------------------
// GET SINGLE TICKET
// -----------------------------------------------------------------------------
/// Get one ticket, served from the cache when possible
///
/// A miss fills the cache with what the store returned. The fill is
/// versioned, so it never replaces a copy written by a later mutation.
///
/// GET /api/tickets/:id
///
/// # Response
/// - 200 OK: ticket JSON
/// - 404 Not Found: unknown or malformed id
pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> AppResult<Json<Ticket>> {
    let start = Instant::now();

    let result = async {
        let id = validation::parse_ticket_id(&raw_id)?;

        if let Some(ticket) = state.cache.get(id).await {
            return Ok(ticket);
        }

        let ticket = state.store.get(id).await?;
        state.cache.put(&ticket).await;
        Ok::<_, AppError>(ticket)
    }
    .await;

    observe("GET", "/api/tickets/:id", start, &result, StatusCode::OK);
    Ok(Json(result?))
}

// -----------------------------------------------------------------------------
// CREATE TICKET
// -----------------------------------------------------------------------------
/// Create a ticket listing
///
/// POST /api/tickets
///
/// # Response
/// - 201 Created: stored ticket with id and timestamps
/// - 400 Bad Request: missing field, bad enum, negative number
/// - 500: storage failure
pub async fn create_ticket(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<CreateTicketRequest>,
) -> AppResult<(StatusCode, Json<Ticket>)> {
    let start = Instant::now();

    let result = async {
        let new = validation::validate_new_ticket(request)?;
        state.store.create(new).await
    }
    .await;

    observe("POST", "/api/tickets", start, &result, StatusCode::CREATED);

    let ticket = result?;
    tracing::info!(
        ticket_id = %ticket.id,
        event_name = %ticket.event_name,
        total_seats = ticket.total_seats,
        "Ticket created"
    );
    metrics::set_available_seats(&ticket.id.to_string(), ticket.available_seats);

    Ok((StatusCode::CREATED, Json(ticket)))
}

// -----------------------------------------------------------------------------
// UPDATE TICKET
// -----------------------------------------------------------------------------
/// Overwrite the supplied fields of a ticket
///
/// PUT /api/tickets/:id
///
/// # Request Body
/// ```json
/// { "status": "cancelled" }
/// ```
pub async fn update_ticket(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    ApiJson(request): ApiJson<UpdateTicketRequest>,
) -> AppResult<Json<Ticket>> {
    let start = Instant::now();

    let result = async {
        let id = validation::parse_ticket_id(&raw_id)?;
        let patch = validation::validate_patch(request)?;
        let ticket = state.store.update(id, &patch).await?;
        state.cache.put(&ticket).await;
        Ok::<_, AppError>(ticket)
    }
    .await;

    observe("PUT", "/api/tickets/:id", start, &result, StatusCode::OK);

    let ticket = result?;
    tracing::info!(ticket_id = %ticket.id, status = %ticket.status, "Ticket updated");
    metrics::set_available_seats(&ticket.id.to_string(), ticket.available_seats);

    Ok(Json(ticket))
}

// -----------------------------------------------------------------------------
// DELETE TICKET
// -----------------------------------------------------------------------------
/// Delete a ticket
///
/// DELETE /api/tickets/:id
pub async fn delete_ticket(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> AppResult<Json<DeleteResponse>> {
    let start = Instant::now();

    let result = async {
        let id = validation::parse_ticket_id(&raw_id)?;
        state.store.delete(id).await?;
        state.cache.mark_deleted(id).await;
        Ok::<_, AppError>(id)
    }
    .await;

    observe("DELETE", "/api/tickets/:id", start, &result, StatusCode::OK);

    let id = result?;
    tracing::info!(ticket_id = %id, "Ticket deleted");
    metrics::clear_available_seats(&id.to_string());

    Ok(Json(DeleteResponse {
        message: "Ticket deleted successfully".to_string(),
        id,
    }))
}

// -----------------------------------------------------------------------------
// RESERVE / RELEASE SEATS
// -----------------------------------------------------------------------------
/// Reserve seats on a ticket
///
/// POST /api/tickets/:id/reserve
///
/// # Request Body
/// ```json
/// { "quantity": 2 }
/// ```
///
/// # Response
/// - 200 OK: updated ticket
/// - 400 Bad Request: bad quantity or not enough seats
/// - 404 Not Found: unknown ticket
/// - 409 Conflict: ticket cancelled/completed (when guarded)
pub async fn reserve_seats(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    ApiJson(request): ApiJson<SeatRequest>,
) -> AppResult<Json<Ticket>> {
    adjust_seats(&state, &raw_id, request, SeatChange::Reserve, "/api/tickets/:id/reserve").await
}

/// Return seats to a ticket
///
/// POST /api/tickets/:id/release
pub async fn release_seats(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    ApiJson(request): ApiJson<SeatRequest>,
) -> AppResult<Json<Ticket>> {
    adjust_seats(&state, &raw_id, request, SeatChange::Release, "/api/tickets/:id/release").await
}

async fn adjust_seats(
    state: &AppState,
    raw_id: &str,
    request: SeatRequest,
    make_change: fn(i32) -> SeatChange,
    endpoint: &str,
) -> AppResult<Json<Ticket>> {
    let start = Instant::now();
    let operation = make_change(1).operation();

    let result = async {
        let id = validation::parse_ticket_id(raw_id)?;
        let quantity = ledger::parse_quantity(request.quantity.as_ref())?;

        tracing::info!(ticket_id = %id, quantity, operation, "Adjusting seats");

        let ticket = state
            .store
            .adjust_seats(id, make_change(quantity), state.seat_policy)
            .await?;
        state.cache.put(&ticket).await;
        Ok::<_, AppError>(ticket)
    }
    .await;

    observe("POST", endpoint, start, &result, StatusCode::OK);

    match result {
        Ok(ticket) => {
            metrics::record_seat_operation(operation, "success");
            metrics::set_available_seats(&ticket.id.to_string(), ticket.available_seats);
            tracing::info!(
                ticket_id = %ticket.id,
                available_seats = ticket.available_seats,
                status = %ticket.status,
                operation,
                "Seats adjusted"
            );
            Ok(Json(ticket))
        }
        Err(e) => {
            metrics::record_seat_operation(operation, e.code());
            Err(e)
        }
    }
}
