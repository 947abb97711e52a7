// =============================================================================
// STORE MODULE
// =============================================================================
// Persistence for Ticket records behind one trait, with two backends:
//
// - postgres: production storage (sqlx, row-level locks)
// - memory:   DashMap-backed storage for local runs and tests
//
// LEARNING NOTE:
// Handlers hold an `Arc<dyn TicketStore>`, so they never know which backend
// is active. Both backends call the same pure functions (validation, ledger)
// while holding their per-ticket lock, which keeps the behavior identical.
// =============================================================================

mod memory;
mod postgres;

pub use memory::MemoryTicketStore;
pub use postgres::PostgresTicketStore;

use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::ledger::{SeatChange, SeatPolicy};
use crate::models::{NewTicket, Ticket, TicketFilter, TicketPatch};
use crate::validation::check_seat_bounds;

/// Storage operations for tickets.
///
/// Every mutating method replaces the whole stored record in one step;
/// readers never observe a half-applied change.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Short backend name for logs ("postgres", "memory").
    fn backend(&self) -> &'static str;

    /// All tickets matching `filter`, ascending by date.
    async fn list(&self, filter: &TicketFilter) -> AppResult<Vec<Ticket>>;

    async fn get(&self, id: Uuid) -> AppResult<Ticket>;

    async fn create(&self, new: NewTicket) -> AppResult<Ticket>;

    /// Overwrite the supplied fields. Seat bounds are re-checked on the merged
    /// record when the patch touches either seat counter.
    async fn update(&self, id: Uuid, patch: &TicketPatch) -> AppResult<Ticket>;

    async fn delete(&self, id: Uuid) -> AppResult<()>;

    /// Reserve or release seats atomically with respect to every other
    /// mutation of the same ticket.
    async fn adjust_seats(
        &self,
        id: Uuid,
        change: SeatChange,
        policy: SeatPolicy,
    ) -> AppResult<Ticket>;

    /// Number of stored tickets.
    async fn count(&self) -> AppResult<i64>;

    /// Whether the backend currently answers queries.
    async fn health_check(&self) -> bool;
}

// -----------------------------------------------------------------------------
// SHARED HELPERS
// -----------------------------------------------------------------------------

/// Merge `patch` into a copy of `ticket`, enforcing seat bounds when needed.
pub(crate) fn merge_patch(
    ticket: &Ticket,
    patch: &TicketPatch,
    now: DateTime<Utc>,
) -> AppResult<Ticket> {
    let mut next = ticket.clone();
    patch.apply_to(&mut next, now);
    if patch.touches_seats() {
        check_seat_bounds(next.total_seats, next.available_seats)?;
    }
    Ok(next)
}

/// Ascending by date, then creation time, then id, so ties are stable.
pub(crate) fn sort_for_listing(tickets: &mut [Ticket]) {
    tickets.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then(a.created_at.cmp(&b.created_at))
            .then(a.id.cmp(&b.id))
    });
}

pub(crate) fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(id.to_string())
}

// -----------------------------------------------------------------------------
// BACKEND SELECTION
// -----------------------------------------------------------------------------
/// Open the store named by `DATABASE_URL`.
///
/// - `postgres://` / `postgresql://`: connect, then create tables
/// - `memory://`: empty in-process store
pub async fn connect(config: &Config) -> Result<Arc<dyn TicketStore>> {
    let url = config.database_url.as_str();

    if url.starts_with("memory://") {
        return Ok(Arc::new(MemoryTicketStore::new()));
    }

    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        let store = PostgresTicketStore::connect(url, config.database_max_connections).await?;
        store.run_migrations().await?;
        return Ok(Arc::new(store));
    }

    bail!("Unsupported DATABASE_URL scheme (expected postgres:// or memory://)")
}
