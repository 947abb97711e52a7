// =============================================================================
// POSTGRES STORE
// =============================================================================
// PostgreSQL-backed ticket storage.
//
// LEARNING NOTES:
// - Every mutation runs in a transaction that first locks the ticket row
//   with SELECT ... FOR UPDATE. A second transaction touching the same row
//   waits until the first commits, then sees the new seat count. That is
//   what prevents two reservations from both taking the last seats.
// - The seat rules themselves live in `ledger` and run in Rust while the row
//   is locked; SQL only loads and stores the record.
// =============================================================================

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use super::{merge_patch, not_found, TicketStore};
use crate::error::AppResult;
use crate::ledger::{apply_seat_change, SeatChange, SeatPolicy};
use crate::metrics;
use crate::models::{NewTicket, Ticket, TicketFilter, TicketPatch};

/// Column list shared by every query that returns a full Ticket.
const TICKET_COLUMNS: &str = r#"id, event_name, event_type, venue, "date", "time", price,
    currency, total_seats, available_seats, description, image_url, status,
    created_at, updated_at"#;

#[derive(Clone)]
pub struct PostgresTicketStore {
    /// SQLx PostgreSQL connection pool
    pool: PgPool,
}

impl PostgresTicketStore {
    // -------------------------------------------------------------------------
    // CONNECTION
    // -------------------------------------------------------------------------
    /// Create a new database connection pool
    ///
    /// # Arguments
    /// * `database_url` - PostgreSQL connection string
    /// * `max_connections` - upper bound on pooled connections
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(1)
            // How long to wait for a connection before giving up
            .acquire_timeout(Duration::from_secs(5))
            // How long a connection can be idle before being closed
            .idle_timeout(Duration::from_secs(300))
            .connect(database_url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        Ok(Self { pool })
    }

    // -------------------------------------------------------------------------
    // MIGRATIONS
    // -------------------------------------------------------------------------
    /// Create the tickets table and its indexes if they do not exist.
    pub async fn run_migrations(&self) -> Result<()> {
        // IF NOT EXISTS keeps this idempotent (safe on every start)
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tickets (
                id UUID PRIMARY KEY,
                event_name TEXT NOT NULL,
                event_type TEXT NOT NULL,
                venue TEXT NOT NULL,
                "date" DATE NOT NULL,
                "time" TEXT NOT NULL,
                price NUMERIC(12, 2) NOT NULL,
                currency TEXT NOT NULL DEFAULT 'USD',
                total_seats INTEGER NOT NULL,
                available_seats INTEGER NOT NULL,
                description TEXT,
                image_url TEXT,
                status TEXT NOT NULL DEFAULT 'active',
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

                CONSTRAINT valid_event_type CHECK (event_type IN
                    ('movie', 'concert', 'sports', 'theater', 'conference', 'other')),
                CONSTRAINT valid_status CHECK (status IN
                    ('active', 'sold-out', 'cancelled', 'completed')),
                CONSTRAINT non_negative_price CHECK (price >= 0),
                CONSTRAINT non_negative_total CHECK (total_seats >= 0),

                -- Upper bound (available <= total) is enforced by the service;
                -- unclamped releases are allowed to exceed it
                CONSTRAINT non_negative_available CHECK (available_seats >= 0)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create tickets table")?;

        for (name, ddl) in [
            ("date", r#"CREATE INDEX IF NOT EXISTS idx_tickets_date ON tickets("date")"#),
            (
                "event_type",
                "CREATE INDEX IF NOT EXISTS idx_tickets_event_type ON tickets(event_type)",
            ),
            (
                "status",
                "CREATE INDEX IF NOT EXISTS idx_tickets_status ON tickets(status)",
            ),
        ] {
            sqlx::query(ddl)
                .execute(&self.pool)
                .await
                .with_context(|| format!("Failed to create {} index", name))?;
        }

        Ok(())
    }

    // -------------------------------------------------------------------------
    // ROW HELPERS
    // -------------------------------------------------------------------------

    /// Load and lock one ticket inside `tx`.
    async fn lock_ticket(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> AppResult<Ticket> {
        let sql = format!("SELECT {} FROM tickets WHERE id = $1 FOR UPDATE", TICKET_COLUMNS);
        sqlx::query_as::<_, Ticket>(&sql)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// Overwrite every mutable column of `ticket` inside `tx`.
    async fn write_ticket(
        tx: &mut Transaction<'_, Postgres>,
        ticket: &Ticket,
    ) -> AppResult<Ticket> {
        let sql = format!(
            r#"
            UPDATE tickets
            SET event_name = $2, event_type = $3, venue = $4, "date" = $5, "time" = $6,
                price = $7, currency = $8, total_seats = $9, available_seats = $10,
                description = $11, image_url = $12, status = $13, updated_at = $14
            WHERE id = $1
            RETURNING {}
            "#,
            TICKET_COLUMNS
        );

        let stored = sqlx::query_as::<_, Ticket>(&sql)
            .bind(ticket.id)
            .bind(&ticket.event_name)
            .bind(ticket.event_type)
            .bind(&ticket.venue)
            .bind(ticket.date)
            .bind(&ticket.time)
            .bind(ticket.price)
            .bind(&ticket.currency)
            .bind(ticket.total_seats)
            .bind(ticket.available_seats)
            .bind(&ticket.description)
            .bind(&ticket.image_url)
            .bind(ticket.status)
            .bind(ticket.updated_at)
            .fetch_one(&mut **tx)
            .await?;

        Ok(stored)
    }
}

#[async_trait]
impl TicketStore for PostgresTicketStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    // -------------------------------------------------------------------------
    // READ OPERATIONS
    // -------------------------------------------------------------------------

    async fn list(&self, filter: &TicketFilter) -> AppResult<Vec<Ticket>> {
        let start = Instant::now();

        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM tickets WHERE TRUE", TICKET_COLUMNS));

        if let Some(event_type) = filter.event_type {
            query.push(" AND event_type = ").push_bind(event_type);
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status);
        }
        if let Some(min_price) = filter.min_price {
            query.push(" AND price >= ").push_bind(min_price);
        }
        if let Some(max_price) = filter.max_price {
            query.push(" AND price <= ").push_bind(max_price);
        }
        if let Some(date) = filter.date {
            query.push(r#" AND "date" = "#).push_bind(date);
        }
        query.push(r#" ORDER BY "date" ASC, created_at ASC, id ASC"#);

        let tickets = query
            .build_query_as::<Ticket>()
            .fetch_all(&self.pool)
            .await?;

        metrics::record_db_query("select", start.elapsed().as_secs_f64());
        Ok(tickets)
    }

    async fn get(&self, id: Uuid) -> AppResult<Ticket> {
        let start = Instant::now();
        let sql = format!("SELECT {} FROM tickets WHERE id = $1", TICKET_COLUMNS);

        let ticket = sqlx::query_as::<_, Ticket>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found(id))?;

        metrics::record_db_query("select", start.elapsed().as_secs_f64());
        Ok(ticket)
    }

    async fn count(&self) -> AppResult<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tickets")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }

    // -------------------------------------------------------------------------
    // WRITE OPERATIONS
    // -------------------------------------------------------------------------

    async fn create(&self, new: NewTicket) -> AppResult<Ticket> {
        let start = Instant::now();
        let ticket = Ticket::from_new(new, Utc::now());

        let sql = format!(
            r#"
            INSERT INTO tickets ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING {}
            "#,
            TICKET_COLUMNS, TICKET_COLUMNS
        );

        let stored = sqlx::query_as::<_, Ticket>(&sql)
            .bind(ticket.id)
            .bind(&ticket.event_name)
            .bind(ticket.event_type)
            .bind(&ticket.venue)
            .bind(ticket.date)
            .bind(&ticket.time)
            .bind(ticket.price)
            .bind(&ticket.currency)
            .bind(ticket.total_seats)
            .bind(ticket.available_seats)
            .bind(&ticket.description)
            .bind(&ticket.image_url)
            .bind(ticket.status)
            .bind(ticket.created_at)
            .bind(ticket.updated_at)
            .fetch_one(&self.pool)
            .await?;

        metrics::record_db_query("insert", start.elapsed().as_secs_f64());
        Ok(stored)
    }

    async fn update(&self, id: Uuid, patch: &TicketPatch) -> AppResult<Ticket> {
        let start = Instant::now();
        let mut tx = self.pool.begin().await?;

        let current = Self::lock_ticket(&mut tx, id).await?;
        let next = merge_patch(&current, patch, Utc::now())?;
        let stored = Self::write_ticket(&mut tx, &next).await?;

        tx.commit().await?;

        metrics::record_db_query("update", start.elapsed().as_secs_f64());
        Ok(stored)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let start = Instant::now();

        let result = sqlx::query("DELETE FROM tickets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        metrics::record_db_query("delete", start.elapsed().as_secs_f64());

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    /// Reserve or release seats under a row lock.
    ///
    /// A ledger error (insufficient seats, closed ticket) drops the
    /// transaction, which rolls it back and releases the lock untouched.
    async fn adjust_seats(
        &self,
        id: Uuid,
        change: SeatChange,
        policy: SeatPolicy,
    ) -> AppResult<Ticket> {
        let start = Instant::now();
        let mut tx = self.pool.begin().await?;

        let current = Self::lock_ticket(&mut tx, id).await?;
        let next = apply_seat_change(&current, change, policy, Utc::now())?;

        let sql = format!(
            r#"
            UPDATE tickets
            SET available_seats = $2, status = $3, updated_at = $4
            WHERE id = $1
            RETURNING {}
            "#,
            TICKET_COLUMNS
        );

        let stored = sqlx::query_as::<_, Ticket>(&sql)
            .bind(next.id)
            .bind(next.available_seats)
            .bind(next.status)
            .bind(next.updated_at)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        metrics::record_db_query("update", start.elapsed().as_secs_f64());
        Ok(stored)
    }

    // -------------------------------------------------------------------------
    // HEALTH CHECK
    // -------------------------------------------------------------------------

    async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }
}
