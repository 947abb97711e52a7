// =============================================================================
// SEAT LEDGER MODULE
// =============================================================================
// Reserve/release arithmetic on a single ticket's seat counter, plus the one
// function that derives status from that counter.
//
// LEARNING NOTES:
// - Everything here is pure: it takes the current record and returns the next
//   one. Atomicity is the store's job (row lock or map entry guard); the store
//   calls `apply_seat_change` while it holds the lock.
// - Because the check and the write happen under the same lock, two callers
//   can never both see "enough seats" for the last seats.
// =============================================================================

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::models::{Ticket, TicketStatus};

/// A seat-count adjustment requested by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatChange {
    Reserve(i32),
    Release(i32),
}

impl SeatChange {
    pub fn quantity(&self) -> i32 {
        match self {
            SeatChange::Reserve(q) | SeatChange::Release(q) => *q,
        }
    }

    /// Label used in logs and metrics.
    pub fn operation(&self) -> &'static str {
        match self {
            SeatChange::Reserve(_) => "reserve",
            SeatChange::Release(_) => "release",
        }
    }
}

/// Operator-selectable behavior for the two edge cases of the ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeatPolicy {
    /// Cap releases at `total_seats`. Off: a release larger than the number
    /// of reserved seats pushes `available_seats` above `total_seats`.
    pub clamp_release_to_total: bool,

    /// Refuse reserve/release on cancelled or completed tickets.
    pub reject_closed_tickets: bool,
}

// -----------------------------------------------------------------------------
// QUANTITY PARSING
// -----------------------------------------------------------------------------
/// Accepts a JSON integer in `1..=i32::MAX`. Anything else (missing, zero,
/// negative, fractional, string) is a ValidationError.
pub fn parse_quantity(raw: Option<&Value>) -> AppResult<i32> {
    let value = raw.ok_or_else(|| AppError::Validation("quantity is required".to_string()))?;

    let quantity = value
        .as_i64()
        .ok_or_else(|| AppError::Validation(format!("quantity must be an integer, got {}", value)))?;

    if quantity <= 0 {
        return Err(AppError::Validation(
            "quantity must be a positive integer".to_string(),
        ));
    }

    i32::try_from(quantity).map_err(|_| AppError::Validation("quantity is too large".to_string()))
}

// -----------------------------------------------------------------------------
// STATUS DERIVATION
// -----------------------------------------------------------------------------
/// Next status after the seat counter changed.
///
/// - active -> sold-out when no seats remain
/// - sold-out -> active when seats are available again
/// - cancelled / completed are never changed here
pub fn derive_status(current: TicketStatus, available_seats: i32) -> TicketStatus {
    match current {
        TicketStatus::Active if available_seats == 0 => TicketStatus::SoldOut,
        TicketStatus::SoldOut if available_seats > 0 => TicketStatus::Active,
        other => other,
    }
}

// -----------------------------------------------------------------------------
// APPLY
// -----------------------------------------------------------------------------
/// Compute the ticket that results from `change`.
///
/// On error the caller must leave the stored record untouched.
pub fn apply_seat_change(
    ticket: &Ticket,
    change: SeatChange,
    policy: SeatPolicy,
    now: DateTime<Utc>,
) -> AppResult<Ticket> {
    let quantity = change.quantity();
    if quantity <= 0 {
        return Err(AppError::Validation(
            "quantity must be a positive integer".to_string(),
        ));
    }

    if policy.reject_closed_tickets && ticket.status.is_closed() {
        return Err(AppError::TicketClosed {
            status: ticket.status,
        });
    }

    let available_seats = match change {
        SeatChange::Reserve(requested) => {
            if requested > ticket.available_seats {
                return Err(AppError::InsufficientSeats {
                    available: ticket.available_seats,
                    requested,
                });
            }
            ticket.available_seats - requested
        }
        SeatChange::Release(released) => {
            let next = ticket.available_seats.checked_add(released).ok_or_else(|| {
                AppError::Validation("release would overflow the seat counter".to_string())
            })?;
            if policy.clamp_release_to_total {
                next.min(ticket.total_seats)
            } else {
                next
            }
        }
    };

    let mut next = ticket.clone();
    next.available_seats = available_seats;
    next.status = derive_status(ticket.status, available_seats);
    next.updated_at = now;
    Ok(next)
}
