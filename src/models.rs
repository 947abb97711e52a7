// =============================================================================
// MODELS MODULE
// =============================================================================
// Data structures used throughout the service: the Ticket record, its enums,
// and the request/response shapes of the HTTP API.
//
// LEARNING NOTES:
// - Request structs are deliberately loose (every field optional, enums as
//   strings). The `validation` module turns them into strict types, so a
//   missing field becomes a ValidationError instead of a framework rejection.
// - Ticket derives FromRow for Postgres and Serialize/Deserialize for both
//   the API and the Redis cache.
// =============================================================================

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Currency applied when a ticket is created without one.
pub const DEFAULT_CURRENCY: &str = "USD";

// =============================================================================
// ENUMS
// =============================================================================

/// Kind of event a ticket is sold for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Movie,
    Concert,
    Sports,
    Theater,
    Conference,
    Other,
}

impl EventType {
    pub const ALL: [EventType; 6] = [
        EventType::Movie,
        EventType::Concert,
        EventType::Sports,
        EventType::Theater,
        EventType::Conference,
        EventType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Movie => "movie",
            EventType::Concert => "concert",
            EventType::Sports => "sports",
            EventType::Theater => "theater",
            EventType::Conference => "conference",
            EventType::Other => "other",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("invalid eventType '{}'", s))
    }
}

/// Lifecycle status of a ticket listing.
///
/// `Active` and `SoldOut` are driven by the seat ledger. `Cancelled` and
/// `Completed` are administrative and only change through Update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum TicketStatus {
    #[default]
    Active,
    SoldOut,
    Cancelled,
    Completed,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 4] = [
        TicketStatus::Active,
        TicketStatus::SoldOut,
        TicketStatus::Cancelled,
        TicketStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Active => "active",
            TicketStatus::SoldOut => "sold-out",
            TicketStatus::Cancelled => "cancelled",
            TicketStatus::Completed => "completed",
        }
    }

    /// Administrative statuses the seat ledger never moves out of.
    pub fn is_closed(&self) -> bool {
        matches!(self, TicketStatus::Cancelled | TicketStatus::Completed)
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TicketStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("invalid status '{}'", s))
    }
}

// =============================================================================
// TICKET
// =============================================================================
// The single stored entity: seat inventory for one event instance.
//
// DERIVE MACROS EXPLAINED:
// - FromRow: SQLx maps `tickets` rows onto this struct (snake_case columns)
// - Serialize/Deserialize: camelCase JSON for the API and the cache
// -----------------------------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    /// Server-assigned identifier, never changes
    pub id: Uuid,

    pub event_name: String,

    pub event_type: EventType,

    pub venue: String,

    /// Calendar day of the event
    pub date: NaiveDate,

    /// Free-form clock string, e.g. "19:30" or "7:30 PM"
    pub time: String,

    /// Non-negative price per seat
    pub price: Decimal,

    pub currency: String,

    /// Capacity fixed at creation; reserve/release never change it
    pub total_seats: i32,

    /// Seats still on sale
    pub available_seats: i32,

    pub description: Option<String>,

    pub image_url: Option<String>,

    pub status: TicketStatus,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    /// Build a fresh record from validated input, assigning id and timestamps.
    pub fn from_new(new: NewTicket, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_name: new.event_name,
            event_type: new.event_type,
            venue: new.venue,
            date: new.date,
            time: new.time,
            price: new.price,
            currency: new.currency,
            total_seats: new.total_seats,
            available_seats: new.available_seats,
            description: new.description,
            image_url: new.image_url,
            status: new.status,
            created_at: now,
            updated_at: now,
        }
    }
}

// -----------------------------------------------------------------------------
// VALIDATED INPUT
// -----------------------------------------------------------------------------

/// A fully validated ticket ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTicket {
    pub event_name: String,
    pub event_type: EventType,
    pub venue: String,
    pub date: NaiveDate,
    pub time: String,
    pub price: Decimal,
    pub currency: String,
    pub total_seats: i32,
    pub available_seats: i32,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub status: TicketStatus,
}

/// Validated partial update: `None` means "leave the field alone".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketPatch {
    pub event_name: Option<String>,
    pub event_type: Option<EventType>,
    pub venue: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub price: Option<Decimal>,
    pub currency: Option<String>,
    pub total_seats: Option<i32>,
    pub available_seats: Option<i32>,
    /// `Some(None)` clears the description
    pub description: Option<Option<String>>,
    /// `Some(None)` clears the image url
    pub image_url: Option<Option<String>>,
    pub status: Option<TicketStatus>,
}

impl TicketPatch {
    /// True when the patch touches either seat counter.
    pub fn touches_seats(&self) -> bool {
        self.total_seats.is_some() || self.available_seats.is_some()
    }

    /// Overwrite the supplied fields on `ticket` and bump `updated_at`.
    pub fn apply_to(&self, ticket: &mut Ticket, now: DateTime<Utc>) {
        if let Some(v) = &self.event_name {
            ticket.event_name = v.clone();
        }
        if let Some(v) = self.event_type {
            ticket.event_type = v;
        }
        if let Some(v) = &self.venue {
            ticket.venue = v.clone();
        }
        if let Some(v) = self.date {
            ticket.date = v;
        }
        if let Some(v) = &self.time {
            ticket.time = v.clone();
        }
        if let Some(v) = self.price {
            ticket.price = v;
        }
        if let Some(v) = &self.currency {
            ticket.currency = v.clone();
        }
        if let Some(v) = self.total_seats {
            ticket.total_seats = v;
        }
        if let Some(v) = self.available_seats {
            ticket.available_seats = v;
        }
        if let Some(v) = &self.description {
            ticket.description = v.clone();
        }
        if let Some(v) = &self.image_url {
            ticket.image_url = v.clone();
        }
        if let Some(v) = self.status {
            ticket.status = v;
        }
        ticket.updated_at = now;
    }
}

/// Query filter for listing tickets. Every criterion is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketFilter {
    pub event_type: Option<EventType>,
    pub status: Option<TicketStatus>,
    /// Inclusive lower price bound
    pub min_price: Option<Decimal>,
    /// Inclusive upper price bound
    pub max_price: Option<Decimal>,
    /// Matches tickets on this calendar day
    pub date: Option<NaiveDate>,
}

impl TicketFilter {
    pub fn matches(&self, ticket: &Ticket) -> bool {
        self.event_type.map_or(true, |t| ticket.event_type == t)
            && self.status.map_or(true, |s| ticket.status == s)
            && self.min_price.map_or(true, |min| ticket.price >= min)
            && self.max_price.map_or(true, |max| ticket.price <= max)
            && self.date.map_or(true, |d| ticket.date == d)
    }
}

// =============================================================================
// API REQUEST/RESPONSE STRUCTURES
// =============================================================================

/// Request body for creating a ticket
///
/// # Example JSON
/// ```json
/// {
///   "eventName": "Summer Jazz Night",
///   "eventType": "concert",
///   "venue": "Blue Note",
///   "date": "2025-07-12",
///   "time": "20:00",
///   "price": 85,
///   "totalSeats": 200,
///   "availableSeats": 200
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicketRequest {
    pub event_name: Option<String>,
    pub event_type: Option<String>,
    pub venue: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub price: Option<Decimal>,
    pub currency: Option<String>,
    pub total_seats: Option<i64>,
    pub available_seats: Option<i64>,

    /// Absent: `None`. Explicit `null`: `Some(None)`, which clears the field
    /// on update.
    #[serde(default, with = "serde_with::rust::double_option")]
    pub description: Option<Option<String>>,

    #[serde(default, with = "serde_with::rust::double_option")]
    pub image_url: Option<Option<String>>,

    pub status: Option<String>,
}

/// Request body for a partial update. Same shape as create, nothing required.
pub type UpdateTicketRequest = CreateTicketRequest;

/// Request body for reserve and release
///
/// `quantity` is kept as raw JSON so that strings, floats and negatives are
/// reported as validation errors by the seat ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeatRequest {
    pub quantity: Option<serde_json::Value>,
}

/// Raw query string of the list endpoint
///
/// # Example
/// GET /api/tickets?eventType=concert&minPrice=50&date=2025-07-12
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub event_type: Option<String>,
    pub status: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub date: Option<String>,
}

/// Confirmation returned by delete
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub message: String,
    pub id: Uuid,
}

// =============================================================================
// HEALTH CHECK RESPONSES
// =============================================================================

/// Simple health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Detailed readiness check response
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: ReadinessChecks,
}

/// Individual dependency health checks
#[derive(Debug, Serialize)]
pub struct ReadinessChecks {
    pub store: bool,
    /// `None` when no cache is configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<bool>,
}

// =============================================================================
// ERROR RESPONSES
// =============================================================================

/// API error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error type/code
    pub error: String,

    /// Human-readable error message
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}
