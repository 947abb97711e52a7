// =============================================================================
// VALIDATION MODULE
// =============================================================================
// Pure functions that turn loose API input into strict domain types.
// Nothing here touches storage, so every rule is unit-testable on its own.
// =============================================================================

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    CreateTicketRequest, EventType, ListParams, NewTicket, TicketFilter, TicketPatch,
    TicketStatus, UpdateTicketRequest, DEFAULT_CURRENCY,
};

/// Parse a path id. Malformed ids are reported as NotFound, like unknown ones.
pub fn parse_ticket_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(raw.to_string()))
}

/// Accepts `YYYY-MM-DD` or a full timestamp; only the calendar day is kept.
pub fn parse_date(raw: &str) -> AppResult<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.date_naive());
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Ok(ts.date());
    }
    Err(AppError::Validation(format!("invalid date '{}'", raw)))
}

fn parse_event_type(raw: &str) -> AppResult<EventType> {
    raw.parse().map_err(AppError::Validation)
}

fn parse_status(raw: &str) -> AppResult<TicketStatus> {
    raw.parse().map_err(AppError::Validation)
}

fn parse_price(raw: &str, field: &str) -> AppResult<Decimal> {
    raw.trim()
        .parse::<Decimal>()
        .map_err(|_| AppError::Validation(format!("{} must be a number", field)))
}

fn required<T>(value: Option<T>, field: &str) -> AppResult<T> {
    value.ok_or_else(|| AppError::Validation(format!("{} is required", field)))
}

fn non_empty(value: String, field: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{} must not be empty", field)));
    }
    Ok(trimmed.to_string())
}

/// Most decimal places a price may carry; matches the NUMERIC(12, 2) column.
const PRICE_SCALE: u32 = 2;

fn check_price(price: Decimal) -> AppResult<Decimal> {
    if price < Decimal::ZERO {
        return Err(AppError::Validation("price must not be negative".to_string()));
    }
    // 12.340 is fine, 12.345 is not
    let price = price.normalize();
    if price.scale() > PRICE_SCALE {
        return Err(AppError::Validation(format!(
            "price must have at most {} decimal places",
            PRICE_SCALE
        )));
    }
    Ok(price)
}

fn seat_count(value: i64, field: &str) -> AppResult<i32> {
    if value < 0 {
        return Err(AppError::Validation(format!("{} must not be negative", field)));
    }
    i32::try_from(value).map_err(|_| AppError::Validation(format!("{} is too large", field)))
}

/// Enforces `0 <= available <= total`.
pub fn check_seat_bounds(total_seats: i32, available_seats: i32) -> AppResult<()> {
    if total_seats < 0 || available_seats < 0 {
        return Err(AppError::Validation(
            "seat counts must not be negative".to_string(),
        ));
    }
    if available_seats > total_seats {
        return Err(AppError::Validation(format!(
            "availableSeats ({}) must not exceed totalSeats ({})",
            available_seats, total_seats
        )));
    }
    Ok(())
}

// -----------------------------------------------------------------------------
// CREATE
// -----------------------------------------------------------------------------
/// Validate a create request: required fields, enums, non-negative numbers,
/// seat bounds. Defaults: currency "USD", status active.
pub fn validate_new_ticket(req: CreateTicketRequest) -> AppResult<NewTicket> {
    let event_name = non_empty(required(req.event_name, "eventName")?, "eventName")?;
    let event_type = parse_event_type(&required(req.event_type, "eventType")?)?;
    let venue = non_empty(required(req.venue, "venue")?, "venue")?;
    let date = parse_date(&required(req.date, "date")?)?;
    let time = non_empty(required(req.time, "time")?, "time")?;
    let price = check_price(required(req.price, "price")?)?;
    let total_seats = seat_count(required(req.total_seats, "totalSeats")?, "totalSeats")?;
    let available_seats = seat_count(
        required(req.available_seats, "availableSeats")?,
        "availableSeats",
    )?;
    check_seat_bounds(total_seats, available_seats)?;

    let currency = match req.currency {
        Some(c) => non_empty(c, "currency")?,
        None => DEFAULT_CURRENCY.to_string(),
    };
    let status = match req.status {
        Some(s) => parse_status(&s)?,
        None => TicketStatus::Active,
    };

    Ok(NewTicket {
        event_name,
        event_type,
        venue,
        date,
        time,
        price,
        currency,
        total_seats,
        available_seats,
        description: req.description.flatten(),
        image_url: req.image_url.flatten(),
        status,
    })
}

// -----------------------------------------------------------------------------
// UPDATE
// -----------------------------------------------------------------------------
/// Validate only the supplied fields of a partial update.
///
/// Seat bounds against the stored record are checked by the store after the
/// patch is merged, since one side of the comparison may not be supplied.
pub fn validate_patch(req: UpdateTicketRequest) -> AppResult<TicketPatch> {
    Ok(TicketPatch {
        event_name: req.event_name.map(|v| non_empty(v, "eventName")).transpose()?,
        event_type: req.event_type.as_deref().map(parse_event_type).transpose()?,
        venue: req.venue.map(|v| non_empty(v, "venue")).transpose()?,
        date: req.date.as_deref().map(parse_date).transpose()?,
        time: req.time.map(|v| non_empty(v, "time")).transpose()?,
        price: req.price.map(check_price).transpose()?,
        currency: req.currency.map(|v| non_empty(v, "currency")).transpose()?,
        total_seats: req
            .total_seats
            .map(|v| seat_count(v, "totalSeats"))
            .transpose()?,
        available_seats: req
            .available_seats
            .map(|v| seat_count(v, "availableSeats"))
            .transpose()?,
        description: req.description,
        image_url: req.image_url,
        status: req.status.as_deref().map(parse_status).transpose()?,
    })
}

// -----------------------------------------------------------------------------
// LIST FILTER
// -----------------------------------------------------------------------------
/// Parse list query parameters. Empty strings count as absent.
pub fn parse_filter(params: ListParams) -> AppResult<TicketFilter> {
    fn present(value: Option<String>) -> Option<String> {
        value.filter(|v| !v.trim().is_empty())
    }

    let filter = TicketFilter {
        event_type: present(params.event_type)
            .as_deref()
            .map(parse_event_type)
            .transpose()?,
        status: present(params.status).as_deref().map(parse_status).transpose()?,
        min_price: present(params.min_price)
            .map(|v| parse_price(&v, "minPrice"))
            .transpose()?,
        max_price: present(params.max_price)
            .map(|v| parse_price(&v, "maxPrice"))
            .transpose()?,
        date: present(params.date).as_deref().map(parse_date).transpose()?,
    };

    Ok(filter)
}
