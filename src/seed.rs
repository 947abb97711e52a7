//! Sample listings inserted into an empty store at startup.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use crate::error::AppResult;
use crate::models::{EventType, NewTicket, TicketStatus, DEFAULT_CURRENCY};
use crate::store::TicketStore;

/// (name, type, venue, days from today, time, price in cents, seats, description)
const SAMPLE_TICKETS: &[(&str, EventType, &str, i64, &str, i64, i32, &str)] = &[
    (
        "Summer Music Festival",
        EventType::Concert,
        "Central Park Amphitheater",
        21,
        "18:00",
        8500,
        500,
        "Three stages of live music from sunset to midnight",
    ),
    (
        "The Last Horizon (Premiere)",
        EventType::Movie,
        "Grand Cinema Hall 1",
        7,
        "20:30",
        2500,
        180,
        "Opening night screening with cast Q&A",
    ),
    (
        "City Derby",
        EventType::Sports,
        "Riverside Stadium",
        14,
        "15:00",
        6000,
        1200,
        "Season rivalry match",
    ),
    (
        "Hamlet",
        EventType::Theater,
        "Royal Playhouse",
        30,
        "19:30",
        4500,
        250,
        "A new staging of the classic tragedy",
    ),
    (
        "RustConf Regional",
        EventType::Conference,
        "Convention Center Hall B",
        45,
        "09:00",
        29900,
        400,
        "Two days of talks on systems programming",
    ),
    (
        "Night Market Food Tour",
        EventType::Other,
        "Old Town Square",
        10,
        "21:00",
        1500,
        40,
        "Guided tasting walk through the night market",
    ),
];

/// Seed sample tickets when the store is empty. Returns how many were added.
pub async fn seed_sample_data(store: &dyn TicketStore) -> AppResult<usize> {
    if store.count().await? > 0 {
        return Ok(0);
    }

    let today = Utc::now().date_naive();
    for &(name, event_type, venue, days, time, cents, seats, description) in SAMPLE_TICKETS {
        store
            .create(NewTicket {
                event_name: name.to_string(),
                event_type,
                venue: venue.to_string(),
                date: today + Duration::days(days),
                time: time.to_string(),
                price: Decimal::new(cents, 2),
                currency: DEFAULT_CURRENCY.to_string(),
                total_seats: seats,
                available_seats: seats,
                description: Some(description.to_string()),
                image_url: None,
                status: TicketStatus::Active,
            })
            .await?;
    }

    Ok(SAMPLE_TICKETS.len())
}
