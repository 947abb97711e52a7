//! HTTP API tests.
//!
//! Drive the full router (routing, extractors, validation, store, error
//! mapping) against the in-memory store. No database or Redis required.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use ticket_inventory_service::{
    build_router,
    cache::TicketCache,
    ledger::SeatPolicy,
    metrics,
    store::{MemoryTicketStore, TicketStore},
    AppState,
};

fn app(policy: SeatPolicy) -> Router {
    app_with_cache(policy, TicketCache::disabled()).0
}

/// Router plus direct handles on its store and cache.
fn app_with_cache(
    policy: SeatPolicy,
    cache: TicketCache,
) -> (Router, Arc<MemoryTicketStore>, TicketCache) {
    let store = Arc::new(MemoryTicketStore::new());
    let state = Arc::new(AppState {
        store: store.clone(),
        cache: cache.clone(),
        seat_policy: policy,
        metrics_handle: metrics::detached_handle(),
    });
    (build_router(state), store, cache)
}

/// Send a raw body with an optional Content-Type header.
async fn send_raw(
    app: &Router,
    uri: &str,
    content_type: Option<&str>,
    body: &'static str,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(Method::POST).uri(uri);
    if let Some(content_type) = content_type {
        builder = builder.header("content-type", content_type);
    }
    let response = app
        .clone()
        .oneshot(builder.body(Body::from(body)).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn ticket_body(name: &str, event_type: &str, price: f64, date: &str, seats: i64) -> Value {
    json!({
        "eventName": name,
        "eventType": event_type,
        "venue": "Main Arena",
        "date": date,
        "time": "19:00",
        "price": price,
        "totalSeats": seats,
        "availableSeats": seats
    })
}

async fn create(app: &Router, body: Value) -> Value {
    let (status, ticket) = send(app, Method::POST, "/api/tickets", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {ticket}");
    ticket
}

fn id_of(ticket: &Value) -> String {
    ticket["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_is_always_ok() {
    let app = app(SeatPolicy::default());
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&app, Method::GET, "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["checks"]["store"], true);
}

#[tokio::test]
async fn create_then_get_returns_supplied_fields() {
    let app = app(SeatPolicy::default());
    let created = create(&app, ticket_body("Jazz Night", "concert", 85.0, "2025-07-12", 200)).await;

    assert_eq!(created["currency"], "USD");
    assert_eq!(created["status"], "active");
    assert!(created["createdAt"].is_string());
    assert!(created["updatedAt"].is_string());

    let (status, fetched) = send(
        &app,
        Method::GET,
        &format!("/api/tickets/{}", id_of(&created)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);
    assert_eq!(fetched["eventName"], "Jazz Night");
    assert_eq!(fetched["eventType"], "concert");
    assert_eq!(fetched["date"], "2025-07-12");
    assert_eq!(fetched["totalSeats"], 200);
    assert_eq!(fetched["price"].as_f64(), Some(85.0));
}

#[tokio::test]
async fn create_with_missing_field_is_a_validation_error() {
    let app = app(SeatPolicy::default());
    let mut body = ticket_body("Jazz Night", "concert", 85.0, "2025-07-12", 200);
    body.as_object_mut().unwrap().remove("venue");

    let (status, error) = send(&app, Method::POST, "/api/tickets", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "VALIDATION_ERROR");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/tickets",
        Some(ticket_body("Opera Gala", "opera", 90.0, "2025-07-12", 50)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn wrongly_typed_body_fields_are_validation_errors() {
    let app = app(SeatPolicy::default());

    for (field, value) in [
        ("price", json!("abc")),
        ("totalSeats", json!("5")),
        ("eventName", json!(42)),
    ] {
        let mut body = ticket_body("Jazz Night", "concert", 85.0, "2025-07-12", 200);
        body[field] = value;

        let (status, error) = send(&app, Method::POST, "/api/tickets", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{field} should be rejected");
        assert_eq!(error["error"], "VALIDATION_ERROR");
        assert!(error["message"].is_string());
    }
}

#[tokio::test]
async fn unreadable_bodies_are_validation_errors() {
    let app = app(SeatPolicy::default());
    let ticket = create(&app, ticket_body("Hamlet", "theater", 45.0, "2025-09-01", 4)).await;
    let reserve = format!("/api/tickets/{}/reserve", id_of(&ticket));

    // No Content-Type
    let (status, error) = send_raw(&app, &reserve, None, r#"{"quantity":1}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "VALIDATION_ERROR");

    // Not JSON at all
    let (status, error) = send_raw(&app, &reserve, Some("application/json"), "{quantity").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "VALIDATION_ERROR");

    let (status, error) =
        send_raw(&app, "/api/tickets", Some("text/plain"), "Jazz Night").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "VALIDATION_ERROR");

    let (_, unchanged) = send(&app, Method::GET, &format!("/api/tickets/{}", id_of(&ticket)), None).await;
    assert_eq!(unchanged["availableSeats"], 4);
}

#[tokio::test]
async fn sub_cent_prices_are_rejected() {
    let app = app(SeatPolicy::default());
    let (status, error) = send(
        &app,
        Method::POST,
        "/api/tickets",
        Some(ticket_body("Jazz Night", "concert", 12.345, "2025-07-12", 200)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "VALIDATION_ERROR");

    let created = create(&app, ticket_body("Jazz Night", "concert", 12.34, "2025-07-12", 200)).await;
    assert_eq!(created["price"].as_f64(), Some(12.34));
}

#[tokio::test]
async fn list_filters_and_orders_by_date() {
    let app = app(SeatPolicy::default());
    let concert = create(&app, ticket_body("Rock Fest", "concert", 85.0, "2025-08-20", 100)).await;
    let movie = create(&app, ticket_body("Premiere", "movie", 25.0, "2025-08-01", 100)).await;

    let (status, all) = send(&app, Method::GET, "/api/tickets", None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = all
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![movie["id"].as_str().unwrap(), concert["id"].as_str().unwrap()]);

    let (_, by_type) = send(&app, Method::GET, "/api/tickets?eventType=concert", None).await;
    assert_eq!(by_type.as_array().unwrap().len(), 1);
    assert_eq!(by_type[0]["id"], concert["id"]);

    let (_, by_price) = send(&app, Method::GET, "/api/tickets?minPrice=50", None).await;
    assert_eq!(by_price.as_array().unwrap().len(), 1);
    assert_eq!(by_price[0]["id"], concert["id"]);

    let (_, by_range) = send(&app, Method::GET, "/api/tickets?minPrice=25&maxPrice=25", None).await;
    assert_eq!(by_range.as_array().unwrap().len(), 1);
    assert_eq!(by_range[0]["id"], movie["id"]);

    let (_, by_date) = send(
        &app,
        Method::GET,
        "/api/tickets?date=2025-08-01T12:00:00Z",
        None,
    )
    .await;
    assert_eq!(by_date.as_array().unwrap().len(), 1);
    assert_eq!(by_date[0]["id"], movie["id"]);

    let (_, by_status) = send(&app, Method::GET, "/api/tickets?status=sold-out", None).await;
    assert!(by_status.as_array().unwrap().is_empty());

    let (status, _) = send(&app, Method::GET, "/api/tickets?eventType=circus", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reserve_and_release_drive_status() {
    let app = app(SeatPolicy::default());
    let ticket = create(&app, ticket_body("Cup Final", "sports", 60.0, "2025-05-20", 10)).await;
    let id = id_of(&ticket);

    let (status, after) = send(
        &app,
        Method::POST,
        &format!("/api/tickets/{id}/reserve"),
        Some(json!({ "quantity": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(after["availableSeats"], 0);
    assert_eq!(after["status"], "sold-out");
    assert_eq!(after["totalSeats"], 10);

    let (status, after) = send(
        &app,
        Method::POST,
        &format!("/api/tickets/{id}/release"),
        Some(json!({ "quantity": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(after["availableSeats"], 1);
    assert_eq!(after["status"], "active");
}

#[tokio::test]
async fn reserving_one_more_than_available_changes_nothing() {
    let app = app(SeatPolicy::default());
    let ticket = create(&app, ticket_body("Hamlet", "theater", 45.0, "2025-09-01", 4)).await;
    let id = id_of(&ticket);

    let (status, error) = send(
        &app,
        Method::POST,
        &format!("/api/tickets/{id}/reserve"),
        Some(json!({ "quantity": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "INSUFFICIENT_SEATS");

    let (_, unchanged) = send(&app, Method::GET, &format!("/api/tickets/{id}"), None).await;
    assert_eq!(unchanged, ticket);
}

#[tokio::test]
async fn bad_quantities_are_rejected() {
    let app = app(SeatPolicy::default());
    let ticket = create(&app, ticket_body("Hamlet", "theater", 45.0, "2025-09-01", 4)).await;
    let uri = format!("/api/tickets/{}/reserve", id_of(&ticket));

    for body in [
        json!({ "quantity": "two" }),
        json!({ "quantity": -1 }),
        json!({ "quantity": 0 }),
        json!({ "quantity": 1.5 }),
        json!({}),
    ] {
        let (status, error) = send(&app, Method::POST, &uri, Some(body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {body} should be rejected");
        assert_eq!(error["error"], "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn unknown_and_malformed_ids_are_not_found() {
    let app = app(SeatPolicy::default());

    for uri in [
        "/api/tickets/0b7d3c1e-6f0a-4c47-9a43-1f5e2b8c9d10".to_string(),
        "/api/tickets/not-an-id".to_string(),
    ] {
        let (status, _) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &app,
            Method::POST,
            &format!("{uri}/reserve"),
            Some(json!({ "quantity": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn delete_then_get_is_not_found() {
    let app = app(SeatPolicy::default());
    let ticket = create(&app, ticket_body("Premiere", "movie", 25.0, "2025-08-01", 100)).await;
    let uri = format!("/api/tickets/{}", id_of(&ticket));

    let (status, body) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], ticket["id"]);

    let (status, _) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_overwrites_only_supplied_fields() {
    let app = app(SeatPolicy::default());
    let ticket = create(&app, ticket_body("Keynote", "conference", 299.0, "2025-10-01", 400)).await;
    let uri = format!("/api/tickets/{}", id_of(&ticket));

    let (status, updated) = send(
        &app,
        Method::PUT,
        &uri,
        Some(json!({ "venue": "Hall C", "status": "cancelled" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["venue"], "Hall C");
    assert_eq!(updated["status"], "cancelled");
    assert_eq!(updated["eventName"], ticket["eventName"]);
    assert_eq!(updated["createdAt"], ticket["createdAt"]);

    let (status, _) = send(&app, Method::PUT, &uri, Some(json!({ "eventType": "gala" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::PUT, &uri, Some(json!({ "availableSeats": 401 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/tickets/0b7d3c1e-6f0a-4c47-9a43-1f5e2b8c9d10",
        Some(json!({ "venue": "Nowhere" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_with_null_clears_optional_text() {
    let app = app(SeatPolicy::default());
    let mut body = ticket_body("Keynote", "conference", 299.0, "2025-10-01", 400);
    body["description"] = json!("Doors at 8");
    body["imageUrl"] = json!("https://img.example/keynote.png");
    let ticket = create(&app, body).await;
    let uri = format!("/api/tickets/{}", id_of(&ticket));

    let (_, kept) = send(&app, Method::PUT, &uri, Some(json!({ "venue": "Hall C" }))).await;
    assert_eq!(kept["description"], "Doors at 8");

    let (status, cleared) = send(&app, Method::PUT, &uri, Some(json!({ "description": null }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cleared["description"], Value::Null);
    assert_eq!(cleared["imageUrl"], "https://img.example/keynote.png");
}

#[tokio::test]
async fn cached_get_follows_reservations() {
    let (app, _, _) = app_with_cache(SeatPolicy::default(), TicketCache::in_memory(300));
    let ticket = create(&app, ticket_body("Cup Final", "sports", 60.0, "2025-05-20", 10)).await;
    let uri = format!("/api/tickets/{}", id_of(&ticket));

    let (_, first) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(first["availableSeats"], 10);

    send(&app, Method::POST, &format!("{uri}/reserve"), Some(json!({ "quantity": 3 }))).await;

    let (_, second) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(second["availableSeats"], 7);
}

/// A Get that read the store before a reservation and fills the cache after
/// it must not bring the old seat count back.
#[tokio::test]
async fn late_cache_fill_cannot_undo_a_reservation() {
    let (app, store, cache) =
        app_with_cache(SeatPolicy::default(), TicketCache::in_memory(300));
    let ticket = create(&app, ticket_body("Cup Final", "sports", 60.0, "2025-05-20", 10)).await;
    let id: Uuid = ticket["id"].as_str().unwrap().parse().unwrap();
    let uri = format!("/api/tickets/{id}");

    let read_before = store.get(id).await.unwrap();
    let (status, _) = send(&app, Method::POST, &format!("{uri}/reserve"), Some(json!({ "quantity": 4 }))).await;
    assert_eq!(status, StatusCode::OK);
    cache.put(&read_before).await;

    let (_, after) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(after["availableSeats"], 6);
}

#[tokio::test]
async fn late_cache_fill_cannot_resurrect_a_deleted_ticket() {
    let (app, store, cache) =
        app_with_cache(SeatPolicy::default(), TicketCache::in_memory(300));
    let ticket = create(&app, ticket_body("Premiere", "movie", 25.0, "2025-08-01", 100)).await;
    let id: Uuid = ticket["id"].as_str().unwrap().parse().unwrap();
    let uri = format!("/api/tickets/{id}");

    let read_before = store.get(id).await.unwrap();
    let (status, _) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    cache.put(&read_before).await;

    let (status, _) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

/// Releasing more than was reserved is not clamped by default: the record
/// ends up with more available seats than its capacity.
#[tokio::test]
async fn unclamped_release_overshoots_capacity() {
    let app = app(SeatPolicy::default());
    let ticket = create(&app, ticket_body("Food Tour", "other", 15.0, "2025-06-01", 40)).await;

    let (status, after) = send(
        &app,
        Method::POST,
        &format!("/api/tickets/{}/release", id_of(&ticket)),
        Some(json!({ "quantity": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(after["availableSeats"], 45);
    assert_eq!(after["totalSeats"], 40);
}

#[tokio::test]
async fn clamped_release_stops_at_capacity() {
    let app = app(SeatPolicy {
        clamp_release_to_total: true,
        ..Default::default()
    });
    let ticket = create(&app, ticket_body("Food Tour", "other", 15.0, "2025-06-01", 40)).await;
    let id = id_of(&ticket);

    send(
        &app,
        Method::POST,
        &format!("/api/tickets/{id}/reserve"),
        Some(json!({ "quantity": 3 })),
    )
    .await;
    let (_, after) = send(
        &app,
        Method::POST,
        &format!("/api/tickets/{id}/release"),
        Some(json!({ "quantity": 10 })),
    )
    .await;
    assert_eq!(after["availableSeats"], 40);
}

#[tokio::test]
async fn closed_tickets_conflict_when_guarded() {
    let app = app(SeatPolicy {
        reject_closed_tickets: true,
        ..Default::default()
    });
    let ticket = create(&app, ticket_body("Cup Final", "sports", 60.0, "2025-05-20", 10)).await;
    let id = id_of(&ticket);

    send(
        &app,
        Method::PUT,
        &format!("/api/tickets/{id}"),
        Some(json!({ "status": "completed" })),
    )
    .await;

    let (status, error) = send(
        &app,
        Method::POST,
        &format!("/api/tickets/{id}/reserve"),
        Some(json!({ "quantity": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["error"], "TICKET_CLOSED");
}

/// 25 concurrent requests for 4 seats each against 30 seats:
/// 7 succeed, 18 are refused, 2 seats remain.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_http_reservations_never_oversell() {
    let app = app(SeatPolicy::default());
    let ticket = create(&app, ticket_body("Last Seats", "concert", 85.0, "2025-12-31", 30)).await;
    let uri = format!("/api/tickets/{}/reserve", id_of(&ticket));

    let mut handles = Vec::new();
    for _ in 0..25 {
        let app = app.clone();
        let uri = uri.clone();
        handles.push(tokio::spawn(async move {
            send(&app, Method::POST, &uri, Some(json!({ "quantity": 4 }))).await.0
        }));
    }

    let mut ok = 0;
    let mut refused = 0;
    for handle in handles {
        match handle.await.unwrap() {
            StatusCode::OK => ok += 1,
            StatusCode::BAD_REQUEST => refused += 1,
            other => panic!("unexpected status {other}"),
        }
    }
    assert_eq!(ok, 7);
    assert_eq!(refused, 18);

    let (_, after) = send(&app, Method::GET, &format!("/api/tickets/{}", id_of(&ticket)), None).await;
    assert_eq!(after["availableSeats"], 2);
}

#[tokio::test]
async fn metrics_endpoint_renders() {
    let app = app(SeatPolicy::default());
    let (status, _) = send(&app, Method::GET, "/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
}
