use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, NaiveDate};
use serde_json::{json, Value};
use tower::ServiceExt;

use schedulr::config::AppConfig;
use schedulr::db;
use schedulr::handlers;
use schedulr::models::DomainEvent;
use schedulr::state::AppState;

// ── Helpers ──

fn test_state() -> Arc<AppState> {
    let config = AppConfig {
        database_url: ":memory:".to_string(),
        ..AppConfig::default()
    };
    let conn = db::init_db(":memory:").unwrap();
    Arc::new(AppState::new(conn, config))
}

async fn send(state: &Arc<AppState>, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = match body {
        Some(body) => Request::builder()
            .method(method)
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };

    let res = handlers::router(state.clone()).oneshot(request).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

/// A day comfortably inside the advance-booking window.
fn booking_day() -> NaiveDate {
    (schedulr::time::now() + Duration::days(7)).date()
}

fn at(day: NaiveDate, hour: u32) -> String {
    format!("{}T{:02}:00:00", day.format("%Y-%m-%d"), hour)
}

async fn create_service(state: &Arc<AppState>) -> String {
    let (status, provider) = send(
        state,
        "POST",
        "/api/providers",
        Some(json!({ "name": "Maya Lindqvist", "bio": "Certified yoga instructor", "rating": 4.8 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, service) = send(
        state,
        "POST",
        "/api/services",
        Some(json!({
            "provider_id": provider["id"],
            "name": "Aerial Yoga Classes",
            "category": "fitness",
            "duration_minutes": 75,
            "price": 45.0
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    service["id"].as_str().unwrap().to_string()
}

async fn create_booking(state: &Arc<AppState>, service_id: &str, user_id: &str, date_time: &str) -> String {
    let (status, booking) = send(
        state,
        "POST",
        "/api/bookings",
        Some(json!({ "user_id": user_id, "service_id": service_id, "date_time": date_time })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{booking}");
    assert_eq!(booking["status"], "pending");
    booking["id"].as_str().unwrap().to_string()
}

// ── Health ──

#[tokio::test]
async fn test_health() {
    let state = test_state();
    let (status, body) = send(&state, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

// ── Catalog ──

#[tokio::test]
async fn test_catalog_lookup_and_filter() {
    let state = test_state();
    let service_id = create_service(&state).await;

    let (status, service) = send(&state, "GET", &format!("/api/services/{service_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(service["category"], "fitness");

    let (_, fitness) = send(&state, "GET", "/api/services?category=fitness", None).await;
    assert_eq!(fitness.as_array().unwrap().len(), 1);
    let (_, therapy) = send(&state, "GET", "/api/services?category=therapy", None).await;
    assert!(therapy.as_array().unwrap().is_empty());

    let (status, _) = send(&state, "GET", "/api/services/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_service_requires_existing_provider() {
    let state = test_state();
    let (status, body) = send(
        &state,
        "POST",
        "/api/services",
        Some(json!({ "provider_id": "ghost", "name": "Tutoring", "duration_minutes": 60 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

// ── Slots ──

#[tokio::test]
async fn test_slots_exclude_confirmed_booking() {
    let state = test_state();
    let service_id = create_service(&state).await;
    let day = booking_day();
    let uri = format!("/api/services/{service_id}/slots?date={}", day.format("%Y-%m-%d"));

    let (status, body) = send(&state, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let slots = body["slots"].as_array().unwrap();
    assert_eq!(slots.len(), 8);
    assert_eq!(slots[0], at(day, 9));
    assert_eq!(slots[7], at(day, 16));

    // A pending booking does not take the slot.
    let booking_id = create_booking(&state, &service_id, "alice", &at(day, 11)).await;
    let (_, body) = send(&state, "GET", &uri, None).await;
    assert_eq!(body["slots"].as_array().unwrap().len(), 8);

    let (status, _) = send(&state, "POST", &format!("/api/bookings/{booking_id}/confirm"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&state, "GET", &uri, None).await;
    let slots = body["slots"].as_array().unwrap();
    assert_eq!(slots.len(), 7);
    assert!(!slots.contains(&json!(at(day, 11))));

    // Cancelling frees it again.
    let (status, _) = send(&state, "POST", &format!("/api/bookings/{booking_id}/cancel"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = send(&state, "GET", &uri, None).await;
    assert_eq!(body["slots"].as_array().unwrap().len(), 8);
}

#[tokio::test]
async fn test_slots_bad_date() {
    let state = test_state();
    let service_id = create_service(&state).await;
    let (status, body) = send(
        &state,
        "GET",
        &format!("/api/services/{service_id}/slots?date=16-06-2025"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("invalid date"));
}

#[tokio::test]
async fn test_slots_unknown_service() {
    let state = test_state();
    let (status, _) = send(&state, "GET", "/api/services/nope/slots?date=2025-06-16", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Bookings ──

#[tokio::test]
async fn test_second_confirm_for_same_slot_conflicts() {
    let state = test_state();
    let service_id = create_service(&state).await;
    let slot = at(booking_day(), 14);

    let first = create_booking(&state, &service_id, "alice", &slot).await;
    let second = create_booking(&state, &service_id, "bob", &slot).await;

    let (status, body) = send(
        &state,
        "POST",
        &format!("/api/bookings/{first}/confirm"),
        Some(json!({ "payment": { "amount": 45.0, "currency": "USD", "status": "completed" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "confirmed");

    let (status, _) = send(&state, "POST", &format!("/api/bookings/{second}/confirm"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // The loser stays pending.
    let (_, body) = send(&state, "GET", &format!("/api/bookings/{second}"), None).await;
    assert_eq!(body["status"], "pending");

    // Re-confirming the winner is a state error, not a slot conflict.
    let (status, _) = send(&state, "POST", &format!("/api/bookings/{first}/confirm"), None).await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);
}

#[tokio::test]
async fn test_booking_outside_business_hours_rejected() {
    let state = test_state();
    let service_id = create_service(&state).await;
    let (status, _) = send(
        &state,
        "POST",
        "/api/bookings",
        Some(json!({ "user_id": "alice", "service_id": service_id, "date_time": at(booking_day(), 18) })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_user_bookings_listed() {
    let state = test_state();
    let (status, user) = send(&state, "POST", "/api/users", Some(json!({ "handle": "alice" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let user_id = user["id"].as_str().unwrap().to_string();
    assert_eq!(user["notification_preferences"]["reminders"], true);

    let service_id = create_service(&state).await;
    create_booking(&state, &service_id, &user_id, &at(booking_day(), 10)).await;

    let (status, bookings) = send(&state, "GET", &format!("/api/users/{user_id}/bookings"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bookings.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_confirm_publishes_event() {
    let state = test_state();
    let mut rx = state.events_tx.subscribe();
    let service_id = create_service(&state).await;
    let booking_id = create_booking(&state, &service_id, "alice", &at(booking_day(), 9)).await;

    send(&state, "POST", &format!("/api/bookings/{booking_id}/confirm"), None).await;

    match rx.try_recv().unwrap() {
        DomainEvent::BookingConfirmed { booking_id: id, .. } => assert_eq!(id, booking_id),
        other => panic!("unexpected event: {}", other.kind()),
    }
}

// ── Group schedules ──

#[tokio::test]
async fn test_group_reconcile_and_confirm() {
    let state = test_state();
    let mut rx = state.events_tx.subscribe();

    let (status, schedule) = send(
        &state,
        "POST",
        "/api/schedules",
        Some(json!({
            "title": "Quarterly planning",
            "created_by": "a",
            "attendee_ids": ["a", "b", "c", "d", "e"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(schedule["status"], "collecting");
    let id = schedule["id"].as_str().unwrap().to_string();

    // Nobody has answered yet.
    let (status, _) = send(&state, "GET", &format!("/api/schedules/{id}/reconcile"), None).await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);

    let proposals = [
        ("a", vec!["2025-07-01T10:00:00", "2025-07-01T14:00:00"]),
        ("b", vec!["2025-07-01T10:00:00"]),
        ("c", vec!["2025-07-01T10:30:00", "2025-07-01T14:00:00"]),
    ];
    for (attendee, times) in proposals {
        let (status, body) = send(
            &state,
            "POST",
            &format!("/api/schedules/{id}/availability"),
            Some(json!({ "attendee_id": attendee, "times": times })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }

    // Three responders, quorum 60% -> at least two supporters.
    let (status, body) = send(&state, "GET", &format!("/api/schedules/{id}/reconcile"), None).await;
    assert_eq!(status, StatusCode::OK);
    let slots = body["common_slots"].as_array().unwrap();
    assert_eq!(slots.len(), 2);
    assert_eq!(slots[0]["time"], "2025-07-01T10:00:00");
    assert_eq!(slots[0]["supporting_count"], 3);
    assert_eq!(slots[1]["time"], "2025-07-01T14:00:00");
    assert_eq!(slots[1]["supporting_count"], 2);

    // Outsiders cannot propose.
    let (status, _) = send(
        &state,
        "POST",
        &format!("/api/schedules/{id}/availability"),
        Some(json!({ "attendee_id": "mallory", "times": ["2025-07-01T10:00:00"] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &state,
        "POST",
        &format!("/api/schedules/{id}/confirm"),
        Some(json!({ "time": "2025-07-01T08:00:00" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(
        &state,
        "POST",
        &format!("/api/schedules/{id}/confirm"),
        Some(json!({ "time": "2025-07-01T10:00:00" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "scheduled");
    assert_eq!(body["final_time"], "2025-07-01T10:00:00");

    match rx.try_recv().unwrap() {
        DomainEvent::GroupScheduleReady { schedule_id, attendee_ids, .. } => {
            assert_eq!(schedule_id, id);
            assert_eq!(attendee_ids.len(), 5);
        }
        other => panic!("unexpected event: {}", other.kind()),
    }

    // Scheduled groups stop collecting.
    let (status, _) = send(
        &state,
        "POST",
        &format!("/api/schedules/{id}/availability"),
        Some(json!({ "attendee_id": "d", "times": ["2025-07-01T10:00:00"] })),
    )
    .await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);
}

#[tokio::test]
async fn test_group_size_limit() {
    let state = test_state();
    let attendees: Vec<String> = (0..21).map(|i| format!("user-{i}")).collect();
    let (status, _) = send(
        &state,
        "POST",
        "/api/schedules",
        Some(json!({ "title": "Town hall", "created_by": "user-0", "attendee_ids": attendees })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ── Waitlist ──

#[tokio::test]
async fn test_waitlist_fifo_notification() {
    let state = test_state();
    let service_id = create_service(&state).await;
    let waitlist_uri = format!("/api/services/{service_id}/waitlist");

    let mut entry_ids = Vec::new();
    for user in ["A", "B", "C"] {
        let (status, entry) = send(&state, "POST", &waitlist_uri, Some(json!({ "user_id": user }))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(entry["notified"], false);
        entry_ids.push(entry["id"].as_str().unwrap().to_string());
    }

    let (_, listed) = send(&state, "GET", &waitlist_uri, None).await;
    let order: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["user_id"].as_str().unwrap())
        .collect();
    assert_eq!(order, vec!["A", "B", "C"]);

    let notify_uri = format!("{waitlist_uri}/notify");
    let (status, body) = send(&state, "POST", &notify_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notified"]["user_id"], "A");

    let (_, body) = send(&state, "POST", &notify_uri, None).await;
    assert_eq!(body["notified"]["user_id"], "B");

    let (status, _) = send(&state, "DELETE", &format!("/api/waitlist/{}", entry_ids[0]), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&state, "DELETE", &format!("/api/waitlist/{}", entry_ids[0]), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&state, "POST", &notify_uri, None).await;
    assert_eq!(body["notified"]["user_id"], "C");
    let (_, body) = send(&state, "POST", &notify_uri, None).await;
    assert!(body["notified"].is_null());
}

#[tokio::test]
async fn test_waitlist_notify_unknown_service() {
    let state = test_state();
    let (status, body) = send(&state, "POST", "/api/services/nope/waitlist/notify", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}
