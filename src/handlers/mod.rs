pub mod booking;
pub mod catalog;
pub mod events;
pub mod health;
pub mod schedule;
pub mod waitlist;

use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        // Catalog
        .route("/api/users", post(catalog::create_user))
        .route("/api/users/:id", get(catalog::get_user))
        .route("/api/users/:id/bookings", get(catalog::get_user_bookings))
        .route(
            "/api/providers",
            post(catalog::create_provider).get(catalog::list_providers),
        )
        .route("/api/providers/:id", get(catalog::get_provider))
        .route(
            "/api/services",
            post(catalog::create_service).get(catalog::list_services),
        )
        .route("/api/services/:id", get(catalog::get_service))
        .route("/api/services/:id/slots", get(booking::get_slots))
        // Waitlist
        .route(
            "/api/services/:id/waitlist",
            post(waitlist::join_waitlist).get(waitlist::list_waitlist),
        )
        .route(
            "/api/services/:id/waitlist/notify",
            post(waitlist::notify_next),
        )
        .route("/api/waitlist/:id", delete(waitlist::remove_entry))
        // Bookings
        .route("/api/bookings", post(booking::create_booking))
        .route("/api/bookings/:id", get(booking::get_booking))
        .route("/api/bookings/:id/confirm", post(booking::confirm_booking))
        .route("/api/bookings/:id/cancel", post(booking::cancel_booking))
        .route("/api/bookings/:id/complete", post(booking::complete_booking))
        .route("/api/bookings/:id/no-show", post(booking::no_show_booking))
        // Group schedules
        .route("/api/schedules", post(schedule::create_schedule))
        .route("/api/schedules/:id", get(schedule::get_schedule))
        .route(
            "/api/schedules/:id/availability",
            post(schedule::submit_availability),
        )
        .route(
            "/api/schedules/:id/reconcile",
            get(schedule::reconcile_schedule),
        )
        .route("/api/schedules/:id/confirm", post(schedule::confirm_schedule))
        .route("/api/schedules/:id/cancel", post(schedule::cancel_schedule))
        .route(
            "/api/schedules/:id/complete",
            post(schedule::complete_schedule),
        )
        .route("/api/events", get(events::events_stream))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
