use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{Booking, PaymentDetails};
use crate::services::booking::{self, NewBooking};
use crate::services::{events, slots};
use crate::state::AppState;
use crate::time::{self, parse_day};

// GET /api/services/:id/slots?date=YYYY-MM-DD
#[derive(Deserialize)]
pub struct SlotsQuery {
    pub date: String,
}

#[derive(Serialize)]
pub struct SlotsResponse {
    service_id: String,
    date: String,
    slots: Vec<NaiveDateTime>,
}

pub async fn get_slots(
    State(state): State<Arc<AppState>>,
    Path(service_id): Path<String>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<SlotsResponse>, AppError> {
    let day = parse_day(&query.date)?;
    let available = {
        let db = state.db();
        slots::get_slots(&db, &service_id, day, state.config.business_hours())?
    };

    Ok(Json(SlotsResponse {
        service_id,
        date: day.format(time::DAY_FORMAT).to_string(),
        slots: available,
    }))
}

// POST /api/bookings
#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub user_id: String,
    pub service_id: String,
    pub date_time: NaiveDateTime,
    pub notes: Option<String>,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let created = {
        let db = state.db();
        booking::create(
            &db,
            NewBooking {
                user_id: body.user_id,
                service_id: body.service_id,
                date_time: body.date_time,
                notes: body.notes,
            },
            state.config.business_hours(),
            state.config.booking_window(),
            time::now(),
        )?
    };
    Ok((StatusCode::CREATED, Json(created)))
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let db = state.db();
    Ok(Json(booking::get(&db, &id)?))
}

// POST /api/bookings/:id/confirm
#[derive(Deserialize)]
pub struct ConfirmBookingRequest {
    pub payment: Option<PaymentDetails>,
}

pub async fn confirm_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Option<Json<ConfirmBookingRequest>>,
) -> Result<Json<Booking>, AppError> {
    let payment = body.and_then(|Json(b)| b.payment);
    let confirmed = {
        let db = state.db();
        booking::confirm(&db, &id, payment, time::now())?
    };
    events::publish(&state.events_tx, events::booking_confirmed(&confirmed));
    Ok(Json(confirmed))
}

// POST /api/bookings/:id/cancel
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let cancelled = {
        let db = state.db();
        booking::cancel(&db, &id, time::now())?
    };
    events::publish(&state.events_tx, events::booking_cancelled(&cancelled));
    Ok(Json(cancelled))
}

// POST /api/bookings/:id/complete
pub async fn complete_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let db = state.db();
    Ok(Json(booking::complete(&db, &id, time::now())?))
}

// POST /api/bookings/:id/no-show
pub async fn no_show_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let db = state.db();
    Ok(Json(booking::mark_no_show(&db, &id, time::now())?))
}
