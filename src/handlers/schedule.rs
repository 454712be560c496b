use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::GroupSchedule;
use crate::services::group::{self, NewGroupSchedule};
use crate::services::events;
use crate::services::reconcile::CommonSlot;
use crate::state::AppState;
use crate::time;

// POST /api/schedules
#[derive(Deserialize)]
pub struct CreateScheduleRequest {
    pub title: String,
    pub description: Option<String>,
    pub created_by: String,
    pub attendee_ids: Vec<String>,
}

pub async fn create_schedule(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateScheduleRequest>,
) -> Result<(StatusCode, Json<GroupSchedule>), AppError> {
    let schedule = {
        let db = state.db();
        group::create(
            &db,
            NewGroupSchedule {
                title: body.title,
                description: body.description,
                created_by: body.created_by,
                attendee_ids: body.attendee_ids,
            },
            state.config.max_group_size,
            time::now(),
        )?
    };
    Ok((StatusCode::CREATED, Json(schedule)))
}

// GET /api/schedules/:id
pub async fn get_schedule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<GroupSchedule>, AppError> {
    let db = state.db();
    Ok(Json(group::get(&db, &id)?))
}

// POST /api/schedules/:id/availability
#[derive(Deserialize)]
pub struct AvailabilityRequest {
    pub attendee_id: String,
    pub times: Vec<NaiveDateTime>,
}

pub async fn submit_availability(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<AvailabilityRequest>,
) -> Result<Json<GroupSchedule>, AppError> {
    let db = state.db();
    Ok(Json(group::submit_availability(
        &db,
        &id,
        &body.attendee_id,
        &body.times,
        time::now(),
    )?))
}

// GET /api/schedules/:id/reconcile
#[derive(Serialize)]
pub struct ReconcileResponse {
    schedule_id: String,
    common_slots: Vec<CommonSlot>,
}

pub async fn reconcile_schedule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ReconcileResponse>, AppError> {
    let common_slots = {
        let db = state.db();
        group::reconcile_schedule(&db, &id, &state.config.reconcile_policy())?
    };
    Ok(Json(ReconcileResponse {
        schedule_id: id,
        common_slots,
    }))
}

// POST /api/schedules/:id/confirm
#[derive(Deserialize)]
pub struct ConfirmScheduleRequest {
    pub time: NaiveDateTime,
}

pub async fn confirm_schedule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<ConfirmScheduleRequest>,
) -> Result<Json<GroupSchedule>, AppError> {
    let schedule = {
        let db = state.db();
        group::confirm_schedule(&db, &id, body.time, &state.config.reconcile_policy())?
    };
    if let Some(event) = events::group_schedule_ready(&schedule) {
        events::publish(&state.events_tx, event);
    }
    Ok(Json(schedule))
}

// POST /api/schedules/:id/cancel
pub async fn cancel_schedule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<GroupSchedule>, AppError> {
    let db = state.db();
    Ok(Json(group::cancel(&db, &id)?))
}

// POST /api/schedules/:id/complete
pub async fn complete_schedule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<GroupSchedule>, AppError> {
    let db = state.db();
    Ok(Json(group::complete(&db, &id)?))
}
