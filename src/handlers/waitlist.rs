use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::errors::AppError;
use crate::models::WaitlistEntry;
use crate::services::{events, waitlist};
use crate::state::AppState;
use crate::time;

// POST /api/services/:id/waitlist
#[derive(Deserialize)]
pub struct JoinWaitlistRequest {
    pub user_id: String,
}

pub async fn join_waitlist(
    State(state): State<Arc<AppState>>,
    Path(service_id): Path<String>,
    Json(body): Json<JoinWaitlistRequest>,
) -> Result<(StatusCode, Json<WaitlistEntry>), AppError> {
    let entry = {
        let db = state.db();
        waitlist::enqueue(&db, &body.user_id, &service_id, time::now())?
    };
    Ok((StatusCode::CREATED, Json(entry)))
}

// GET /api/services/:id/waitlist
pub async fn list_waitlist(
    State(state): State<Arc<AppState>>,
    Path(service_id): Path<String>,
) -> Result<Json<Vec<WaitlistEntry>>, AppError> {
    let db = state.db();
    Ok(Json(waitlist::list(&db, &service_id)?))
}

// POST /api/services/:id/waitlist/notify
pub async fn notify_next(
    State(state): State<Arc<AppState>>,
    Path(service_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let notified = {
        let db = state.db();
        waitlist::notify_next(&db, &service_id, time::now())?
    };

    match notified {
        Some(entry) => {
            events::publish(&state.events_tx, events::waitlist_slot_available(&entry));
            Ok(Json(json!({ "notified": entry })))
        }
        None => Ok(Json(json!({ "notified": null }))),
    }
}

// DELETE /api/waitlist/:id
pub async fn remove_entry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let removed = {
        let db = state.db();
        waitlist::remove(&db, &id)?
    };
    if !removed {
        return Err(AppError::NotFound(format!("waitlist entry {id}")));
    }
    Ok(StatusCode::NO_CONTENT)
}
