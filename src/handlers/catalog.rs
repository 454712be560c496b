use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{Booking, Provider, Service, ServiceCategory, User};
use crate::services::catalog::{self, NewProvider, NewService, NewUser};
use crate::services::booking;
use crate::state::AppState;

// POST /api/users
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewUser>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = {
        let db = state.db();
        catalog::create_user(&db, body)?
    };
    Ok((StatusCode::CREATED, Json(user)))
}

// GET /api/users/:id
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<User>, AppError> {
    let db = state.db();
    Ok(Json(catalog::get_user(&db, &id)?))
}

// GET /api/users/:id/bookings
pub async fn get_user_bookings(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let db = state.db();
    Ok(Json(booking::list_for_user(&db, &id)?))
}

// POST /api/providers
pub async fn create_provider(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewProvider>,
) -> Result<(StatusCode, Json<Provider>), AppError> {
    let provider = {
        let db = state.db();
        catalog::create_provider(&db, body)?
    };
    Ok((StatusCode::CREATED, Json(provider)))
}

// GET /api/providers
pub async fn list_providers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Provider>>, AppError> {
    let db = state.db();
    Ok(Json(catalog::list_providers(&db)?))
}

// GET /api/providers/:id
pub async fn get_provider(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Provider>, AppError> {
    let db = state.db();
    Ok(Json(catalog::get_provider(&db, &id)?))
}

// POST /api/services
pub async fn create_service(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewService>,
) -> Result<(StatusCode, Json<Service>), AppError> {
    let service = {
        let db = state.db();
        catalog::create_service(&db, body)?
    };
    Ok((StatusCode::CREATED, Json(service)))
}

// GET /api/services
#[derive(Deserialize)]
pub struct ServicesQuery {
    pub category: Option<ServiceCategory>,
}

pub async fn list_services(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ServicesQuery>,
) -> Result<Json<Vec<Service>>, AppError> {
    let db = state.db();
    Ok(Json(catalog::list_services(&db, query.category)?))
}

// GET /api/services/:id
pub async fn get_service(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Service>, AppError> {
    let db = state.db();
    Ok(Json(catalog::get_service(&db, &id)?))
}
