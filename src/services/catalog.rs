use rusqlite::Connection;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::{ContactInfo, NotificationPreferences, Provider, Service, ServiceCategory, User};

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub handle: Option<String>,
    pub wallet_address: Option<String>,
    #[serde(default)]
    pub notification_preferences: NotificationPreferences,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProvider {
    pub name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub contact: ContactInfo,
    pub rating: Option<f64>,
    #[serde(default)]
    pub verified: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewService {
    pub provider_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: Option<ServiceCategory>,
    pub duration_minutes: i32,
    pub price: Option<f64>,
}

pub fn create_user(conn: &Connection, new: NewUser) -> AppResult<User> {
    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        handle: new.handle,
        wallet_address: new.wallet_address,
        notification_preferences: new.notification_preferences,
    };
    queries::insert_user(conn, &user)?;
    tracing::info!(user_id = %user.id, "user created");
    Ok(user)
}

pub fn get_user(conn: &Connection, user_id: &str) -> AppResult<User> {
    queries::get_user(conn, user_id)?.ok_or_else(|| AppError::NotFound(format!("user {user_id}")))
}

pub fn create_provider(conn: &Connection, new: NewProvider) -> AppResult<Provider> {
    if new.name.trim().is_empty() {
        return Err(AppError::InvalidInput("provider name is required".to_string()));
    }
    if let Some(rating) = new.rating {
        if !(0.0..=5.0).contains(&rating) {
            return Err(AppError::InvalidInput(format!(
                "rating must be between 0 and 5, got {rating}"
            )));
        }
    }

    let provider = Provider {
        id: uuid::Uuid::new_v4().to_string(),
        name: new.name,
        bio: new.bio,
        contact: new.contact,
        rating: new.rating,
        verified: new.verified,
    };
    queries::insert_provider(conn, &provider)?;
    tracing::info!(provider_id = %provider.id, "provider created");
    Ok(provider)
}

pub fn get_provider(conn: &Connection, provider_id: &str) -> AppResult<Provider> {
    queries::get_provider(conn, provider_id)?
        .ok_or_else(|| AppError::NotFound(format!("provider {provider_id}")))
}

pub fn list_providers(conn: &Connection) -> AppResult<Vec<Provider>> {
    Ok(queries::list_providers(conn)?)
}

pub fn create_service(conn: &Connection, new: NewService) -> AppResult<Service> {
    if new.name.trim().is_empty() {
        return Err(AppError::InvalidInput("service name is required".to_string()));
    }
    if new.duration_minutes <= 0 {
        return Err(AppError::InvalidInput(format!(
            "duration must be positive, got {}",
            new.duration_minutes
        )));
    }
    if new.price.is_some_and(|p| p < 0.0) {
        return Err(AppError::InvalidInput("price cannot be negative".to_string()));
    }
    // The store does not enforce references, so check the provider here.
    let provider = get_provider(conn, &new.provider_id)?;

    let service = Service {
        id: uuid::Uuid::new_v4().to_string(),
        provider_id: provider.id,
        name: new.name,
        description: new.description,
        category: new.category.unwrap_or(ServiceCategory::Other),
        duration_minutes: new.duration_minutes,
        price: new.price,
    };
    queries::insert_service(conn, &service)?;
    tracing::info!(service_id = %service.id, provider_id = %service.provider_id, "service created");
    Ok(service)
}

pub fn get_service(conn: &Connection, service_id: &str) -> AppResult<Service> {
    queries::get_service(conn, service_id)?
        .ok_or_else(|| AppError::NotFound(format!("service {service_id}")))
}

pub fn list_services(
    conn: &Connection,
    category: Option<ServiceCategory>,
) -> AppResult<Vec<Service>> {
    Ok(queries::list_services(conn, category)?)
}
