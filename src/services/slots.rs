use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::Service;
use crate::time::day_bounds;

/// Daily window in which hourly slots are offered, `[open_hour, close_hour)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessHours {
    pub open_hour: u32,
    pub close_hour: u32,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            open_hour: 9,
            close_hour: 17,
        }
    }
}

impl BusinessHours {
    pub fn validate(&self) -> AppResult<()> {
        if self.open_hour >= self.close_hour || self.close_hour > 24 {
            return Err(AppError::InvalidInput(format!(
                "invalid business hours: {:02}:00-{:02}:00",
                self.open_hour, self.close_hour
            )));
        }
        Ok(())
    }

    /// True when `dt` sits on an hour boundary inside the window.
    pub fn contains_slot(&self, dt: &NaiveDateTime) -> bool {
        dt.minute() == 0
            && dt.second() == 0
            && dt.nanosecond() == 0
            && dt.hour() >= self.open_hour
            && dt.hour() < self.close_hour
    }
}

/// One instant per hour boundary inside the business window, ascending.
/// The service duration does not change the step.
pub fn generate(
    service: &Service,
    day: NaiveDate,
    hours: BusinessHours,
) -> AppResult<Vec<NaiveDateTime>> {
    if service.duration_minutes <= 0 {
        return Err(AppError::InvalidInput(format!(
            "service {} has non-positive duration {}",
            service.id, service.duration_minutes
        )));
    }
    hours.validate()?;

    let slots = (hours.open_hour..hours.close_hour)
        .filter_map(|hour| NaiveTime::from_hms_opt(hour, 0, 0))
        .map(|time| day.and_time(time))
        .collect();
    Ok(slots)
}

/// Drops every slot equal to a confirmed booking of this service on `day`.
/// Reads once and never writes; the result is only valid for this call.
pub fn filter(
    conn: &Connection,
    service: &Service,
    day: NaiveDate,
    slots: Vec<NaiveDateTime>,
) -> AppResult<Vec<NaiveDateTime>> {
    let (start, end) = day_bounds(day);
    let booked = queries::get_confirmed_times_in_range(conn, &service.id, &start, &end)?;
    Ok(exclude_booked(slots, &booked))
}

pub fn exclude_booked(slots: Vec<NaiveDateTime>, booked: &[NaiveDateTime]) -> Vec<NaiveDateTime> {
    slots
        .into_iter()
        .filter(|slot| !booked.contains(slot))
        .collect()
}

/// Bookable instants for a service on a day: `generate` then `filter`.
pub fn get_slots(
    conn: &Connection,
    service_id: &str,
    day: NaiveDate,
    hours: BusinessHours,
) -> AppResult<Vec<NaiveDateTime>> {
    let service = queries::get_service(conn, service_id)?
        .ok_or_else(|| AppError::NotFound(format!("service {service_id}")))?;

    let generated = generate(&service, day, hours)?;
    let available = filter(conn, &service, day, generated)?;

    tracing::debug!(
        service_id = %service.id,
        day = %day,
        available = available.len(),
        "computed slots"
    );
    Ok(available)
}
