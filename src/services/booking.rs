use chrono::NaiveDateTime;
use rusqlite::Connection;

use crate::config::BookingWindow;
use crate::db::queries::{self, ConfirmOutcome};
use crate::errors::{AppError, AppResult};
use crate::models::{Booking, BookingStatus, PaymentDetails};
use crate::services::slots::BusinessHours;

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub user_id: String,
    pub service_id: String,
    pub date_time: NaiveDateTime,
    pub notes: Option<String>,
}

/// Validates a booking time: hourly slot inside the business window, and
/// within the advance-booking window relative to `now`.
pub fn validate_booking_time(
    dt: &NaiveDateTime,
    hours: BusinessHours,
    window: BookingWindow,
    now: NaiveDateTime,
) -> AppResult<()> {
    if !hours.contains_slot(dt) {
        return Err(AppError::InvalidInput(format!(
            "{dt} is not a bookable slot ({:02}:00-{:02}:00, on the hour)",
            hours.open_hour, hours.close_hour
        )));
    }
    if *dt < now + window.min_advance {
        return Err(AppError::InvalidInput(format!(
            "bookings must be made at least {} hours in advance",
            window.min_advance.num_hours()
        )));
    }
    if *dt > now + window.max_advance {
        return Err(AppError::InvalidInput(format!(
            "bookings can be made at most {} days in advance",
            window.max_advance.num_days()
        )));
    }
    Ok(())
}

/// Creates a `pending` booking. The slot is not reserved until `confirm`.
pub fn create(
    conn: &Connection,
    new: NewBooking,
    hours: BusinessHours,
    window: BookingWindow,
    now: NaiveDateTime,
) -> AppResult<Booking> {
    if new.user_id.trim().is_empty() {
        return Err(AppError::InvalidInput("user_id is required".to_string()));
    }
    let service = queries::get_service(conn, &new.service_id)?
        .ok_or_else(|| AppError::NotFound(format!("service {}", new.service_id)))?;

    validate_booking_time(&new.date_time, hours, window, now)?;

    let booking = Booking {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: new.user_id,
        service_id: service.id,
        provider_id: service.provider_id,
        date_time: new.date_time,
        status: BookingStatus::Pending,
        payment: None,
        notes: new.notes,
        created_at: now,
        updated_at: now,
    };
    queries::insert_booking(conn, &booking)?;

    tracing::info!(
        booking_id = %booking.id,
        service_id = %booking.service_id,
        date_time = %booking.date_time,
        "booking created"
    );
    Ok(booking)
}

pub fn get(conn: &Connection, booking_id: &str) -> AppResult<Booking> {
    queries::get_booking_by_id(conn, booking_id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))
}

/// `pending -> confirmed` as a conditional write. Losing a race for the same
/// (service, instant) yields `Conflict` and leaves this booking pending.
pub fn confirm(
    conn: &Connection,
    booking_id: &str,
    payment: Option<PaymentDetails>,
    now: NaiveDateTime,
) -> AppResult<Booking> {
    match queries::confirm_booking(conn, booking_id, payment.as_ref(), &now)? {
        ConfirmOutcome::Confirmed => {
            let booking = get(conn, booking_id)?;
            tracing::info!(
                booking_id = %booking.id,
                service_id = %booking.service_id,
                date_time = %booking.date_time,
                "booking confirmed"
            );
            Ok(booking)
        }
        ConfirmOutcome::SlotTaken => {
            tracing::warn!(booking_id = %booking_id, "confirmation lost: slot already taken");
            Err(AppError::Conflict(
                "that time slot is already booked".to_string(),
            ))
        }
        ConfirmOutcome::NotPending => {
            let booking = get(conn, booking_id)?;
            Err(AppError::PreconditionFailed(format!(
                "booking {booking_id} is {}, not pending",
                booking.status.as_str()
            )))
        }
    }
}

/// Cancels a pending or confirmed booking, releasing its slot at once.
pub fn cancel(conn: &Connection, booking_id: &str, now: NaiveDateTime) -> AppResult<Booking> {
    let booking = transition(conn, booking_id, BookingStatus::Cancelled, now)?;
    tracing::info!(booking_id = %booking.id, "booking cancelled");
    Ok(booking)
}

/// Marks a confirmed booking whose instant has passed as completed.
pub fn complete(conn: &Connection, booking_id: &str, now: NaiveDateTime) -> AppResult<Booking> {
    settle(conn, booking_id, BookingStatus::Completed, now)
}

/// Marks a confirmed booking whose instant has passed as a no-show.
pub fn mark_no_show(conn: &Connection, booking_id: &str, now: NaiveDateTime) -> AppResult<Booking> {
    settle(conn, booking_id, BookingStatus::NoShow, now)
}

pub fn list_for_user(conn: &Connection, user_id: &str) -> AppResult<Vec<Booking>> {
    Ok(queries::get_bookings_for_user(conn, user_id)?)
}

fn settle(
    conn: &Connection,
    booking_id: &str,
    to: BookingStatus,
    now: NaiveDateTime,
) -> AppResult<Booking> {
    let booking = get(conn, booking_id)?;
    if booking.date_time > now {
        return Err(AppError::PreconditionFailed(format!(
            "booking {booking_id} has not taken place yet"
        )));
    }
    transition(conn, booking_id, to, now)
}

fn transition(
    conn: &Connection,
    booking_id: &str,
    to: BookingStatus,
    now: NaiveDateTime,
) -> AppResult<Booking> {
    let current = get(conn, booking_id)?;
    if !current.status.can_transition_to(to) {
        return Err(AppError::PreconditionFailed(format!(
            "cannot move booking {booking_id} from {} to {}",
            current.status.as_str(),
            to.as_str()
        )));
    }
    if !queries::transition_booking_status(conn, booking_id, current.status, to, &now)? {
        // Status changed between the read and the write.
        return Err(AppError::Conflict(format!(
            "booking {booking_id} was modified concurrently"
        )));
    }
    get(conn, booking_id)
}
