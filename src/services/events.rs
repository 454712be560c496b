use tokio::sync::broadcast;

use crate::models::{Booking, DomainEvent, GroupSchedule, WaitlistEntry};
use crate::time::format_instant;

/// Broadcasts to SSE subscribers; dropped silently when nobody listens.
pub fn publish(tx: &broadcast::Sender<DomainEvent>, event: DomainEvent) {
    tracing::debug!(kind = event.kind(), "publishing domain event");
    let _ = tx.send(event);
}

pub fn booking_confirmed(booking: &Booking) -> DomainEvent {
    DomainEvent::BookingConfirmed {
        booking_id: booking.id.clone(),
        service_id: booking.service_id.clone(),
        user_id: booking.user_id.clone(),
        date_time: format_instant(&booking.date_time),
    }
}

pub fn booking_cancelled(booking: &Booking) -> DomainEvent {
    DomainEvent::BookingCancelled {
        booking_id: booking.id.clone(),
        service_id: booking.service_id.clone(),
        date_time: format_instant(&booking.date_time),
    }
}

/// `None` until the schedule has a final time.
pub fn group_schedule_ready(schedule: &GroupSchedule) -> Option<DomainEvent> {
    schedule
        .final_time
        .as_ref()
        .map(|final_time| DomainEvent::GroupScheduleReady {
            schedule_id: schedule.id.clone(),
            final_time: format_instant(final_time),
            attendee_ids: schedule.attendee_ids.clone(),
        })
}

pub fn waitlist_slot_available(entry: &WaitlistEntry) -> DomainEvent {
    DomainEvent::WaitlistSlotAvailable {
        entry_id: entry.id.clone(),
        service_id: entry.service_id.clone(),
        user_id: entry.user_id.clone(),
    }
}
