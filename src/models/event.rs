use serde::Serialize;

/// Broadcast to `/api/events` subscribers whenever the core changes state
/// that a notification transport would care about.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomainEvent {
    BookingConfirmed {
        booking_id: String,
        service_id: String,
        user_id: String,
        date_time: String,
    },
    BookingCancelled {
        booking_id: String,
        service_id: String,
        date_time: String,
    },
    GroupScheduleReady {
        schedule_id: String,
        final_time: String,
        attendee_ids: Vec<String>,
    },
    WaitlistSlotAvailable {
        entry_id: String,
        service_id: String,
        user_id: String,
    },
}

impl DomainEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            DomainEvent::BookingConfirmed { .. } => "booking_confirmed",
            DomainEvent::BookingCancelled { .. } => "booking_cancelled",
            DomainEvent::GroupScheduleReady { .. } => "group_schedule_ready",
            DomainEvent::WaitlistSlotAvailable { .. } => "waitlist_slot_available",
        }
    }
}
