pub mod booking;
pub mod event;
pub mod group_schedule;
pub mod provider;
pub mod service;
pub mod user;
pub mod waitlist;

pub use booking::{Booking, BookingStatus, PaymentDetails, PaymentStatus};
pub use event::DomainEvent;
pub use group_schedule::{GroupSchedule, GroupScheduleStatus, ProposedTime};
pub use provider::{ContactInfo, Provider};
pub use service::{Service, ServiceCategory};
pub use user::{NotificationPreferences, User};
pub use waitlist::WaitlistEntry;
