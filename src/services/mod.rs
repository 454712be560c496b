pub mod booking;
pub mod catalog;
pub mod events;
pub mod group;
pub mod reconcile;
pub mod slots;
pub mod waitlist;
