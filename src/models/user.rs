use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub handle: Option<String>,
    pub wallet_address: Option<String>,
    #[serde(default)]
    pub notification_preferences: NotificationPreferences,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    pub group_scheduling: bool,
    pub service_bookings: bool,
    pub waitlist_updates: bool,
    pub reminders: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            group_scheduling: true,
            service_bookings: true,
            waitlist_updates: true,
            reminders: true,
        }
    }
}
