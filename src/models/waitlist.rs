use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitlistEntry {
    pub id: String,
    pub user_id: String,
    pub service_id: String,
    pub entry_time: NaiveDateTime,
    pub priority: i32,
    pub notified: bool,
    pub notified_at: Option<NaiveDateTime>,
}
