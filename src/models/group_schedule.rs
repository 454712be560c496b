use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSchedule {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub created_by: String,
    pub attendee_ids: Vec<String>,
    pub proposed_times: Vec<ProposedTime>,
    pub final_time: Option<NaiveDateTime>,
    pub status: GroupScheduleStatus,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedTime {
    pub attendee_id: String,
    pub time: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GroupScheduleStatus {
    Collecting,
    Scheduled,
    Cancelled,
    Completed,
}

impl GroupScheduleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupScheduleStatus::Collecting => "collecting",
            GroupScheduleStatus::Scheduled => "scheduled",
            GroupScheduleStatus::Cancelled => "cancelled",
            GroupScheduleStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "scheduled" => GroupScheduleStatus::Scheduled,
            "cancelled" => GroupScheduleStatus::Cancelled,
            "completed" => GroupScheduleStatus::Completed,
            _ => GroupScheduleStatus::Collecting,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GroupScheduleStatus::Cancelled | GroupScheduleStatus::Completed
        )
    }
}

impl GroupSchedule {
    pub fn is_attendee(&self, attendee_id: &str) -> bool {
        self.attendee_ids.iter().any(|a| a == attendee_id)
    }

    /// Proposals grouped per attendee, in attendee order. Attendees without
    /// proposals are omitted, so every returned entry is a responder.
    pub fn availabilities(&self) -> Vec<(String, Vec<NaiveDateTime>)> {
        self.attendee_ids
            .iter()
            .map(|attendee| {
                let times: Vec<NaiveDateTime> = self
                    .proposed_times
                    .iter()
                    .filter(|p| &p.attendee_id == attendee)
                    .map(|p| p.time)
                    .collect();
                (attendee.clone(), times)
            })
            .filter(|(_, times)| !times.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    #[test]
    fn test_availabilities_skip_non_responders() {
        let schedule = GroupSchedule {
            id: "s1".to_string(),
            title: "Team lunch".to_string(),
            description: None,
            created_by: "alice".to_string(),
            attendee_ids: vec!["alice".to_string(), "bob".to_string(), "carol".to_string()],
            proposed_times: vec![
                ProposedTime {
                    attendee_id: "carol".to_string(),
                    time: dt("2025-06-16 14:00"),
                },
                ProposedTime {
                    attendee_id: "alice".to_string(),
                    time: dt("2025-06-16 13:00"),
                },
                ProposedTime {
                    attendee_id: "alice".to_string(),
                    time: dt("2025-06-16 15:00"),
                },
            ],
            final_time: None,
            status: GroupScheduleStatus::Collecting,
            created_at: dt("2025-06-01 10:00"),
        };

        let avail = schedule.availabilities();
        assert_eq!(avail.len(), 2);
        assert_eq!(avail[0].0, "alice");
        assert_eq!(avail[0].1, vec![dt("2025-06-16 13:00"), dt("2025-06-16 15:00")]);
        assert_eq!(avail[1].0, "carol");
    }
}
