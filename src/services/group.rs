use chrono::{NaiveDateTime, SubsecRound};
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::{GroupSchedule, GroupScheduleStatus, ProposedTime};
use crate::services::reconcile::{self, CommonSlot, ReconcilePolicy};

#[derive(Debug, Clone)]
pub struct NewGroupSchedule {
    pub title: String,
    pub description: Option<String>,
    pub created_by: String,
    pub attendee_ids: Vec<String>,
}

pub fn create(
    conn: &Connection,
    new: NewGroupSchedule,
    max_group_size: usize,
    now: NaiveDateTime,
) -> AppResult<GroupSchedule> {
    if new.title.trim().is_empty() {
        return Err(AppError::InvalidInput("title is required".to_string()));
    }

    let mut attendee_ids: Vec<String> = Vec::with_capacity(new.attendee_ids.len());
    for id in new.attendee_ids {
        let id = id.trim().to_string();
        if !id.is_empty() && !attendee_ids.contains(&id) {
            attendee_ids.push(id);
        }
    }
    if attendee_ids.is_empty() {
        return Err(AppError::InvalidInput(
            "a group schedule needs at least one attendee".to_string(),
        ));
    }
    if attendee_ids.len() > max_group_size {
        return Err(AppError::InvalidInput(format!(
            "groups are limited to {max_group_size} attendees"
        )));
    }

    let schedule = GroupSchedule {
        id: uuid::Uuid::new_v4().to_string(),
        title: new.title,
        description: new.description,
        created_by: new.created_by,
        attendee_ids,
        proposed_times: Vec::new(),
        final_time: None,
        status: GroupScheduleStatus::Collecting,
        created_at: now,
    };
    queries::insert_group_schedule(conn, &schedule)?;

    tracing::info!(
        schedule_id = %schedule.id,
        attendees = schedule.attendee_ids.len(),
        "group schedule created"
    );
    Ok(schedule)
}

pub fn get(conn: &Connection, schedule_id: &str) -> AppResult<GroupSchedule> {
    queries::get_group_schedule(conn, schedule_id)?
        .ok_or_else(|| AppError::NotFound(format!("group schedule {schedule_id}")))
}

/// Appends an attendee's proposals, kept to the microsecond. Does not
/// reconcile.
pub fn submit_availability(
    conn: &Connection,
    schedule_id: &str,
    attendee_id: &str,
    instants: &[NaiveDateTime],
    now: NaiveDateTime,
) -> AppResult<GroupSchedule> {
    if instants.is_empty() {
        return Err(AppError::InvalidInput(
            "at least one proposed time is required".to_string(),
        ));
    }

    let tx = conn.unchecked_transaction()?;
    let schedule = get(&tx, schedule_id)?;
    if schedule.status != GroupScheduleStatus::Collecting {
        return Err(AppError::PreconditionFailed(format!(
            "group schedule {schedule_id} is {}, not collecting",
            schedule.status.as_str()
        )));
    }
    if !schedule.is_attendee(attendee_id) {
        return Err(AppError::InvalidInput(format!(
            "{attendee_id} is not an attendee of group schedule {schedule_id}"
        )));
    }

    let proposals: Vec<ProposedTime> = instants
        .iter()
        .map(|time| ProposedTime {
            attendee_id: attendee_id.to_string(),
            time: time.trunc_subsecs(6),
        })
        .collect();
    queries::insert_proposals(&tx, schedule_id, &proposals, &now)?;
    tx.commit()?;

    tracing::info!(
        schedule_id = %schedule_id,
        attendee_id = %attendee_id,
        proposals = proposals.len(),
        "availability submitted"
    );
    get(conn, schedule_id)
}

/// Ranked common slots over the stored proposals. Recomputed on every call.
pub fn reconcile_schedule(
    conn: &Connection,
    schedule_id: &str,
    policy: &ReconcilePolicy,
) -> AppResult<Vec<CommonSlot>> {
    policy.validate()?;
    let schedule = get(conn, schedule_id)?;

    let availabilities = schedule.availabilities();
    if availabilities.is_empty() {
        return Err(AppError::PreconditionFailed(format!(
            "no attendee of group schedule {schedule_id} has responded yet"
        )));
    }

    Ok(reconcile::reconcile(&availabilities, policy))
}

/// Fixes the final time. `chosen` must be one of the eligible instants of a
/// reconciliation over the current proposals.
pub fn confirm_schedule(
    conn: &Connection,
    schedule_id: &str,
    chosen: NaiveDateTime,
    policy: &ReconcilePolicy,
) -> AppResult<GroupSchedule> {
    let chosen = chosen.trunc_subsecs(6);
    let schedule = get(conn, schedule_id)?;
    if schedule.status != GroupScheduleStatus::Collecting {
        return Err(AppError::PreconditionFailed(format!(
            "group schedule {schedule_id} is {}, not collecting",
            schedule.status.as_str()
        )));
    }

    let eligible = reconcile_schedule(conn, schedule_id, policy)?;
    if !eligible.iter().any(|slot| slot.time == chosen) {
        return Err(AppError::Conflict(format!(
            "{chosen} is not among the eligible common times"
        )));
    }

    if !queries::transition_schedule_status(
        conn,
        schedule_id,
        GroupScheduleStatus::Collecting,
        GroupScheduleStatus::Scheduled,
        Some(&chosen),
    )? {
        return Err(AppError::Conflict(format!(
            "group schedule {schedule_id} was modified concurrently"
        )));
    }

    tracing::info!(schedule_id = %schedule_id, final_time = %chosen, "group schedule confirmed");
    get(conn, schedule_id)
}

/// Cancels from any non-terminal state.
pub fn cancel(conn: &Connection, schedule_id: &str) -> AppResult<GroupSchedule> {
    let schedule = get(conn, schedule_id)?;
    if schedule.status.is_terminal() {
        return Err(AppError::PreconditionFailed(format!(
            "group schedule {schedule_id} is already {}",
            schedule.status.as_str()
        )));
    }
    if !queries::transition_schedule_status(
        conn,
        schedule_id,
        schedule.status,
        GroupScheduleStatus::Cancelled,
        None,
    )? {
        return Err(AppError::Conflict(format!(
            "group schedule {schedule_id} was modified concurrently"
        )));
    }
    tracing::info!(schedule_id = %schedule_id, "group schedule cancelled");
    get(conn, schedule_id)
}

pub fn complete(conn: &Connection, schedule_id: &str) -> AppResult<GroupSchedule> {
    let schedule = get(conn, schedule_id)?;
    if schedule.status != GroupScheduleStatus::Scheduled {
        return Err(AppError::PreconditionFailed(format!(
            "group schedule {schedule_id} is {}, not scheduled",
            schedule.status.as_str()
        )));
    }
    if !queries::transition_schedule_status(
        conn,
        schedule_id,
        GroupScheduleStatus::Scheduled,
        GroupScheduleStatus::Completed,
        None,
    )? {
        return Err(AppError::Conflict(format!(
            "group schedule {schedule_id} was modified concurrently"
        )));
    }
    get(conn, schedule_id)
}
