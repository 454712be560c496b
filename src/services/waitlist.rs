use chrono::{Duration, NaiveDateTime, SubsecRound};
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::WaitlistEntry;

/// Joins the service's waitlist. `entry_time` is `now` at storage precision
/// (microseconds), pushed forward by one microsecond when needed so it stays
/// strictly after the last entry.
pub fn enqueue(
    conn: &Connection,
    user_id: &str,
    service_id: &str,
    now: NaiveDateTime,
) -> AppResult<WaitlistEntry> {
    if user_id.trim().is_empty() {
        return Err(AppError::InvalidInput("user_id is required".to_string()));
    }
    if queries::get_service(conn, service_id)?.is_none() {
        return Err(AppError::NotFound(format!("service {service_id}")));
    }

    let now = now.trunc_subsecs(6);
    let tx = conn.unchecked_transaction()?;

    let entry_time = match queries::latest_entry_time(&tx, service_id)? {
        Some(last) if last >= now => last + Duration::microseconds(1),
        _ => now,
    };

    let entry = WaitlistEntry {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        service_id: service_id.to_string(),
        entry_time,
        priority: 1,
        notified: false,
        notified_at: None,
    };
    queries::insert_waitlist_entry(&tx, &entry)?;
    tx.commit()?;

    tracing::info!(
        entry_id = %entry.id,
        service_id = %service_id,
        user_id = %user_id,
        "joined waitlist"
    );
    Ok(entry)
}

/// Earliest un-notified entry for the service. Does not change anything, so
/// repeated calls return the same entry until it is notified or removed.
pub fn next_to_notify(conn: &Connection, service_id: &str) -> AppResult<Option<WaitlistEntry>> {
    Ok(queries::next_unnotified_entry(conn, service_id)?)
}

/// Sets `notified` once. A second call on the same entry is a `Conflict`.
pub fn mark_notified(
    conn: &Connection,
    entry_id: &str,
    now: NaiveDateTime,
) -> AppResult<WaitlistEntry> {
    if !queries::mark_entry_notified(conn, entry_id, &now)? {
        return match queries::get_waitlist_entry(conn, entry_id)? {
            Some(_) => Err(AppError::Conflict(format!(
                "waitlist entry {entry_id} already notified"
            ))),
            None => Err(AppError::NotFound(format!("waitlist entry {entry_id}"))),
        };
    }

    queries::get_waitlist_entry(conn, entry_id)?
        .ok_or_else(|| AppError::NotFound(format!("waitlist entry {entry_id}")))
}

/// Deletes the entry. `Ok(false)` when it was already gone.
pub fn remove(conn: &Connection, entry_id: &str) -> AppResult<bool> {
    let removed = queries::delete_waitlist_entry(conn, entry_id)?;
    if removed {
        tracing::info!(entry_id = %entry_id, "removed waitlist entry");
    }
    Ok(removed)
}

/// Selects and marks the next entry in one transaction.
pub fn notify_next(
    conn: &Connection,
    service_id: &str,
    now: NaiveDateTime,
) -> AppResult<Option<WaitlistEntry>> {
    if queries::get_service(conn, service_id)?.is_none() {
        return Err(AppError::NotFound(format!("service {service_id}")));
    }
    let tx = conn.unchecked_transaction()?;

    let Some(next) = next_to_notify(&tx, service_id)? else {
        return Ok(None);
    };
    let notified = mark_notified(&tx, &next.id, now)?;
    tx.commit()?;

    tracing::info!(
        entry_id = %notified.id,
        service_id = %service_id,
        user_id = %notified.user_id,
        "notified waitlist entry"
    );
    Ok(Some(notified))
}

pub fn list(conn: &Connection, service_id: &str) -> AppResult<Vec<WaitlistEntry>> {
    if queries::get_service(conn, service_id)?.is_none() {
        return Err(AppError::NotFound(format!("service {service_id}")));
    }
    Ok(queries::list_waitlist(conn, service_id)?)
}

/// Outcome of one sweep over notified-but-unconfirmed entries.
#[derive(Debug, Default)]
pub struct SweepReport {
    pub expired: Vec<WaitlistEntry>,
    pub notified: Vec<WaitlistEntry>,
}

/// Removes entries notified at or before `now - timeout` and notifies the
/// next entry of each affected service, once per expired entry.
pub fn expire_stale(
    conn: &Connection,
    now: NaiveDateTime,
    timeout: Duration,
) -> AppResult<SweepReport> {
    let tx = conn.unchecked_transaction()?;
    let cutoff = now - timeout + Duration::microseconds(1);

    let mut report = SweepReport::default();
    for entry in queries::notified_before(&tx, &cutoff)? {
        queries::delete_waitlist_entry(&tx, &entry.id)?;
        if let Some(next) = next_to_notify(&tx, &entry.service_id)? {
            report.notified.push(mark_notified(&tx, &next.id, now)?);
        }
        report.expired.push(entry);
    }
    tx.commit()?;

    if !report.expired.is_empty() {
        tracing::info!(
            expired = report.expired.len(),
            notified = report.notified.len(),
            "expired stale waitlist notifications"
        );
    }
    Ok(report)
}
