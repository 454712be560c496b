use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{
    Booking, BookingStatus, GroupSchedule, GroupScheduleStatus, ProposedTime, Provider, Service,
    ServiceCategory, User, WaitlistEntry,
};
use crate::time::{format_instant, format_precise, parse_instant};

// ── Users ──

pub fn insert_user(conn: &Connection, user: &User) -> anyhow::Result<()> {
    let prefs = serde_json::to_string(&user.notification_preferences)?;
    conn.execute(
        "INSERT INTO users (id, handle, wallet_address, notification_preferences)
         VALUES (?1, ?2, ?3, ?4)",
        params![user.id, user.handle, user.wallet_address, prefs],
    )?;
    Ok(())
}

pub fn get_user(conn: &Connection, id: &str) -> anyhow::Result<Option<User>> {
    let row = conn
        .query_row(
            "SELECT id, handle, wallet_address, notification_preferences FROM users WHERE id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .optional()?;

    match row {
        Some((id, handle, wallet_address, prefs_json)) => Ok(Some(User {
            id,
            handle,
            wallet_address,
            notification_preferences: serde_json::from_str(&prefs_json).unwrap_or_default(),
        })),
        None => Ok(None),
    }
}

// ── Providers ──

pub fn insert_provider(conn: &Connection, provider: &Provider) -> anyhow::Result<()> {
    let contact = serde_json::to_string(&provider.contact)?;
    conn.execute(
        "INSERT INTO providers (id, name, bio, contact, rating, verified)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            provider.id,
            provider.name,
            provider.bio,
            contact,
            provider.rating,
            provider.verified,
        ],
    )?;
    Ok(())
}

pub fn get_provider(conn: &Connection, id: &str) -> anyhow::Result<Option<Provider>> {
    let result = conn
        .query_row(
            "SELECT id, name, bio, contact, rating, verified FROM providers WHERE id = ?1",
            params![id],
            |row| Ok(parse_provider_row(row)),
        )
        .optional()?;
    result.transpose()
}

pub fn list_providers(conn: &Connection) -> anyhow::Result<Vec<Provider>> {
    let mut stmt =
        conn.prepare("SELECT id, name, bio, contact, rating, verified FROM providers ORDER BY name")?;
    let rows = stmt.query_map([], |row| Ok(parse_provider_row(row)))?;

    let mut providers = vec![];
    for row in rows {
        providers.push(row??);
    }
    Ok(providers)
}

fn parse_provider_row(row: &rusqlite::Row) -> anyhow::Result<Provider> {
    let contact_json: String = row.get(3)?;
    Ok(Provider {
        id: row.get(0)?,
        name: row.get(1)?,
        bio: row.get(2)?,
        contact: serde_json::from_str(&contact_json).unwrap_or_default(),
        rating: row.get(4)?,
        verified: row.get(5)?,
    })
}

// ── Services ──

pub fn insert_service(conn: &Connection, service: &Service) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO services (id, provider_id, name, description, category, duration_minutes, price)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            service.id,
            service.provider_id,
            service.name,
            service.description,
            service.category.as_str(),
            service.duration_minutes,
            service.price,
        ],
    )?;
    Ok(())
}

pub fn get_service(conn: &Connection, id: &str) -> anyhow::Result<Option<Service>> {
    let result = conn
        .query_row(
            "SELECT id, provider_id, name, description, category, duration_minutes, price
             FROM services WHERE id = ?1",
            params![id],
            |row| Ok(parse_service_row(row)),
        )
        .optional()?;
    result.transpose()
}

pub fn list_services(
    conn: &Connection,
    category: Option<ServiceCategory>,
) -> anyhow::Result<Vec<Service>> {
    let mut stmt = conn.prepare(
        "SELECT id, provider_id, name, description, category, duration_minutes, price
         FROM services WHERE (?1 IS NULL OR category = ?1) ORDER BY name",
    )?;
    let rows = stmt.query_map(params![category.map(|c| c.as_str())], |row| {
        Ok(parse_service_row(row))
    })?;

    let mut services = vec![];
    for row in rows {
        services.push(row??);
    }
    Ok(services)
}

fn parse_service_row(row: &rusqlite::Row) -> anyhow::Result<Service> {
    let category: String = row.get(4)?;
    Ok(Service {
        id: row.get(0)?,
        provider_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        category: ServiceCategory::parse(&category),
        duration_minutes: row.get(5)?,
        price: row.get(6)?,
    })
}

// ── Bookings ──

/// Result of the conditional `pending -> confirmed` write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Confirmed,
    /// Another confirmed booking already holds the (service, instant) pair.
    SlotTaken,
    /// The booking is missing or no longer pending.
    NotPending,
}

const BOOKING_COLUMNS: &str =
    "id, user_id, service_id, provider_id, date_time, status, payment, notes, created_at, updated_at";

pub fn insert_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    let payment = booking
        .payment
        .as_ref()
        .map(|p| serde_json::to_string(p))
        .transpose()?;

    conn.execute(
        "INSERT INTO bookings (id, user_id, service_id, provider_id, date_time, status, payment, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            booking.id,
            booking.user_id,
            booking.service_id,
            booking.provider_id,
            format_instant(&booking.date_time),
            booking.status.as_str(),
            payment,
            booking.notes,
            format_instant(&booking.created_at),
            format_instant(&booking.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn
        .query_row(
            &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
            params![id],
            |row| Ok(parse_booking_row(row)),
        )
        .optional()?;
    result.transpose()
}

pub fn get_bookings_for_user(conn: &Connection, user_id: &str) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE user_id = ?1 ORDER BY date_time ASC"
    ))?;
    let rows = stmt.query_map(params![user_id], |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

/// Instants of confirmed bookings for a service within `[start, end)`.
pub fn get_confirmed_times_in_range(
    conn: &Connection,
    service_id: &str,
    start: &NaiveDateTime,
    end: &NaiveDateTime,
) -> anyhow::Result<Vec<NaiveDateTime>> {
    let mut stmt = conn.prepare(
        "SELECT date_time FROM bookings
         WHERE service_id = ?1 AND status = 'confirmed' AND date_time >= ?2 AND date_time < ?3
         ORDER BY date_time ASC",
    )?;
    let rows = stmt.query_map(
        params![service_id, format_instant(start), format_instant(end)],
        |row| row.get::<_, String>(0),
    )?;

    let mut times = vec![];
    for row in rows {
        times.push(parse_instant(&row?)?);
    }
    Ok(times)
}

pub fn confirm_booking(
    conn: &Connection,
    id: &str,
    payment: Option<&crate::models::PaymentDetails>,
    now: &NaiveDateTime,
) -> anyhow::Result<ConfirmOutcome> {
    let payment = payment.map(|p| serde_json::to_string(p)).transpose()?;
    let result = conn.execute(
        "UPDATE bookings SET status = 'confirmed', payment = COALESCE(?1, payment), updated_at = ?2
         WHERE id = ?3 AND status = 'pending'",
        params![payment, format_instant(now), id],
    );

    match result {
        Ok(0) => Ok(ConfirmOutcome::NotPending),
        Ok(_) => Ok(ConfirmOutcome::Confirmed),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Ok(ConfirmOutcome::SlotTaken)
        }
        Err(e) => Err(e.into()),
    }
}

/// Moves a booking from `from` to `to`; returns false when the booking was
/// not in `from` (or does not exist).
pub fn transition_booking_status(
    conn: &Connection,
    id: &str,
    from: BookingStatus,
    to: BookingStatus,
    now: &NaiveDateTime,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
        params![to.as_str(), format_instant(now), id, from.as_str()],
    )?;
    Ok(count > 0)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let date_time: String = row.get(4)?;
    let status: String = row.get(5)?;
    let payment: Option<String> = row.get(6)?;
    let created_at: String = row.get(8)?;
    let updated_at: String = row.get(9)?;

    Ok(Booking {
        id: row.get(0)?,
        user_id: row.get(1)?,
        service_id: row.get(2)?,
        provider_id: row.get(3)?,
        date_time: parse_instant(&date_time)?,
        status: BookingStatus::parse(&status),
        payment: payment
            .as_deref()
            .map(|p| serde_json::from_str(p))
            .transpose()?,
        notes: row.get(7)?,
        created_at: parse_instant(&created_at)?,
        updated_at: parse_instant(&updated_at)?,
    })
}

// ── Group Schedules ──

pub fn insert_group_schedule(conn: &Connection, schedule: &GroupSchedule) -> anyhow::Result<()> {
    let attendees = serde_json::to_string(&schedule.attendee_ids)?;
    conn.execute(
        "INSERT INTO group_schedules (id, title, description, created_by, attendee_ids, final_time, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            schedule.id,
            schedule.title,
            schedule.description,
            schedule.created_by,
            attendees,
            schedule.final_time.as_ref().map(format_precise),
            schedule.status.as_str(),
            format_instant(&schedule.created_at),
        ],
    )?;
    insert_proposals(conn, &schedule.id, &schedule.proposed_times, &schedule.created_at)?;
    Ok(())
}

pub fn get_group_schedule(conn: &Connection, id: &str) -> anyhow::Result<Option<GroupSchedule>> {
    let row = conn
        .query_row(
            "SELECT id, title, description, created_by, attendee_ids, final_time, status, created_at
             FROM group_schedules WHERE id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, String>(7)?,
                ))
            },
        )
        .optional()?;

    let Some((id, title, description, created_by, attendees, final_time, status, created_at)) = row
    else {
        return Ok(None);
    };

    let proposed_times = get_proposals(conn, &id)?;

    Ok(Some(GroupSchedule {
        id,
        title,
        description,
        created_by,
        attendee_ids: serde_json::from_str(&attendees)?,
        proposed_times,
        final_time: final_time.as_deref().map(parse_instant).transpose()?,
        status: GroupScheduleStatus::parse(&status),
        created_at: parse_instant(&created_at)?,
    }))
}

pub fn insert_proposals(
    conn: &Connection,
    schedule_id: &str,
    proposals: &[ProposedTime],
    submitted_at: &NaiveDateTime,
) -> anyhow::Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO schedule_proposals (schedule_id, attendee_id, proposed_time, submitted_at)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    let submitted_at = format_instant(submitted_at);
    for proposal in proposals {
        stmt.execute(params![
            schedule_id,
            proposal.attendee_id,
            format_precise(&proposal.time),
            submitted_at,
        ])?;
    }
    Ok(())
}

fn get_proposals(conn: &Connection, schedule_id: &str) -> anyhow::Result<Vec<ProposedTime>> {
    let mut stmt = conn.prepare(
        "SELECT attendee_id, proposed_time FROM schedule_proposals
         WHERE schedule_id = ?1 ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![schedule_id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut proposals = vec![];
    for row in rows {
        let (attendee_id, time) = row?;
        proposals.push(ProposedTime {
            attendee_id,
            time: parse_instant(&time)?,
        });
    }
    Ok(proposals)
}

/// Conditional status change; `final_time` is written only when provided.
/// Proposal and final instants keep microseconds, like waitlist times.
pub fn transition_schedule_status(
    conn: &Connection,
    id: &str,
    from: GroupScheduleStatus,
    to: GroupScheduleStatus,
    final_time: Option<&NaiveDateTime>,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE group_schedules SET status = ?1, final_time = COALESCE(?2, final_time)
         WHERE id = ?3 AND status = ?4",
        params![to.as_str(), final_time.map(format_precise), id, from.as_str()],
    )?;
    Ok(count > 0)
}

// ── Waitlist ──

const WAITLIST_COLUMNS: &str = "id, user_id, service_id, entry_time, priority, notified, notified_at";

pub fn insert_waitlist_entry(conn: &Connection, entry: &WaitlistEntry) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO waitlist_entries (id, user_id, service_id, entry_time, priority, notified, notified_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            entry.id,
            entry.user_id,
            entry.service_id,
            format_precise(&entry.entry_time),
            entry.priority,
            entry.notified,
            entry.notified_at.as_ref().map(format_precise),
        ],
    )?;
    Ok(())
}

pub fn latest_entry_time(
    conn: &Connection,
    service_id: &str,
) -> anyhow::Result<Option<NaiveDateTime>> {
    let latest: Option<String> = conn.query_row(
        "SELECT MAX(entry_time) FROM waitlist_entries WHERE service_id = ?1",
        params![service_id],
        |row| row.get(0),
    )?;
    latest.as_deref().map(parse_instant).transpose()
}

pub fn get_waitlist_entry(conn: &Connection, id: &str) -> anyhow::Result<Option<WaitlistEntry>> {
    let result = conn
        .query_row(
            &format!("SELECT {WAITLIST_COLUMNS} FROM waitlist_entries WHERE id = ?1"),
            params![id],
            |row| Ok(parse_waitlist_row(row)),
        )
        .optional()?;
    result.transpose()
}

/// Earliest un-notified entry for a service, ties broken by id.
pub fn next_unnotified_entry(
    conn: &Connection,
    service_id: &str,
) -> anyhow::Result<Option<WaitlistEntry>> {
    let result = conn
        .query_row(
            &format!(
                "SELECT {WAITLIST_COLUMNS} FROM waitlist_entries
                 WHERE service_id = ?1 AND notified = 0
                 ORDER BY entry_time ASC, id ASC LIMIT 1"
            ),
            params![service_id],
            |row| Ok(parse_waitlist_row(row)),
        )
        .optional()?;
    result.transpose()
}

pub fn list_waitlist(conn: &Connection, service_id: &str) -> anyhow::Result<Vec<WaitlistEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {WAITLIST_COLUMNS} FROM waitlist_entries
         WHERE service_id = ?1 ORDER BY entry_time ASC, id ASC"
    ))?;
    let rows = stmt.query_map(params![service_id], |row| Ok(parse_waitlist_row(row)))?;

    let mut entries = vec![];
    for row in rows {
        entries.push(row??);
    }
    Ok(entries)
}

/// Sets `notified` only if it is still false; returns whether a row changed.
pub fn mark_entry_notified(
    conn: &Connection,
    id: &str,
    now: &NaiveDateTime,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE waitlist_entries SET notified = 1, notified_at = ?1 WHERE id = ?2 AND notified = 0",
        params![format_precise(now), id],
    )?;
    Ok(count > 0)
}

pub fn delete_waitlist_entry(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM waitlist_entries WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

/// Entries notified strictly before `cutoff`, oldest notification first.
pub fn notified_before(
    conn: &Connection,
    cutoff: &NaiveDateTime,
) -> anyhow::Result<Vec<WaitlistEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {WAITLIST_COLUMNS} FROM waitlist_entries
         WHERE notified = 1 AND notified_at < ?1 ORDER BY notified_at ASC, id ASC"
    ))?;
    let rows = stmt.query_map(params![format_precise(cutoff)], |row| {
        Ok(parse_waitlist_row(row))
    })?;

    let mut entries = vec![];
    for row in rows {
        entries.push(row??);
    }
    Ok(entries)
}

fn parse_waitlist_row(row: &rusqlite::Row) -> anyhow::Result<WaitlistEntry> {
    let entry_time: String = row.get(3)?;
    let notified_at: Option<String> = row.get(6)?;
    Ok(WaitlistEntry {
        id: row.get(0)?,
        user_id: row.get(1)?,
        service_id: row.get(2)?,
        entry_time: parse_instant(&entry_time)?,
        priority: row.get(4)?,
        notified: row.get(5)?,
        notified_at: notified_at.as_deref().map(parse_instant).transpose()?,
    })
}
