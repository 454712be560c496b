//! Instant formatting and calendar-day helpers shared by the store and the
//! scheduling services. All instants are naive timestamps in one reference
//! frame.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::errors::AppError;

pub const INSTANT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Fixed-width microsecond format, so lexical order equals temporal order.
pub const PRECISE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
pub const DAY_FORMAT: &str = "%Y-%m-%d";

pub fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

pub fn format_instant(dt: &NaiveDateTime) -> String {
    dt.format(INSTANT_FORMAT).to_string()
}

pub fn format_precise(dt: &NaiveDateTime) -> String {
    dt.format(PRECISE_FORMAT).to_string()
}

pub fn parse_instant(s: &str) -> anyhow::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, PRECISE_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, INSTANT_FORMAT))
        .map_err(|e| anyhow::anyhow!("invalid stored instant {s:?}: {e}"))
}

pub fn parse_day(s: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(s.trim(), DAY_FORMAT)
        .map_err(|_| AppError::InvalidInput(format!("invalid date: {s} (expected YYYY-MM-DD)")))
}

/// Half-open `[start, next day start)` bounds of a calendar day.
pub fn day_bounds(day: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let start = day.and_time(NaiveTime::MIN);
    let end = start + chrono::Duration::days(1);
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_day_rejects_garbage() {
        assert!(parse_day("2025-06-16").is_ok());
        assert!(matches!(parse_day("16/06/2025"), Err(AppError::InvalidInput(_))));
        assert!(matches!(parse_day("2025-02-30"), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_parse_instant_accepts_both_precisions() {
        let plain = parse_instant("2025-06-16 09:00:00").unwrap();
        let precise = parse_instant("2025-06-16 09:00:00.000250").unwrap();
        assert!(precise > plain);
        assert_eq!(format_instant(&plain), "2025-06-16 09:00:00");
        assert_eq!(format_precise(&precise), "2025-06-16 09:00:00.000250");
    }

    #[test]
    fn test_day_bounds_is_half_open() {
        let day = NaiveDate::from_ymd_opt(2025, 6, 16).unwrap();
        let (start, end) = day_bounds(day);
        assert_eq!(format_instant(&start), "2025-06-16 00:00:00");
        assert_eq!(format_instant(&end), "2025-06-17 00:00:00");
    }
}
