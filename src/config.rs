use std::env;
use std::fmt::Display;
use std::ops::RangeInclusive;
use std::str::FromStr;

use chrono::Duration;

use crate::services::reconcile::ReconcilePolicy;
use crate::services::slots::BusinessHours;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub business_open_hour: u32,
    pub business_close_hour: u32,
    pub quorum_percent: u32,
    pub tolerance_minutes: i64,
    pub waitlist_timeout_minutes: i64,
    pub min_advance_hours: i64,
    pub max_advance_days: i64,
    pub max_group_size: usize,
    pub sweep_interval_secs: u64,
}

/// How far ahead of "now" a booking may be placed.
#[derive(Clone, Copy, Debug)]
pub struct BookingWindow {
    pub min_advance: Duration,
    pub max_advance: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            database_url: "schedulr.db".to_string(),
            business_open_hour: 9,
            business_close_hour: 17,
            quorum_percent: 60,
            tolerance_minutes: 60,
            waitlist_timeout_minutes: 15,
            min_advance_hours: 2,
            max_advance_days: 90,
            max_group_size: 20,
            sweep_interval_secs: 60,
        }
    }
}

impl AppConfig {
    /// Reads settings from the environment. Unparsable or out-of-range
    /// values are logged and replaced by their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: env_or("PORT", defaults.port),
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            business_open_hour: env_in("BUSINESS_OPEN_HOUR", defaults.business_open_hour, HOUR),
            business_close_hour: env_in(
                "BUSINESS_CLOSE_HOUR",
                defaults.business_close_hour,
                HOUR,
            ),
            quorum_percent: env_in("QUORUM_PERCENT", defaults.quorum_percent, QUORUM_PERCENT),
            tolerance_minutes: env_in(
                "TOLERANCE_MINUTES",
                defaults.tolerance_minutes,
                TOLERANCE_MINUTES,
            ),
            waitlist_timeout_minutes: env_in(
                "WAITLIST_TIMEOUT_MINUTES",
                defaults.waitlist_timeout_minutes,
                WAITLIST_TIMEOUT_MINUTES,
            ),
            min_advance_hours: env_in(
                "MIN_ADVANCE_HOURS",
                defaults.min_advance_hours,
                MIN_ADVANCE_HOURS,
            ),
            max_advance_days: env_in(
                "MAX_ADVANCE_DAYS",
                defaults.max_advance_days,
                MAX_ADVANCE_DAYS,
            ),
            max_group_size: env_in("MAX_GROUP_SIZE", defaults.max_group_size, MAX_GROUP_SIZE),
            sweep_interval_secs: env_in(
                "SWEEP_INTERVAL_SECS",
                defaults.sweep_interval_secs,
                SWEEP_INTERVAL_SECS,
            ),
        }
    }

    /// Bounds check for configs built by hand. The duration helpers below
    /// assume it passed.
    pub fn validate(&self) -> anyhow::Result<()> {
        check("BUSINESS_OPEN_HOUR", self.business_open_hour, HOUR)?;
        check("BUSINESS_CLOSE_HOUR", self.business_close_hour, HOUR)?;
        check("QUORUM_PERCENT", self.quorum_percent, QUORUM_PERCENT)?;
        check("TOLERANCE_MINUTES", self.tolerance_minutes, TOLERANCE_MINUTES)?;
        check(
            "WAITLIST_TIMEOUT_MINUTES",
            self.waitlist_timeout_minutes,
            WAITLIST_TIMEOUT_MINUTES,
        )?;
        check("MIN_ADVANCE_HOURS", self.min_advance_hours, MIN_ADVANCE_HOURS)?;
        check("MAX_ADVANCE_DAYS", self.max_advance_days, MAX_ADVANCE_DAYS)?;
        check("MAX_GROUP_SIZE", self.max_group_size, MAX_GROUP_SIZE)?;
        check("SWEEP_INTERVAL_SECS", self.sweep_interval_secs, SWEEP_INTERVAL_SECS)?;
        Ok(())
    }

    pub fn business_hours(&self) -> BusinessHours {
        BusinessHours {
            open_hour: self.business_open_hour,
            close_hour: self.business_close_hour,
        }
    }

    pub fn reconcile_policy(&self) -> ReconcilePolicy {
        ReconcilePolicy {
            tolerance: Duration::minutes(self.tolerance_minutes),
            quorum_percent: self.quorum_percent,
        }
    }

    pub fn booking_window(&self) -> BookingWindow {
        BookingWindow {
            min_advance: Duration::hours(self.min_advance_hours),
            max_advance: Duration::days(self.max_advance_days),
        }
    }

    pub fn waitlist_timeout(&self) -> Duration {
        Duration::minutes(self.waitlist_timeout_minutes)
    }
}

const HOUR: RangeInclusive<u32> = 0..=24;
const QUORUM_PERCENT: RangeInclusive<u32> = 1..=100;
const TOLERANCE_MINUTES: RangeInclusive<i64> = 1..=10_080;
const WAITLIST_TIMEOUT_MINUTES: RangeInclusive<i64> = 1..=10_080;
const MIN_ADVANCE_HOURS: RangeInclusive<i64> = 0..=8_760;
const MAX_ADVANCE_DAYS: RangeInclusive<i64> = 1..=3_650;
const MAX_GROUP_SIZE: RangeInclusive<usize> = 1..=1_000;
const SWEEP_INTERVAL_SECS: RangeInclusive<u64> = 1..=86_400;

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, "unparsable setting, using default");
                default
            }
        },
        Err(_) => default,
    }
}

fn env_in<T>(key: &str, default: T, range: RangeInclusive<T>) -> T
where
    T: FromStr + PartialOrd + Display + Copy,
{
    let value = env_or(key, default);
    if range.contains(&value) {
        return value;
    }
    tracing::warn!(
        key,
        value = %value,
        min = %range.start(),
        max = %range.end(),
        "setting out of range, using default"
    );
    default
}

fn check<T: PartialOrd + Display>(key: &str, value: T, range: RangeInclusive<T>) -> anyhow::Result<()> {
    anyhow::ensure!(
        range.contains(&value),
        "{key}={value} is outside {}..={}",
        range.start(),
        range.end()
    );
    Ok(())
}
