//! Explicit timezone policy for day, hour and weekday comparisons.
//!
//! Instants are stored in UTC. Every "calendar day" question the rules ask
//! is answered in one configured IANA timezone.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;

use crate::error::{QuestlogError, Result};

/// Timezone used to turn instants into local days and hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    tz: Tz,
}

impl Default for Calendar {
    fn default() -> Self {
        Self::new(Tz::UTC)
    }
}

impl Calendar {
    /// Create a calendar for a timezone.
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Create a calendar from an IANA name like `"Europe/Madrid"`.
    pub fn from_name(name: &str) -> Result<Self> {
        let tz: Tz = name
            .parse()
            .map_err(|_| QuestlogError::config(format!("invalid timezone: {name}")))?;
        Ok(Self::new(tz))
    }

    /// The configured timezone.
    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Local calendar day of an instant.
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.tz).date_naive()
    }

    /// Local hour (0-23) of an instant.
    pub fn local_hour(&self, instant: DateTime<Utc>) -> u32 {
        instant.with_timezone(&self.tz).hour()
    }

    /// Local weekday of an instant.
    pub fn local_weekday(&self, instant: DateTime<Utc>) -> Weekday {
        instant.with_timezone(&self.tz).weekday()
    }

    /// Whether an instant falls on a local Saturday or Sunday.
    pub fn is_weekend(&self, instant: DateTime<Utc>) -> bool {
        matches!(self.local_weekday(instant), Weekday::Sat | Weekday::Sun)
    }

    /// Today's local date as seen at `now`.
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        self.local_date(now)
    }

    /// Local noon of `date` as a UTC instant.
    ///
    /// Used to pin date-only due dates; noon never falls in a DST gap.
    pub fn midday(&self, date: NaiveDate) -> DateTime<Utc> {
        let noon = date.and_time(NaiveTime::MIN) + Duration::hours(12);
        self.tz
            .from_local_datetime(&noon)
            .earliest()
            .map(|local| local.with_timezone(&Utc))
            .unwrap_or_else(|| noon.and_utc())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_default_is_utc() {
        let cal = Calendar::default();
        assert_eq!(cal.timezone(), Tz::UTC);
        assert_eq!(
            cal.local_date(utc(2025, 3, 1, 23, 30)),
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
        );
        assert_eq!(cal.local_hour(utc(2025, 3, 1, 23, 30)), 23);
    }

    #[test]
    fn test_from_name_shifts_day_and_hour() {
        // March is CST (UTC-6) in Chicago.
        let cal = Calendar::from_name("America/Chicago").unwrap();
        let instant = utc(2025, 3, 2, 3, 0);
        assert_eq!(
            cal.local_date(instant),
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
        );
        assert_eq!(cal.local_hour(instant), 21);
    }

    #[test]
    fn test_from_name_invalid() {
        let err = Calendar::from_name("Mars/Olympus").unwrap_err();
        assert!(err.to_string().contains("invalid timezone"));
    }

    #[test]
    fn test_is_weekend() {
        let cal = Calendar::default();
        // 2025-03-01 is a Saturday, 2025-03-03 a Monday.
        assert!(cal.is_weekend(utc(2025, 3, 1, 12, 0)));
        assert!(cal.is_weekend(utc(2025, 3, 2, 12, 0)));
        assert!(!cal.is_weekend(utc(2025, 3, 3, 12, 0)));
    }

    #[test]
    fn test_weekend_follows_local_day() {
        // Sunday 23:00 UTC is already Monday in Tokyo.
        let cal = Calendar::from_name("Asia/Tokyo").unwrap();
        assert!(!cal.is_weekend(utc(2025, 3, 2, 23, 0)));
        assert_eq!(cal.local_weekday(utc(2025, 3, 2, 23, 0)), Weekday::Mon);
    }

    #[test]
    fn test_midday_lands_on_same_local_date() {
        let cal = Calendar::from_name("America/New_York").unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();

        let instant = cal.midday(date);

        assert_eq!(cal.local_date(instant), date);
        assert_eq!(cal.local_hour(instant), 12);
        assert_eq!(instant, utc(2025, 3, 9, 16, 0));
    }
}
