//! crates/study_tracker_core/src/time.rs
//!
//! Clock implementations and the calendar-day arithmetic shared by the
//! streak and pomodoro logic.
//!
//! Every "day" in the application is a calendar day in one fixed reference
//! timezone. Study logs store that day directly as a `NaiveDate`; pomodoro
//! timestamps are mapped onto it through [`Calendar`].

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use std::sync::Mutex;

use crate::ports::Clock;

/// Reads the real wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Used by tests and tooling.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Maps instants onto calendar days of a fixed reference timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    offset: FixedOffset,
}

impl Default for Calendar {
    fn default() -> Self {
        Self::utc()
    }
}

impl Calendar {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn utc() -> Self {
        Self { offset: Utc.fix() }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// The calendar day `instant` falls on.
    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    pub fn today(&self, clock: &dyn Clock) -> NaiveDate {
        self.date_of(clock.now())
    }

    /// Midnight at the start of `date`, as a UTC instant.
    pub fn start_of(&self, date: NaiveDate) -> DateTime<Utc> {
        // A fixed offset has no gaps or folds, so the local midnight is unique.
        self.offset
            .from_local_datetime(&date.and_time(NaiveTime::MIN))
            .single()
            .map(|local| local.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
    }

    /// The half-open interval `[start, end)` covering `date`.
    pub fn day_bounds(&self, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self.start_of(date);
        (start, start + Duration::days(1))
    }
}

/// Whole days from `earlier` to `later`; negative when `later` is before.
pub fn days_between(later: NaiveDate, earlier: NaiveDate) -> i64 {
    later.signed_duration_since(earlier).num_days()
}

/// Parses offsets such as `+09:00`, `-05:30` or `Z`.
pub fn parse_utc_offset(raw: &str) -> Option<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return Some(Utc.fix());
    }
    let (sign, rest) = match raw.as_bytes().first()? {
        b'+' => (1, &raw[1..]),
        b'-' => (-1, &raw[1..]),
        _ => return None,
    };
    let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokyo() -> Calendar {
        Calendar::new(FixedOffset::east_opt(9 * 3600).unwrap())
    }

    #[test]
    fn date_of_uses_the_reference_offset() {
        // 2025-01-01 20:00 UTC is already the 2nd in Tokyo.
        let instant = Utc.with_ymd_and_hms(2025, 1, 1, 20, 0, 0).unwrap();
        assert_eq!(Calendar::utc().date_of(instant), NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(tokyo().date_of(instant), NaiveDate::from_ymd_opt(2025, 1, 2).unwrap());
    }

    #[test]
    fn day_bounds_are_half_open_local_midnights() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        let (start, end) = tokyo().day_bounds(date);
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 1, 1, 15, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 1, 2, 15, 0, 0).unwrap());
    }

    #[test]
    fn fixed_clock_advances_on_request() {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 5, 1, 23, 30, 0).unwrap());
        clock.advance(Duration::hours(1));
        assert_eq!(Calendar::utc().today(&clock), NaiveDate::from_ymd_opt(2025, 5, 2).unwrap());
    }

    #[test]
    fn parses_common_offset_spellings() {
        assert_eq!(parse_utc_offset("+09:00"), FixedOffset::east_opt(9 * 3600));
        assert_eq!(parse_utc_offset("-05:30"), FixedOffset::east_opt(-(5 * 3600 + 30 * 60)));
        assert_eq!(parse_utc_offset("Z"), FixedOffset::east_opt(0));
        assert_eq!(parse_utc_offset("+9"), FixedOffset::east_opt(9 * 3600));
        assert_eq!(parse_utc_offset("09:00"), None);
        assert_eq!(parse_utc_offset("+25:00"), None);
    }
}
