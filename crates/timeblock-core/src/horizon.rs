//! Planning horizon: the bounded multi-week window every run works inside.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;

use crate::error::ValidationError;
use crate::event::Interval;

/// Shortest supported horizon, in days (inclusive span).
pub const MIN_HORIZON_DAYS: i64 = 21;

/// Longest supported horizon, in days (inclusive span).
pub const MAX_HORIZON_DAYS: i64 = 28;

/// Upper bound for any minute quantity (durations, chunks, buffers).
/// Nothing longer than the longest horizon can ever be placed.
pub const MAX_SPAN_MINUTES: i64 = MAX_HORIZON_DAYS * 24 * 60;

/// Inclusive date range `[start, end]` spanning three to four weeks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlanningHorizon {
    start: NaiveDate,
    end: NaiveDate,
}

impl PlanningHorizon {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationError> {
        let span = (end - start).num_days() + 1;
        if !(MIN_HORIZON_DAYS..=MAX_HORIZON_DAYS).contains(&span) {
            return Err(ValidationError::InvalidHorizon(format!(
                "{start}..={end} spans {span} days; expected {MIN_HORIZON_DAYS}-{MAX_HORIZON_DAYS}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Horizon of `days` days beginning on `start`.
    pub fn starting(start: NaiveDate, days: u32) -> Result<Self, ValidationError> {
        if days == 0 {
            return Err(ValidationError::InvalidHorizon("horizon must span at least one day".into()));
        }
        Self::new(start, start + Duration::days(i64::from(days) - 1))
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end
    }

    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Every date in the horizon, in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        (0..self.num_days()).map(move |offset| self.start + Duration::days(offset))
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Midnight UTC at the start of the first day.
    pub fn start_instant(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.start.and_time(NaiveTime::MIN))
    }

    /// Midnight UTC after the last day.
    pub fn end_instant(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&(self.end + Duration::days(1)).and_time(NaiveTime::MIN))
    }

    pub fn interval(&self) -> Interval {
        Interval::span(self.start_instant(), self.end_instant())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn accepts_three_to_four_weeks() {
        assert!(PlanningHorizon::starting(date(2024, 1, 1), 21).is_ok());
        assert!(PlanningHorizon::starting(date(2024, 1, 1), 28).is_ok());
        assert!(PlanningHorizon::starting(date(2024, 1, 1), 20).is_err());
        assert!(PlanningHorizon::starting(date(2024, 1, 1), 29).is_err());
        assert!(PlanningHorizon::starting(date(2024, 1, 1), 0).is_err());
    }

    #[test]
    fn rejects_inverted_dates() {
        assert!(PlanningHorizon::new(date(2024, 2, 1), date(2024, 1, 1)).is_err());
    }

    #[test]
    fn instants_bracket_all_days() {
        let horizon = PlanningHorizon::starting(date(2024, 1, 1), 21).unwrap();
        assert_eq!(horizon.end_date(), date(2024, 1, 21));
        assert_eq!(horizon.days().count(), 21);
        assert_eq!((horizon.end_instant() - horizon.start_instant()).num_days(), 21);
        assert!(horizon.contains_date(date(2024, 1, 21)));
        assert!(!horizon.contains_date(date(2024, 1, 22)));
    }
}
