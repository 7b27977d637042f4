//! Candidate query dates in the observer's reference timezone.
//!
//! European matches finish late at night in Pacific time, and NBA games on the
//! US east coast end after midnight UTC, so a single calendar date is not
//! enough: each run queries today and a couple of prior days.

use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate, Offset, TimeZone, Utc, Weekday};

use crate::config::{ScheduleConfig, ZoneKind};
use crate::error::ConfigError;

/// Never reach further back than this many days from today.
pub const MAX_DAYS_BACK: u32 = 2;

const HOUR: i32 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceZone {
    /// US Pacific with daylight saving (PST/PDT).
    UsPacific,
    Fixed(FixedOffset),
}

impl ReferenceZone {
    pub fn from_config(config: &ScheduleConfig) -> Result<Self, ConfigError> {
        match config.zone {
            ZoneKind::UsPacific => Ok(ReferenceZone::UsPacific),
            ZoneKind::Fixed => FixedOffset::east_opt(config.utc_offset_hours.saturating_mul(HOUR))
                .map(ReferenceZone::Fixed)
                .ok_or(ConfigError::BadOffset(config.utc_offset_hours)),
        }
    }

    /// UTC offset in effect at `at`.
    pub fn offset_at(&self, at: DateTime<Utc>) -> FixedOffset {
        match self {
            ReferenceZone::Fixed(offset) => *offset,
            ReferenceZone::UsPacific => {
                let hours = if pacific_dst_active(at) { -7 } else { -8 };
                FixedOffset::east_opt(hours * HOUR).unwrap_or_else(|| Utc.fix())
            }
        }
    }

    pub fn today(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset_at(at)).date_naive()
    }
}

/// US rule: from the second Sunday of March at 02:00 PST (10:00 UTC) until the
/// first Sunday of November at 02:00 PDT (09:00 UTC).
fn pacific_dst_active(at: DateTime<Utc>) -> bool {
    let year = at.year();
    let start = NaiveDate::from_weekday_of_month_opt(year, 3, Weekday::Sun, 2)
        .and_then(|d| d.and_hms_opt(10, 0, 0));
    let end = NaiveDate::from_weekday_of_month_opt(year, 11, Weekday::Sun, 1)
        .and_then(|d| d.and_hms_opt(9, 0, 0));

    match (start, end) {
        (Some(start), Some(end)) => {
            let naive = at.naive_utc();
            naive >= start && naive < end
        }
        _ => false,
    }
}

/// Which dates a run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeSelector {
    /// Today and `days_back` prior days.
    Rolling { days_back: u32 },
    Date(NaiveDate),
    /// Inclusive range.
    Range { from: NaiveDate, to: NaiveDate },
}

impl ScopeSelector {
    /// Dates to query, most recent first.
    pub fn candidate_dates(&self, today: NaiveDate) -> Result<Vec<NaiveDate>, ConfigError> {
        match self {
            ScopeSelector::Rolling { days_back } => Ok((0..=(*days_back).min(MAX_DAYS_BACK))
                .filter_map(|n| today.checked_sub_days(Days::new(n as u64)))
                .collect()),
            ScopeSelector::Date(date) => Ok(vec![*date]),
            ScopeSelector::Range { from, to } => {
                if from > to {
                    return Err(ConfigError::InvertedRange {
                        from: from.to_string(),
                        to: to.to_string(),
                    });
                }
                let mut dates: Vec<NaiveDate> = from.iter_days().take_while(|d| d <= to).collect();
                dates.reverse();
                Ok(dates)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_pacific_offset_follows_dst() {
        let zone = ReferenceZone::UsPacific;
        assert_eq!(zone.offset_at(utc(2026, 1, 15, 12)).local_minus_utc(), -8 * HOUR);
        assert_eq!(zone.offset_at(utc(2026, 7, 1, 12)).local_minus_utc(), -7 * HOUR);
        // 2026-03-08 is the second Sunday of March.
        assert_eq!(zone.offset_at(utc(2026, 3, 8, 9)).local_minus_utc(), -8 * HOUR);
        assert_eq!(zone.offset_at(utc(2026, 3, 8, 10)).local_minus_utc(), -7 * HOUR);
        // 2026-11-01 is the first Sunday of November.
        assert_eq!(zone.offset_at(utc(2026, 11, 1, 8)).local_minus_utc(), -7 * HOUR);
        assert_eq!(zone.offset_at(utc(2026, 11, 1, 9)).local_minus_utc(), -8 * HOUR);
    }

    #[test]
    fn test_today_crosses_date_line() {
        // 03:00 UTC on the 20th is still the evening of the 19th in Los Angeles.
        let zone = ReferenceZone::UsPacific;
        assert_eq!(zone.today(utc(2026, 10, 20, 3)), date(2026, 10, 19));
    }

    #[test]
    fn test_fixed_zone_from_config() {
        let config = ScheduleConfig {
            zone: ZoneKind::Fixed,
            utc_offset_hours: 1,
            days_back: 2,
        };
        let zone = ReferenceZone::from_config(&config).unwrap();
        assert_eq!(zone.today(utc(2026, 10, 19, 23)), date(2026, 10, 20));
    }

    #[test]
    fn test_bad_offset_rejected() {
        let config = ScheduleConfig {
            zone: ZoneKind::Fixed,
            utc_offset_hours: 30,
            days_back: 2,
        };
        assert_eq!(
            ReferenceZone::from_config(&config).unwrap_err(),
            ConfigError::BadOffset(30)
        );
    }

    #[test]
    fn test_rolling_window_is_most_recent_first_and_capped() {
        let dates = ScopeSelector::Rolling { days_back: 7 }
            .candidate_dates(date(2026, 3, 1))
            .unwrap();
        assert_eq!(dates, vec![date(2026, 3, 1), date(2026, 2, 28), date(2026, 2, 27)]);
    }

    #[test]
    fn test_range_is_reversed() {
        let dates = ScopeSelector::Range {
            from: date(2026, 1, 1),
            to: date(2026, 1, 3),
        }
        .candidate_dates(date(2026, 10, 19))
        .unwrap();
        assert_eq!(dates, vec![date(2026, 1, 3), date(2026, 1, 2), date(2026, 1, 1)]);
    }

    #[test]
    fn test_inverted_range_rejected() {
        let err = ScopeSelector::Range {
            from: date(2026, 1, 3),
            to: date(2026, 1, 1),
        }
        .candidate_dates(date(2026, 10, 19))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvertedRange { .. }));
    }
}
