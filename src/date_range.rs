//! Calendar boundaries for the week, month and year views.
//!
//! All comparisons happen on calendar dates (`NaiveDate`), never on instants,
//! and the canonical storage form of a day is its zero-padded `YYYY-MM-DD` key.

use crate::errors::TrackerError;
use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Week,
    Month,
    Year,
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Granularity::Week => "week",
            Granularity::Month => "month",
            Granularity::Year => "year",
        };
        f.write_str(name)
    }
}

/// One step backwards or forwards; `-1` and `1` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum Direction {
    Back,
    Forward,
}

impl TryFrom<i8> for Direction {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Direction::Back),
            1 => Ok(Direction::Forward),
            other => Err(format!("direction must be -1 or 1, got {other}")),
        }
    }
}

impl From<Direction> for i8 {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Back => -1,
            Direction::Forward => 1,
        }
    }
}

/// Canonical day key. Two keys are equal exactly when they name the same calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DayKey(NaiveDate);

impl DayKey {
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Accepts `YYYY-M-D` with or without zero padding and canonicalizes it.
    /// Signed years (`-0001-03-01`, `+10000-01-01`) read back what `Display` writes.
    pub fn parse(raw: &str) -> Result<Self, TrackerError> {
        let invalid = || TrackerError::Validation(format!("invalid day key '{raw}'"));
        let trimmed = raw.trim();
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            return Ok(Self(date));
        }

        let (negative, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        let mut parts = unsigned.split('-');
        let (Some(year), Some(month), Some(day), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        if year.starts_with(['+', '-']) {
            return Err(invalid());
        }
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let year = if negative { -year } else { year };
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        let day = day.parse::<u32>().map_err(|_| invalid())?;
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(invalid)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl TryFrom<String> for DayKey {
    type Error = TrackerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DayKey> for String {
    fn from(key: DayKey) -> Self {
        key.to_string()
    }
}

/// Inclusive on both ends; `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Every day from `start` to `end`, ascending.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(move |date| *date <= self.end)
    }

    pub fn len(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        (self.end - self.start).num_days() as usize + 1
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

/// The week (Sunday to Saturday), month or year containing `reference`.
pub fn range_for(reference: NaiveDate, granularity: Granularity) -> Result<DateRange, TrackerError> {
    let out_of_range = || TrackerError::DateOutOfRange(reference);
    let (start, end) = match granularity {
        Granularity::Week => {
            let start = week_start(reference).ok_or_else(out_of_range)?;
            let end = start.checked_add_days(Days::new(6)).ok_or_else(out_of_range)?;
            (start, end)
        }
        Granularity::Month => {
            let start = NaiveDate::from_ymd_opt(reference.year(), reference.month(), 1)
                .ok_or_else(out_of_range)?;
            // day zero of the following month
            let end = start
                .checked_add_months(Months::new(1))
                .and_then(|next| next.pred_opt())
                .ok_or_else(out_of_range)?;
            (start, end)
        }
        Granularity::Year => {
            let start =
                NaiveDate::from_ymd_opt(reference.year(), 1, 1).ok_or_else(out_of_range)?;
            let end =
                NaiveDate::from_ymd_opt(reference.year(), 12, 31).ok_or_else(out_of_range)?;
            (start, end)
        }
    };
    Ok(DateRange { start, end })
}

/// Moves `reference` one unit of `granularity`. Month and year steps clamp the day
/// of month to the target month's length (Jan 31 + 1 month = Feb 28/29).
pub fn shift(
    reference: NaiveDate,
    granularity: Granularity,
    direction: Direction,
) -> Result<NaiveDate, TrackerError> {
    let shifted = match (granularity, direction) {
        (Granularity::Week, Direction::Back) => reference.checked_sub_days(Days::new(7)),
        (Granularity::Week, Direction::Forward) => reference.checked_add_days(Days::new(7)),
        (Granularity::Month, Direction::Back) => reference.checked_sub_months(Months::new(1)),
        (Granularity::Month, Direction::Forward) => reference.checked_add_months(Months::new(1)),
        (Granularity::Year, Direction::Back) => reference.checked_sub_months(Months::new(12)),
        (Granularity::Year, Direction::Forward) => reference.checked_add_months(Months::new(12)),
    };
    shifted.ok_or(TrackerError::DateOutOfRange(reference))
}

pub fn days_in(range: &DateRange) -> Vec<NaiveDate> {
    range.days().collect()
}

pub fn day_key(date: NaiveDate) -> DayKey {
    DayKey::from_date(date)
}

fn week_start(date: NaiveDate) -> Option<NaiveDate> {
    date.checked_sub_days(Days::new(u64::from(date.weekday().num_days_from_sunday())))
}

/// Week number counted from the Sunday-started week holding Jan 1.
pub fn week_of_year(date: NaiveDate) -> u32 {
    let jan1_offset = NaiveDate::from_ymd_opt(date.year(), 1, 1)
        .map(|jan1| jan1.weekday().num_days_from_sunday())
        .unwrap_or(0);
    (date.ordinal0() + jan1_offset + 1).div_ceil(7)
}

pub fn title(range: &DateRange, granularity: Granularity) -> String {
    match granularity {
        Granularity::Week => format!(
            "{} - {}",
            range.start.format("%Y-%m-%d"),
            range.end.format("%Y-%m-%d")
        ),
        Granularity::Month => range.start.format("%Y-%m").to_string(),
        Granularity::Year => range.start.format("%Y").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn week_range_runs_sunday_to_saturday() {
        let range = range_for(ymd(2024, 2, 14), Granularity::Week).unwrap();
        assert_eq!(range.start, ymd(2024, 2, 11));
        assert_eq!(range.end, ymd(2024, 2, 17));
        assert_eq!(range.start.weekday(), Weekday::Sun);
        assert_eq!(range.end.weekday(), Weekday::Sat);
    }

    #[test]
    fn week_range_on_a_sunday_starts_that_day() {
        let range = range_for(ymd(2024, 3, 3), Granularity::Week).unwrap();
        assert_eq!(range.start, ymd(2024, 3, 3));
        assert_eq!(range.end, ymd(2024, 3, 9));
    }

    #[test]
    fn every_range_contains_its_reference_day() {
        let mut date = ymd(2023, 11, 1);
        while date <= ymd(2025, 3, 31) {
            for granularity in [Granularity::Week, Granularity::Month, Granularity::Year] {
                let range = range_for(date, granularity).unwrap();
                assert!(
                    range.start <= date && date <= range.end,
                    "{date} not in {granularity} {range:?}"
                );
                let days = days_in(&range);
                assert_eq!(days.len(), range.len());
                match granularity {
                    Granularity::Week => {
                        assert_eq!(days.len(), 7);
                        assert_eq!(days[0].weekday(), Weekday::Sun);
                    }
                    Granularity::Month => assert!((28..=31).contains(&days.len())),
                    Granularity::Year => assert!(days.len() == 365 || days.len() == 366),
                }
            }
            date = date.succ_opt().unwrap();
        }
    }

    #[test]
    fn month_range_handles_leap_february() {
        let leap = range_for(ymd(2024, 2, 10), Granularity::Month).unwrap();
        assert_eq!(leap.end, ymd(2024, 2, 29));
        let common = range_for(ymd(2023, 2, 10), Granularity::Month).unwrap();
        assert_eq!(common.end, ymd(2023, 2, 28));
        let december = range_for(ymd(2023, 12, 25), Granularity::Month).unwrap();
        assert_eq!(december.start, ymd(2023, 12, 1));
        assert_eq!(december.end, ymd(2023, 12, 31));
    }

    #[test]
    fn year_range_spans_jan_to_dec() {
        let range = range_for(ymd(2024, 7, 4), Granularity::Year).unwrap();
        assert_eq!(range.start, ymd(2024, 1, 1));
        assert_eq!(range.end, ymd(2024, 12, 31));
        assert_eq!(range.len(), 366);
    }

    #[test]
    fn month_shift_clamps_to_month_end() {
        let shifted = shift(ymd(2024, 1, 31), Granularity::Month, Direction::Forward).unwrap();
        assert_eq!(shifted, ymd(2024, 2, 29));
        let back = shift(ymd(2024, 3, 31), Granularity::Month, Direction::Back).unwrap();
        assert_eq!(back, ymd(2024, 2, 29));
    }

    #[test]
    fn week_and_year_shift() {
        assert_eq!(
            shift(ymd(2024, 2, 14), Granularity::Week, Direction::Back).unwrap(),
            ymd(2024, 2, 7)
        );
        assert_eq!(
            shift(ymd(2024, 2, 29), Granularity::Year, Direction::Forward).unwrap(),
            ymd(2025, 2, 28)
        );
    }

    #[test]
    fn shift_past_calendar_limit_is_an_error() {
        let err = shift(NaiveDate::MAX, Granularity::Week, Direction::Forward).unwrap_err();
        assert_eq!(err, TrackerError::DateOutOfRange(NaiveDate::MAX));
    }

    #[test]
    fn day_key_is_zero_padded_and_lenient_on_parse() {
        assert_eq!(day_key(ymd(2024, 3, 1)).to_string(), "2024-03-01");
        assert_eq!(DayKey::parse("2024-3-1").unwrap(), day_key(ymd(2024, 3, 1)));
        assert!(DayKey::parse("2024-02-30").is_err());
        assert!(DayKey::parse("2024-02").is_err());
        assert!(DayKey::parse("2024-02-01-09").is_err());
        assert!(DayKey::parse("--2024-02-01").is_err());
    }

    #[test]
    fn day_keys_outside_four_digit_years_read_back() {
        for date in [ymd(-1, 3, 1), ymd(0, 12, 31), ymd(10000, 1, 1)] {
            let key = day_key(date);
            assert_eq!(DayKey::parse(&key.to_string()).unwrap(), key);
        }
        assert_eq!(DayKey::parse("-1-3-1").unwrap(), day_key(ymd(-1, 3, 1)));
    }

    #[test]
    fn year_navigation_below_year_zero_keeps_usable_keys() {
        let back = shift(ymd(0, 3, 1), Granularity::Year, Direction::Back).unwrap();
        let range = range_for(back, Granularity::Month).unwrap();
        for date in range.days() {
            let key = day_key(date);
            assert_eq!(DayKey::parse(&key.to_string()).unwrap().date(), date);
        }
    }

    #[test]
    fn inverted_range_has_no_days() {
        let range = DateRange {
            start: ymd(2024, 3, 2),
            end: ymd(2024, 3, 1),
        };
        assert!(range.is_empty());
        assert_eq!(range.len(), 0);
        assert_eq!(range.days().count(), 0);
    }

    #[test]
    fn direction_reads_signed_steps() {
        let back: Direction = serde_json::from_str("-1").unwrap();
        assert_eq!(back, Direction::Back);
        assert!(serde_json::from_str::<Direction>("2").is_err());
    }

    #[test]
    fn titles_and_week_numbers() {
        let week = range_for(ymd(2024, 2, 14), Granularity::Week).unwrap();
        assert_eq!(title(&week, Granularity::Week), "2024-02-11 - 2024-02-17");
        let month = range_for(ymd(2024, 2, 14), Granularity::Month).unwrap();
        assert_eq!(title(&month, Granularity::Month), "2024-02");
        // Jan 1 2024 is a Monday, so Jan 6 closes week 1 and Jan 7 opens week 2.
        assert_eq!(week_of_year(ymd(2024, 1, 6)), 1);
        assert_eq!(week_of_year(ymd(2024, 1, 7)), 2);
    }
}
