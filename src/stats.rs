use crate::completion::CompletionMap;
use crate::date_range::{DateRange, DayKey, Granularity, range_for};
use crate::errors::TrackerError;
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayPoint {
    pub date: DayKey,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeStats {
    pub days: Vec<DayPoint>,
    pub completed_count: u32,
    pub total_count: u32,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthSummary {
    pub month: u32,
    pub completed: u32,
    pub total: u32,
    pub rate: f64,
}

/// Pairs every day of `range` with its completion flag (absent means false).
pub fn build(range: &DateRange, completions: &CompletionMap) -> RangeStats {
    let mut days = Vec::with_capacity(range.len());
    days.extend(range.days().map(|date| {
        let date = DayKey::from_date(date);
        DayPoint {
            completed: completions.get(&date).copied().unwrap_or(false),
            date,
        }
    }));

    let total_count = days.len() as u32;
    let completed_count = days.iter().filter(|day| day.completed).count() as u32;

    RangeStats {
        rate: completion_rate(completed_count, total_count),
        days,
        completed_count,
        total_count,
    }
}

/// Per-month totals for `year`, each taken from the same day-level `build`
/// used by the week and month views.
pub fn year_summary(year: i32, completions: &CompletionMap) -> Result<Vec<MonthSummary>, TrackerError> {
    let mut months = Vec::with_capacity(12);
    for month in 1..=12 {
        let first = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| TrackerError::Validation(format!("year {year} out of range")))?;
        let stats = build(&range_for(first, Granularity::Month)?, completions);
        months.push(MonthSummary {
            month,
            completed: stats.completed_count,
            total: stats.total_count,
            rate: stats.rate,
        });
    }
    Ok(months)
}

/// Percentage rounded to one decimal; 0 for an empty range.
pub fn completion_rate(completed: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let percent = f64::from(completed) / f64::from(total) * 100.0;
    (percent * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn mark(map: &mut CompletionMap, dates: &[NaiveDate]) {
        for date in dates {
            map.insert(DayKey::from_date(*date), true);
        }
    }

    #[test]
    fn march_with_three_completed_days() {
        let mut map = CompletionMap::new();
        mark(&mut map, &[ymd(2024, 3, 1), ymd(2024, 3, 3), ymd(2024, 3, 15)]);
        let stats = build(&range_for(ymd(2024, 3, 1), Granularity::Month).unwrap(), &map);
        assert_eq!(stats.total_count, 31);
        assert_eq!(stats.completed_count, 3);
        assert_eq!(stats.rate, 9.7);
        assert_eq!(stats.days[0].date.to_string(), "2024-03-01");
        assert!(stats.days[0].completed);
        assert!(!stats.days[1].completed);
    }

    #[test]
    fn records_outside_range_and_false_records_are_ignored() {
        let mut map = CompletionMap::new();
        mark(&mut map, &[ymd(2024, 2, 29), ymd(2024, 4, 1)]);
        map.insert(DayKey::from_date(ymd(2024, 3, 10)), false);
        let stats = build(&range_for(ymd(2024, 3, 10), Granularity::Month).unwrap(), &map);
        assert_eq!(stats.completed_count, 0);
        assert_eq!(stats.rate, 0.0);
    }

    #[test]
    fn build_is_repeatable() {
        let mut map = CompletionMap::new();
        mark(&mut map, &[ymd(2024, 2, 12)]);
        let range = range_for(ymd(2024, 2, 14), Granularity::Week).unwrap();
        assert_eq!(build(&range, &map), build(&range, &map));
    }

    #[test]
    fn rate_bounds() {
        assert_eq!(completion_rate(0, 0), 0.0);
        assert_eq!(completion_rate(0, 366), 0.0);
        assert!(completion_rate(1, 366) > 0.0);
        assert!(completion_rate(365, 366) < 100.0);
        assert_eq!(completion_rate(31, 31), 100.0);
        for completed in 0..=7 {
            let rate = completion_rate(completed, 7);
            assert!((0.0..=100.0).contains(&rate));
        }
    }

    #[test]
    fn full_week_rates_one_hundred() {
        let range = range_for(ymd(2024, 2, 14), Granularity::Week).unwrap();
        let mut map = CompletionMap::new();
        let days: Vec<NaiveDate> = range.days().collect();
        mark(&mut map, &days);
        let stats = build(&range, &map);
        assert_eq!(stats.completed_count, stats.total_count);
        assert_eq!(stats.rate, 100.0);
    }

    #[test]
    fn leap_year_summary_has_29_day_february() {
        let mut map = CompletionMap::new();
        mark(&mut map, &[ymd(2024, 2, 1), ymd(2024, 2, 29), ymd(2024, 3, 1)]);
        let summary = year_summary(2024, &map).unwrap();
        assert_eq!(summary.len(), 12);
        assert_eq!(summary[1].total, 29);
        assert_eq!(summary[1].completed, 2);
        assert_eq!(summary[1].rate, 6.9);
        assert_eq!(summary[2].completed, 1);
        assert_eq!(year_summary(2023, &map).unwrap()[1].total, 28);
    }

    #[test]
    fn year_summary_matches_month_builds() {
        let mut map = CompletionMap::new();
        mark(&mut map, &[ymd(2024, 6, 5), ymd(2024, 6, 6), ymd(2024, 12, 31)]);
        let summary = year_summary(2024, &map).unwrap();
        for month in [6u32, 12] {
            let stats = build(
                &range_for(ymd(2024, month, 1), Granularity::Month).unwrap(),
                &map,
            );
            let row = &summary[month as usize - 1];
            assert_eq!(row.completed, stats.completed_count);
            assert_eq!(row.rate, stats.rate);
        }
    }
}
