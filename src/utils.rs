use crate::error::{Result, StatisticsError};
use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, SubsecRound, Utc};

/// Smallest step between two adjacent reporting windows.
pub fn instant() -> Duration {
    Duration::milliseconds(1)
}

/// Drops precision below [`instant`] so adjacent windows leave no gap.
pub fn truncate_to_instant(at: DateTime<Utc>) -> DateTime<Utc> {
    at.trunc_subsecs(3)
}

pub fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

pub fn last_day_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    let (next_year, next_month) = next_month(year, month);

    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.checked_sub_days(Days::new(1)))
        .ok_or_else(|| StatisticsError::DateError(format!("Invalid month {}-{:02}", year, month)))
}

pub fn start_of_day(date: NaiveDate) -> Result<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| StatisticsError::DateError(format!("Invalid date {}", date)))
}

pub fn end_of_day(date: NaiveDate) -> Result<DateTime<Utc>> {
    let next = date
        .checked_add_days(Days::new(1))
        .ok_or_else(|| StatisticsError::DateError(format!("Date overflow after {}", date)))?;
    Ok(start_of_day(next)? - instant())
}

/// First instant of the given calendar month.
pub fn month_start(year: i32, month: u32) -> Result<DateTime<Utc>> {
    let date = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| StatisticsError::DateError(format!("Invalid month {}-{:02}", year, month)))?;
    start_of_day(date)
}

/// Last instant of the given calendar month.
pub fn month_end(year: i32, month: u32) -> Result<DateTime<Utc>> {
    let (next_year, next_month) = next_month(year, month);
    Ok(month_start(next_year, next_month)? - instant())
}

pub fn year_bounds(year: i32) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    Ok((month_start(year, 1)?, month_end(year, 12)?))
}

pub fn month_key(year: i32, month: u32) -> String {
    format!("{:04}-{:02}", year, month)
}

pub fn month_key_of(at: DateTime<Utc>) -> String {
    month_key(at.year(), at.month())
}

/// Inclusive overlap test between two closed intervals.
pub fn windows_overlap(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start <= b_end && b_start <= a_end
}

/// `part / whole * 100`, or zero when `whole` is not positive.
pub fn ratio_pct(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_last_day_of_month() {
        assert_eq!(
            last_day_of_month(2023, 2).unwrap(),
            NaiveDate::from_ymd_opt(2023, 2, 28).unwrap()
        );
        assert_eq!(
            last_day_of_month(2024, 2).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert_eq!(
            last_day_of_month(2023, 12).unwrap(),
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()
        );
        assert!(last_day_of_month(2023, 13).is_err());
    }

    #[test]
    fn test_month_bounds() {
        let start = month_start(2024, 2).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());

        let end = month_end(2024, 2).unwrap();
        assert_eq!(end.day(), 29);
        assert_eq!(end.hour(), 23);
        assert_eq!(end + instant(), month_start(2024, 3).unwrap());

        let december = month_end(2023, 12).unwrap();
        assert_eq!(december + instant(), month_start(2024, 1).unwrap());
    }

    #[test]
    fn test_day_bounds() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let end = end_of_day(date).unwrap();
        assert_eq!(end + instant(), start_of_day(date.succ_opt().unwrap()).unwrap());
    }

    #[test]
    fn test_month_key() {
        assert_eq!(month_key(2024, 3), "2024-03");
        assert_eq!(
            month_key_of(Utc.with_ymd_and_hms(2023, 11, 5, 12, 0, 0).unwrap()),
            "2023-11"
        );
    }

    #[test]
    fn test_ratio_pct_never_divides_by_zero() {
        assert_eq!(ratio_pct(25.0, 200.0), 12.5);
        assert_eq!(ratio_pct(5.0, 0.0), 0.0);
        assert_eq!(ratio_pct(0.0, 0.0), 0.0);
        assert!(ratio_pct(1.0, 0.0).is_finite());
    }

    #[test]
    fn test_windows_overlap() {
        let jan_start = month_start(2024, 1).unwrap();
        let jan_end = month_end(2024, 1).unwrap();
        let feb_start = month_start(2024, 2).unwrap();
        let feb_end = month_end(2024, 2).unwrap();

        assert!(windows_overlap(jan_start, jan_end, jan_end, feb_end));
        assert!(!windows_overlap(jan_start, jan_end, feb_start, feb_end));
    }
}
