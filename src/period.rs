use crate::error::Result;
use crate::utils::{end_of_day, instant, month_end, month_start, start_of_day, truncate_to_instant};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

/// What the caller asked for. Every field is optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PeriodRequest {
    pub filter_start: Option<DateTime<Utc>>,
    pub filter_end: Option<DateTime<Utc>>,
    pub selected_year: Option<i32>,
}

impl PeriodRequest {
    pub fn new(
        filter_start: Option<DateTime<Utc>>,
        filter_end: Option<DateTime<Utc>>,
        selected_year: Option<i32>,
    ) -> Self {
        Self {
            filter_start,
            filter_end,
            selected_year,
        }
    }

    /// Whole-day window from the first instant of `start` to the last instant of `end`.
    pub fn from_dates(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        Ok(Self {
            filter_start: Some(start_of_day(start)?),
            filter_end: Some(end_of_day(end)?),
            selected_year: None,
        })
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.selected_year = Some(year);
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolvedPeriod {
    pub filter_start: DateTime<Utc>,
    pub filter_end: DateTime<Utc>,
    pub comparison_start: DateTime<Utc>,
    pub comparison_end: DateTime<Utc>,
    pub trend_year: i32,
}

impl ResolvedPeriod {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.filter_start <= at && at <= self.filter_end
    }

    pub fn comparison_contains(&self, at: DateTime<Utc>) -> bool {
        self.comparison_start <= at && at <= self.comparison_end
    }
}

/// Resolves the active window and its comparison window.
///
/// Without an explicit start *and* end the window is the calendar month
/// containing `now`. A reversed explicit window is swapped rather than
/// rejected. The comparison window has the same length and ends one
/// instant before the filter window starts. A comparison window reaching
/// past the earliest representable time is clamped to it.
pub fn resolve_period(request: &PeriodRequest, now: DateTime<Utc>) -> Result<ResolvedPeriod> {
    let (filter_start, filter_end) = match (request.filter_start, request.filter_end) {
        (Some(start), Some(end)) => {
            let (start, end) = (truncate_to_instant(start), truncate_to_instant(end));
            if start <= end {
                (start, end)
            } else {
                (end, start)
            }
        }
        _ => (
            month_start(now.year(), now.month())?,
            month_end(now.year(), now.month())?,
        ),
    };

    let length = filter_end - filter_start;
    let comparison_end = filter_start
        .checked_sub_signed(instant())
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let comparison_start = comparison_end
        .checked_sub_signed(length)
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    let trend_year = request.selected_year.unwrap_or_else(|| filter_start.year());

    debug!(
        "Resolved window {} .. {} (comparison {} .. {}, trend year {})",
        filter_start, filter_end, comparison_start, comparison_end, trend_year
    );

    Ok(ResolvedPeriod {
        filter_start,
        filter_end,
        comparison_start,
        comparison_end,
        trend_year,
    })
}
