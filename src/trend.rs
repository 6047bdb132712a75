use crate::currency::{convert_record, CurrencyClassifier};
use crate::error::Result;
use crate::period::ResolvedPeriod;
use crate::schema::{CaseRecord, TrendMetric, TrendPoint};
use crate::utils::{month_end, month_key, month_start, windows_overlap};
use chrono::Datelike;
use log::debug;

/// Twelve calendar-month buckets for `period.trend_year`, January first.
///
/// Buckets are filled from the year-scoped record set and are independent
/// of the filter window, which only drives `is_selected`.
pub fn build_trend<'a>(
    records: impl IntoIterator<Item = &'a CaseRecord>,
    period: &ResolvedPeriod,
    metric: TrendMetric,
    classifier: &CurrencyClassifier,
) -> Result<Vec<TrendPoint>> {
    let year = period.trend_year;

    let mut points = Vec::with_capacity(12);
    for month in 1..=12 {
        let selected = windows_overlap(
            month_start(year, month)?,
            month_end(year, month)?,
            period.filter_start,
            period.filter_end,
        );
        points.push(TrendPoint {
            month_key: month_key(year, month),
            value: 0.0,
            is_selected: selected,
        });
    }

    for record in records {
        if record.created_at.year() != year {
            debug!(
                "Case {} created {} lies outside trend year {}",
                record.id, record.created_at, year
            );
            continue;
        }

        let idx = record.created_at.month0() as usize;
        points[idx].value += match metric {
            TrendMetric::CaseCount => 1.0,
            TrendMetric::Revenue => convert_record(record, classifier).collected,
        };
    }

    Ok(points)
}
