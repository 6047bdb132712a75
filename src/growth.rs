use crate::schema::GrowthMetric;
use crate::utils::ratio_pct;

/// Signed change from `previous` to `current` in percent. An empty or
/// negative baseline yields `0.0`.
pub fn growth_pct(current: f64, previous: f64) -> f64 {
    if previous > 0.0 {
        ratio_pct(current - previous, previous)
    } else {
        0.0
    }
}

pub fn compute_growth(
    current_revenue: f64,
    current_cases: usize,
    previous_revenue: f64,
    previous_cases: usize,
) -> GrowthMetric {
    GrowthMetric {
        revenue_growth_pct: growth_pct(current_revenue, previous_revenue),
        case_growth_pct: growth_pct(current_cases as f64, previous_cases as f64),
    }
}
