use crate::aggregator::{aggregate_by, aggregate_staff, Dimension, ExamTypeNormalizer, StaffRanking};
use crate::config::EngineConfig;
use crate::currency::{convert_record, convert_records, CurrencyClassifier};
use crate::error::{Result, StatisticsError};
use crate::growth::compute_growth;
use crate::normalizer::{collect_staff_ids, normalize_rows, StaffDirectory};
use crate::period::{resolve_period, PeriodRequest, ResolvedPeriod};
use crate::ranking::{select_top, RankedDimension};
use crate::schema::{CaseRecord, PaymentStatus, StatisticsSnapshot};
use crate::store::{RecordStore, TenantRoleConfig};
use crate::trend::build_trend;
use chrono::{DateTime, Utc};
use log::{debug, info};
use std::collections::{HashMap, HashSet};

/// Everything a snapshot is computed from, already fetched and normalized.
#[derive(Debug, Clone)]
pub struct SnapshotInputs {
    pub period: ResolvedPeriod,
    pub role_config: TenantRoleConfig,
    pub current: Vec<CaseRecord>,
    pub comparison: Vec<CaseRecord>,
    pub trend_year: Vec<CaseRecord>,
    pub all_time: Vec<CaseRecord>,
    pub staff: StaffDirectory,
}

pub struct StatisticsEngine<S> {
    store: S,
    config: EngineConfig,
}

impl<S: RecordStore> StatisticsEngine<S> {
    pub fn new(store: S, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub async fn compute_statistics(
        &self,
        tenant_id: &str,
        filter_start: Option<DateTime<Utc>>,
        filter_end: Option<DateTime<Utc>>,
        selected_year: Option<i32>,
    ) -> Result<StatisticsSnapshot> {
        let request = PeriodRequest::new(filter_start, filter_end, selected_year);
        self.compute_statistics_at(tenant_id, &request, Utc::now())
            .await
    }

    /// Same as [`compute_statistics`](Self::compute_statistics) with an
    /// explicit "now" for the default-month fallback.
    pub async fn compute_statistics_at(
        &self,
        tenant_id: &str,
        request: &PeriodRequest,
        as_of: DateTime<Utc>,
    ) -> Result<StatisticsSnapshot> {
        let role_config = self
            .store
            .fetch_tenant_role_config(tenant_id)
            .await?
            .ok_or_else(|| StatisticsError::MissingRoleConfiguration(tenant_id.to_string()))?;
        role_config.validate(tenant_id)?;

        let period = resolve_period(request, as_of)?;
        info!(
            "Computing statistics for tenant {} over {} .. {}",
            tenant_id, period.filter_start, period.filter_end
        );

        let (current, comparison, trend_year, all_time) = futures::try_join!(
            self.store
                .fetch_cases(tenant_id, Some(period.filter_start), Some(period.filter_end)),
            self.store.fetch_cases(
                tenant_id,
                Some(period.comparison_start),
                Some(period.comparison_end)
            ),
            self.store.fetch_cases_for_year(tenant_id, period.trend_year),
            self.store.fetch_cases(tenant_id, None, None),
        )?;
        debug!(
            "Fetched {} current, {} comparison, {} trend-year and {} all-time rows",
            current.len(),
            comparison.len(),
            trend_year.len(),
            all_time.len()
        );

        let current = normalize_rows(current);
        let comparison = normalize_rows(comparison);
        let trend_year = normalize_rows(trend_year);
        let all_time = normalize_rows(all_time);

        let staff_ids = collect_staff_ids(
            current
                .iter()
                .chain(&comparison)
                .chain(&trend_year)
                .chain(&all_time),
        );
        let staff = if staff_ids.is_empty() {
            StaffDirectory::default()
        } else {
            StaffDirectory::new(self.store.fetch_staff_profiles(&staff_ids).await?)
        };
        debug!(
            "Resolved {} of {} referenced staff profiles",
            staff.len(),
            staff_ids.len()
        );

        let inputs = SnapshotInputs {
            period,
            role_config,
            current,
            comparison,
            trend_year,
            all_time,
            staff,
        };
        build_snapshot(&inputs, &self.config)
    }
}

/// Computes a snapshot from already-fetched inputs. Holds no state and
/// performs no I/O.
pub fn build_snapshot(inputs: &SnapshotInputs, config: &EngineConfig) -> Result<StatisticsSnapshot> {
    let classifier = CurrencyClassifier::from_config(config);
    let exam_types = ExamTypeNormalizer::from_config(config);
    let period = &inputs.period;
    let current = &inputs.current;

    let totals = convert_records(current, &classifier);
    let previous = convert_records(&inputs.comparison, &classifier);
    let all_time = convert_records(&inputs.all_time, &classifier);

    let completed_cases = current
        .iter()
        .filter(|r| r.payment_status == PaymentStatus::Paid)
        .count();

    let incomplete: Vec<&CaseRecord> = current
        .iter()
        .filter(|r| r.payment_status == PaymentStatus::Incomplete)
        .collect();
    let pending_amount: f64 = incomplete
        .iter()
        .map(|r| (r.total_amount - convert_record(r, &classifier).collected).max(0.0))
        .sum();

    let patients: HashSet<&str> = current
        .iter()
        .filter_map(|r| r.patient_id.as_deref())
        .collect();

    let mut first_seen: HashMap<&str, DateTime<Utc>> = HashMap::new();
    for record in inputs.all_time.iter().chain(current) {
        if let Some(patient) = record.patient_id.as_deref() {
            first_seen
                .entry(patient)
                .and_modify(|at| *at = (*at).min(record.created_at))
                .or_insert(record.created_at);
        }
    }
    let new_patients_in_period = patients
        .iter()
        .filter(|p| first_seen.get(*p).is_some_and(|at| period.contains(*at)))
        .count();

    let total_biopsy_blocks: u64 = current
        .iter()
        .filter_map(|r| r.biopsy_block_count)
        .map(u64::from)
        .sum();

    let top_n = config.top_n;
    let dimension = |d: Dimension| select_top(aggregate_by(current, d, &exam_types), top_n);
    let staff = |ranking: StaffRanking| {
        if inputs.role_config.has_role(ranking.role()) {
            select_top(aggregate_staff(current, ranking, &inputs.staff), top_n)
        } else {
            RankedDimension::default()
        }
    };

    let trend_metric = inputs.role_config.trend_metric;
    let trend = build_trend(&inputs.trend_year, period, trend_metric, &classifier)?;

    let growth = compute_growth(
        totals.collected,
        current.len(),
        previous.collected,
        inputs.comparison.len(),
    );

    Ok(StatisticsSnapshot {
        period: *period,
        total_revenue_all_time: all_time.collected,
        period_revenue: totals.collected,
        period_revenue_local: totals.local,
        period_revenue_reference: totals.reference,
        total_cases: current.len(),
        completed_cases,
        incomplete_cases: incomplete.len(),
        pending_amount,
        unique_patients: patients.len(),
        new_patients_in_period,
        total_biopsy_blocks,
        degraded_records: current.iter().filter(|r| r.is_degraded()).count(),
        previous_period_revenue: previous.collected,
        previous_period_cases: inputs.comparison.len(),
        branches: dimension(Dimension::Branch),
        exam_types: dimension(Dimension::ExamType),
        origins: dimension(Dimension::Origin),
        treating_doctors: dimension(Dimension::TreatingDoctor),
        receptionists: staff(StaffRanking::Receptionist),
        pathologists: staff(StaffRanking::Pathologist),
        cytotechnologists: staff(StaffRanking::Cytotechnologist),
        trend_metric,
        trend,
        growth,
    })
}
