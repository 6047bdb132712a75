use crate::error::{Result, StatisticsError};
use crate::normalizer::{parse_timestamp, RawCaseRow};
use crate::schema::{StaffProfile, StaffRole, TrendMetric};
use crate::utils::year_bounds;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Per-tenant settings kept next to the records.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TenantRoleConfig {
    pub laboratory_id: Option<String>,
    pub available_roles: Vec<String>,
    #[serde(default)]
    pub trend_metric: TrendMetric,
}

impl TenantRoleConfig {
    pub fn has_role(&self, role: StaffRole) -> bool {
        self.available_roles
            .iter()
            .any(|r| StaffRole::parse(r) == role)
    }

    /// A tenant without roles or without a laboratory cannot be reported on.
    pub fn validate(&self, tenant_id: &str) -> Result<()> {
        if self.available_roles.iter().all(|r| r.trim().is_empty()) {
            return Err(StatisticsError::MissingRoleConfiguration(
                tenant_id.to_string(),
            ));
        }
        if self
            .laboratory_id
            .as_deref()
            .map_or(true, |lab| lab.trim().is_empty())
        {
            return Err(StatisticsError::MissingLaboratory(tenant_id.to_string()));
        }
        Ok(())
    }
}

/// Source of case rows and lookup tables. Failures are returned as
/// [`StatisticsError::Fetch`] and are handed to the caller untouched.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn fetch_cases(
        &self,
        tenant_id: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<RawCaseRow>>;

    async fn fetch_cases_for_year(&self, tenant_id: &str, year: i32) -> Result<Vec<RawCaseRow>> {
        let (start, end) = year_bounds(year)?;
        self.fetch_cases(tenant_id, Some(start), Some(end)).await
    }

    async fn fetch_staff_profiles(
        &self,
        ids: &BTreeSet<String>,
    ) -> Result<HashMap<String, StaffProfile>>;

    async fn fetch_tenant_role_config(&self, tenant_id: &str)
        -> Result<Option<TenantRoleConfig>>;
}

/// Record store backed by in-process vectors.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    cases: HashMap<String, Vec<RawCaseRow>>,
    staff: HashMap<String, StaffProfile>,
    role_configs: HashMap<String, TenantRoleConfig>,
    staff_lookups: AtomicUsize,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cases(mut self, tenant_id: &str, rows: Vec<RawCaseRow>) -> Self {
        self.cases
            .entry(tenant_id.to_string())
            .or_default()
            .extend(rows);
        self
    }

    pub fn with_staff(mut self, profile: StaffProfile) -> Self {
        self.staff.insert(profile.id.clone(), profile);
        self
    }

    pub fn with_role_config(mut self, tenant_id: &str, config: TenantRoleConfig) -> Self {
        self.role_configs.insert(tenant_id.to_string(), config);
        self
    }

    /// Number of `fetch_staff_profiles` calls served so far.
    pub fn staff_lookups(&self) -> usize {
        self.staff_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn fetch_cases(
        &self,
        tenant_id: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<RawCaseRow>> {
        let rows = self.cases.get(tenant_id).map(Vec::as_slice).unwrap_or(&[]);
        if start.is_none() && end.is_none() {
            return Ok(rows.to_vec());
        }

        Ok(rows
            .iter()
            .filter(|row| {
                let Some(at) = row.created_at.as_deref().and_then(parse_timestamp) else {
                    return false;
                };
                start.map_or(true, |s| at >= s) && end.map_or(true, |e| at <= e)
            })
            .cloned()
            .collect())
    }

    async fn fetch_staff_profiles(
        &self,
        ids: &BTreeSet<String>,
    ) -> Result<HashMap<String, StaffProfile>> {
        self.staff_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(ids
            .iter()
            .filter_map(|id| self.staff.get(id).map(|p| (id.clone(), p.clone())))
            .collect())
    }

    async fn fetch_tenant_role_config(
        &self,
        tenant_id: &str,
    ) -> Result<Option<TenantRoleConfig>> {
        Ok(self.role_configs.get(tenant_id).cloned())
    }
}
