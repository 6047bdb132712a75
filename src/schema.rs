use crate::period::ResolvedPeriod;
use crate::ranking::RankedDimension;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A case carries at most this many payment legs.
pub const MAX_PAYMENT_LEGS: usize = 4;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum PaymentStatus {
    #[schemars(description = "The billed amount has been fully collected")]
    Paid,

    #[schemars(description = "Part of the billed amount is still outstanding")]
    Incomplete,

    #[default]
    #[schemars(description = "Any status the laboratory records that is neither paid nor incomplete")]
    Other,
}

impl PaymentStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "paid" | "pagado" | "completado" => Self::Paid,
            "incomplete" | "incompleto" | "pendiente" => Self::Incomplete,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PaymentLeg {
    pub method: Option<String>,
    pub amount: Option<f64>,
}

impl PaymentLeg {
    pub fn new(method: impl Into<String>, amount: f64) -> Self {
        Self {
            method: Some(method.into()),
            amount: Some(amount),
        }
    }

    /// Returns the method and amount when this leg counts toward currency totals:
    /// a named method with a strictly positive amount.
    pub fn contribution(&self) -> Option<(&str, f64)> {
        match (self.method.as_deref(), self.amount) {
            (Some(method), Some(amount)) if amount > 0.0 => Some((method, amount)),
            _ => None,
        }
    }
}

/// Canonical, strictly-typed case row. Built by the normalizer and never
/// mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub branch: String,
    pub exam_type: String,
    pub origin: String,
    pub treating_doctor: String,
    /// Billed amount in the reference currency.
    pub total_amount: f64,
    pub payment_status: PaymentStatus,
    /// Local-currency units per one reference-currency unit.
    pub exchange_rate: f64,
    pub payments: Vec<PaymentLeg>,
    pub patient_id: Option<String>,
    /// Empty when the patient could not be resolved.
    pub patient_name: String,
    pub created_by: Option<String>,
    pub generated_by: Option<String>,
    pub pathologist_id: Option<String>,
    pub cytotechnologist_id: Option<String>,
    pub biopsy_block_count: Option<u32>,
}

impl CaseRecord {
    pub fn is_degraded(&self) -> bool {
        self.patient_name.is_empty()
    }

    pub fn staff_ids(&self) -> impl Iterator<Item = &str> {
        [
            self.created_by.as_deref(),
            self.generated_by.as_deref(),
            self.pathologist_id.as_deref(),
            self.cytotechnologist_id.as_deref(),
        ]
        .into_iter()
        .flatten()
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    Owner,
    Receptionist,
    Pathologist,
    Cytotechnologist,
    Resident,
    #[default]
    Other,
}

impl StaffRole {
    /// Maps the role names stored by the laboratory (English or Spanish,
    /// any case) onto the closed role set.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "owner" | "propietario" => Self::Owner,
            "receptionist" | "recepcionista" | "employee" => Self::Receptionist,
            "pathologist" | "patologo" | "patólogo" => Self::Pathologist,
            "cytotechnologist" | "citotecnologo" | "citotecnólogo" | "citotecno" => {
                Self::Cytotechnologist
            }
            "resident" | "residente" => Self::Resident,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StaffProfile {
    pub id: String,
    pub display_name: String,
    pub role: StaffRole,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TrendMetric {
    #[default]
    #[schemars(description = "Monthly buckets accumulate collected revenue in the reference currency")]
    Revenue,

    #[schemars(description = "Monthly buckets accumulate the number of cases")]
    CaseCount,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DimensionalBucket {
    pub key: String,
    pub label: String,
    pub count: usize,
    pub revenue: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendPoint {
    pub month_key: String,
    pub value: f64,
    pub is_selected: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct GrowthMetric {
    pub revenue_growth_pct: f64,
    pub case_growth_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatisticsSnapshot {
    pub period: ResolvedPeriod,

    pub total_revenue_all_time: f64,
    pub period_revenue: f64,
    pub period_revenue_local: f64,
    pub period_revenue_reference: f64,
    pub total_cases: usize,
    pub completed_cases: usize,
    pub incomplete_cases: usize,
    pub pending_amount: f64,
    pub unique_patients: usize,
    pub new_patients_in_period: usize,
    pub total_biopsy_blocks: u64,
    pub degraded_records: usize,

    pub previous_period_revenue: f64,
    pub previous_period_cases: usize,

    pub branches: RankedDimension,
    pub exam_types: RankedDimension,
    pub origins: RankedDimension,
    pub treating_doctors: RankedDimension,
    pub receptionists: RankedDimension,
    pub pathologists: RankedDimension,
    pub cytotechnologists: RankedDimension,

    pub trend_metric: TrendMetric,
    pub trend: Vec<TrendPoint>,
    pub growth: GrowthMetric,
}
