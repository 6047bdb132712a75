use crate::schema::{CaseRecord, PaymentLeg, PaymentStatus, StaffProfile, StaffRole, MAX_PAYMENT_LEGS};
use crate::utils::truncate_to_instant;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Case row as the record layer hands it over: every field optional,
/// numbers possibly encoded as strings, patient joined as a nested object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawCaseRow {
    pub id: Option<String>,
    pub created_at: Option<String>,
    pub branch: Option<String>,
    pub exam_type: Option<String>,
    pub origin: Option<String>,
    pub treating_doctor: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub total_amount: Option<f64>,
    pub payment_status: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub exchange_rate: Option<f64>,
    pub payment_method_1: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub payment_amount_1: Option<f64>,
    pub payment_method_2: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub payment_amount_2: Option<f64>,
    pub payment_method_3: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub payment_amount_3: Option<f64>,
    pub payment_method_4: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub payment_amount_4: Option<f64>,
    pub patient_id: Option<String>,
    pub created_by: Option<String>,
    pub generated_by: Option<String>,
    pub pathologist_id: Option<String>,
    pub cytotechnologist_id: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub biopsy_block_count: Option<f64>,
    pub patient: Option<RawPatient>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawPatient {
    pub id: Option<String>,
    pub full_name: Option<String>,
    pub id_number: Option<String>,
}

fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite()))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parses a record timestamp at millisecond precision.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    parse_full_precision(raw.trim()).map(truncate_to_instant)
}

fn parse_full_precision(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

impl RawCaseRow {
    /// Converts the row into a canonical record. Missing text becomes an
    /// empty string and missing numbers become zero. Only a row without a
    /// readable creation timestamp is rejected, since it cannot be placed in
    /// any window.
    pub fn into_record(self) -> Option<CaseRecord> {
        let Some(created_at) = self.created_at.as_deref().and_then(parse_timestamp) else {
            warn!(
                "Skipping case {:?}: unreadable created_at {:?}",
                self.id, self.created_at
            );
            return None;
        };

        let legs = [
            (self.payment_method_1, self.payment_amount_1),
            (self.payment_method_2, self.payment_amount_2),
            (self.payment_method_3, self.payment_amount_3),
            (self.payment_method_4, self.payment_amount_4),
        ];
        let payments: Vec<PaymentLeg> = legs
            .into_iter()
            .take(MAX_PAYMENT_LEGS)
            .map(|(method, amount)| PaymentLeg {
                method: non_blank(method),
                amount,
            })
            .collect();

        let patient = self.patient.unwrap_or_default();
        let patient_id = non_blank(self.patient_id).or_else(|| non_blank(patient.id));
        let patient_name = non_blank(patient.full_name).unwrap_or_default();

        Some(CaseRecord {
            id: non_blank(self.id).unwrap_or_default(),
            created_at,
            branch: non_blank(self.branch).unwrap_or_default(),
            exam_type: self.exam_type.unwrap_or_default(),
            origin: non_blank(self.origin).unwrap_or_default(),
            treating_doctor: non_blank(self.treating_doctor).unwrap_or_default(),
            total_amount: self.total_amount.unwrap_or(0.0).max(0.0),
            payment_status: self
                .payment_status
                .as_deref()
                .map(PaymentStatus::parse)
                .unwrap_or_default(),
            exchange_rate: self.exchange_rate.unwrap_or(0.0),
            payments,
            patient_id,
            patient_name,
            created_by: non_blank(self.created_by),
            generated_by: non_blank(self.generated_by),
            pathologist_id: non_blank(self.pathologist_id),
            cytotechnologist_id: non_blank(self.cytotechnologist_id),
            biopsy_block_count: self
                .biopsy_block_count
                .filter(|v| *v >= 0.0)
                .map(|v| v.round() as u32),
        })
    }
}

pub fn normalize_rows(rows: Vec<RawCaseRow>) -> Vec<CaseRecord> {
    let total = rows.len();
    let records: Vec<CaseRecord> = rows.into_iter().filter_map(RawCaseRow::into_record).collect();

    let degraded = records.iter().filter(|r| r.is_degraded()).count();
    debug!(
        "Normalized {} of {} rows ({} without a resolvable patient)",
        records.len(),
        total,
        degraded
    );

    records
}

/// Every distinct staff id referenced by the given records, for one batched lookup.
pub fn collect_staff_ids<'a>(records: impl IntoIterator<Item = &'a CaseRecord>) -> BTreeSet<String> {
    records
        .into_iter()
        .flat_map(|r| r.staff_ids())
        .map(String::from)
        .collect()
}

/// Id → profile lookup built once per invocation.
#[derive(Debug, Clone, Default)]
pub struct StaffDirectory {
    profiles: HashMap<String, StaffProfile>,
}

impl StaffDirectory {
    pub fn new(profiles: HashMap<String, StaffProfile>) -> Self {
        Self { profiles }
    }

    pub fn role_of(&self, id: &str) -> Option<StaffRole> {
        self.profiles.get(id).map(|p| p.role)
    }

    pub fn has_role(&self, id: Option<&str>, role: StaffRole) -> bool {
        id.and_then(|id| self.role_of(id)) == Some(role)
    }

    /// Display name of the profile, or the raw id when the profile is unknown.
    pub fn display_name(&self, id: &str) -> String {
        self.profiles
            .get(id)
            .map(|p| p.display_name.trim())
            .filter(|name| !name.is_empty())
            .unwrap_or(id)
            .to_string()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
