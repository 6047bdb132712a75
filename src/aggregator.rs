//! Grouping of case records along the reporting dimensions.
//!
//! Dimensional revenue is always the billed `total_amount`. Collected revenue
//! only appears in the scalar totals of a snapshot.

use crate::config::EngineConfig;
use crate::normalizer::StaffDirectory;
use crate::schema::{CaseRecord, DimensionalBucket, StaffRole};
use crate::utils::ratio_pct;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Label used for records whose dimension value is blank.
pub const UNSPECIFIED_LABEL: &str = "Unspecified";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankBy {
    Revenue,
    Count,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Branch,
    ExamType,
    Origin,
    TreatingDoctor,
}

impl Dimension {
    fn raw_value<'a>(&self, record: &'a CaseRecord) -> &'a str {
        match self {
            Dimension::Branch => &record.branch,
            Dimension::ExamType => &record.exam_type,
            Dimension::Origin => &record.origin,
            Dimension::TreatingDoctor => &record.treating_doctor,
        }
    }
}

/// Folds free-text exam types into grouping keys: no accents, lowercase,
/// single spaces, known synonyms collapsed.
#[derive(Debug, Clone, Default)]
pub struct ExamTypeNormalizer {
    synonyms: BTreeMap<String, String>,
}

impl ExamTypeNormalizer {
    pub fn new(synonyms: BTreeMap<String, String>) -> Self {
        let synonyms = synonyms
            .into_iter()
            .map(|(variant, canonical)| (fold(&variant), fold(&canonical)))
            .collect();
        Self { synonyms }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.exam_type_synonyms.clone())
    }

    pub fn normalize(&self, raw: &str) -> String {
        let folded = fold(raw);
        match self.synonyms.get(&folded) {
            Some(canonical) => canonical.clone(),
            None => folded,
        }
    }
}

fn fold(raw: &str) -> String {
    let stripped: String = raw
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Insertion-ordered accumulator; the first record seen for a key fixes its label.
#[derive(Debug, Default)]
struct GroupAccumulator {
    index: HashMap<String, usize>,
    buckets: Vec<DimensionalBucket>,
}

impl GroupAccumulator {
    fn add(&mut self, key: String, label: impl FnOnce() -> String, revenue: f64) {
        let idx = match self.index.get(&key) {
            Some(idx) => *idx,
            None => {
                self.buckets.push(DimensionalBucket {
                    key: key.clone(),
                    label: label(),
                    count: 0,
                    revenue: 0.0,
                    percentage: 0.0,
                });
                self.index.insert(key, self.buckets.len() - 1);
                self.buckets.len() - 1
            }
        };

        let bucket = &mut self.buckets[idx];
        bucket.count += 1;
        bucket.revenue += revenue;
    }

    fn finish(self, rank_by: RankBy) -> Vec<DimensionalBucket> {
        let metric = |b: &DimensionalBucket| match rank_by {
            RankBy::Revenue => b.revenue,
            RankBy::Count => b.count as f64,
        };

        let mut buckets = self.buckets;
        let total: f64 = buckets.iter().map(metric).sum();
        for bucket in &mut buckets {
            bucket.percentage = ratio_pct(metric(&*bucket), total);
        }

        // stable: equal metrics keep first-seen order
        buckets.sort_by(|a, b| metric(b).partial_cmp(&metric(a)).unwrap_or(Ordering::Equal));
        buckets
    }
}

/// Groups records by a case attribute, ranked by billed revenue.
pub fn aggregate_by<'a>(
    records: impl IntoIterator<Item = &'a CaseRecord>,
    dimension: Dimension,
    exam_types: &ExamTypeNormalizer,
) -> Vec<DimensionalBucket> {
    let mut groups = GroupAccumulator::default();

    for record in records {
        let raw = dimension.raw_value(record);
        let key = match dimension {
            Dimension::ExamType => exam_types.normalize(raw),
            _ => raw.trim().to_string(),
        };
        let label = || {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                UNSPECIFIED_LABEL.to_string()
            } else {
                raw.to_string()
            }
        };
        groups.add(key, label, record.total_amount);
    }

    groups.finish(RankBy::Revenue)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaffRanking {
    Receptionist,
    Pathologist,
    Cytotechnologist,
}

impl StaffRanking {
    pub fn role(&self) -> StaffRole {
        match self {
            StaffRanking::Receptionist => StaffRole::Receptionist,
            StaffRanking::Pathologist => StaffRole::Pathologist,
            StaffRanking::Cytotechnologist => StaffRole::Cytotechnologist,
        }
    }

    /// Staff member a case is credited to. An explicit assignment wins;
    /// otherwise the creator (or, for cytology, the generator first) is used
    /// when their role matches.
    pub fn assignee<'a>(&self, record: &'a CaseRecord, directory: &StaffDirectory) -> Option<&'a str> {
        let role = self.role();
        let by_role = |id: Option<&'a str>| id.filter(|_| directory.has_role(id, role));

        match self {
            StaffRanking::Receptionist => by_role(record.created_by.as_deref()),
            StaffRanking::Pathologist => record
                .pathologist_id
                .as_deref()
                .or_else(|| by_role(record.created_by.as_deref())),
            StaffRanking::Cytotechnologist => record
                .cytotechnologist_id
                .as_deref()
                .or_else(|| by_role(record.generated_by.as_deref()))
                .or_else(|| by_role(record.created_by.as_deref())),
        }
    }
}

/// Case counts per staff member for one role, ranked by count.
pub fn aggregate_staff<'a>(
    records: impl IntoIterator<Item = &'a CaseRecord>,
    ranking: StaffRanking,
    directory: &StaffDirectory,
) -> Vec<DimensionalBucket> {
    let mut groups = GroupAccumulator::default();

    for record in records {
        if let Some(id) = ranking.assignee(record, directory) {
            groups.add(
                id.to_string(),
                || directory.display_name(id),
                record.total_amount,
            );
        }
    }

    groups.finish(RankBy::Count)
}
