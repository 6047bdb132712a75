//! # Lab Statistics Engine
//!
//! Turns the case transactions of a multi-tenant medical laboratory into a
//! reporting snapshot: collected revenue split by currency, case counts,
//! rankings per branch, exam type, origin, doctor and staff member, a fixed
//! twelve-month trend and growth against the preceding period.
//!
//! ## Core Concepts
//!
//! - **Collected revenue**: the sum of a case's payment legs, converted into the
//!   reference currency with the case's own exchange rate
//! - **Billed revenue**: the case's `total_amount`, used by every dimensional ranking
//! - **Comparison window**: the equally long window ending right before the filter window
//! - **Trend year**: twelve calendar-month buckets, independent of the filter window
//! - **Record Store**: the async source of raw rows; the engine never caches or subscribes
//!
//! ## Example
//!
//! ```rust,ignore
//! use lab_statistics_engine::*;
//!
//! let store = InMemoryRecordStore::new()
//!     .with_role_config("lab-1", TenantRoleConfig {
//!         laboratory_id: Some("main".to_string()),
//!         available_roles: vec!["owner".to_string(), "patologo".to_string()],
//!         trend_metric: TrendMetric::Revenue,
//!     })
//!     .with_cases("lab-1", rows);
//!
//! let engine = StatisticsEngine::new(store, EngineConfig::default())?;
//! let snapshot = engine.compute_statistics("lab-1", None, None, None).await?;
//! println!("{} cases, {:.2} collected", snapshot.total_cases, snapshot.period_revenue);
//! ```

pub mod aggregator;
pub mod config;
pub mod currency;
pub mod engine;
pub mod error;
pub mod growth;
pub mod invalidation;
pub mod normalizer;
pub mod period;
pub mod ranking;
pub mod schema;
pub mod store;
pub mod trend;
pub mod utils;

pub use aggregator::{
    aggregate_by, aggregate_staff, Dimension, ExamTypeNormalizer, RankBy, StaffRanking,
    UNSPECIFIED_LABEL,
};
pub use config::EngineConfig;
pub use currency::{convert_record, convert_records, CurrencyClassifier, CurrencyTotals, PaymentCurrency};
pub use engine::{build_snapshot, SnapshotInputs, StatisticsEngine};
pub use error::{Result, StatisticsError};
pub use growth::{compute_growth, growth_pct};
pub use invalidation::{ChangeKind, InvalidationBus, InvalidationEvent, SnapshotCache, SnapshotKey};
pub use normalizer::{collect_staff_ids, normalize_rows, RawCaseRow, RawPatient, StaffDirectory};
pub use period::{resolve_period, PeriodRequest, ResolvedPeriod};
pub use ranking::{select_top, RankedDimension};
pub use schema::*;
pub use store::{InMemoryRecordStore, RecordStore, TenantRoleConfig};
pub use trend::build_trend;
