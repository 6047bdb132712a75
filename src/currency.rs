use crate::config::EngineConfig;
use crate::schema::CaseRecord;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::iter::Sum;
use std::ops::AddAssign;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentCurrency {
    Local,
    Reference,
}

/// Decides which payment methods are settled in the local currency.
#[derive(Debug, Clone, Default)]
pub struct CurrencyClassifier {
    local_methods: HashSet<String>,
}

impl CurrencyClassifier {
    pub fn new<I, S>(local_methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            local_methods: local_methods
                .into_iter()
                .map(|m| Self::key(m.as_ref()))
                .collect(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(&config.local_currency_methods)
    }

    fn key(method: &str) -> String {
        method.trim().to_lowercase()
    }

    pub fn classify(&self, method: &str) -> PaymentCurrency {
        if self.local_methods.contains(&Self::key(method)) {
            PaymentCurrency::Local
        } else {
            PaymentCurrency::Reference
        }
    }
}

/// Collected amounts for one record or a set of records.
///
/// `collected` is the reference-currency equivalent of every leg that could
/// be converted. Local legs on a record whose exchange rate is not positive
/// appear in `local` but not in `collected`, so `local / rate + reference`
/// does not reconcile with `collected` for such records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrencyTotals {
    pub local: f64,
    pub reference: f64,
    pub collected: f64,
}

impl AddAssign for CurrencyTotals {
    fn add_assign(&mut self, other: Self) {
        self.local += other.local;
        self.reference += other.reference;
        self.collected += other.collected;
    }
}

impl Sum for CurrencyTotals {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |mut acc, t| {
            acc += t;
            acc
        })
    }
}

pub fn convert_record(record: &CaseRecord, classifier: &CurrencyClassifier) -> CurrencyTotals {
    let mut totals = CurrencyTotals::default();

    for (method, amount) in record.payments.iter().filter_map(|leg| leg.contribution()) {
        match classifier.classify(method) {
            PaymentCurrency::Local => {
                totals.local += amount;
                if record.exchange_rate > 0.0 {
                    totals.collected += amount / record.exchange_rate;
                } else {
                    warn!(
                        "Case {}: local payment of {} via '{}' left unconverted (exchange rate {})",
                        record.id, amount, method, record.exchange_rate
                    );
                }
            }
            PaymentCurrency::Reference => {
                totals.reference += amount;
                totals.collected += amount;
            }
        }
    }

    totals
}

pub fn convert_records<'a>(
    records: impl IntoIterator<Item = &'a CaseRecord>,
    classifier: &CurrencyClassifier,
) -> CurrencyTotals {
    records
        .into_iter()
        .map(|r| convert_record(r, classifier))
        .sum()
}
