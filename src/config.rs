use crate::error::{Result, StatisticsError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn default_local_currency_methods() -> Vec<String> {
    ["Punto de venta", "Pago móvil", "Transferencia", "Bolívares en efectivo"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_exam_type_synonyms() -> BTreeMap<String, String> {
    [
        ("biopcia", "biopsia"),
        ("ihq", "inmunohistoquimica"),
        ("citologia liquida", "citologia en base liquida"),
    ]
    .into_iter()
    .map(|(variant, canonical)| (variant.to_string(), canonical.to_string()))
    .collect()
}

fn default_top_n() -> usize {
    5
}

/// Engine-wide classification rules, supplied once and shared by every call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct EngineConfig {
    #[schemars(
        description = "Payment method names settled in the local currency. Matching is case-insensitive and exact; every other method is treated as reference currency."
    )]
    #[serde(default = "default_local_currency_methods")]
    pub local_currency_methods: Vec<String>,

    #[schemars(
        description = "Normalized exam-type variants (lowercase, no accents) mapped to the canonical key they are grouped under."
    )]
    #[serde(default = "default_exam_type_synonyms")]
    pub exam_type_synonyms: BTreeMap<String, String>,

    #[schemars(description = "How many entries of each ranking are exposed for summary cards.")]
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            local_currency_methods: default_local_currency_methods(),
            exam_type_synonyms: default_exam_type_synonyms(),
            top_n: default_top_n(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_n == 0 {
            return Err(StatisticsError::InvalidConfig(
                "top_n must be at least 1".to_string(),
            ));
        }

        if let Some(idx) = self
            .local_currency_methods
            .iter()
            .position(|m| m.trim().is_empty())
        {
            return Err(StatisticsError::InvalidConfig(format!(
                "local_currency_methods[{}] is empty",
                idx
            )));
        }

        for (variant, canonical) in &self.exam_type_synonyms {
            if variant.trim().is_empty() || canonical.trim().is_empty() {
                return Err(StatisticsError::InvalidConfig(format!(
                    "exam type synonym '{}' -> '{}' has an empty side",
                    variant, canonical
                )));
            }
        }

        Ok(())
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(EngineConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
