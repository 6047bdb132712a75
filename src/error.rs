use thiserror::Error;

#[derive(Error, Debug)]
pub enum StatisticsError {
    #[error("Tenant {0} has no role configuration")]
    MissingRoleConfiguration(String),

    #[error("Tenant {0} is not assigned to a laboratory")]
    MissingLaboratory(String),

    #[error("Record store failed during {operation}: {source}")]
    Fetch {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("Date calculation error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl StatisticsError {
    /// Wraps a record store failure so it reaches the caller unchanged.
    pub fn fetch(
        operation: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Fetch {
            operation: operation.into(),
            source: source.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StatisticsError>;
