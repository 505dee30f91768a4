pub mod certs;
pub mod nodes;

use crate::collectors::CollectError;
use crate::config::ConfigError;
use crate::metrics::{DuplicateMetric, EvaluatedMetric};
use crate::snapshot::TimestampError;
use crate::status::Status;
use crate::threshold::ThresholdError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Threshold(#[from] ThresholdError),
    #[error(transparent)]
    Collect(#[from] CollectError),
    #[error(transparent)]
    Timestamp(#[from] TimestampError),
    #[error(transparent)]
    DuplicateMetric(#[from] DuplicateMetric),
    #[error("не задан endpoint: укажите --endpoint или endpoint в config")]
    MissingEndpoint,
    #[error("не указана проверка: используйте подкоманду certs или nodes")]
    MissingCommand,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckOutcome {
    pub check: &'static str,
    pub status: Status,
    pub summary: String,
    pub details: Vec<String>,
    pub metrics: Vec<EvaluatedMetric>,
}

impl CheckOutcome {
    /// Fatal errors become an UNKNOWN outcome without partial output.
    pub fn unknown(check: &'static str, err: &CheckError) -> Self {
        Self {
            check,
            status: Status::Unknown,
            summary: err.to_string(),
            details: Vec::new(),
            metrics: Vec::new(),
        }
    }
}
