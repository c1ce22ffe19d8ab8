use thiserror::Error;

use cashbook_config::ConfigError;
use cashbook_core::CoreError;

/// Failures surfaced by the [`Cashbook`](crate::Cashbook) facade.
#[derive(Debug, Error)]
pub enum CashbookError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
