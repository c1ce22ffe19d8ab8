use cashbook_domain::{DraftError, MonthRefError};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Ledger not found: {0}")]
    LedgerNotFound(Uuid),
    #[error("Card not found: {0}")]
    CardNotFound(Uuid),
    #[error("Transaction not found: {0}")]
    TransactionNotFound(Uuid),
    #[error("Recurrence not found: {0}")]
    RecurrenceNotFound(Uuid),
    #[error("Debt contract not found: {0}")]
    ContractNotFound(Uuid),
    #[error("Opening balance not found: {0}")]
    OpeningBalanceNotFound(Uuid),
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Serialization error: {0}")]
    Serde(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<DraftError> for CoreError {
    fn from(err: DraftError) -> Self {
        CoreError::Validation(err.to_string())
    }
}

impl From<MonthRefError> for CoreError {
    fn from(err: MonthRefError) -> Self {
        CoreError::Validation(err.to_string())
    }
}

/// Rejects calendar days outside `1..=31`.
pub(crate) fn validate_day(field: &str, day: u32) -> Result<(), CoreError> {
    if (1..=31).contains(&day) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "{field} must be between 1 and 31, got {day}"
        )))
    }
}
