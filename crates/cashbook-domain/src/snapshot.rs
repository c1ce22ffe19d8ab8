//! Whole-dataset snapshot used by persistence backends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    card::CreditCard, debt::DebtContract, ledger::Ledger, opening_balance::OpeningBalance,
    recurrence::Recurrence, transaction::Transaction,
};

pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// Every record collection of a cashbook, in one serializable value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerData {
    #[serde(default = "LedgerData::schema_version")]
    pub schema_version: u32,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub ledgers: Vec<Ledger>,
    #[serde(default)]
    pub cards: Vec<CreditCard>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub recurrences: Vec<Recurrence>,
    #[serde(default)]
    pub contracts: Vec<DebtContract>,
    #[serde(default)]
    pub opening_balances: Vec<OpeningBalance>,
}

impl LedgerData {
    fn schema_version() -> u32 {
        SNAPSHOT_SCHEMA_VERSION
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn is_empty(&self) -> bool {
        self.ledgers.is_empty()
            && self.cards.is_empty()
            && self.transactions.is_empty()
            && self.recurrences.is_empty()
            && self.contracts.is_empty()
            && self.opening_balances.is_empty()
    }
}

impl Default for LedgerData {
    fn default() -> Self {
        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            updated_at: Utc::now(),
            ledgers: Vec::new(),
            cards: Vec::new(),
            transactions: Vec::new(),
            recurrences: Vec::new(),
            contracts: Vec::new(),
            opening_balances: Vec::new(),
        }
    }
}
