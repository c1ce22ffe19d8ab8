//! Ledgers: the independent books every other record points at.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::*;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
/// Closed set of book categories a ledger can belong to.
pub enum LedgerKind {
    Personal,
    Business,
}

impl fmt::Display for LedgerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LedgerKind::Personal => "personal",
            LedgerKind::Business => "business",
        };
        f.write_str(label)
    }
}

/// An independent financial book. Owns transactions, cards, contracts,
/// recurrences and opening balances by reference only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ledger {
    pub id: Uuid,
    pub kind: LedgerKind,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
}

impl Ledger {
    pub fn new(name: impl Into<String>, kind: LedgerKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            name: name.into(),
            is_default: false,
        }
    }

    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }
}

impl Identifiable for Ledger {
    fn id(&self) -> Uuid {
        self.id
    }
}
