//! Shared traits and constants for cashbook records.

use uuid::Uuid;

/// Category bucket used when a transaction carries no category.
pub const DEFAULT_CATEGORY: &str = "general";

/// Exposes a stable identifier for entities stored in the cashbook.
pub trait Identifiable {
    fn id(&self) -> Uuid;
}

/// Records that belong to a ledger by foreign key.
pub trait LedgerOwned {
    /// Returns the owning ledger, or `None` while the record is unclassified.
    fn ledger_id(&self) -> Option<Uuid>;

    fn belongs_to(&self, ledger_id: Uuid) -> bool {
        self.ledger_id() == Some(ledger_id)
    }
}

/// Selects which ledgers an aggregate or filter covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerScope {
    Single(Uuid),
    Consolidated,
}

impl LedgerScope {
    pub fn includes(&self, ledger_id: Uuid) -> bool {
        match self {
            LedgerScope::Single(id) => *id == ledger_id,
            LedgerScope::Consolidated => true,
        }
    }
}
