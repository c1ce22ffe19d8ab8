use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{common::*, month::MonthRef};

/// Cash on hand at the start of a month for one ledger. A snapshot: once
/// written it is never recomputed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpeningBalance {
    pub id: Uuid,
    pub ledger_id: Uuid,
    pub month_ref: MonthRef,
    pub amount: Decimal,
    /// Month from which automatic rollover accounting started.
    pub base_month: MonthRef,
}

impl OpeningBalance {
    pub fn new(ledger_id: Uuid, month_ref: MonthRef, amount: Decimal, base_month: MonthRef) -> Self {
        Self {
            id: Uuid::new_v4(),
            ledger_id,
            month_ref,
            amount,
            base_month,
        }
    }

    /// A manually seeded balance that starts its own rollover chain.
    pub fn seeded(ledger_id: Uuid, month_ref: MonthRef, amount: Decimal) -> Self {
        Self::new(ledger_id, month_ref, amount, month_ref)
    }
}

impl Identifiable for OpeningBalance {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl LedgerOwned for OpeningBalance {
    fn ledger_id(&self) -> Option<Uuid> {
        Some(self.ledger_id)
    }
}
