//! Ledger-scoped views over raw transactions.

use std::collections::HashSet;

use cashbook_domain::{CreditCard, LedgerScope, MonthRef, Transaction};
use tracing::debug;
use uuid::Uuid;

/// Inclusive run of contiguous reference months.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub first: MonthRef,
    pub last: MonthRef,
}

impl Period {
    pub fn month(month: MonthRef) -> Self {
        Self {
            first: month,
            last: month,
        }
    }

    /// `count` months starting at `first`; a zero count is treated as one.
    pub fn span(first: MonthRef, count: u32) -> Self {
        let extra = count.max(1) - 1;
        Self {
            first,
            last: first.shift(extra as i32),
        }
    }

    pub fn contains(&self, month: MonthRef) -> bool {
        self.first <= month && month <= self.last
    }
}

/// Transactions visible in `scope`. Card transactions whose card no longer
/// resolves are dropped.
pub fn scoped_transactions<'a>(
    transactions: &'a [Transaction],
    cards: &[CreditCard],
    scope: LedgerScope,
) -> Vec<&'a Transaction> {
    let card_ids: HashSet<Uuid> = cards.iter().map(|card| card.id).collect();
    transactions
        .iter()
        .filter(|txn| scope.includes(txn.ledger_id))
        .filter(|txn| {
            if !txn.is_card() {
                return true;
            }
            let resolved = txn.card_id.is_some_and(|id| card_ids.contains(&id));
            if !resolved {
                debug!(transaction = %txn.id, "card transaction without a known card excluded");
            }
            resolved
        })
        .collect()
}

/// Scoped transactions whose reference month falls in `period`.
pub fn period_transactions<'a>(
    transactions: &'a [Transaction],
    cards: &[CreditCard],
    scope: LedgerScope,
    period: Period,
) -> Vec<&'a Transaction> {
    scoped_transactions(transactions, cards, scope)
        .into_iter()
        .filter(|txn| period.contains(txn.reference_month))
        .collect()
}
