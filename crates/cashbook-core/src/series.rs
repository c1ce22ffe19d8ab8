//! Installment and recurrence series membership.
//!
//! Records of one series share a key stored in `recurrence_id`: the rule id
//! for generated transactions, or the first record's id for installment
//! batches. Older records written before keys existed are matched by exact
//! description, ledger and nature instead.

use cashbook_domain::Transaction;
use uuid::Uuid;

/// Key shared by every member of the series `txn` belongs to.
pub fn series_key(txn: &Transaction) -> Option<Uuid> {
    txn.recurrence_id
}

/// All records of the series containing `anchor` (the anchor included),
/// ordered by installment position and then date.
pub fn resolve_series_members<'a>(
    anchor: &Transaction,
    transactions: &'a [Transaction],
) -> Vec<&'a Transaction> {
    let mut members: Vec<&Transaction> = match series_key(anchor) {
        Some(key) => transactions
            .iter()
            .filter(|txn| txn.recurrence_id == Some(key) || txn.id == key || txn.id == anchor.id)
            .collect(),
        None => transactions
            .iter()
            .filter(|txn| txn.id == anchor.id || is_legacy_sibling(anchor, txn))
            .collect(),
    };
    members.sort_by_key(|txn| (txn.installments.map(|info| info.current), txn.date));
    members
}

fn is_legacy_sibling(anchor: &Transaction, candidate: &Transaction) -> bool {
    candidate.recurrence_id.is_none()
        && candidate.ledger_id == anchor.ledger_id
        && candidate.nature == anchor.nature
        && candidate.base_description() == anchor.base_description()
}

/// Members at or after `anchor` in the series.
pub fn forward_members<'a>(
    anchor: &Transaction,
    members: Vec<&'a Transaction>,
) -> Vec<&'a Transaction> {
    let position = anchor.installments.map(|info| info.current);
    members
        .into_iter()
        .filter(|txn| match (position, txn.installments) {
            (Some(current), Some(info)) => info.current >= current,
            _ => txn.date >= anchor.date,
        })
        .collect()
}

/// Highest installment index present among `members`.
pub fn max_installment(members: &[&Transaction]) -> u32 {
    members
        .iter()
        .filter_map(|txn| txn.installments.map(|info| info.current))
        .max()
        .unwrap_or(members.len() as u32)
}
