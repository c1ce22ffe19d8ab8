//! Save, scoped edit and scoped delete of transactions and their series.

use cashbook_domain::{
    month::add_months, CreditCard, EditingItem, LedgerScope, MonthRef, Recurrence, Transaction,
    TransactionDraft, TransactionNature, TransactionStatus,
};
use rust_decimal::Decimal;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    card_service::CardService,
    debt_service::DebtService,
    ledger_service::LedgerService,
    report::BatchReport,
    scope::{period_transactions, Period},
    series::{forward_members, max_installment, resolve_series_members},
    store::LedgerStore,
    CoreError,
};

/// Which records of a series an edit applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditScope {
    Single,
    /// The edited record and every later member.
    Forward,
    Series,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteScope {
    Single,
    /// The whole series, including the parent recurrence rule if any.
    AllRelated,
}

/// Result of a save. `primary` is the record the user was editing;
/// `report` lists every record written along the way.
#[derive(Debug, Clone)]
pub struct SaveOutcome {
    pub primary: Uuid,
    pub report: BatchReport,
}

/// Ledger and accounting month a draft is booked under.
#[derive(Debug, Clone, Copy)]
struct Placement {
    ledger_id: Uuid,
    reference_month: MonthRef,
}

/// Provides validated create/update/delete flows for transactions.
pub struct TransactionService;

impl TransactionService {
    pub fn get(store: &dyn LedgerStore, id: Uuid) -> Result<Transaction, CoreError> {
        store.transaction(id)
    }

    /// Transactions visible in `scope` for `period`, ordered by date.
    pub fn list(
        store: &dyn LedgerStore,
        scope: LedgerScope,
        period: Period,
    ) -> Result<Vec<Transaction>, CoreError> {
        let transactions = store.transactions()?;
        let cards = store.cards()?;
        let mut listed: Vec<Transaction> = period_transactions(&transactions, &cards, scope, period)
            .into_iter()
            .cloned()
            .collect();
        listed.sort_by_key(|txn| txn.date);
        Ok(listed)
    }

    /// Single entry point for the editing form.
    ///
    /// Existing records are updated in place (raising the installment count
    /// expands the series). Drafts and recurrence occurrences are created;
    /// card or installment drafts with a count above one become a series.
    pub fn save(store: &dyn LedgerStore, item: EditingItem) -> Result<SaveOutcome, CoreError> {
        let existing_id = item.existing_id();
        let draft = item.into_draft();
        draft.validate()?;
        let card = match draft.card_id {
            Some(card_id) => Some(CardService::get(store, card_id)?),
            None => None,
        };
        match existing_id {
            Some(id) => Self::save_existing(store, id, draft, card.as_ref()),
            None => {
                let placement = place(store, &draft, card.as_ref())?;
                Self::save_new(store, draft, placement)
            }
        }
    }

    fn save_new(
        store: &dyn LedgerStore,
        draft: TransactionDraft,
        placement: Placement,
    ) -> Result<SaveOutcome, CoreError> {
        if draft.nature == TransactionNature::Recurring {
            if let Some(rule_id) = draft.recurrence_id {
                let materialized = store.transactions()?.into_iter().find(|txn| {
                    txn.recurrence_id == Some(rule_id)
                        && txn.reference_month == placement.reference_month
                });
                if let Some(existing) = materialized {
                    debug!(transaction = %existing.id, "occurrence already materialized; updating it");
                    let mut txn = existing;
                    apply_draft(&mut txn, draft, placement);
                    let id = txn.id;
                    store.update_transaction(txn)?;
                    return Ok(SaveOutcome {
                        primary: id,
                        report: BatchReport {
                            succeeded: vec![id],
                            failed: Vec::new(),
                        },
                    });
                }
            }
        }

        if draft.creates_series() {
            return Self::create_installments(store, draft, placement);
        }

        let mut txn = draft.into_transaction(placement.reference_month);
        txn.ledger_id = placement.ledger_id;
        let id = store.add_transaction(txn)?;
        info!(transaction = %id, "transaction created");
        Ok(SaveOutcome {
            primary: id,
            report: BatchReport {
                succeeded: vec![id],
                failed: Vec::new(),
            },
        })
    }

    /// Writes the first installment, then the `count - 1` siblings one
    /// calendar month apart. The first record's id keys the series.
    fn create_installments(
        store: &dyn LedgerStore,
        draft: TransactionDraft,
        placement: Placement,
    ) -> Result<SaveOutcome, CoreError> {
        let count = draft.installment_count;
        let mut first = draft.into_transaction(placement.reference_month);
        first.ledger_id = placement.ledger_id;
        first.recurrence_id = Some(first.id);
        first.set_installment(1, count);
        let key = store.add_transaction(first.clone())?;

        let mut report = BatchReport::new();
        report.succeeded.push(key);
        for index in 2..=count {
            let offset = (index - 1) as i32;
            let mut sibling = first.clone();
            sibling.id = Uuid::new_v4();
            sibling.status = TransactionStatus::Scheduled;
            sibling.date = add_months(first.date, offset);
            sibling.reference_month = first.reference_month.shift(offset);
            sibling.set_installment(index, count);
            let id = sibling.id;
            report.record(id, store.add_transaction(sibling).map(|_| ()));
        }
        info!(
            series = %key,
            installments = count,
            created = report.succeeded.len(),
            "installment series created"
        );
        Ok(SaveOutcome {
            primary: key,
            report,
        })
    }

    fn save_existing(
        store: &dyn LedgerStore,
        id: Uuid,
        draft: TransactionDraft,
        card: Option<&CreditCard>,
    ) -> Result<SaveOutcome, CoreError> {
        let old = store.transaction(id)?;
        let old_total = old.installments.map(|info| info.total).unwrap_or(1);
        let new_total = draft.installment_count;
        let expands =
            new_total > old_total && (old.installments.is_some() || draft.creates_series());
        if old.installments.is_some() && new_total < old_total {
            return Err(CoreError::InvalidOperation(format!(
                "installment count cannot shrink from {old_total} to {new_total}"
            )));
        }

        let placement = if draft.date == old.date && draft.card_id == old.card_id {
            if draft.ledger_id != old.ledger_id {
                LedgerService::get(store, draft.ledger_id)?;
            }
            Placement {
                ledger_id: card
                    .and_then(|card| card.ledger_id)
                    .unwrap_or(draft.ledger_id),
                reference_month: draft.reference_month.unwrap_or(old.reference_month),
            }
        } else {
            let mut moved = draft.clone();
            moved.reference_month = None;
            place(store, &moved, card)?
        };

        let was_paid = old.is_paid();
        let mut txn = old.clone();
        apply_draft(&mut txn, draft, placement);
        if expands {
            match txn.installments {
                Some(info) => txn.set_installment(info.current, new_total),
                None => {
                    txn.nature = TransactionNature::Installment;
                    txn.recurrence_id.get_or_insert(txn.id);
                    txn.set_installment(1, new_total);
                }
            }
        }
        store.update_transaction(txn.clone())?;
        debug!(transaction = %id, "transaction updated");

        sync_contract(store, was_paid, &txn)?;

        let mut report = BatchReport::new();
        report.succeeded.push(id);
        if expands {
            report.merge(Self::expand_series(store, &txn, new_total)?);
        }
        Ok(SaveOutcome {
            primary: id,
            report,
        })
    }

    /// Raises the installment total of the series containing `anchor`.
    ///
    /// Existing members take the anchor's amount and the new total; only the
    /// missing trailing installments are created.
    pub fn expand_series(
        store: &dyn LedgerStore,
        anchor: &Transaction,
        new_total: u32,
    ) -> Result<BatchReport, CoreError> {
        let all = store.transactions()?;
        let members = resolve_series_members(anchor, &all);
        let current_max = max_installment(&members);
        if new_total < current_max {
            return Err(CoreError::InvalidOperation(format!(
                "series already has {current_max} installments"
            )));
        }

        let mut report = BatchReport::new();
        for member in &members {
            if member.id == anchor.id {
                continue;
            }
            let mut updated = (*member).clone();
            let current = updated.installments.map(|info| info.current).unwrap_or(1);
            updated.amount = anchor.amount;
            updated.set_installment(current, new_total);
            report.record(updated.id, store.update_transaction(updated));
        }

        let last = members
            .iter()
            .max_by_key(|txn| txn.installments.map(|info| info.current).unwrap_or(0))
            .map(|txn| (*txn).clone())
            .unwrap_or_else(|| anchor.clone());
        let last_index = last
            .installments
            .map(|info| info.current)
            .unwrap_or(current_max);
        for index in (current_max + 1)..=new_total {
            let offset = (index - last_index) as i32;
            let mut sibling = last.clone();
            sibling.id = Uuid::new_v4();
            sibling.amount = anchor.amount;
            sibling.status = TransactionStatus::Scheduled;
            sibling.recurrence_id = anchor.recurrence_id;
            sibling.description = anchor.base_description().to_string();
            sibling.date = add_months(last.date, offset);
            sibling.reference_month = last.reference_month.shift(offset);
            sibling.set_installment(index, new_total);
            let id = sibling.id;
            report.record(id, store.add_transaction(sibling).map(|_| ()));
        }
        info!(anchor = %anchor.id, total = new_total, "installment series expanded");
        Ok(report)
    }

    /// Applies `edited` to one record, to it and later members, or to the
    /// whole series. Outside the edited record only the shared fields move:
    /// kind, amount, category and description. Series-wide and forward edits
    /// of generated transactions also update the parent rule.
    pub fn update_scoped(
        store: &dyn LedgerStore,
        edited: Transaction,
        scope: EditScope,
    ) -> Result<BatchReport, CoreError> {
        if scope == EditScope::Single {
            return Self::save(store, EditingItem::Existing(edited)).map(|outcome| outcome.report);
        }
        if edited.amount < Decimal::ZERO {
            return Err(CoreError::Validation("amount must not be negative".into()));
        }

        let old = store.transaction(edited.id)?;
        let all = store.transactions()?;
        let mut members = resolve_series_members(&old, &all);
        if scope == EditScope::Forward {
            members = forward_members(&old, members);
        }

        let mut report = BatchReport::new();
        for member in members {
            let mut updated = if member.id == edited.id {
                edited.clone()
            } else {
                let mut copy = member.clone();
                copy.kind = edited.kind;
                copy.amount = edited.amount;
                copy.category = edited.category.clone();
                copy.description = edited.base_description().to_string();
                copy
            };
            if let Some(info) = member.installments {
                updated.set_installment(info.current, info.total);
            }
            let id = updated.id;
            match store.update_transaction(updated.clone()) {
                Ok(()) if id == edited.id => {
                    report.record(id, sync_contract(store, old.is_paid(), &updated));
                }
                result => report.record(id, result),
            }
        }

        if old.nature == TransactionNature::Recurring {
            if let Some(rule_id) = old.recurrence_id {
                match store.recurrence(rule_id) {
                    Ok(rule) => {
                        let rule = retemplate(rule, &edited);
                        store.update_recurrence(rule)?;
                        info!(recurrence = %rule_id, "recurrence template updated from edit");
                    }
                    Err(CoreError::RecurrenceNotFound(_)) => {
                        debug!(recurrence = %rule_id, "edited transaction has no parent rule");
                    }
                    Err(err) => return Err(err),
                }
            }
        }
        Ok(report)
    }

    /// Deletes a record or its whole series.
    ///
    /// A single occurrence of a generated transaction is deleted and its
    /// month is skipped on the rule so the generator does not recreate it.
    /// `AllRelated` on a generated transaction removes the rule and every
    /// record it generated; on other records it removes every record sharing
    /// the series key or contract.
    pub fn delete_scoped(
        store: &dyn LedgerStore,
        txn_id: Uuid,
        scope: DeleteScope,
    ) -> Result<BatchReport, CoreError> {
        let txn = store.transaction(txn_id)?;
        let rule = parent_rule(store, &txn)?;
        let mut report = BatchReport::new();

        match scope {
            DeleteScope::Single => {
                if let Some(mut rule) = rule {
                    if rule.skip(txn.reference_month) {
                        debug!(recurrence = %rule.id, month = %txn.reference_month, "occurrence skipped on delete");
                        store.update_recurrence(rule)?;
                    }
                }
                store.delete_transaction(txn_id)?;
                report.succeeded.push(txn_id);
            }
            DeleteScope::AllRelated => {
                let all = store.transactions()?;
                let targets: Vec<Uuid> = match rule {
                    Some(rule) => {
                        store.delete_recurrence(rule.id)?;
                        info!(recurrence = %rule.id, "recurrence deleted");
                        all.iter()
                            .filter(|other| other.recurrence_id == Some(rule.id) || other.id == txn.id)
                            .map(|other| other.id)
                            .collect()
                    }
                    None if txn.nature == TransactionNature::Recurring => {
                        resolve_series_members(&txn, &all)
                            .into_iter()
                            .map(|other| other.id)
                            .collect()
                    }
                    None => related_records(&txn, &all),
                };
                for id in targets {
                    report.record(id, store.delete_transaction(id));
                }
            }
        }
        info!(transaction = %txn_id, deleted = report.succeeded.len(), "transactions deleted");
        Ok(report)
    }
}

/// Resolves ledger and reference month for a draft.

/// Moves the linked contract when an update changed the paid state of `txn`.
fn sync_contract(store: &dyn LedgerStore, was_paid: bool, txn: &Transaction) -> Result<(), CoreError> {
    let Some(contract_id) = txn.contract_id else {
        return Ok(());
    };
    if was_paid != txn.is_paid() && txn.status != TransactionStatus::Cancelled {
        DebtService::apply_payment_change(store, contract_id, txn.is_paid())?;
    }
    Ok(())
}
fn place(
    store: &dyn LedgerStore,
    draft: &TransactionDraft,
    card: Option<&CreditCard>,
) -> Result<Placement, CoreError> {
    LedgerService::get(store, draft.ledger_id)?;
    Ok(match card {
        Some(card) => Placement {
            ledger_id: card.ledger_id.unwrap_or(draft.ledger_id),
            reference_month: draft
                .reference_month
                .unwrap_or_else(|| card.invoice_month(draft.date)),
        },
        None => Placement {
            ledger_id: draft.ledger_id,
            reference_month: draft
                .reference_month
                .unwrap_or_else(|| MonthRef::from_date(draft.date)),
        },
    })
}

/// Copies the editable fields of `draft` onto a persisted record.
fn apply_draft(txn: &mut Transaction, draft: TransactionDraft, placement: Placement) {
    txn.ledger_id = placement.ledger_id;
    txn.reference_month = placement.reference_month;
    txn.kind = draft.kind;
    txn.method = draft.method;
    txn.status = draft.status;
    txn.amount = draft.amount;
    txn.date = draft.date;
    txn.category = draft.category;
    txn.description = draft.description;
    txn.nature = draft.nature;
    txn.card_id = draft.card_id;
    txn.contract_id = draft.contract_id;
    if draft.recurrence_id.is_some() {
        txn.recurrence_id = draft.recurrence_id;
    }
    if let Some(info) = txn.installments {
        txn.set_installment(info.current, info.total);
    }
}

fn retemplate(mut rule: Recurrence, edited: &Transaction) -> Recurrence {
    rule.kind = edited.kind;
    rule.amount = edited.amount;
    rule.category = edited.category.clone();
    rule.description = edited.base_description().to_string();
    rule
}

fn parent_rule(store: &dyn LedgerStore, txn: &Transaction) -> Result<Option<Recurrence>, CoreError> {
    if txn.nature != TransactionNature::Recurring {
        return Ok(None);
    }
    let Some(rule_id) = txn.recurrence_id else {
        return Ok(None);
    };
    match store.recurrence(rule_id) {
        Ok(rule) => Ok(Some(rule)),
        Err(CoreError::RecurrenceNotFound(_)) => Ok(None),
        Err(err) => Err(err),
    }
}

/// Records tied to `txn` by series key, contract or id, plus legacy
/// installment siblings without a key.
fn related_records(txn: &Transaction, all: &[Transaction]) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = all
        .iter()
        .filter(|other| {
            other.id == txn.id
                || Some(other.id) == txn.recurrence_id
                || other.recurrence_id == Some(txn.id)
                || (txn.recurrence_id.is_some() && other.recurrence_id == txn.recurrence_id)
                || (txn.contract_id.is_some() && other.contract_id == txn.contract_id)
        })
        .map(|other| other.id)
        .collect();
    if txn.recurrence_id.is_none() && txn.nature == TransactionNature::Installment {
        for member in resolve_series_members(txn, all) {
            if !ids.contains(&member.id) {
                ids.push(member.id);
            }
        }
    }
    ids
}
