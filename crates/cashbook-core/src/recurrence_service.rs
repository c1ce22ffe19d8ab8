//! Recurrence rule maintenance and the rolling-horizon generator.

use std::{
    collections::HashSet,
    sync::{Mutex, MutexGuard},
};

use chrono::NaiveDate;
use cashbook_domain::{
    CreditCard, MonthRef, PaymentMethod, Recurrence, RecurrenceOccurrence, Transaction,
    TransactionNature, TransactionStatus,
};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    card_service::CardService, error::validate_day, ledger_service::LedgerService,
    report::BatchFailure, store::LedgerStore, CoreError,
};

/// Default look-ahead: the current month and the next.
pub const DEFAULT_HORIZON_MONTHS: u32 = 2;

/// Provides safe helpers for creating and modifying recurrence rules.
pub struct RecurrenceService;

impl RecurrenceService {
    pub fn create(store: &dyn LedgerStore, rule: Recurrence) -> Result<Uuid, CoreError> {
        Self::validate(store, &rule)?;
        LedgerService::get(store, rule.ledger_id)?;
        let id = store.add_recurrence(rule)?;
        info!(recurrence = %id, "recurrence created");
        Ok(id)
    }

    pub fn update(store: &dyn LedgerStore, rule: Recurrence) -> Result<(), CoreError> {
        Self::validate(store, &rule)?;
        store.update_recurrence(rule)
    }

    /// Pauses or resumes generation.
    pub fn set_active(store: &dyn LedgerStore, id: Uuid, active: bool) -> Result<(), CoreError> {
        let mut rule = store.recurrence(id)?;
        rule.is_active = active;
        store.update_recurrence(rule)
    }

    /// Suppresses `month`, returning whether it was newly added.
    pub fn skip_month(
        store: &dyn LedgerStore,
        id: Uuid,
        month: MonthRef,
    ) -> Result<bool, CoreError> {
        let mut rule = store.recurrence(id)?;
        if !rule.skip(month) {
            return Ok(false);
        }
        store.update_recurrence(rule)?;
        debug!(recurrence = %id, %month, "month skipped");
        Ok(true)
    }

    /// The not-yet-materialized slot of `id` in `month`, for editing.
    pub fn project(
        store: &dyn LedgerStore,
        id: Uuid,
        month: MonthRef,
    ) -> Result<RecurrenceOccurrence, CoreError> {
        let rule = store.recurrence(id)?;
        Ok(RecurrenceOccurrence::project(&rule, month))
    }

    fn validate(store: &dyn LedgerStore, rule: &Recurrence) -> Result<(), CoreError> {
        validate_day("day of month", rule.day_of_month)?;
        if rule.amount < Decimal::ZERO {
            return Err(CoreError::Validation("amount must not be negative".into()));
        }
        match (rule.method, rule.card_id) {
            (PaymentMethod::Card, Some(card_id)) => {
                CardService::get(store, card_id)?;
                Ok(())
            }
            (PaymentMethod::Card, None) => Err(CoreError::Validation(
                "card recurrences require a card".into(),
            )),
            (_, Some(_)) => Err(CoreError::Validation(
                "only card recurrences may reference a card".into(),
            )),
            (_, None) => Ok(()),
        }
    }
}

/// Summary of one generator run.
#[derive(Debug, Clone, Default)]
pub struct GenerationReport {
    pub created: Vec<Uuid>,
    /// Rules left alone (inactive, or billed to an unknown card) plus slots
    /// left alone (skipped months, records that already exist).
    pub skipped: usize,
    /// Rules whose creation failed, keyed by recurrence id.
    pub failed: Vec<BatchFailure>,
}

/// Materializes transactions from recurrence rules for the current and
/// upcoming months.
///
/// Safe to call repeatedly and concurrently within one process: the persisted
/// transactions decide whether a slot exists, and an in-flight set keeps two
/// overlapping runs from writing the same `(recurrence, month)` slot.
#[derive(Debug)]
pub struct RecurrenceGenerator {
    horizon_months: u32,
    in_flight: Mutex<HashSet<(Uuid, MonthRef)>>,
}

impl Default for RecurrenceGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_HORIZON_MONTHS)
    }
}

impl RecurrenceGenerator {
    pub fn new(horizon_months: u32) -> Self {
        Self {
            horizon_months: horizon_months.max(1),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn horizon_months(&self) -> u32 {
        self.horizon_months
    }

    pub fn run(
        &self,
        store: &dyn LedgerStore,
        today: NaiveDate,
    ) -> Result<GenerationReport, CoreError> {
        let rules = store.recurrences()?;
        let cards = store.cards()?;
        let mut existing: HashSet<(Uuid, MonthRef)> = store
            .transactions()?
            .iter()
            .filter_map(|txn| txn.recurrence_id.map(|id| (id, txn.reference_month)))
            .collect();
        let mut report = GenerationReport::default();
        let start = MonthRef::from_date(today);

        for rule in &rules {
            if !rule.is_generating() {
                debug!(recurrence = %rule.id, "recurrence not generating; skipped");
                report.skipped += 1;
                continue;
            }
            let card = match rule.method {
                PaymentMethod::Card => {
                    let found = rule
                        .card_id
                        .and_then(|card_id| cards.iter().find(|card| card.id == card_id));
                    if found.is_none() {
                        debug!(recurrence = %rule.id, card = ?rule.card_id, "card unavailable; skipped");
                        report.skipped += 1;
                        continue;
                    }
                    found
                }
                PaymentMethod::Pix | PaymentMethod::Boleto => None,
            };
            for target in start.range(self.horizon_months) {
                let slot = plan_slot(rule, card, target);
                let key = (rule.id, slot.reference_month);
                if rule.is_skipped(slot.reference_month) || existing.contains(&key) {
                    report.skipped += 1;
                    continue;
                }
                let Some(_reservation) = self.reserve(key) else {
                    debug!(recurrence = %rule.id, month = %slot.reference_month, "slot in flight elsewhere");
                    report.skipped += 1;
                    continue;
                };
                match self.materialize(store, rule, slot) {
                    Ok(Some(id)) => {
                        info!(recurrence = %rule.id, transaction = %id, month = %key.1, "recurring transaction generated");
                        report.created.push(id);
                    }
                    Ok(None) => report.skipped += 1,
                    Err(err) => {
                        warn!(recurrence = %rule.id, month = %key.1, error = %err, "recurring transaction generation failed");
                        report.failed.push(BatchFailure {
                            id: rule.id,
                            reason: err.to_string(),
                        });
                    }
                }
                existing.insert(key);
            }
        }
        Ok(report)
    }

    /// Writes the slot unless a persisted record already covers it.
    fn materialize(
        &self,
        store: &dyn LedgerStore,
        rule: &Recurrence,
        slot: Slot,
    ) -> Result<Option<Uuid>, CoreError> {
        let covered = store.transactions()?.iter().any(|txn| {
            txn.recurrence_id == Some(rule.id) && txn.reference_month == slot.reference_month
        });
        if covered {
            return Ok(None);
        }
        let mut txn = Transaction::new(
            slot.ledger_id,
            rule.kind,
            rule.amount,
            slot.date,
            rule.description.clone(),
        );
        txn.method = rule.method;
        txn.card_id = rule.card_id;
        txn.reference_month = slot.reference_month;
        txn.category = rule.category.clone();
        txn.nature = TransactionNature::Recurring;
        txn.status = TransactionStatus::Scheduled;
        txn.recurrence_id = Some(rule.id);
        store.add_transaction(txn).map(Some)
    }

    fn reserve(&self, key: (Uuid, MonthRef)) -> Option<Reservation<'_>> {
        let mut keys = lock(&self.in_flight);
        if keys.insert(key) {
            Some(Reservation {
                keys: &self.in_flight,
                key,
            })
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    ledger_id: Uuid,
    date: NaiveDate,
    reference_month: MonthRef,
}

/// Where and when `rule` lands for `target`. `None` when a card rule's card
/// cannot be resolved.
fn plan_slot(rule: &Recurrence, card: Option<&CreditCard>, target: MonthRef) -> Slot {
    let date = rule.occurrence_date(target);
    match card {
        Some(card) => Slot {
            ledger_id: card.ledger_id.unwrap_or(rule.ledger_id),
            date,
            reference_month: card.invoice_month(date),
        },
        None => Slot {
            ledger_id: rule.ledger_id,
            date,
            reference_month: target,
        },
    }
}

/// Releases an in-flight key when dropped.
struct Reservation<'a> {
    keys: &'a Mutex<HashSet<(Uuid, MonthRef)>>,
    key: (Uuid, MonthRef),
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        lock(self.keys).remove(&self.key);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
