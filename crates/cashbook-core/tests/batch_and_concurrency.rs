use std::{collections::HashSet, sync::Arc, thread};

use cashbook_core::{
    CardService, CoreError, DeleteScope, LedgerService, LedgerStore, MemoryStore,
    RecurrenceGenerator, RecurrenceService, TransactionService,
};
use cashbook_domain::{
    CreditCard, LedgerData, LedgerKind, MonthRef, Recurrence, Transaction, TransactionDraft,
    TransactionKind, TransactionNature,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Delegates to a [`MemoryStore`] but refuses writes to chosen records.
struct FlakyStore {
    inner: MemoryStore,
    poisoned_descriptions: Vec<String>,
}

impl FlakyStore {
    fn rejects(&self, txn: &Transaction) -> bool {
        self.poisoned_descriptions
            .iter()
            .any(|poison| txn.description.contains(poison.as_str()))
    }
}

impl LedgerStore for FlakyStore {
    fn read(&self, view: &mut dyn FnMut(&LedgerData)) -> Result<(), CoreError> {
        self.inner.read(view)
    }

    fn write(
        &self,
        change: &mut dyn FnMut(&mut LedgerData) -> Result<(), CoreError>,
    ) -> Result<(), CoreError> {
        self.inner.write(change)
    }

    fn add_transaction(&self, transaction: Transaction) -> Result<Uuid, CoreError> {
        if self.rejects(&transaction) {
            return Err(CoreError::Storage("disk full".into()));
        }
        self.inner.add_transaction(transaction)
    }

    fn update_transaction(&self, transaction: Transaction) -> Result<(), CoreError> {
        if self.rejects(&transaction) {
            return Err(CoreError::Storage("disk full".into()));
        }
        self.inner.update_transaction(transaction)
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn installment_batch_continues_after_a_failed_sibling() {
    let store = FlakyStore {
        inner: MemoryStore::new(),
        poisoned_descriptions: vec!["(2/4)".into()],
    };
    let ledger = LedgerService::create(&store, "Home", LedgerKind::Personal).expect("ledger");
    let draft = TransactionDraft::new(
        ledger.id,
        TransactionKind::Expense,
        Decimal::new(5000, 2),
        date(2026, 1, 10),
        "Camera",
    )
    .in_installments(4);

    let outcome = TransactionService::save(&store, draft.into()).expect("save");
    assert_eq!(outcome.report.succeeded.len(), 3);
    assert_eq!(outcome.report.failed.len(), 1);
    assert!(outcome.report.failed[0].reason.contains("disk full"));

    let descriptions: HashSet<String> = store
        .transactions()
        .unwrap()
        .into_iter()
        .map(|txn| txn.description)
        .collect();
    assert!(descriptions.contains("Camera (1/4)"));
    assert!(descriptions.contains("Camera (3/4)"));
    assert!(descriptions.contains("Camera (4/4)"));
}

#[test]
fn failing_first_installment_aborts_the_series() {
    let store = FlakyStore {
        inner: MemoryStore::new(),
        poisoned_descriptions: vec!["(1/3)".into()],
    };
    let ledger = LedgerService::create(&store, "Home", LedgerKind::Personal).expect("ledger");
    let draft = TransactionDraft::new(
        ledger.id,
        TransactionKind::Expense,
        Decimal::ONE,
        date(2026, 1, 10),
        "Stove",
    )
    .in_installments(3);

    let err = TransactionService::save(&store, draft.into()).expect_err("first write fails");
    assert!(matches!(err, CoreError::Storage(_)));
    assert!(store.transactions().unwrap().is_empty());
}

#[test]
fn card_classification_reports_failures_and_moves_the_rest() {
    let store = FlakyStore {
        inner: MemoryStore::new(),
        poisoned_descriptions: vec!["Locked".into()],
    };
    let home = LedgerService::create(&store, "Home", LedgerKind::Personal).expect("ledger");
    let studio = LedgerService::create(&store, "Studio", LedgerKind::Business).expect("ledger");
    let card = CreditCard::new("Visa", 10, 20, Decimal::ZERO);
    CardService::register(&store, card.clone()).expect("card");
    for description in ["Paper", "Locked", "Toner"] {
        let txn = Transaction::new(
            home.id,
            TransactionKind::Expense,
            Decimal::ONE,
            date(2026, 2, 1),
            description,
        )
        .on_card(card.id, MonthRef::new(2026, 2).unwrap());
        store.inner.add_transaction(txn).expect("seed");
    }

    let report = CardService::classify(&store, card.id, studio.id).expect("classify");
    assert_eq!(report.succeeded.len(), 2);
    assert_eq!(report.failed.len(), 1);
    let moved = store
        .transactions()
        .unwrap()
        .into_iter()
        .filter(|txn| txn.ledger_id == studio.id)
        .count();
    assert_eq!(moved, 2);
}

#[test]
fn overlapping_generator_runs_create_each_slot_once() {
    let store = Arc::new(MemoryStore::new());
    let ledger =
        LedgerService::create(store.as_ref(), "Home", LedgerKind::Personal).expect("ledger");
    for day in [1, 10, 20, 28] {
        let rule = Recurrence::new(
            ledger.id,
            TransactionKind::Expense,
            Decimal::new(1000, 2),
            day,
            format!("Rule {day}"),
        );
        RecurrenceService::create(store.as_ref(), rule).expect("rule");
    }
    let generator = Arc::new(RecurrenceGenerator::default());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            let generator = Arc::clone(&generator);
            thread::spawn(move || {
                generator
                    .run(store.as_ref(), date(2026, 7, 4))
                    .expect("run")
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("generator thread");
    }

    let txns = store.transactions().unwrap();
    assert_eq!(txns.len(), 8);
    let slots: HashSet<_> = txns
        .iter()
        .map(|txn| (txn.recurrence_id, txn.reference_month))
        .collect();
    assert_eq!(slots.len(), 8);
}

#[test]
fn deleting_a_recurring_occurrence_without_rule_falls_back_to_description() {
    let store = MemoryStore::new();
    let ledger = LedgerService::create(&store, "Home", LedgerKind::Personal).expect("ledger");
    for month in 1..=3 {
        let mut txn = Transaction::new(
            ledger.id,
            TransactionKind::Expense,
            Decimal::ONE,
            date(2026, month, 5),
            "Gym",
        );
        txn.nature = TransactionNature::Recurring;
        store.add_transaction(txn).expect("seed");
    }
    let first = store.transactions().unwrap()[0].clone();

    let report = TransactionService::delete_scoped(&store, first.id, DeleteScope::AllRelated)
        .expect("delete");
    assert_eq!(report.succeeded.len(), 3);
    assert!(store.transactions().unwrap().is_empty());
}
