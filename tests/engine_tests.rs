mod common;

use cashbook::{
    core::{
        CardService, DeleteScope, FlowEntry, FlowFilter, LedgerService, LedgerStore,
        OpeningBalanceService, RecurrenceService, RolloverOutcome,
    },
    domain::{
        CreditCard, LedgerKind, LedgerScope, Recurrence, TransactionDraft, TransactionKind,
        TransactionStatus,
    },
};
use common::{date, memory_cashbook, month};
use rust_decimal::Decimal;

fn money(value: i64) -> Decimal {
    Decimal::new(value, 0)
}

#[test]
fn month_view_rolls_balance_generates_and_groups_invoices() {
    let (cashbook, store) = memory_cashbook(date(2026, 2, 10));
    let home = LedgerService::create(store.as_ref(), "Home", LedgerKind::Personal)
        .expect("create ledger");
    OpeningBalanceService::set_opening_balance(store.as_ref(), home.id, month(2026, 1), money(1000))
        .expect("seed january");

    let salary = TransactionDraft::new(
        home.id,
        TransactionKind::Income,
        money(500),
        date(2026, 1, 5),
        "Salary",
    );
    let groceries = TransactionDraft::new(
        home.id,
        TransactionKind::Expense,
        money(200),
        date(2026, 1, 12),
        "Groceries",
    );
    for draft in [salary, groceries] {
        let saved = cashbook.save(draft.into()).expect("save january entry");
        cashbook.toggle_paid(saved.primary).expect("mark paid");
    }

    RecurrenceService::create(
        store.as_ref(),
        Recurrence::new(home.id, TransactionKind::Expense, money(800), 5, "Rent"),
    )
    .expect("rent rule");
    let card = CreditCard::new("Visa", 10, 20, money(2000)).in_ledger(home.id);
    let card_id = CardService::register(store.as_ref(), card).expect("register card");
    let purchase = TransactionDraft::new(
        home.id,
        TransactionKind::Expense,
        money(100),
        date(2026, 2, 3),
        "Headphones",
    )
    .on_card(card_id)
    .in_installments(3);
    cashbook.save(purchase.into()).expect("save purchase");

    let view = cashbook
        .refresh(LedgerScope::Single(home.id), month(2026, 2), FlowFilter::All)
        .expect("refresh");

    assert_eq!(view.generation.created.len(), 2, "february and march rent");
    assert!(matches!(
        &view.openings[..],
        [(id, RolloverOutcome::Created(balance))] if *id == home.id && balance.amount == money(1300)
    ));

    let stats = &view.statistics;
    assert_eq!(stats.opening_balance, money(1300));
    assert_eq!(stats.realized_expense, Decimal::ZERO);
    assert_eq!(stats.projected_expense, money(900));
    assert_eq!(stats.cash_balance, money(1300));
    assert_eq!(stats.projected_balance, money(400));
    assert!(stats.overdue.iter().any(|txn| txn.description == "Rent"));

    assert_eq!(view.flow.len(), 2);
    match &view.flow[..] {
        [FlowEntry::Single(rent), FlowEntry::Invoice(invoice)] => {
            assert_eq!(rent.date, date(2026, 2, 5));
            assert_eq!(invoice.card_name, "Visa");
            assert_eq!(invoice.amount, money(100));
            assert_eq!(invoice.date, date(2026, 2, 20));
            assert_eq!(invoice.status, TransactionStatus::Scheduled);
        }
        other => panic!("unexpected flow: {other:?}"),
    }

    assert_eq!(view.card_usage.len(), 1);
    assert_eq!(view.card_usage[0].used, money(300));
    assert_eq!(view.card_usage[0].available, money(1700));
}

#[test]
fn refreshing_twice_changes_nothing() {
    let (cashbook, store) = memory_cashbook(date(2026, 3, 1));
    let home = LedgerService::create(store.as_ref(), "Home", LedgerKind::Personal)
        .expect("create ledger");
    RecurrenceService::create(
        store.as_ref(),
        Recurrence::new(home.id, TransactionKind::Income, money(3000), 1, "Salary"),
    )
    .expect("salary rule");

    let first = cashbook
        .refresh(LedgerScope::Consolidated, month(2026, 3), FlowFilter::All)
        .expect("first refresh");
    let before = store.snapshot().expect("snapshot");
    let second = cashbook
        .refresh(LedgerScope::Consolidated, month(2026, 3), FlowFilter::All)
        .expect("second refresh");
    let after = store.snapshot().expect("snapshot");

    assert_eq!(first.generation.created.len(), 2);
    assert!(second.generation.created.is_empty());
    assert!(matches!(first.openings[0].1, RolloverOutcome::Created(_)));
    assert!(matches!(second.openings[0].1, RolloverOutcome::Existing(_)));
    assert_eq!(before.transactions.len(), after.transactions.len());
    assert_eq!(before.opening_balances, after.opening_balances);
}

#[test]
fn months_before_launch_use_manual_balances_only() {
    let (cashbook, store) = memory_cashbook(date(2025, 12, 15));
    let home = LedgerService::create(store.as_ref(), "Home", LedgerKind::Personal)
        .expect("create ledger");

    let unseeded = cashbook
        .refresh(LedgerScope::Single(home.id), month(2025, 12), FlowFilter::All)
        .expect("refresh");
    assert_eq!(unseeded.openings[0].1, RolloverOutcome::BeforeLaunch);
    assert_eq!(unseeded.statistics.opening_balance, Decimal::ZERO);
    assert!(store.opening_balances().expect("balances").is_empty());

    OpeningBalanceService::set_opening_balance(store.as_ref(), home.id, month(2025, 12), money(250))
        .expect("seed");
    let seeded = cashbook
        .refresh(LedgerScope::Single(home.id), month(2025, 12), FlowFilter::All)
        .expect("refresh");
    assert_eq!(seeded.statistics.opening_balance, money(250));
}

#[test]
fn consolidated_opening_sums_every_ledger() {
    let (cashbook, store) = memory_cashbook(date(2026, 1, 20));
    let home = LedgerService::create(store.as_ref(), "Home", LedgerKind::Personal)
        .expect("home");
    let studio = LedgerService::create(store.as_ref(), "Studio", LedgerKind::Business)
        .expect("studio");
    OpeningBalanceService::set_opening_balance(store.as_ref(), home.id, month(2026, 1), money(100))
        .expect("seed home");
    OpeningBalanceService::set_opening_balance(store.as_ref(), studio.id, month(2026, 1), money(40))
        .expect("seed studio");

    let view = cashbook
        .refresh(LedgerScope::Consolidated, month(2026, 1), FlowFilter::All)
        .expect("refresh");
    assert_eq!(view.openings.len(), 2);
    assert_eq!(view.statistics.opening_balance, money(140));
}

#[test]
fn deleting_a_generated_occurrence_keeps_it_from_coming_back() {
    let (cashbook, store) = memory_cashbook(date(2026, 4, 2));
    let home = LedgerService::create(store.as_ref(), "Home", LedgerKind::Personal)
        .expect("create ledger");
    RecurrenceService::create(
        store.as_ref(),
        Recurrence::new(home.id, TransactionKind::Expense, money(60), 15, "Gym"),
    )
    .expect("gym rule");
    let view = cashbook
        .refresh(LedgerScope::Single(home.id), month(2026, 4), FlowFilter::All)
        .expect("refresh");
    let april = view
        .flow
        .iter()
        .find_map(|entry| match entry {
            FlowEntry::Single(txn) => Some(txn.id),
            FlowEntry::Invoice(_) => None,
        })
        .expect("april gym");

    cashbook
        .delete(april, DeleteScope::Single)
        .expect("delete occurrence");
    let again = cashbook
        .refresh(LedgerScope::Single(home.id), month(2026, 4), FlowFilter::All)
        .expect("refresh again");
    assert!(again.generation.created.is_empty());
    assert!(again.flow.is_empty());
    assert_eq!(store.transactions().expect("transactions").len(), 1);
}
