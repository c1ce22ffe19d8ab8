use std::fs;

use cashbook_core::{CoreError, LedgerService, LedgerStore, OpeningBalanceService};
use cashbook_domain::{LedgerData, LedgerKind, MonthRef};
use cashbook_storage_json::{JsonLedgerStore, StoragePaths};
use rust_decimal::Decimal;
use tempfile::tempdir;

#[test]
fn json_store_persists_across_reopen() {
    let dir = tempdir().expect("tempdir");
    let paths = StoragePaths::under(dir.path());
    let ledger_id = {
        let store = JsonLedgerStore::open(paths.clone()).expect("open store");
        let ledger =
            LedgerService::create(&store, "Home", LedgerKind::Personal).expect("create ledger");
        OpeningBalanceService::set_opening_balance(
            &store,
            ledger.id,
            MonthRef::new(2026, 1).unwrap(),
            Decimal::new(100000, 2),
        )
        .expect("set opening");
        ledger.id
    };

    let reopened = JsonLedgerStore::open(paths).expect("reopen store");
    let ledgers = reopened.ledgers().expect("ledgers");
    assert_eq!(ledgers.len(), 1);
    assert_eq!(ledgers[0].id, ledger_id);
    assert!(ledgers[0].is_default);
    let balances = reopened.opening_balances().expect("balances");
    assert_eq!(balances[0].amount, Decimal::new(100000, 2));
    assert!(reopened.data_path().exists());
    assert!(!reopened.data_path().with_extension("json.tmp").exists());
}

#[test]
fn missing_file_opens_empty_without_writing() {
    let dir = tempdir().expect("tempdir");
    let store = JsonLedgerStore::open(StoragePaths::under(dir.path())).expect("open store");
    assert!(store.snapshot().expect("snapshot").is_empty());
    assert!(!store.data_path().exists());
}

#[test]
fn failed_change_leaves_file_and_cache_untouched() {
    let dir = tempdir().expect("tempdir");
    let store = JsonLedgerStore::open(StoragePaths::under(dir.path())).expect("open store");
    LedgerService::create(&store, "Home", LedgerKind::Personal).expect("create ledger");
    let before = fs::read_to_string(store.data_path()).expect("read data file");

    let err = store
        .write(&mut |data: &mut LedgerData| {
            data.ledgers.clear();
            Err(CoreError::InvalidOperation("abort".into()))
        })
        .expect_err("change aborts");
    assert!(matches!(err, CoreError::InvalidOperation(_)));

    assert_eq!(store.ledgers().expect("ledgers").len(), 1);
    let after = fs::read_to_string(store.data_path()).expect("read data file");
    assert_eq!(before, after);
}

#[test]
fn backups_are_listed_restored_and_pruned() {
    let dir = tempdir().expect("tempdir");
    let paths = StoragePaths::under(dir.path());
    let store = JsonLedgerStore::open_named(paths.clone(), "Family Book", 3).expect("open store");
    assert_eq!(store.name(), "family-book");
    LedgerService::create(&store, "Home", LedgerKind::Personal).expect("create ledger");

    for stamp in ["20250101_0800", "20250102_0800", "20250103_0800"] {
        fs::write(
            paths.backup_root.join(format!("family-book_{stamp}.json")),
            "{}",
        )
        .expect("seed backup");
    }
    let info = store.backup(Some("Before cleanup")).expect("backup");
    assert!(info.id.ends_with("_before-cleanup.json"));
    assert!(info.created_at.is_some());

    let backups = store.list_backups().expect("list backups");
    assert_eq!(backups.len(), 3);
    assert_eq!(backups[0].id, info.id);
    assert!(!paths.backup_root.join("family-book_20250101_0800.json").exists());

    LedgerService::create(&store, "Studio", LedgerKind::Business).expect("second ledger");
    assert_eq!(store.ledgers().expect("ledgers").len(), 2);

    let restored = store.restore_backup(&info).expect("restore");
    assert_eq!(restored.ledgers.len(), 1);
    assert_eq!(store.ledgers().expect("ledgers").len(), 1);
    let reopened = JsonLedgerStore::open_named(paths, "family book", 3).expect("reopen");
    assert_eq!(reopened.ledgers().expect("ledgers").len(), 1);
}

#[test]
fn corrupt_data_file_is_a_serde_error() {
    let dir = tempdir().expect("tempdir");
    let paths = StoragePaths::under(dir.path());
    fs::write(paths.data_root.join("cashbook.json"), "{ not json").expect("write junk");
    match JsonLedgerStore::open(paths) {
        Err(CoreError::Serde(_)) => {}
        Err(other) => panic!("unexpected error: {other:?}"),
        Ok(_) => panic!("corrupt file should not open"),
    }
}
