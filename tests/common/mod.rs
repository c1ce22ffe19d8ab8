#![allow(dead_code)]

use std::{path::PathBuf, sync::Arc, sync::Mutex};

use cashbook::{
    config::{Config, ConfigManager},
    core::{FixedClock, LedgerStore, MemoryStore},
    domain::MonthRef,
    Cashbook,
};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Serializes tests that touch process environment variables.
pub static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn month(y: i32, m: u32) -> MonthRef {
    MonthRef::new(y, m).expect("valid month")
}

/// Unique directory that outlives the calling test.
pub fn test_dir() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    base
}

/// Config launched in December 2025, so January 2026 onward rolls over.
pub fn test_config() -> Config {
    Config {
        min_supported_month: month(2025, 12),
        ..Config::default()
    }
}

/// In-memory cashbook frozen at `today`.
pub fn memory_cashbook(today: NaiveDate) -> (Cashbook, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let shared: Arc<dyn LedgerStore> = store.clone();
    let cashbook = Cashbook::new(shared, Arc::new(FixedClock::at_date(today)), test_config());
    (cashbook, store)
}

/// Config manager plus config pointing the data root into a fresh directory.
pub fn setup_file_env() -> (ConfigManager, Config) {
    let base = test_dir();
    let manager = ConfigManager::with_base_dir(base.clone()).expect("create config manager");
    let config = Config {
        data_root: Some(base.join("data")),
        backup_retention: 3,
        ..test_config()
    };
    manager.save(&config).expect("save config");
    (manager, config)
}
