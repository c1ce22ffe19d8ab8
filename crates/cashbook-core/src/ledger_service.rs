//! Ledger registry.

use cashbook_domain::{Ledger, LedgerKind, LedgerOwned};
use tracing::info;
use uuid::Uuid;

use crate::{store::LedgerStore, CoreError};

pub struct LedgerService;

impl LedgerService {
    /// Creates a ledger. The first ledger of a cashbook becomes the default.
    pub fn create(
        store: &dyn LedgerStore,
        name: &str,
        kind: LedgerKind,
    ) -> Result<Ledger, CoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::Validation("ledger name must not be empty".into()));
        }
        let mut ledger = Ledger::new(name, kind);
        if store.ledgers()?.is_empty() {
            ledger = ledger.as_default();
        }
        store.add_ledger(ledger.clone())?;
        info!(ledger = %ledger.id, kind = %ledger.kind, "ledger created");
        Ok(ledger)
    }

    pub fn get(store: &dyn LedgerStore, id: Uuid) -> Result<Ledger, CoreError> {
        store
            .ledgers()?
            .into_iter()
            .find(|ledger| ledger.id == id)
            .ok_or(CoreError::LedgerNotFound(id))
    }

    pub fn default_ledger(store: &dyn LedgerStore) -> Result<Option<Ledger>, CoreError> {
        Ok(store.ledgers()?.into_iter().find(|ledger| ledger.is_default))
    }

    /// Marks `id` as the default ledger and clears the flag everywhere else.
    pub fn set_default(store: &dyn LedgerStore, id: Uuid) -> Result<(), CoreError> {
        let ledgers = store.ledgers()?;
        if !ledgers.iter().any(|ledger| ledger.id == id) {
            return Err(CoreError::LedgerNotFound(id));
        }
        for mut ledger in ledgers {
            let should_be_default = ledger.id == id;
            if ledger.is_default != should_be_default {
                ledger.is_default = should_be_default;
                store.update_ledger(ledger)?;
            }
        }
        Ok(())
    }

    pub fn rename(store: &dyn LedgerStore, id: Uuid, name: &str) -> Result<(), CoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::Validation("ledger name must not be empty".into()));
        }
        let mut ledger = Self::get(store, id)?;
        ledger.name = name.to_string();
        store.update_ledger(ledger)
    }

    /// Deletes an empty ledger. Ledgers that still own records are kept.
    pub fn delete(store: &dyn LedgerStore, id: Uuid) -> Result<(), CoreError> {
        let data = store.snapshot()?;
        if !data.ledgers.iter().any(|ledger| ledger.id == id) {
            return Err(CoreError::LedgerNotFound(id));
        }
        let in_use = owns_any(&data.transactions, id)
            || owns_any(&data.cards, id)
            || owns_any(&data.recurrences, id)
            || owns_any(&data.contracts, id)
            || owns_any(&data.opening_balances, id);
        if in_use {
            return Err(CoreError::InvalidOperation(format!(
                "ledger {id} still owns records"
            )));
        }
        store.delete_ledger(id)?;
        info!(ledger = %id, "ledger deleted");
        Ok(())
    }
}

fn owns_any<T: LedgerOwned>(records: &[T], ledger_id: Uuid) -> bool {
    records.iter().any(|record| record.belongs_to(ledger_id))
}
