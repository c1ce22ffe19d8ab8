//! Persistence seam for the cashbook services.

use std::sync::RwLock;

use cashbook_domain::{
    common::Identifiable, CreditCard, DebtContract, Ledger, LedgerData, OpeningBalance,
    Recurrence, Transaction,
};
use uuid::Uuid;

use crate::CoreError;

/// Record-level CRUD over every collection of a cashbook.
///
/// Backends implement [`read`](LedgerStore::read) and
/// [`write`](LedgerStore::write); the per-entity operations are provided on
/// top of them. Each call is one independent write: there are no multi-record
/// transactions.
pub trait LedgerStore: Send + Sync {
    /// Runs `view` against the current snapshot.
    fn read(&self, view: &mut dyn FnMut(&LedgerData)) -> Result<(), CoreError>;

    /// Applies `change` and persists the result. A failed change must leave
    /// the stored snapshot untouched.
    fn write(
        &self,
        change: &mut dyn FnMut(&mut LedgerData) -> Result<(), CoreError>,
    ) -> Result<(), CoreError>;

    fn snapshot(&self) -> Result<LedgerData, CoreError> {
        let mut copy = LedgerData::default();
        self.read(&mut |data| copy = data.clone())?;
        Ok(copy)
    }

    fn ledgers(&self) -> Result<Vec<Ledger>, CoreError> {
        let mut out = Vec::new();
        self.read(&mut |data| out = data.ledgers.clone())?;
        Ok(out)
    }

    fn add_ledger(&self, ledger: Ledger) -> Result<Uuid, CoreError> {
        let id = ledger.id;
        let mut slot = Some(ledger);
        self.write(&mut |data| insert_new(&mut data.ledgers, &mut slot))?;
        Ok(id)
    }

    fn update_ledger(&self, ledger: Ledger) -> Result<(), CoreError> {
        let id = ledger.id;
        let mut slot = Some(ledger);
        self.write(&mut |data| {
            replace_existing(&mut data.ledgers, &mut slot).ok_or(CoreError::LedgerNotFound(id))
        })
    }

    fn delete_ledger(&self, id: Uuid) -> Result<(), CoreError> {
        self.write(&mut |data| {
            remove_by_id(&mut data.ledgers, id)
                .map(|_| ())
                .ok_or(CoreError::LedgerNotFound(id))
        })
    }

    fn cards(&self) -> Result<Vec<CreditCard>, CoreError> {
        let mut out = Vec::new();
        self.read(&mut |data| out = data.cards.clone())?;
        Ok(out)
    }

    fn add_card(&self, card: CreditCard) -> Result<Uuid, CoreError> {
        let id = card.id;
        let mut slot = Some(card);
        self.write(&mut |data| insert_new(&mut data.cards, &mut slot))?;
        Ok(id)
    }

    fn update_card(&self, card: CreditCard) -> Result<(), CoreError> {
        let id = card.id;
        let mut slot = Some(card);
        self.write(&mut |data| {
            replace_existing(&mut data.cards, &mut slot).ok_or(CoreError::CardNotFound(id))
        })
    }

    fn delete_card(&self, id: Uuid) -> Result<(), CoreError> {
        self.write(&mut |data| {
            remove_by_id(&mut data.cards, id)
                .map(|_| ())
                .ok_or(CoreError::CardNotFound(id))
        })
    }

    fn transactions(&self) -> Result<Vec<Transaction>, CoreError> {
        let mut out = Vec::new();
        self.read(&mut |data| out = data.transactions.clone())?;
        Ok(out)
    }

    fn transaction(&self, id: Uuid) -> Result<Transaction, CoreError> {
        let mut found = None;
        self.read(&mut |data| {
            found = data.transactions.iter().find(|txn| txn.id == id).cloned();
        })?;
        found.ok_or(CoreError::TransactionNotFound(id))
    }

    fn add_transaction(&self, transaction: Transaction) -> Result<Uuid, CoreError> {
        let id = transaction.id;
        let mut slot = Some(transaction);
        self.write(&mut |data| insert_new(&mut data.transactions, &mut slot))?;
        Ok(id)
    }

    fn update_transaction(&self, transaction: Transaction) -> Result<(), CoreError> {
        let id = transaction.id;
        let mut slot = Some(transaction);
        self.write(&mut |data| {
            replace_existing(&mut data.transactions, &mut slot)
                .ok_or(CoreError::TransactionNotFound(id))
        })
    }

    fn delete_transaction(&self, id: Uuid) -> Result<(), CoreError> {
        self.write(&mut |data| {
            remove_by_id(&mut data.transactions, id)
                .map(|_| ())
                .ok_or(CoreError::TransactionNotFound(id))
        })
    }

    fn recurrences(&self) -> Result<Vec<Recurrence>, CoreError> {
        let mut out = Vec::new();
        self.read(&mut |data| out = data.recurrences.clone())?;
        Ok(out)
    }

    fn recurrence(&self, id: Uuid) -> Result<Recurrence, CoreError> {
        let mut found = None;
        self.read(&mut |data| {
            found = data.recurrences.iter().find(|rule| rule.id == id).cloned();
        })?;
        found.ok_or(CoreError::RecurrenceNotFound(id))
    }

    fn add_recurrence(&self, recurrence: Recurrence) -> Result<Uuid, CoreError> {
        let id = recurrence.id;
        let mut slot = Some(recurrence);
        self.write(&mut |data| insert_new(&mut data.recurrences, &mut slot))?;
        Ok(id)
    }

    fn update_recurrence(&self, recurrence: Recurrence) -> Result<(), CoreError> {
        let id = recurrence.id;
        let mut slot = Some(recurrence);
        self.write(&mut |data| {
            replace_existing(&mut data.recurrences, &mut slot)
                .ok_or(CoreError::RecurrenceNotFound(id))
        })
    }

    fn delete_recurrence(&self, id: Uuid) -> Result<(), CoreError> {
        self.write(&mut |data| {
            remove_by_id(&mut data.recurrences, id)
                .map(|_| ())
                .ok_or(CoreError::RecurrenceNotFound(id))
        })
    }

    fn contracts(&self) -> Result<Vec<DebtContract>, CoreError> {
        let mut out = Vec::new();
        self.read(&mut |data| out = data.contracts.clone())?;
        Ok(out)
    }

    fn contract(&self, id: Uuid) -> Result<DebtContract, CoreError> {
        let mut found = None;
        self.read(&mut |data| {
            found = data.contracts.iter().find(|contract| contract.id == id).cloned();
        })?;
        found.ok_or(CoreError::ContractNotFound(id))
    }

    fn add_contract(&self, contract: DebtContract) -> Result<Uuid, CoreError> {
        let id = contract.id;
        let mut slot = Some(contract);
        self.write(&mut |data| insert_new(&mut data.contracts, &mut slot))?;
        Ok(id)
    }

    fn update_contract(&self, contract: DebtContract) -> Result<(), CoreError> {
        let id = contract.id;
        let mut slot = Some(contract);
        self.write(&mut |data| {
            replace_existing(&mut data.contracts, &mut slot).ok_or(CoreError::ContractNotFound(id))
        })
    }

    fn delete_contract(&self, id: Uuid) -> Result<(), CoreError> {
        self.write(&mut |data| {
            remove_by_id(&mut data.contracts, id)
                .map(|_| ())
                .ok_or(CoreError::ContractNotFound(id))
        })
    }

    fn opening_balances(&self) -> Result<Vec<OpeningBalance>, CoreError> {
        let mut out = Vec::new();
        self.read(&mut |data| out = data.opening_balances.clone())?;
        Ok(out)
    }

    /// Rejects a second record for the same ledger and month.
    fn add_opening_balance(&self, balance: OpeningBalance) -> Result<Uuid, CoreError> {
        let id = balance.id;
        let mut slot = Some(balance);
        self.write(&mut |data| {
            if let Some(candidate) = slot.as_ref() {
                let taken = data.opening_balances.iter().any(|existing| {
                    existing.ledger_id == candidate.ledger_id
                        && existing.month_ref == candidate.month_ref
                });
                if taken {
                    return Err(CoreError::InvalidOperation(format!(
                        "opening balance for {} already exists",
                        candidate.month_ref
                    )));
                }
            }
            insert_new(&mut data.opening_balances, &mut slot)
        })?;
        Ok(id)
    }

    fn update_opening_balance(&self, balance: OpeningBalance) -> Result<(), CoreError> {
        let id = balance.id;
        let mut slot = Some(balance);
        self.write(&mut |data| {
            replace_existing(&mut data.opening_balances, &mut slot)
                .ok_or(CoreError::OpeningBalanceNotFound(id))
        })
    }

    fn delete_opening_balance(&self, id: Uuid) -> Result<(), CoreError> {
        self.write(&mut |data| {
            remove_by_id(&mut data.opening_balances, id)
                .map(|_| ())
                .ok_or(CoreError::OpeningBalanceNotFound(id))
        })
    }
}

fn insert_new<T: Identifiable>(items: &mut Vec<T>, slot: &mut Option<T>) -> Result<(), CoreError> {
    let Some(item) = slot.take() else {
        return Ok(());
    };
    let id = item.id();
    if items.iter().any(|existing| existing.id() == id) {
        *slot = Some(item);
        return Err(CoreError::InvalidOperation(format!("record {id} already exists")));
    }
    items.push(item);
    Ok(())
}

fn replace_existing<T: Identifiable>(items: &mut [T], slot: &mut Option<T>) -> Option<()> {
    let item = slot.take()?;
    let id = item.id();
    match items.iter_mut().find(|existing| existing.id() == id) {
        Some(existing) => {
            *existing = item;
            Some(())
        }
        None => {
            *slot = Some(item);
            None
        }
    }
}

fn remove_by_id<T: Identifiable>(items: &mut Vec<T>, id: Uuid) -> Option<T> {
    let index = items.iter().position(|existing| existing.id() == id)?;
    Some(items.remove(index))
}

/// In-process store guarded by a read/write lock. Used by tests and as the
/// working copy behind file-backed stores.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<LedgerData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(data: LedgerData) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }

    /// Consumes the store, returning its snapshot.
    pub fn into_data(self) -> LedgerData {
        match self.data.into_inner() {
            Ok(data) => data,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl LedgerStore for MemoryStore {
    fn read(&self, view: &mut dyn FnMut(&LedgerData)) -> Result<(), CoreError> {
        let guard = self
            .data
            .read()
            .map_err(|_| CoreError::Storage("memory store lock poisoned".into()))?;
        view(&*guard);
        Ok(())
    }

    fn write(
        &self,
        change: &mut dyn FnMut(&mut LedgerData) -> Result<(), CoreError>,
    ) -> Result<(), CoreError> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| CoreError::Storage("memory store lock poisoned".into()))?;
        let mut draft = guard.clone();
        change(&mut draft)?;
        draft.touch();
        *guard = draft;
        Ok(())
    }
}
