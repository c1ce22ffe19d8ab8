//! Credit card registry and classification.

use std::collections::HashSet;

use cashbook_domain::CreditCard;
use rust_decimal::Decimal;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    error::validate_day, ledger_service::LedgerService, report::BatchReport, store::LedgerStore,
    CoreError,
};

pub struct CardService;

impl CardService {
    pub fn register(store: &dyn LedgerStore, card: CreditCard) -> Result<Uuid, CoreError> {
        Self::validate(&card)?;
        if let Some(ledger_id) = card.ledger_id {
            LedgerService::get(store, ledger_id)?;
        }
        let id = store.add_card(card)?;
        info!(card = %id, "card registered");
        Ok(id)
    }

    /// Replaces billing parameters. Ledger changes go through [`CardService::classify`].
    pub fn update(store: &dyn LedgerStore, card: CreditCard) -> Result<(), CoreError> {
        Self::validate(&card)?;
        let current = Self::get(store, card.id)?;
        if current.ledger_id != card.ledger_id {
            return Err(CoreError::InvalidOperation(
                "use classify to move a card between ledgers".into(),
            ));
        }
        store.update_card(card)
    }

    pub fn get(store: &dyn LedgerStore, id: Uuid) -> Result<CreditCard, CoreError> {
        store
            .cards()?
            .into_iter()
            .find(|card| card.id == id)
            .ok_or(CoreError::CardNotFound(id))
    }

    /// Assigns the card to `ledger_id` and re-homes its transactions.
    ///
    /// Contracts paid with the card move along with every transaction they
    /// own, so installments never sit in a ledger other than their contract's.
    pub fn classify(
        store: &dyn LedgerStore,
        card_id: Uuid,
        ledger_id: Uuid,
    ) -> Result<BatchReport, CoreError> {
        LedgerService::get(store, ledger_id)?;
        let mut card = Self::get(store, card_id)?;
        card.ledger_id = Some(ledger_id);
        store.update_card(card)?;
        info!(card = %card_id, ledger = %ledger_id, "card classified");

        let mut report = BatchReport::new();
        let mut moved_contracts = HashSet::new();
        for mut contract in store.contracts()? {
            if contract.card_id != Some(card_id) {
                continue;
            }
            moved_contracts.insert(contract.id);
            if contract.ledger_id == ledger_id {
                continue;
            }
            let id = contract.id;
            contract.ledger_id = ledger_id;
            report.record(id, store.update_contract(contract));
        }

        for mut txn in store.transactions()? {
            let linked = txn.card_id == Some(card_id)
                || txn
                    .contract_id
                    .is_some_and(|contract_id| moved_contracts.contains(&contract_id));
            if !linked || txn.ledger_id == ledger_id {
                continue;
            }
            let id = txn.id;
            txn.ledger_id = ledger_id;
            report.record(id, store.update_transaction(txn));
        }
        debug!(moved = report.succeeded.len(), "card transactions re-homed");
        Ok(report)
    }

    /// Removes the card. Its transactions stay but drop out of every view.
    pub fn remove(store: &dyn LedgerStore, id: Uuid) -> Result<(), CoreError> {
        store.delete_card(id)?;
        info!(card = %id, "card removed");
        Ok(())
    }

    fn validate(card: &CreditCard) -> Result<(), CoreError> {
        validate_day("closing day", card.closing_day)?;
        validate_day("due day", card.due_day)?;
        if card.limit < Decimal::ZERO {
            return Err(CoreError::Validation("card limit must not be negative".into()));
        }
        if card.name.trim().is_empty() {
            return Err(CoreError::Validation("card name must not be empty".into()));
        }
        Ok(())
    }
}
