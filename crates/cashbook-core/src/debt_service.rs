//! Debt contracts and the payment toggles that drive their amortization.

use cashbook_domain::{
    ContractStatus, DebtContract, MonthRef, PaymentMethod, Transaction, TransactionKind,
    TransactionNature, TransactionStatus,
};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    card_service::CardService, error::validate_day, ledger_service::LedgerService,
    report::BatchReport, store::LedgerStore, CoreError,
};

/// Result of flipping a transaction between paid and unpaid.
#[derive(Debug, Clone)]
pub struct ToggleOutcome {
    pub transaction: Transaction,
    /// The linked contract after adjustment, when it still exists.
    pub contract: Option<DebtContract>,
    /// `total_debt_remaining - installment_amount * installments_remaining`
    /// when the two disagree.
    pub drift: Option<Decimal>,
}

/// Contract created together with its installment transactions.
#[derive(Debug, Clone)]
pub struct ContractCreation {
    pub contract: DebtContract,
    pub report: BatchReport,
}

pub struct DebtService;

impl DebtService {
    /// Flips scheduled/overdue to paid and paid back to scheduled, keeping
    /// the linked contract's counters in step.
    pub fn toggle_paid(store: &dyn LedgerStore, txn_id: Uuid) -> Result<ToggleOutcome, CoreError> {
        let mut txn = store.transaction(txn_id)?;
        let paying = match txn.status {
            TransactionStatus::Scheduled | TransactionStatus::Overdue => true,
            TransactionStatus::Paid => false,
            TransactionStatus::Cancelled => {
                return Err(CoreError::InvalidOperation(
                    "cancelled transactions cannot be toggled".into(),
                ))
            }
        };
        txn.status = if paying {
            TransactionStatus::Paid
        } else {
            TransactionStatus::Scheduled
        };
        store.update_transaction(txn.clone())?;
        debug!(transaction = %txn_id, status = %txn.status, "payment status toggled");

        let (contract, drift) = match txn.contract_id {
            Some(contract_id) => Self::apply_payment_change(store, contract_id, paying)?,
            None => (None, None),
        };
        Ok(ToggleOutcome {
            transaction: txn,
            contract,
            drift,
        })
    }

    /// Moves a contract one installment forward (`paying`) or back after the
    /// paid state of one of its transactions changed. A missing contract is
    /// not an error.
    pub fn apply_payment_change(
        store: &dyn LedgerStore,
        contract_id: Uuid,
        paying: bool,
    ) -> Result<(Option<DebtContract>, Option<Decimal>), CoreError> {
        let mut contract = match store.contract(contract_id) {
            Ok(contract) => contract,
            Err(CoreError::ContractNotFound(_)) => {
                debug!(contract = %contract_id, "linked contract missing");
                return Ok((None, None));
            }
            Err(err) => return Err(err),
        };
        if paying {
            contract.record_payment();
        } else {
            contract.revert_payment();
        }
        store.update_contract(contract.clone())?;
        let drift = report_drift(&contract);
        info!(
            contract = %contract.id,
            remaining = contract.installments_remaining,
            status = %contract.status,
            "contract amortization updated"
        );
        Ok((Some(contract), drift))
    }

    /// Stores `contract` and one scheduled installment per remaining
    /// installment, starting in `first_month` on the contract's due day.
    ///
    /// The first installment is written before the others so its id can key
    /// the series; later failures are reported and do not stop the batch.
    pub fn create_contract(
        store: &dyn LedgerStore,
        contract: DebtContract,
        first_month: MonthRef,
        category: Option<String>,
    ) -> Result<ContractCreation, CoreError> {
        validate_contract(&contract)?;
        LedgerService::get(store, contract.ledger_id)?;
        let card = contract
            .card_id
            .map(|card_id| CardService::get(store, card_id))
            .transpose()?;
        if let Some(card) = card.as_ref() {
            if card.ledger_id.is_some_and(|ledger_id| ledger_id != contract.ledger_id) {
                return Err(CoreError::Validation(
                    "contract card belongs to another ledger".into(),
                ));
            }
        }
        store.add_contract(contract.clone())?;
        info!(contract = %contract.id, installments = contract.installments_remaining, "contract created");

        let total = contract.installments_remaining;
        let mut report = BatchReport::new();
        let mut series_key = None;
        for index in 0..total {
            let month = first_month.shift(index as i32);
            let date = month.day(contract.due_day);
            let mut txn = Transaction::new(
                contract.ledger_id,
                TransactionKind::Expense,
                contract.installment_amount,
                date,
                contract_label(&contract),
            );
            txn.nature = TransactionNature::Installment;
            txn.contract_id = Some(contract.id);
            txn.category = category.clone();
            if let Some(card) = card.as_ref() {
                txn.method = PaymentMethod::Card;
                txn.card_id = Some(card.id);
                txn.reference_month = card.invoice_month(date);
            }
            txn.set_installment(index + 1, total);

            let id = txn.id;
            match series_key {
                None => {
                    txn.recurrence_id = Some(id);
                    store.add_transaction(txn)?;
                    series_key = Some(id);
                    report.succeeded.push(id);
                }
                Some(key) => {
                    txn.recurrence_id = Some(key);
                    report.record(id, store.add_transaction(txn).map(|_| ()));
                }
            }
        }
        Ok(ContractCreation { contract, report })
    }

    /// Direct edit of a contract's fields. Counters are taken as given; any
    /// drift is reported rather than corrected.
    pub fn edit_contract(
        store: &dyn LedgerStore,
        mut contract: DebtContract,
    ) -> Result<Option<Decimal>, CoreError> {
        validate_contract(&contract)?;
        store.contract(contract.id)?;
        contract.status = if contract.installments_remaining == 0 {
            ContractStatus::Settled
        } else {
            ContractStatus::Active
        };
        store.update_contract(contract.clone())?;
        Ok(report_drift(&contract))
    }

    /// Deletes a contract. With `cascade` its installments go too; otherwise
    /// they are kept and unlinked.
    pub fn delete_contract(
        store: &dyn LedgerStore,
        contract_id: Uuid,
        cascade: bool,
    ) -> Result<BatchReport, CoreError> {
        store.delete_contract(contract_id)?;
        info!(contract = %contract_id, cascade, "contract deleted");
        let mut report = BatchReport::new();
        for mut txn in store.transactions()? {
            if txn.contract_id != Some(contract_id) {
                continue;
            }
            let id = txn.id;
            if cascade {
                report.record(id, store.delete_transaction(id));
            } else {
                txn.contract_id = None;
                report.record(id, store.update_transaction(txn));
            }
        }
        Ok(report)
    }

    pub fn contracts_for_card(
        store: &dyn LedgerStore,
        card_id: Uuid,
    ) -> Result<Vec<DebtContract>, CoreError> {
        Ok(store
            .contracts()?
            .into_iter()
            .filter(|contract| contract.card_id == Some(card_id))
            .collect())
    }
}

fn validate_contract(contract: &DebtContract) -> Result<(), CoreError> {
    validate_day("due day", contract.due_day)?;
    if contract.installment_amount < Decimal::ZERO || contract.total_debt_remaining < Decimal::ZERO
    {
        return Err(CoreError::Validation("contract amounts must not be negative".into()));
    }
    Ok(())
}

fn contract_label(contract: &DebtContract) -> String {
    if contract.description.trim().is_empty() {
        contract.creditor.clone()
    } else {
        contract.description.clone()
    }
}

fn report_drift(contract: &DebtContract) -> Option<Decimal> {
    let drift = contract.drift();
    if let Some(delta) = drift {
        warn!(
            contract = %contract.id,
            recorded = %contract.total_debt_remaining,
            expected = %contract.expected_remaining(),
            %delta,
            "contract balance drifted from installment count"
        );
    }
    drift
}
