//! Month-start cash balances rolled forward from the previous month.

use cashbook_domain::{CreditCard, LedgerScope, MonthRef, OpeningBalance, Transaction};
use rust_decimal::Decimal;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    ledger_service::LedgerService,
    scope::{period_transactions, Period},
    store::LedgerStore,
    CoreError,
};

/// What [`OpeningBalanceService::ensure`] did for a month.
#[derive(Debug, Clone, PartialEq)]
pub enum RolloverOutcome {
    /// The month is at or before the earliest supported month.
    BeforeLaunch,
    /// A record already existed and was left untouched.
    Existing(OpeningBalance),
    Created(OpeningBalance),
}

impl RolloverOutcome {
    pub fn balance(&self) -> Option<&OpeningBalance> {
        match self {
            RolloverOutcome::BeforeLaunch => None,
            RolloverOutcome::Existing(balance) | RolloverOutcome::Created(balance) => {
                Some(balance)
            }
        }
    }

    pub fn amount(&self) -> Decimal {
        self.balance()
            .map(|balance| balance.amount)
            .unwrap_or(Decimal::ZERO)
    }
}

pub struct OpeningBalanceService;

impl OpeningBalanceService {
    /// Makes sure `(ledger_id, month)` has an opening balance.
    ///
    /// Existing records are snapshots and are never recomputed. A missing
    /// previous-month record yields a zero balance; older months are not
    /// back-filled.
    pub fn ensure(
        store: &dyn LedgerStore,
        ledger_id: Uuid,
        month: MonthRef,
        min_supported: MonthRef,
    ) -> Result<RolloverOutcome, CoreError> {
        if month <= min_supported {
            return Ok(RolloverOutcome::BeforeLaunch);
        }
        let balances = store.opening_balances()?;
        if let Some(existing) = find(&balances, ledger_id, month) {
            return Ok(RolloverOutcome::Existing(existing.clone()));
        }

        let previous_month = month.previous();
        let record = match find(&balances, ledger_id, previous_month) {
            Some(previous) => {
                let transactions = store.transactions()?;
                let cards = store.cards()?;
                let net = Self::month_net(&transactions, &cards, ledger_id, previous_month);
                OpeningBalance::new(ledger_id, month, previous.amount + net, previous.base_month)
            }
            None => {
                debug!(ledger = %ledger_id, %month, "no previous opening balance; starting at zero");
                OpeningBalance::seeded(ledger_id, month, Decimal::ZERO)
            }
        };
        match store.add_opening_balance(record.clone()) {
            Ok(_) => {
                info!(ledger = %ledger_id, %month, amount = %record.amount, "opening balance rolled over");
                Ok(RolloverOutcome::Created(record))
            }
            // Lost a race with another writer: the stored record wins.
            Err(CoreError::InvalidOperation(_)) => {
                let balances = store.opening_balances()?;
                find(&balances, ledger_id, month)
                    .cloned()
                    .map(RolloverOutcome::Existing)
                    .ok_or_else(|| {
                        CoreError::Storage(format!("opening balance for {month} vanished"))
                    })
            }
            Err(err) => Err(err),
        }
    }

    /// Creates or overwrites the opening balance of a month by hand. The
    /// record starts a new rollover chain.
    pub fn set_opening_balance(
        store: &dyn LedgerStore,
        ledger_id: Uuid,
        month: MonthRef,
        amount: Decimal,
    ) -> Result<OpeningBalance, CoreError> {
        LedgerService::get(store, ledger_id)?;
        let balances = store.opening_balances()?;
        match find(&balances, ledger_id, month) {
            Some(existing) => {
                let mut updated = existing.clone();
                updated.amount = amount;
                updated.base_month = month;
                store.update_opening_balance(updated.clone())?;
                info!(ledger = %ledger_id, %month, %amount, "opening balance overridden");
                Ok(updated)
            }
            None => {
                let record = OpeningBalance::seeded(ledger_id, month, amount);
                store.add_opening_balance(record.clone())?;
                info!(ledger = %ledger_id, %month, %amount, "opening balance seeded");
                Ok(record)
            }
        }
    }

    pub fn opening_balance(
        store: &dyn LedgerStore,
        ledger_id: Uuid,
        month: MonthRef,
    ) -> Result<Option<OpeningBalance>, CoreError> {
        Ok(find(&store.opening_balances()?, ledger_id, month).cloned())
    }

    /// Committed income minus committed expense of one ledger in `month`.
    /// Paid and scheduled records count; overdue and cancelled do not.
    pub fn month_net(
        transactions: &[Transaction],
        cards: &[CreditCard],
        ledger_id: Uuid,
        month: MonthRef,
    ) -> Decimal {
        period_transactions(
            transactions,
            cards,
            LedgerScope::Single(ledger_id),
            Period::month(month),
        )
        .into_iter()
        .filter(|txn| txn.status.is_committed())
        .fold(Decimal::ZERO, |net, txn| {
            if txn.is_income() {
                net + txn.amount
            } else {
                net - txn.amount
            }
        })
    }
}

fn find(balances: &[OpeningBalance], ledger_id: Uuid, month: MonthRef) -> Option<&OpeningBalance> {
    balances
        .iter()
        .find(|balance| balance.ledger_id == ledger_id && balance.month_ref == month)
}
