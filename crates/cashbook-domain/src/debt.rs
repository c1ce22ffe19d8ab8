//! Debt contracts and their amortization state.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::*;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    #[default]
    Active,
    Settled,
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ContractStatus::Active => "active",
            ContractStatus::Settled => "settled",
        };
        f.write_str(label)
    }
}

/// A multi-installment obligation tracked alongside its installment
/// transactions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DebtContract {
    pub id: Uuid,
    pub ledger_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_id: Option<Uuid>,
    #[serde(default)]
    pub creditor: String,
    #[serde(default)]
    pub description: String,
    pub installment_amount: Decimal,
    pub installments_remaining: u32,
    pub total_debt_remaining: Decimal,
    #[serde(default)]
    pub total_loan_value: Decimal,
    pub due_day: u32,
    #[serde(default)]
    pub status: ContractStatus,
}

impl DebtContract {
    pub fn new(
        ledger_id: Uuid,
        creditor: impl Into<String>,
        installment_amount: Decimal,
        installments: u32,
        due_day: u32,
    ) -> Self {
        let total = installment_amount * Decimal::from(installments);
        Self {
            id: Uuid::new_v4(),
            ledger_id,
            card_id: None,
            creditor: creditor.into(),
            description: String::new(),
            installment_amount,
            installments_remaining: installments,
            total_debt_remaining: total,
            total_loan_value: total,
            due_day,
            status: if installments == 0 {
                ContractStatus::Settled
            } else {
                ContractStatus::Active
            },
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ContractStatus::Active
    }

    /// `installment_amount × installments_remaining`.
    pub fn expected_remaining(&self) -> Decimal {
        self.installment_amount * Decimal::from(self.installments_remaining)
    }

    /// Difference between the recorded and the expected remaining debt, if any.
    pub fn drift(&self) -> Option<Decimal> {
        let delta = self.total_debt_remaining - self.expected_remaining();
        if delta.is_zero() {
            None
        } else {
            Some(delta)
        }
    }

    /// Sets both counters together, the direct-edit path.
    pub fn reset_remaining(&mut self, installments_remaining: u32) {
        self.installments_remaining = installments_remaining;
        self.total_debt_remaining = self.expected_remaining();
        self.refresh_status();
    }

    /// One installment was paid. Counters never go below zero.
    pub fn record_payment(&mut self) {
        self.installments_remaining = self.installments_remaining.saturating_sub(1);
        self.total_debt_remaining =
            (self.total_debt_remaining - self.installment_amount).max(Decimal::ZERO);
        self.refresh_status();
    }

    /// A previously paid installment was reverted to unpaid.
    pub fn revert_payment(&mut self) {
        self.installments_remaining += 1;
        self.total_debt_remaining += self.installment_amount;
        self.status = ContractStatus::Active;
    }

    fn refresh_status(&mut self) {
        self.status = if self.installments_remaining == 0 {
            ContractStatus::Settled
        } else {
            ContractStatus::Active
        };
    }
}

impl Identifiable for DebtContract {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl LedgerOwned for DebtContract {
    fn ledger_id(&self) -> Option<Uuid> {
        Some(self.ledger_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract(installments: u32) -> DebtContract {
        DebtContract::new(Uuid::new_v4(), "Bank", Decimal::new(25000, 2), installments, 10)
    }

    #[test]
    fn payments_settle_exactly_at_zero() {
        let mut contract = contract(3);
        contract.record_payment();
        contract.record_payment();
        assert!(contract.is_active());
        contract.record_payment();
        assert_eq!(contract.installments_remaining, 0);
        assert_eq!(contract.total_debt_remaining, Decimal::ZERO);
        assert_eq!(contract.status, ContractStatus::Settled);
    }

    #[test]
    fn revert_reactivates_settled_contract() {
        let mut contract = contract(1);
        contract.record_payment();
        contract.revert_payment();
        assert_eq!(contract.status, ContractStatus::Active);
        assert_eq!(contract.installments_remaining, 1);
        assert_eq!(contract.total_debt_remaining, Decimal::new(25000, 2));
    }

    #[test]
    fn drift_reports_manual_divergence() {
        let mut contract = contract(4);
        assert_eq!(contract.drift(), None);
        contract.total_debt_remaining = Decimal::new(90000, 2);
        assert_eq!(contract.drift(), Some(Decimal::new(-10000, 2)));
    }
}
