//! Recurrence rules: templates that generate periodic transactions.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    common::*,
    month::MonthRef,
    transaction::{PaymentMethod, TransactionKind},
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// A monthly template. Never counted in statistics; only the transactions it
/// generates are.
pub struct Recurrence {
    pub id: Uuid,
    pub ledger_id: Uuid,
    #[serde(default)]
    pub description: String,
    pub kind: TransactionKind,
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub method: PaymentMethod,
    pub day_of_month: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_id: Option<Uuid>,
    #[serde(default = "Recurrence::default_flag")]
    pub is_active: bool,
    #[serde(default = "Recurrence::default_flag")]
    pub auto_generate: bool,
    /// Reference months the user explicitly removed.
    #[serde(default)]
    pub skipped_months: BTreeSet<MonthRef>,
}

impl Recurrence {
    pub fn new(
        ledger_id: Uuid,
        kind: TransactionKind,
        amount: Decimal,
        day_of_month: u32,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            ledger_id,
            description: description.into(),
            kind,
            amount,
            category: None,
            method: PaymentMethod::Pix,
            day_of_month,
            card_id: None,
            is_active: true,
            auto_generate: true,
            skipped_months: BTreeSet::new(),
        }
    }

    pub fn on_card(mut self, card_id: Uuid) -> Self {
        self.method = PaymentMethod::Card;
        self.card_id = Some(card_id);
        self
    }

    fn default_flag() -> bool {
        true
    }

    /// Active and allowed to materialize transactions on its own.
    pub fn is_generating(&self) -> bool {
        self.is_active && self.auto_generate
    }

    pub fn is_skipped(&self, month: MonthRef) -> bool {
        self.skipped_months.contains(&month)
    }

    /// Suppresses `month`, returning whether it was newly added.
    pub fn skip(&mut self, month: MonthRef) -> bool {
        self.skipped_months.insert(month)
    }

    /// Nominal date of the occurrence inside `month`.
    pub fn occurrence_date(&self, month: MonthRef) -> NaiveDate {
        month.day(self.day_of_month)
    }
}

impl Identifiable for Recurrence {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl LedgerOwned for Recurrence {
    fn ledger_id(&self) -> Option<Uuid> {
        Some(self.ledger_id)
    }
}
