//! Credit cards and their billing-cycle mapping.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{common::*, month::MonthRef};

/// A credit card. Closing and due days define how a spend date maps onto an
/// invoice month.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreditCard {
    pub id: Uuid,
    /// `None` while the card is unclassified.
    #[serde(default)]
    pub ledger_id: Option<Uuid>,
    pub name: String,
    pub closing_day: u32,
    pub due_day: u32,
    #[serde(default)]
    pub limit: Decimal,
}

impl CreditCard {
    pub fn new(name: impl Into<String>, closing_day: u32, due_day: u32, limit: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            ledger_id: None,
            name: name.into(),
            closing_day,
            due_day,
            limit,
        }
    }

    pub fn in_ledger(mut self, ledger_id: Uuid) -> Self {
        self.ledger_id = Some(ledger_id);
        self
    }

    pub fn is_classified(&self) -> bool {
        self.ledger_id.is_some()
    }

    /// Invoice month a purchase made on `spend` is billed in.
    pub fn invoice_month(&self, spend: NaiveDate) -> MonthRef {
        invoice_month(spend, self.closing_day)
    }

    /// Payment date of the invoice for `reference_month`.
    pub fn due_date(&self, reference_month: MonthRef) -> NaiveDate {
        reference_month.day(self.due_day)
    }
}

/// Maps a spend date onto its invoice month: purchases before the closing day
/// fall in the spend month, the rest roll into the following month.
pub fn invoice_month(spend: NaiveDate, closing_day: u32) -> MonthRef {
    let spend_month = MonthRef::from_date(spend);
    if spend.day() < closing_day {
        spend_month
    } else {
        spend_month.next()
    }
}

impl Identifiable for CreditCard {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl LedgerOwned for CreditCard {
    fn ledger_id(&self) -> Option<Uuid> {
        self.ledger_id
    }
}
