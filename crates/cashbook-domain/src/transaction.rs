//! Domain models for ledger transactions.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{common::*, month::MonthRef};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
/// How the money moves. `Card` implies billing-cycle semantics.
pub enum PaymentMethod {
    Pix,
    Card,
    /// Bank slip.
    Boleto,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
/// Enumerates the user-declared lifecycle state of a transaction.
pub enum TransactionStatus {
    Scheduled,
    Paid,
    /// Display state; only persisted through an explicit toggle.
    Overdue,
    Cancelled,
}

impl TransactionStatus {
    /// Scheduled or overdue: money that has not moved yet.
    pub fn is_open(self) -> bool {
        matches!(self, TransactionStatus::Scheduled | TransactionStatus::Overdue)
    }

    /// Paid or scheduled: what the opening-balance rollover counts.
    pub fn is_committed(self) -> bool {
        matches!(self, TransactionStatus::Paid | TransactionStatus::Scheduled)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransactionStatus::Scheduled => "scheduled",
            TransactionStatus::Paid => "paid",
            TransactionStatus::Overdue => "overdue",
            TransactionStatus::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TransactionNature {
    OneOff,
    Recurring,
    Installment,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
/// Position of a transaction inside an installment series.
pub struct InstallmentInfo {
    pub current: u32,
    pub total: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: Uuid,
    pub ledger_id: Uuid,
    pub kind: TransactionKind,
    pub method: PaymentMethod,
    pub status: TransactionStatus,
    pub amount: Decimal,
    /// Due date, or spend date for card purchases.
    pub date: NaiveDate,
    /// Accounting/invoice month the transaction counts toward.
    pub reference_month: MonthRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub description: String,
    pub nature: TransactionNature,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_id: Option<Uuid>,
    /// Recurrence link, or the series key shared by an installment batch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installments: Option<InstallmentInfo>,
}

impl Transaction {
    pub fn new(
        ledger_id: Uuid,
        kind: TransactionKind,
        amount: Decimal,
        date: NaiveDate,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            ledger_id,
            kind,
            method: PaymentMethod::Pix,
            status: TransactionStatus::Scheduled,
            amount,
            date,
            reference_month: MonthRef::from_date(date),
            category: None,
            description: description.into(),
            nature: TransactionNature::OneOff,
            card_id: None,
            contract_id: None,
            recurrence_id: None,
            installments: None,
        }
    }

    pub fn income(ledger_id: Uuid, amount: Decimal, date: NaiveDate) -> Self {
        Self::new(ledger_id, TransactionKind::Income, amount, date, "")
    }

    pub fn expense(ledger_id: Uuid, amount: Decimal, date: NaiveDate) -> Self {
        Self::new(ledger_id, TransactionKind::Expense, amount, date, "")
    }

    /// Bills the transaction through `card_id` for `reference_month`.
    pub fn on_card(mut self, card_id: Uuid, reference_month: MonthRef) -> Self {
        self.method = PaymentMethod::Card;
        self.card_id = Some(card_id);
        self.reference_month = reference_month;
        self
    }

    pub fn with_status(mut self, status: TransactionStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn is_income(&self) -> bool {
        self.kind == TransactionKind::Income
    }

    pub fn is_expense(&self) -> bool {
        self.kind == TransactionKind::Expense
    }

    pub fn is_paid(&self) -> bool {
        self.status == TransactionStatus::Paid
    }

    pub fn is_card(&self) -> bool {
        self.method == PaymentMethod::Card
    }

    pub fn category_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(fallback)
    }

    /// Description without the `(i/n)` installment suffix.
    pub fn base_description(&self) -> &str {
        strip_installment_suffix(&self.description)
    }

    /// Rewrites the installment position and the matching description suffix.
    pub fn set_installment(&mut self, current: u32, total: u32) {
        let base = self.base_description().to_string();
        self.description = installment_label(&base, current, total);
        self.installments = Some(InstallmentInfo { current, total });
    }
}

impl Identifiable for Transaction {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl LedgerOwned for Transaction {
    fn ledger_id(&self) -> Option<Uuid> {
        Some(self.ledger_id)
    }
}

/// Appends the `(current/total)` suffix used by installment siblings.
pub fn installment_label(base: &str, current: u32, total: u32) -> String {
    let base = base.trim_end();
    if base.is_empty() {
        format!("({current}/{total})")
    } else {
        format!("{base} ({current}/{total})")
    }
}

/// Removes a trailing `(i/n)` suffix, if present.
pub fn strip_installment_suffix(description: &str) -> &str {
    let trimmed = description.trim_end();
    let Some(inner) = trimmed.strip_suffix(')') else {
        return trimmed;
    };
    let Some(open) = inner.rfind('(') else {
        return trimmed;
    };
    let body = &inner[open + 1..];
    let is_position = body
        .split_once('/')
        .map(|(current, total)| {
            !current.is_empty()
                && !total.is_empty()
                && current.chars().all(|c| c.is_ascii_digit())
                && total.chars().all(|c| c.is_ascii_digit())
        })
        .unwrap_or(false);
    if is_position {
        inner[..open].trim_end()
    } else {
        trimmed
    }
}
