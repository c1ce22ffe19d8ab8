//! Entry-point types for the save handler.
//!
//! The presentation layer edits one of three shapes: a persisted transaction,
//! a projected recurrence slot that has not been materialized yet, or a fresh
//! draft. [`EditingItem`] keeps them apart and every variant converts into a
//! validated [`TransactionDraft`] explicitly.

use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    month::MonthRef,
    recurrence::Recurrence,
    transaction::{
        PaymentMethod, Transaction, TransactionKind, TransactionNature, TransactionStatus,
    },
};

/// What the user is saving.
#[derive(Debug, Clone, PartialEq)]
pub enum EditingItem {
    /// An edited copy of a persisted transaction.
    Existing(Transaction),
    /// A recurrence slot shown before the generator materialized it.
    Occurrence(RecurrenceOccurrence),
    /// A new entry.
    Draft(TransactionDraft),
}

impl EditingItem {
    /// Identifier of the persisted record being edited, if any.
    pub fn existing_id(&self) -> Option<Uuid> {
        match self {
            EditingItem::Existing(txn) => Some(txn.id),
            EditingItem::Occurrence(_) | EditingItem::Draft(_) => None,
        }
    }

    pub fn into_draft(self) -> TransactionDraft {
        match self {
            EditingItem::Existing(txn) => TransactionDraft::from(txn),
            EditingItem::Occurrence(occurrence) => occurrence.into_draft(),
            EditingItem::Draft(draft) => draft,
        }
    }
}

impl From<Transaction> for EditingItem {
    fn from(txn: Transaction) -> Self {
        EditingItem::Existing(txn)
    }
}

impl From<TransactionDraft> for EditingItem {
    fn from(draft: TransactionDraft) -> Self {
        EditingItem::Draft(draft)
    }
}

impl From<RecurrenceOccurrence> for EditingItem {
    fn from(occurrence: RecurrenceOccurrence) -> Self {
        EditingItem::Occurrence(occurrence)
    }
}

/// A projected, not yet persisted, occurrence of a recurrence rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RecurrenceOccurrence {
    pub recurrence_id: Uuid,
    pub ledger_id: Uuid,
    pub kind: TransactionKind,
    pub method: PaymentMethod,
    pub card_id: Option<Uuid>,
    pub amount: Decimal,
    pub category: Option<String>,
    pub description: String,
    pub date: NaiveDate,
    /// `None` for card rules: the invoice month depends on the card.
    pub reference_month: Option<MonthRef>,
}

impl RecurrenceOccurrence {
    pub fn project(rule: &Recurrence, month: MonthRef) -> Self {
        let reference_month = match rule.method {
            PaymentMethod::Card => None,
            PaymentMethod::Pix | PaymentMethod::Boleto => Some(month),
        };
        Self {
            recurrence_id: rule.id,
            ledger_id: rule.ledger_id,
            kind: rule.kind,
            method: rule.method,
            card_id: rule.card_id,
            amount: rule.amount,
            category: rule.category.clone(),
            description: rule.description.clone(),
            date: rule.occurrence_date(month),
            reference_month,
        }
    }

    pub fn into_draft(self) -> TransactionDraft {
        TransactionDraft {
            ledger_id: self.ledger_id,
            kind: self.kind,
            method: self.method,
            status: TransactionStatus::Scheduled,
            amount: self.amount,
            date: self.date,
            reference_month: self.reference_month,
            category: self.category,
            description: self.description,
            nature: TransactionNature::Recurring,
            card_id: self.card_id,
            contract_id: None,
            recurrence_id: Some(self.recurrence_id),
            installment_count: 1,
        }
    }
}

/// Validated input for creating transactions.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionDraft {
    pub ledger_id: Uuid,
    pub kind: TransactionKind,
    pub method: PaymentMethod,
    pub status: TransactionStatus,
    pub amount: Decimal,
    pub date: NaiveDate,
    /// Resolved from the card's billing cycle (or the date) when absent.
    pub reference_month: Option<MonthRef>,
    pub category: Option<String>,
    pub description: String,
    pub nature: TransactionNature,
    pub card_id: Option<Uuid>,
    pub contract_id: Option<Uuid>,
    pub recurrence_id: Option<Uuid>,
    /// Number of installments to create; 1 for a single record.
    pub installment_count: u32,
}

impl TransactionDraft {
    pub fn new(
        ledger_id: Uuid,
        kind: TransactionKind,
        amount: Decimal,
        date: NaiveDate,
        description: impl Into<String>,
    ) -> Self {
        Self {
            ledger_id,
            kind,
            method: PaymentMethod::Pix,
            status: TransactionStatus::Scheduled,
            amount,
            date,
            reference_month: None,
            category: None,
            description: description.into(),
            nature: TransactionNature::OneOff,
            card_id: None,
            contract_id: None,
            recurrence_id: None,
            installment_count: 1,
        }
    }

    pub fn on_card(mut self, card_id: Uuid) -> Self {
        self.method = PaymentMethod::Card;
        self.card_id = Some(card_id);
        self
    }

    pub fn in_installments(mut self, count: u32) -> Self {
        self.nature = TransactionNature::Installment;
        self.installment_count = count;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Card or installment entries with more than one installment expand
    /// into a series.
    pub fn creates_series(&self) -> bool {
        self.installment_count > 1
            && (self.method == PaymentMethod::Card || self.nature == TransactionNature::Installment)
    }

    pub fn validate(&self) -> Result<(), DraftError> {
        if self.amount.is_sign_negative() && !self.amount.is_zero() {
            return Err(DraftError::NegativeAmount(self.amount));
        }
        if self.installment_count == 0 {
            return Err(DraftError::InvalidInstallmentCount(self.installment_count));
        }
        match (self.method, self.card_id) {
            (PaymentMethod::Card, None) => Err(DraftError::MissingCard),
            (PaymentMethod::Pix | PaymentMethod::Boleto, Some(_)) => Err(DraftError::UnexpectedCard),
            _ => Ok(()),
        }
    }

    /// Builds the persisted record; installment bookkeeping is applied by the
    /// caller.
    pub fn into_transaction(self, reference_month: MonthRef) -> Transaction {
        let nature = if self.creates_series() {
            TransactionNature::Installment
        } else {
            self.nature
        };
        Transaction {
            id: Uuid::new_v4(),
            ledger_id: self.ledger_id,
            kind: self.kind,
            method: self.method,
            status: self.status,
            amount: self.amount,
            date: self.date,
            reference_month,
            category: self.category,
            description: self.description,
            nature,
            card_id: self.card_id,
            contract_id: self.contract_id,
            recurrence_id: self.recurrence_id,
            installments: None,
        }
    }
}

impl From<Transaction> for TransactionDraft {
    fn from(txn: Transaction) -> Self {
        let installment_count = txn.installments.map(|info| info.total).unwrap_or(1);
        let description = txn.base_description().to_string();
        Self {
            ledger_id: txn.ledger_id,
            kind: txn.kind,
            method: txn.method,
            status: txn.status,
            amount: txn.amount,
            date: txn.date,
            reference_month: Some(txn.reference_month),
            category: txn.category,
            description,
            nature: txn.nature,
            card_id: txn.card_id,
            contract_id: txn.contract_id,
            recurrence_id: txn.recurrence_id,
            installment_count,
        }
    }
}

/// Parses user-entered money such as `1234.56`, `1234,56` or `1.234,56`.
pub fn parse_amount(raw: &str) -> Result<Decimal, DraftError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DraftError::InvalidAmount(raw.to_string()));
    }
    let normalized = match (trimmed.rfind(','), trimmed.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => trimmed.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => trimmed.replace(',', ""),
        (Some(_), None) => trimmed.replace(',', "."),
        _ => trimmed.to_string(),
    };
    let value =
        Decimal::from_str(&normalized).map_err(|_| DraftError::InvalidAmount(raw.to_string()))?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(DraftError::NegativeAmount(value));
    }
    Ok(value)
}

/// Parses a user-entered installment count; zero and non-numbers are rejected.
pub fn parse_installment_count(raw: &str) -> Result<u32, DraftError> {
    let count = raw
        .trim()
        .parse::<u32>()
        .map_err(|_| DraftError::InvalidAmount(raw.to_string()))?;
    if count == 0 {
        return Err(DraftError::InvalidInstallmentCount(count));
    }
    Ok(count)
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Input rejected before anything is persisted.
pub enum DraftError {
    InvalidAmount(String),
    NegativeAmount(Decimal),
    InvalidInstallmentCount(u32),
    MissingCard,
    UnexpectedCard,
}

impl fmt::Display for DraftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DraftError::InvalidAmount(raw) => write!(f, "`{raw}` is not a valid number"),
            DraftError::NegativeAmount(value) => write!(f, "amount {value} must not be negative"),
            DraftError::InvalidInstallmentCount(count) => {
                write!(f, "installment count must be at least 1, got {count}")
            }
            DraftError::MissingCard => f.write_str("card transactions require a card"),
            DraftError::UnexpectedCard => f.write_str("only card transactions may reference a card"),
        }
    }
}

impl std::error::Error for DraftError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_amount_accepts_common_notations() {
        assert_eq!(parse_amount("1234.56").unwrap(), Decimal::new(123456, 2));
        assert_eq!(parse_amount("1234,56").unwrap(), Decimal::new(123456, 2));
        assert_eq!(parse_amount("1.234,56").unwrap(), Decimal::new(123456, 2));
        assert_eq!(parse_amount("1,234.56").unwrap(), Decimal::new(123456, 2));
    }

    #[test]
    fn parse_amount_rejects_garbage_and_negatives() {
        assert!(matches!(parse_amount("abc"), Err(DraftError::InvalidAmount(_))));
        assert!(matches!(parse_amount(""), Err(DraftError::InvalidAmount(_))));
        assert!(matches!(parse_amount("-3"), Err(DraftError::NegativeAmount(_))));
    }

    #[test]
    fn parse_installment_count_rejects_zero() {
        assert_eq!(parse_installment_count("4").unwrap(), 4);
        assert!(parse_installment_count("0").is_err());
        assert!(parse_installment_count("two").is_err());
    }

    #[test]
    fn card_draft_requires_card() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let mut draft = TransactionDraft::new(
            Uuid::new_v4(),
            TransactionKind::Expense,
            Decimal::TEN,
            date,
            "Shoes",
        );
        draft.method = PaymentMethod::Card;
        assert_eq!(draft.validate(), Err(DraftError::MissingCard));
        let draft = draft.on_card(Uuid::new_v4());
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn existing_transaction_converts_to_draft_without_suffix() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let mut txn = Transaction::expense(Uuid::new_v4(), Decimal::TEN, date);
        txn.description = "Phone".into();
        txn.set_installment(2, 6);
        let draft = EditingItem::from(txn).into_draft();
        assert_eq!(draft.description, "Phone");
        assert_eq!(draft.installment_count, 6);
    }
}
