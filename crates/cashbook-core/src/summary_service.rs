//! Period statistics, the invoice-grouped flow view and card usage.
//!
//! Everything here is a pure function of its inputs: callers pass the
//! transactions, the card registry and a [`SummaryContext`] carrying "today",
//! the scope and the period. Nothing reads ambient state.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use cashbook_domain::{
    month::window_end, CreditCard, DebtContract, LedgerOwned, LedgerScope, MonthRef, Transaction,
    TransactionStatus, DEFAULT_CATEGORY,
};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::scope::{period_transactions, Period};

/// Look-ahead for the due-soon list, in days.
pub const DEFAULT_DUE_SOON_DAYS: i64 = 7;
const TOP_CATEGORY_COUNT: usize = 3;

#[derive(Debug, Clone)]
pub struct SummaryContext {
    pub today: NaiveDate,
    pub scope: LedgerScope,
    pub period: Period,
    pub opening_balance: Decimal,
    pub due_soon_days: i64,
    pub default_category: String,
}

impl SummaryContext {
    pub fn new(today: NaiveDate, scope: LedgerScope, period: Period) -> Self {
        Self {
            today,
            scope,
            period,
            opening_balance: Decimal::ZERO,
            due_soon_days: DEFAULT_DUE_SOON_DAYS,
            default_category: DEFAULT_CATEGORY.to_string(),
        }
    }

    pub fn with_opening_balance(mut self, opening_balance: Decimal) -> Self {
        self.opening_balance = opening_balance;
        self
    }

    pub fn with_due_soon_days(mut self, days: i64) -> Self {
        self.due_soon_days = days;
        self
    }

    pub fn with_default_category(mut self, category: impl Into<String>) -> Self {
        self.default_category = category.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTotal {
    pub category: String,
    pub total: Decimal,
}

/// Aggregates for one scope and period.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    pub opening_balance: Decimal,
    pub realized_income: Decimal,
    pub realized_expense: Decimal,
    pub projected_income: Decimal,
    pub projected_expense: Decimal,
    /// Opening balance plus what actually moved.
    pub cash_balance: Decimal,
    /// Opening balance plus everything booked, paid or not.
    pub projected_balance: Decimal,
    pub overdue: Vec<Transaction>,
    pub due_soon: Vec<Transaction>,
    pub top_categories: Vec<CategoryTotal>,
}

/// Card transactions of one card and reference month, shown as one line.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceEntry {
    pub card_id: Uuid,
    pub card_name: String,
    pub reference_month: MonthRef,
    pub amount: Decimal,
    /// The card's due day inside the reference month.
    pub date: NaiveDate,
    /// Paid once every member is paid, scheduled otherwise.
    pub status: TransactionStatus,
    pub members: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FlowEntry {
    Single(Transaction),
    Invoice(InvoiceEntry),
}

impl FlowEntry {
    pub fn date(&self) -> NaiveDate {
        match self {
            FlowEntry::Single(txn) => txn.date,
            FlowEntry::Invoice(invoice) => invoice.date,
        }
    }

    pub fn amount(&self) -> Decimal {
        match self {
            FlowEntry::Single(txn) => txn.amount,
            FlowEntry::Invoice(invoice) => invoice.amount,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            FlowEntry::Single(txn) => &txn.description,
            FlowEntry::Invoice(invoice) => &invoice.card_name,
        }
    }

    /// Status as displayed on `today`. Open single entries dated in the past
    /// read as overdue; invoices keep their stored status.
    pub fn effective_status(&self, today: NaiveDate) -> TransactionStatus {
        match self {
            FlowEntry::Single(txn) if txn.status.is_open() && txn.date < today => {
                TransactionStatus::Overdue
            }
            FlowEntry::Single(txn) => txn.status,
            FlowEntry::Invoice(invoice) => invoice.status,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowFilter {
    #[default]
    All,
    Scheduled,
    Paid,
    Overdue,
}

impl FlowFilter {
    pub fn accepts(self, entry: &FlowEntry, today: NaiveDate) -> bool {
        let status = entry.effective_status(today);
        match self {
            FlowFilter::All => true,
            FlowFilter::Scheduled => status == TransactionStatus::Scheduled,
            FlowFilter::Paid => status == TransactionStatus::Paid,
            FlowFilter::Overdue => status == TransactionStatus::Overdue,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardUsage {
    pub card_id: Uuid,
    pub used: Decimal,
    pub limit: Decimal,
    /// `limit - used`; negative when the card is over its limit.
    pub available: Decimal,
}

pub struct SummaryService;

impl SummaryService {
    pub fn statistics(
        transactions: &[Transaction],
        cards: &[CreditCard],
        ctx: &SummaryContext,
    ) -> Statistics {
        let visible = period_transactions(transactions, cards, ctx.scope, ctx.period);
        let mut stats = Statistics {
            opening_balance: ctx.opening_balance,
            ..Statistics::default()
        };
        let due_limit = window_end(ctx.today, ctx.due_soon_days);
        let mut by_category: BTreeMap<String, Decimal> = BTreeMap::new();

        for txn in visible {
            if txn.is_income() {
                if txn.is_paid() {
                    stats.realized_income += txn.amount;
                }
                stats.projected_income += txn.amount;
                continue;
            }

            if txn.is_paid() {
                stats.realized_expense += txn.amount;
            }
            // Projected totals count every status, cancelled included.
            stats.projected_expense += txn.amount;
            *by_category
                .entry(txn.category_or(&ctx.default_category).to_string())
                .or_insert(Decimal::ZERO) += txn.amount;

            if txn.status.is_open() && txn.date < ctx.today {
                stats.overdue.push(txn.clone());
            }
            if txn.status == TransactionStatus::Scheduled
                && ctx.today <= txn.date
                && txn.date <= due_limit
            {
                stats.due_soon.push(txn.clone());
            }
        }

        stats.cash_balance = ctx.opening_balance + stats.realized_income - stats.realized_expense;
        stats.projected_balance =
            ctx.opening_balance + stats.projected_income - stats.projected_expense;
        stats.overdue.sort_by_key(|txn| txn.date);
        stats.due_soon.sort_by_key(|txn| txn.date);

        let mut categories: Vec<CategoryTotal> = by_category
            .into_iter()
            .map(|(category, total)| CategoryTotal { category, total })
            .collect();
        // BTreeMap order keeps ties alphabetical under the stable sort.
        categories.sort_by(|a, b| b.total.cmp(&a.total));
        categories.truncate(TOP_CATEGORY_COUNT);
        stats.top_categories = categories;
        stats
    }

    /// Non-card transactions one by one plus one invoice per card and
    /// reference month, sorted by date and then filtered by status.
    pub fn flow(
        transactions: &[Transaction],
        cards: &[CreditCard],
        ctx: &SummaryContext,
        filter: FlowFilter,
    ) -> Vec<FlowEntry> {
        let visible = period_transactions(transactions, cards, ctx.scope, ctx.period);
        let mut entries = Vec::new();
        let mut invoices: BTreeMap<(Uuid, MonthRef), Vec<&Transaction>> = BTreeMap::new();

        for txn in visible {
            match (txn.is_card(), txn.card_id) {
                (true, Some(card_id)) => invoices
                    .entry((card_id, txn.reference_month))
                    .or_default()
                    .push(txn),
                _ => entries.push(FlowEntry::Single(txn.clone())),
            }
        }

        let cards_by_id: HashMap<Uuid, &CreditCard> =
            cards.iter().map(|card| (card.id, card)).collect();
        for ((card_id, reference_month), members) in invoices {
            let Some(card) = cards_by_id.get(&card_id) else {
                continue;
            };
            entries.push(FlowEntry::Invoice(build_invoice(card, reference_month, &members)));
        }

        entries.sort_by(|a, b| a.date().cmp(&b.date()).then_with(|| a.label().cmp(b.label())));
        entries.retain(|entry| filter.accepts(entry, ctx.today));
        entries
    }

    /// Remaining debt of active contracts on the card plus unpaid card
    /// expenses those contracts do not already cover.
    pub fn card_usage(
        card: &CreditCard,
        contracts: &[DebtContract],
        transactions: &[Transaction],
    ) -> CardUsage {
        let active: HashSet<Uuid> = contracts
            .iter()
            .filter(|contract| contract.is_active() && contract.card_id == Some(card.id))
            .map(|contract| contract.id)
            .collect();
        let contract_debt: Decimal = contracts
            .iter()
            .filter(|contract| active.contains(&contract.id))
            .map(|contract| contract.total_debt_remaining)
            .sum();
        let loose_spend: Decimal = transactions
            .iter()
            .filter(|txn| txn.card_id == Some(card.id) && txn.is_expense())
            .filter(|txn| {
                !matches!(
                    txn.status,
                    TransactionStatus::Paid | TransactionStatus::Cancelled
                )
            })
            .filter(|txn| !txn.contract_id.is_some_and(|id| active.contains(&id)))
            .map(|txn| txn.amount)
            .sum();
        let used = contract_debt + loose_spend;
        CardUsage {
            card_id: card.id,
            used,
            limit: card.limit,
            available: card.limit - used,
        }
    }

    /// Usage of every card visible in `scope`. Unclassified cards only show
    /// up in the consolidated view.
    pub fn card_usages(
        cards: &[CreditCard],
        contracts: &[DebtContract],
        transactions: &[Transaction],
        scope: LedgerScope,
    ) -> Vec<CardUsage> {
        cards
            .iter()
            .filter(|card| match scope {
                LedgerScope::Consolidated => true,
                LedgerScope::Single(ledger_id) => card.belongs_to(ledger_id),
            })
            .map(|card| Self::card_usage(card, contracts, transactions))
            .collect()
    }
}

fn build_invoice(
    card: &CreditCard,
    reference_month: MonthRef,
    members: &[&Transaction],
) -> InvoiceEntry {
    let all_paid = members.iter().all(|txn| txn.is_paid());
    InvoiceEntry {
        card_id: card.id,
        card_name: card.name.clone(),
        reference_month,
        amount: members.iter().map(|txn| txn.amount).sum(),
        date: card.due_date(reference_month),
        status: if all_paid {
            TransactionStatus::Paid
        } else {
            TransactionStatus::Scheduled
        },
        members: members.iter().map(|txn| txn.id).collect(),
    }
}
