use std::sync::Arc;

use cashbook_config::Config;
use cashbook_core::{
    BatchReport, CardUsage, Clock, CoreError, DebtService, DeleteScope, EditScope, FlowEntry,
    FlowFilter, GenerationReport, LedgerStore, OpeningBalanceService, Period,
    RecurrenceGenerator, RolloverOutcome, SaveOutcome, Statistics, SummaryContext,
    SummaryService, SystemClock, ToggleOutcome, TransactionService,
};
use cashbook_domain::{EditingItem, LedgerData, LedgerScope, MonthRef, Transaction};
use cashbook_storage_json::{JsonLedgerStore, StoragePaths};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, info};
use uuid::Uuid;

use crate::CashbookError;

/// Everything a ledger/month view shows, computed in one pass.
#[derive(Debug, Clone)]
pub struct Dashboard {
    pub scope: LedgerScope,
    pub month: MonthRef,
    pub generation: GenerationReport,
    /// Roller outcome per ledger in scope.
    pub openings: Vec<(Uuid, RolloverOutcome)>,
    pub statistics: Statistics,
    pub flow: Vec<FlowEntry>,
    pub card_usage: Vec<CardUsage>,
}

/// Store, clock and configuration wired to the reconciliation services.
pub struct Cashbook {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    config: Config,
    generator: RecurrenceGenerator,
}

impl Cashbook {
    pub fn new(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>, config: Config) -> Self {
        let generator = RecurrenceGenerator::new(config.generation_horizon_months);
        Self {
            store,
            clock,
            config,
            generator,
        }
    }

    /// Opens the JSON cashbook under the configured data root with the wall clock.
    pub fn open(config: Config) -> Result<Self, CashbookError> {
        config.validate()?;
        let root = config.resolve_data_root();
        let store = JsonLedgerStore::open_named(
            StoragePaths::under(&root),
            "cashbook",
            config.backup_retention,
        )?;
        info!(root = %root.display(), "cashbook opened");
        Ok(Self::new(Arc::new(store), Arc::new(SystemClock), config))
    }

    pub fn store(&self) -> &dyn LedgerStore {
        self.store.as_ref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Brings the books up to date and aggregates the view of `month`.
    ///
    /// Runs the recurrence generator, makes sure every ledger in scope has an
    /// opening balance for `month`, then computes statistics, the flow list
    /// and card usage from one snapshot.
    pub fn refresh(
        &self,
        scope: LedgerScope,
        month: MonthRef,
        filter: FlowFilter,
    ) -> Result<Dashboard, CashbookError> {
        let today = self.today();
        let generation = self.generator.run(self.store(), today)?;

        let mut openings = Vec::new();
        let mut opening_total = Decimal::ZERO;
        for ledger in self.store.ledgers()? {
            if !scope.includes(ledger.id) {
                continue;
            }
            let outcome = OpeningBalanceService::ensure(
                self.store(),
                ledger.id,
                month,
                self.config.min_supported_month,
            )?;
            opening_total += match outcome.balance() {
                Some(balance) => balance.amount,
                None => OpeningBalanceService::opening_balance(self.store(), ledger.id, month)?
                    .map(|balance| balance.amount)
                    .unwrap_or(Decimal::ZERO),
            };
            openings.push((ledger.id, outcome));
        }

        let data = self.store.snapshot()?;
        let ctx = SummaryContext::new(today, scope, Period::month(month))
            .with_opening_balance(opening_total)
            .with_due_soon_days(i64::from(self.config.due_soon_days))
            .with_default_category(self.config.default_category.clone());
        let statistics = SummaryService::statistics(&data.transactions, &data.cards, &ctx);
        let flow = SummaryService::flow(&data.transactions, &data.cards, &ctx, filter);
        let card_usage =
            SummaryService::card_usages(&data.cards, &data.contracts, &data.transactions, scope);
        debug!(%month, entries = flow.len(), "dashboard refreshed");

        Ok(Dashboard {
            scope,
            month,
            generation,
            openings,
            statistics,
            flow,
            card_usage,
        })
    }

    pub fn save(&self, item: EditingItem) -> Result<SaveOutcome, CashbookError> {
        Ok(TransactionService::save(self.store(), item)?)
    }

    pub fn edit(&self, edited: Transaction, scope: EditScope) -> Result<BatchReport, CashbookError> {
        Ok(TransactionService::update_scoped(self.store(), edited, scope)?)
    }

    pub fn delete(&self, txn_id: Uuid, scope: DeleteScope) -> Result<BatchReport, CashbookError> {
        Ok(TransactionService::delete_scoped(self.store(), txn_id, scope)?)
    }

    pub fn toggle_paid(&self, txn_id: Uuid) -> Result<ToggleOutcome, CashbookError> {
        Ok(DebtService::toggle_paid(self.store(), txn_id)?)
    }

    /// Serializes every record of the cashbook.
    pub fn export_json(&self) -> Result<String, CashbookError> {
        Ok(serde_json::to_string_pretty(&self.store.snapshot()?)?)
    }

    /// Replaces the whole cashbook with a previously exported snapshot.
    pub fn import_json(&self, raw: &str) -> Result<(), CashbookError> {
        let incoming: LedgerData = serde_json::from_str(raw)?;
        if incoming.schema_version > cashbook_domain::SNAPSHOT_SCHEMA_VERSION {
            return Err(CoreError::InvalidOperation(format!(
                "snapshot schema {} is newer than supported {}",
                incoming.schema_version,
                cashbook_domain::SNAPSHOT_SCHEMA_VERSION
            ))
            .into());
        }
        let mut slot = Some(incoming);
        self.store.write(&mut |data| {
            if let Some(incoming) = slot.take() {
                *data = incoming;
            }
            Ok(())
        })?;
        info!("cashbook imported");
        Ok(())
    }
}
