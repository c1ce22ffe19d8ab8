#![doc(test(attr(deny(warnings))))]

//! Cashbook keeps personal and business ledgers reconciled: it materializes
//! recurring transactions, rolls opening balances forward month to month,
//! aggregates statistics and the invoice-grouped cash flow, and keeps debt
//! contracts in step with the payments made against them.
//!
//! The services live in `cashbook-core`; this crate wires them to a store,
//! a clock and the user's configuration.

pub mod engine;
pub mod errors;
pub mod utils;

pub use cashbook_config as config;
pub use cashbook_core as core;
pub use cashbook_domain as domain;
pub use cashbook_storage_json as storage;

pub use engine::{Cashbook, Dashboard};
pub use errors::CashbookError;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Cashbook tracing initialized.");
    });
}
