//! cashbook-core
//!
//! Reconciliation and recurrence services for the cashbook.
//! Depends on cashbook-domain. Persistence is reached only through [`LedgerStore`].

pub mod card_service;
pub mod debt_service;
pub mod error;
pub mod ledger_service;
pub mod opening_balance_service;
pub mod recurrence_service;
pub mod report;
pub mod scope;
pub mod series;
pub mod store;
pub mod summary_service;
pub mod time;
pub mod transaction_service;

pub use card_service::*;
pub use debt_service::*;
pub use error::CoreError;
pub use ledger_service::*;
pub use opening_balance_service::*;
pub use recurrence_service::*;
pub use report::*;
pub use scope::Period;
pub use series::resolve_series_members;
pub use store::{LedgerStore, MemoryStore};
pub use summary_service::*;
pub use time::{Clock, FixedClock, SystemClock};
pub use transaction_service::*;
