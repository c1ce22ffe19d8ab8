//! cashbook-domain
//!
//! Pure domain models (Ledger, CreditCard, Transaction, Recurrence, DebtContract,
//! OpeningBalance). No I/O, no storage. Only data types, core enums and the
//! calendar arithmetic they share.

pub mod card;
pub mod common;
pub mod debt;
pub mod editing;
pub mod ledger;
pub mod month;
pub mod opening_balance;
pub mod recurrence;
pub mod snapshot;
pub mod transaction;

pub use card::*;
pub use common::*;
pub use debt::*;
pub use editing::*;
pub use ledger::*;
pub use month::*;
pub use opening_balance::*;
pub use recurrence::*;
pub use snapshot::*;
pub use transaction::*;
