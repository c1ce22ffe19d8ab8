//! cashbook-config
//!
//! Engine settings (launch month, generation horizon, due-soon window, data
//! location) and their persistence on disk.

pub mod error;
pub mod manager;
pub mod model;

pub use error::ConfigError;
pub use manager::ConfigManager;
pub use model::Config;
