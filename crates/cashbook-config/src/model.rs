use std::path::PathBuf;

use cashbook_domain::MonthRef;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Engine settings shared by every ledger of a cashbook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Months up to and including this one are seeded by hand; the opening
    /// balance roller leaves them alone.
    #[serde(default = "Config::default_min_supported_month")]
    pub min_supported_month: MonthRef,
    #[serde(default = "Config::default_generation_horizon_months")]
    pub generation_horizon_months: u32,
    #[serde(default = "Config::default_due_soon_days")]
    pub due_soon_days: u32,
    #[serde(default = "Config::default_category_value")]
    pub default_category: String,
    #[serde(default = "Config::default_backup_retention")]
    pub backup_retention: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Optional custom root directory for the data file. Defaults to `~/Documents/Cashbook`.
    pub data_root: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_supported_month: Self::default_min_supported_month(),
            generation_horizon_months: Self::default_generation_horizon_months(),
            due_soon_days: Self::default_due_soon_days(),
            default_category: Self::default_category_value(),
            backup_retention: Self::default_backup_retention(),
            data_root: None,
        }
    }
}

impl Config {
    pub fn default_min_supported_month() -> MonthRef {
        MonthRef::from_date(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default())
    }

    pub fn default_generation_horizon_months() -> u32 {
        2
    }

    pub fn default_due_soon_days() -> u32 {
        7
    }

    pub fn default_category_value() -> String {
        "general".into()
    }

    pub fn default_backup_retention() -> usize {
        5
    }

    pub fn resolve_data_root(&self) -> PathBuf {
        if let Some(path) = &self.data_root {
            return path.clone();
        }

        let base = dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        base.join("Cashbook")
    }

    /// Rejects values the engine cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generation_horizon_months == 0 {
            return Err(ConfigError::Invalid(
                "generation_horizon_months must be at least 1".into(),
            ));
        }
        if self.backup_retention == 0 {
            return Err(ConfigError::Invalid(
                "backup_retention must be at least 1".into(),
            ));
        }
        if self.default_category.trim().is_empty() {
            return Err(ConfigError::Invalid("default_category must not be empty".into()));
        }
        Ok(())
    }
}
