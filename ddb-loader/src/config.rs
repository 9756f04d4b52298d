/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Run configuration, loaded from an optional TOML file and then overridden from the command line.
//!
//! Every section has a default, so an empty file (or no file at all) is a valid configuration.
//!
//! ```toml
//! [table]
//! name = "receipts"
//! sort_key_type = "number"
//!
//! [import]
//! batch_size = 25
//! column_types = { page = "number", tags = "string-set" }
//!
//! [retry]
//! max_attempts = 8
//! ```

use crate::error::{invalid_config, ConfigError};
use crate::record::IdentityColumns;
use crate::retry::RetryPolicy;
use crate::synth::total_weight;
use crate::tax::{TaxRates, TaxRule};
use ddb_loader_core::{ColumnType, KeyType};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Largest number of items DynamoDB accepts in one `BatchWriteItem` call.
pub const MAX_BATCH_SIZE: usize = 25;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub table: TableConfig,
    pub import: ImportConfig,
    pub retry: RetryConfig,
    pub logging: LoggingConfig,
    pub tax: TaxConfig,
    pub category_column: CategoryColumnConfig,
}

impl Config {
    /// Reads `path`, or returns the defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let Some(path) = path else {
            return Ok(Config::default());
        };
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.into(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.into(),
            source,
        })
    }

    /// Checks the constraints serde cannot express. Call after applying command line overrides.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_BATCH_SIZE).contains(&self.import.batch_size) {
            return Err(invalid_config(format!(
                "batch size must be between 1 and {MAX_BATCH_SIZE}, got {}",
                self.import.batch_size
            )));
        }
        if self.table.partition_key.is_empty() || self.table.sort_key.is_empty() {
            return Err(invalid_config("key column names must not be empty"));
        }
        if self.table.partition_key == self.table.sort_key {
            return Err(invalid_config(format!(
                "partition and sort key are both `{}`",
                self.table.partition_key
            )));
        }
        for (column, key_type) in [
            (&self.table.partition_key, self.table.partition_key_type),
            (&self.table.sort_key, self.table.sort_key_type),
        ] {
            match self.import.column_types.get(column) {
                Some(hint) if *hint != key_type.column_type() => {
                    return Err(invalid_config(format!(
                        "key column `{column}` is typed {hint} in import.column_types but the \
                         table declares it as {key_type}"
                    )));
                }
                _ => {}
            }
        }
        if !self.import.delimiter.is_ascii() {
            return Err(invalid_config(format!(
                "delimiter `{}` is not a single-byte character",
                self.import.delimiter
            )));
        }
        if self.retry.max_attempts == Some(0) {
            return Err(invalid_config("retry max_attempts must be at least 1"));
        }
        if self.logging.max_bytes == 0 || self.logging.backups == 0 {
            return Err(invalid_config(
                "logging max_bytes and backups must both be at least 1",
            ));
        }
        self.category_column.validate()
    }

    /// The table name, which has no default and must come from the file or the command line.
    pub fn table_name(&self) -> Result<&str, ConfigError> {
        self.table
            .name
            .as_deref()
            .ok_or_else(|| invalid_config("no table name given (set `table.name` or pass --table)"))
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct TableConfig {
    pub name: Option<String>,
    pub partition_key: String,
    pub sort_key: String,
    /// Key attribute types of the table. Key cells are always converted to these.
    pub partition_key_type: KeyType,
    pub sort_key_type: KeyType,
    /// Region override; otherwise the default AWS configuration chain decides.
    pub region: Option<String>,
}

impl TableConfig {
    pub fn identity_columns(&self) -> IdentityColumns {
        IdentityColumns::new(&self.partition_key, &self.sort_key)
            .with_types(self.partition_key_type, self.sort_key_type)
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            name: None,
            partition_key: "project".into(),
            sort_key: "page".into(),
            partition_key_type: KeyType::String,
            sort_key_type: KeyType::Number,
            region: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ImportConfig {
    pub batch_size: usize,
    pub delimiter: char,
    /// Count the table's items after the import.
    pub verify: bool,
    /// Explicit types for columns whose text should not be inferred.
    pub column_types: HashMap<String, ColumnType>,
}

impl ImportConfig {
    pub fn delimiter_byte(&self) -> u8 {
        // `Config::validate` rejects non-ASCII delimiters.
        self.delimiter as u8
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: MAX_BATCH_SIZE,
            delimiter: ',',
            verify: true,
            column_types: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    /// Submissions per batch, the first one included. Unset means no limit.
    pub max_attempts: Option<u32>,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.initial_backoff_ms),
            Duration::from_millis(self.max_backoff_ms),
        )
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: None,
            initial_backoff_ms: 100,
            max_backoff_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log file path. `None` disables the file sink.
    pub file: Option<PathBuf>,
    /// Size past which the log file is rotated.
    pub max_bytes: u64,
    /// Rotated files kept next to the active one, as `<file>.1` (newest) to `<file>.N`.
    pub backups: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: Some(PathBuf::from("import_log.txt")),
            max_bytes: 5 * 1024 * 1024,
            backups: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TaxConfig {
    pub category_column: String,
    pub total_column: String,
    pub gst_column: String,
    pub pst_column: String,
    pub rates: TaxRates,
    /// Category name to rule. Categories not listed use `default_rule`.
    pub rules: BTreeMap<String, TaxRule>,
    pub default_rule: TaxRule,
}

impl TaxConfig {
    pub fn rule_for(&self, category: &str) -> TaxRule {
        self.rules
            .get(category)
            .copied()
            .unwrap_or(self.default_rule)
    }
}

impl Default for TaxConfig {
    fn default() -> Self {
        let full_hst = ["Entertainment", "Other", "Motor-Vehicle-Expenses", "Restaurants"]
            .into_iter()
            .map(|category| (category.to_owned(), TaxRule::FullHst));
        let gst_only = ["Utilities", "Groceries"]
            .into_iter()
            .map(|category| (category.to_owned(), TaxRule::GstOnly));
        Self {
            category_column: "VENDOR_NAME".into(),
            total_column: "TOTAL".into(),
            gst_column: "gst".into(),
            pst_column: "pst".into(),
            rates: TaxRates::default(),
            rules: full_hst.chain(gst_only).collect(),
            default_rule: TaxRule::PstOnly,
        }
    }
}

/// One value of a synthesized column and its relative weight.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct WeightedLabel {
    pub label: String,
    pub weight: f64,
}

impl WeightedLabel {
    pub fn new(label: impl Into<String>, weight: f64) -> Self {
        Self {
            label: label.into(),
            weight,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CategoryColumnConfig {
    pub column: String,
    pub choices: Vec<WeightedLabel>,
}

impl CategoryColumnConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.column.is_empty() {
            return Err(invalid_config("category column name must not be empty"));
        }
        total_weight(&self.choices)?;
        Ok(())
    }
}

impl Default for CategoryColumnConfig {
    fn default() -> Self {
        Self {
            column: "PAYMENT_TYPE".into(),
            choices: vec![
                WeightedLabel::new("Mastercard", 0.20),
                WeightedLabel::new("Debit", 0.50),
                WeightedLabel::new("Cash", 0.25),
                WeightedLabel::new("Cheque", 0.05),
            ],
        }
    }
}
