/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::config::Config;
use ddb_loader_core::KeyType;

pub mod add_column;
pub mod import;
pub mod list_attributes;
pub mod recompute_tax;
pub mod remove_attributes;

/// Table addressing options shared by the subcommands that talk to DynamoDB.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct TableArgs {
    /// Name of the DynamoDB table. Overrides `table.name` from the config file.
    #[arg(long)]
    pub table: Option<String>,
    /// Partition key column. Defaults to `project`.
    #[arg(long)]
    pub partition_key: Option<String>,
    /// Sort key column. Defaults to `page`.
    #[arg(long)]
    pub sort_key: Option<String>,
    /// Type of the partition key: `string`, `number` or `binary`. Defaults to `string`.
    #[arg(long, value_parser = parse_key_type)]
    pub partition_key_type: Option<KeyType>,
    /// Type of the sort key: `string`, `number` or `binary`. Defaults to `number`.
    #[arg(long, value_parser = parse_key_type)]
    pub sort_key_type: Option<KeyType>,
    /// AWS region. Defaults to the region from the AWS configuration chain.
    #[arg(long)]
    pub region: Option<String>,
}

impl TableArgs {
    pub fn apply(&self, config: &mut Config) {
        let table = &mut config.table;
        if let Some(name) = &self.table {
            table.name = Some(name.clone());
        }
        if let Some(partition_key) = &self.partition_key {
            table.partition_key = partition_key.clone();
        }
        if let Some(sort_key) = &self.sort_key {
            table.sort_key = sort_key.clone();
        }
        if let Some(key_type) = self.partition_key_type {
            table.partition_key_type = key_type;
        }
        if let Some(key_type) = self.sort_key_type {
            table.sort_key_type = key_type;
        }
        if let Some(region) = &self.region {
            table.region = Some(region.clone());
        }
    }
}

fn parse_key_type(value: &str) -> Result<KeyType, String> {
    match value {
        "string" => Ok(KeyType::String),
        "number" => Ok(KeyType::Number),
        "binary" => Ok(KeyType::Binary),
        other => Err(format!(
            "`{other}` is not a key type (expected string, number or binary)"
        )),
    }
}
