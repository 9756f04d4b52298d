/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::config::Config;
use crate::import::{ImportSettings, Importer};
use crate::store::{DynamoDbStore, MemoryStore};
use crate::subcommand::TableArgs;
use crate::summary::RunSummary;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

#[derive(clap::Args, Debug, Clone)]
pub struct ImportArgs {
    /// CSV file to import. The first row must name the columns.
    pub input: PathBuf,

    #[command(flatten)]
    pub table: TableArgs,

    /// Stop after this many data rows.
    #[arg(long)]
    pub limit: Option<u64>,

    /// Items per batch write, at most 25.
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Field delimiter of the input file.
    #[arg(long)]
    pub delimiter: Option<char>,

    /// Give up on a batch after this many submissions. Unlimited by default.
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Skip counting the table's items after the import.
    #[arg(long)]
    pub no_verify: bool,

    /// Write to an in-memory table instead of DynamoDB.
    #[arg(long)]
    pub dry_run: bool,
}

impl ImportArgs {
    fn apply(&self, config: &mut Config) {
        self.table.apply(config);
        if let Some(batch_size) = self.batch_size {
            config.import.batch_size = batch_size;
        }
        if let Some(delimiter) = self.delimiter {
            config.import.delimiter = delimiter;
        }
        if let Some(max_attempts) = self.max_attempts {
            config.retry.max_attempts = Some(max_attempts);
        }
        if self.no_verify {
            config.import.verify = false;
        }
    }
}

pub async fn subcommand_import(args: &ImportArgs, mut config: Config) -> Result<RunSummary> {
    args.apply(&mut config);
    let settings = ImportSettings::from_config(&config)?;
    let result = if args.dry_run {
        info!("Dry run: items are written to an in-memory table");
        let store = MemoryStore::for_key(config.table.identity_columns());
        Importer::new(&store, settings)
            .import_file(&args.input, args.limit)
            .await
    } else {
        let store = DynamoDbStore::from_env(config.table.region.clone()).await;
        Importer::new(&store, settings)
            .import_file(&args.input, args.limit)
            .await
    };
    result.with_context(|| format!("failed to import {}", args.input.display()))
}
