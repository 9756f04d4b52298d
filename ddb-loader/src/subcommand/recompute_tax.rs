/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::config::Config;
use crate::tax::{recompute_file, TaxSummary};
use anyhow::{Context, Result};
use std::path::PathBuf;

#[derive(clap::Args, Debug, Clone)]
pub struct RecomputeTaxArgs {
    /// CSV file with category and tax-inclusive total columns.
    pub input: PathBuf,

    /// Where to write the updated file.
    #[arg(long)]
    pub output: PathBuf,

    /// Column holding the category. Defaults to `VENDOR_NAME`.
    #[arg(long)]
    pub category_column: Option<String>,

    /// Column holding the tax-inclusive total. Defaults to `TOTAL`.
    #[arg(long)]
    pub total_column: Option<String>,

    /// Field delimiter of the input and output files.
    #[arg(long)]
    pub delimiter: Option<char>,
}

pub fn subcommand_recompute_tax(args: &RecomputeTaxArgs, mut config: Config) -> Result<TaxSummary> {
    if let Some(column) = &args.category_column {
        config.tax.category_column = column.clone();
    }
    if let Some(column) = &args.total_column {
        config.tax.total_column = column.clone();
    }
    if let Some(delimiter) = args.delimiter {
        config.import.delimiter = delimiter;
    }
    config.validate()?;
    recompute_file(
        &config.tax,
        config.import.delimiter_byte(),
        &args.input,
        &args.output,
    )
    .with_context(|| format!("failed to recompute taxes in {}", args.input.display()))
}
