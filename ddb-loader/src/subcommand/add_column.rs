/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::config::Config;
use crate::synth::{add_column_file, CategorySampler};
use anyhow::{Context, Result};
use std::path::PathBuf;

#[derive(clap::Args, Debug, Clone)]
pub struct AddColumnArgs {
    /// CSV file to extend.
    pub input: PathBuf,

    /// Where to write the extended file.
    #[arg(long)]
    pub output: PathBuf,

    /// Name of the new column. Defaults to `PAYMENT_TYPE`.
    #[arg(long)]
    pub column: Option<String>,

    /// Seed for reproducible output.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Field delimiter of the input and output files.
    #[arg(long)]
    pub delimiter: Option<char>,
}

pub fn subcommand_add_column(args: &AddColumnArgs, mut config: Config) -> Result<u64> {
    if let Some(column) = &args.column {
        config.category_column.column = column.clone();
    }
    if let Some(delimiter) = args.delimiter {
        config.import.delimiter = delimiter;
    }
    config.validate()?;
    let mut sampler = CategorySampler::new(&config.category_column.choices, args.seed)?;
    add_column_file(
        &config.category_column,
        &mut sampler,
        config.import.delimiter_byte(),
        &args.input,
        &args.output,
    )
    .with_context(|| format!("failed to add a column to {}", args.input.display()))
}
