/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ddb_loader::config::Config;
use ddb_loader::logging;
use ddb_loader::subcommand::add_column::{subcommand_add_column, AddColumnArgs};
use ddb_loader::subcommand::import::{subcommand_import, ImportArgs};
use ddb_loader::subcommand::list_attributes::{subcommand_list_attributes, ListAttributesArgs};
use ddb_loader::subcommand::recompute_tax::{subcommand_recompute_tax, RecomputeTaxArgs};
use ddb_loader::subcommand::remove_attributes::{
    subcommand_remove_attributes, RemoveAttributesArgs,
};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct GlobalArgs {
    /// TOML configuration file. Built-in defaults are used for anything it leaves out.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Rotating log file. Defaults to `import_log.txt`.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Log to stderr only.
    #[arg(long, global = true)]
    no_log_file: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Imports a CSV file into a DynamoDB table in batches of up to 25 items
    ///
    /// Rows missing a key column, or with values that cannot be converted, are logged and
    /// skipped. Items DynamoDB leaves unprocessed are resubmitted until none remain.
    Import(ImportArgs),
    /// Prints the name of every attribute found on any item of a table
    ListAttributes(ListAttributesArgs),
    /// Removes attributes from every item of a table
    RemoveAttributes(RemoveAttributesArgs),
    /// Fills in the GST and PST columns of a CSV file from each row's category and total
    RecomputeTax(RecomputeTaxArgs),
    /// Adds a column of randomly drawn category labels to a CSV file
    AddColumn(AddColumnArgs),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(cli.global.config.as_deref())?;
    if let Some(log_file) = cli.global.log_file {
        config.logging.file = Some(log_file);
    }
    // Dropping the guard flushes the log file, so it lives until `main` returns.
    let _guard =
        logging::init(&config.logging, cli.global.no_log_file).context("failed to open log file")?;

    info!("Starting script execution");
    let result = run(cli.command, config).await;
    match &result {
        Ok(()) => info!("Script execution completed"),
        Err(err) => error!("{err:#}"),
    }
    result
}

async fn run(command: Command, config: Config) -> Result<()> {
    match command {
        Command::Import(args) => {
            let summary = subcommand_import(&args, config).await?;
            println!(
                "Imported {} of {} rows ({} skipped, {} duplicate keys)",
                summary.processed,
                summary.rows_read,
                summary.skipped(),
                summary.duplicate_count()
            );
        }
        Command::ListAttributes(args) => subcommand_list_attributes(&args, config).await?,
        Command::RemoveAttributes(args) => {
            let summary = subcommand_remove_attributes(&args, config).await?;
            println!(
                "Scanned {} items, updated {}, failed {}",
                summary.scanned, summary.updated, summary.failed
            );
        }
        Command::RecomputeTax(args) => {
            let summary = subcommand_recompute_tax(&args, config)?;
            println!(
                "Updated {} of {} rows; file saved as {}",
                summary.updated,
                summary.rows,
                args.output.display()
            );
        }
        Command::AddColumn(args) => {
            let rows = subcommand_add_column(&args, config)?;
            println!(
                "Process completed. {rows} rows written to {}",
                args.output.display()
            );
        }
    }
    Ok(())
}
