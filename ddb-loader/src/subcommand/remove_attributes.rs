/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::attributes::{remove_attributes, RemovalSummary};
use crate::config::Config;
use crate::store::DynamoDbStore;
use crate::subcommand::TableArgs;
use anyhow::{bail, Context, Result};
use tracing::{info, warn};

#[derive(clap::Args, Debug, Clone)]
pub struct RemoveAttributesArgs {
    /// Attributes to remove from every item.
    #[arg(required = true)]
    pub attributes: Vec<String>,

    #[command(flatten)]
    pub table: TableArgs,

    /// Log what would be removed without changing the table.
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn subcommand_remove_attributes(
    args: &RemoveAttributesArgs,
    mut config: Config,
) -> Result<RemovalSummary> {
    args.table.apply(&mut config);
    config.validate()?;
    let table = config.table_name()?;
    let identity = config.table.identity_columns();
    if let Some(key) = args
        .attributes
        .iter()
        .find(|name| **name == identity.partition || **name == identity.sort)
    {
        bail!("`{key}` is part of the primary key and cannot be removed");
    }

    let store = DynamoDbStore::from_env(config.table.region.clone()).await;
    let summary = remove_attributes(&store, table, &identity, &args.attributes, args.dry_run)
        .await
        .with_context(|| format!("failed to scan table `{table}`"))?;
    if summary.failed > 0 {
        warn!("{} items could not be updated", summary.failed);
    }
    info!("Operation completed successfully.");
    Ok(summary)
}
