/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::attributes::list_attribute_types;
use crate::config::Config;
use crate::store::{DynamoDbStore, ItemStore};
use crate::subcommand::TableArgs;
use anyhow::{Context, Result};
use std::io::{self, Write};

#[derive(clap::Args, Debug, Clone)]
pub struct ListAttributesArgs {
    #[command(flatten)]
    pub table: TableArgs,

    /// Also print the DynamoDB types each attribute was found with.
    #[arg(long)]
    pub types: bool,
}

pub async fn subcommand_list_attributes(args: &ListAttributesArgs, mut config: Config) -> Result<()> {
    args.table.apply(&mut config);
    config.validate()?;
    let store = DynamoDbStore::from_env(config.table.region.clone()).await;
    let mut stdout = io::stdout();
    list_attributes(&store, config.table_name()?, args.types, &mut stdout).await
}

async fn list_attributes<S: ItemStore>(
    store: &S,
    table: &str,
    with_types: bool,
    out: &mut impl Write,
) -> Result<()> {
    let types = list_attribute_types(store, table)
        .await
        .with_context(|| format!("failed to scan table `{table}`"))?;
    writeln!(out, "All attribute names in the table:")?;
    for (name, types) in types {
        if with_types {
            let types: Vec<_> = types.into_iter().collect();
            writeln!(out, "- {name} ({})", types.join(", "))?;
        } else {
            writeln!(out, "- {name}")?;
        }
    }
    Ok(())
}
