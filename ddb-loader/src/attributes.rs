/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Table-wide attribute maintenance: discovering attribute names and removing attributes.

use crate::error::StoreError;
use crate::record::IdentityColumns;
use crate::store::ItemStore;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use ddb_loader_core::{type_name, CompositeKey, Item};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, error, info};

/// Scans the whole table and returns every attribute name found on any item, sorted.
pub async fn list_attribute_names<S: ItemStore>(
    store: &S,
    table: &str,
) -> Result<Vec<String>, StoreError> {
    Ok(list_attribute_types(store, table).await?.into_keys().collect())
}

/// Scans the whole table and returns, per attribute name, the DynamoDB types it was stored as.
pub async fn list_attribute_types<S: ItemStore>(
    store: &S,
    table: &str,
) -> Result<BTreeMap<String, BTreeSet<&'static str>>, StoreError> {
    let mut types: BTreeMap<String, BTreeSet<&'static str>> = BTreeMap::new();
    let mut start = None;
    let mut pages = 0u32;
    loop {
        let page = store.scan_page(table, start).await?;
        pages += 1;
        for item in &page.items {
            for (name, value) in item {
                types
                    .entry(name.clone())
                    .or_default()
                    .insert(type_name(value));
            }
        }
        match page.last_evaluated_key {
            Some(key) => start = Some(key),
            None => break,
        }
    }
    debug!(pages, attributes = types.len(), "scanned {table}");
    Ok(types)
}

/// Outcome of [`remove_attributes`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemovalSummary {
    pub scanned: u64,
    pub updated: u64,
    pub failed: u64,
}

/// Removes `attributes` from every item holding at least one of them.
///
/// Each affected item gets one update that removes only the attributes it holds. A failed update
/// is logged and the scan carries on; a failed scan ends the operation. With `dry_run` the
/// removals are logged but not made.
pub async fn remove_attributes<S: ItemStore>(
    store: &S,
    table: &str,
    identity: &IdentityColumns,
    attributes: &[String],
    dry_run: bool,
) -> Result<RemovalSummary, StoreError> {
    let mut summary = RemovalSummary::default();
    let mut start = None;
    loop {
        let page = store.scan_page(table, start).await?;
        for item in &page.items {
            summary.scanned += 1;
            let present: Vec<String> = attributes
                .iter()
                .filter(|name| item.contains_key(*name))
                .cloned()
                .collect();
            if present.is_empty() {
                continue;
            }
            let key = match CompositeKey::from_item(item, &identity.partition, &identity.sort) {
                Ok(key) => key,
                Err(err) => {
                    summary.failed += 1;
                    error!("Cannot address item to delete columns {present:?}: {err}");
                    continue;
                }
            };
            if dry_run {
                info!("Would delete columns {present:?} from item with {key}");
                summary.updated += 1;
                continue;
            }
            match store.remove_attributes(table, &key, &present).await {
                Ok(old) => {
                    summary.updated += 1;
                    info!("Deleted columns {present:?} from item with {key}");
                    log_old_values(old.as_ref(), &present);
                }
                Err(err) => {
                    summary.failed += 1;
                    error!(
                        "Error deleting columns from item with {key}: {}",
                        DisplayErrorContext(&err)
                    );
                }
            }
        }
        match page.last_evaluated_key {
            Some(key) => start = Some(key),
            None => break,
        }
    }
    info!(
        scanned = summary.scanned,
        updated = summary.updated,
        failed = summary.failed,
        "Finished processing all items in the table."
    );
    Ok(summary)
}

fn log_old_values(old: Option<&Item>, removed: &[String]) {
    let Some(old) = old else {
        return;
    };
    for name in removed {
        if let Some(value) = old.get(name) {
            info!("Deleted column '{name}' had value: {value:?}");
        }
    }
}
