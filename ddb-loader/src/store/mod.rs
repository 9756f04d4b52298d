/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! The table operations the tools need, behind a trait so a run can target DynamoDB or an
//! in-process table.

use crate::error::StoreError;
use async_trait::async_trait;
use ddb_loader_core::{CompositeKey, Item};

mod dynamodb;
mod memory;

pub use self::dynamodb::{removal_expression, DynamoDbStore};
pub use self::memory::{MemoryStore, WriteCall};

/// One page of a full-table scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanPage {
    pub items: Vec<Item>,
    /// Where the next page starts. `None` once the table is exhausted.
    pub last_evaluated_key: Option<Item>,
}

#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Puts up to 25 items in one request and returns the ones the table left unprocessed.
    ///
    /// An `Err` means the request was rejected as a whole and nothing can be assumed written.
    async fn batch_put(&self, table: &str, items: Vec<Item>) -> Result<Vec<Item>, StoreError>;

    /// Counts every item with strongly consistent reads.
    async fn count_items(&self, table: &str) -> Result<u64, StoreError>;

    /// Reads one page of items, starting after `exclusive_start_key`.
    async fn scan_page(
        &self,
        table: &str,
        exclusive_start_key: Option<Item>,
    ) -> Result<ScanPage, StoreError>;

    /// Removes `attributes` from the item at `key`, returning the item as it was before.
    async fn remove_attributes(
        &self,
        table: &str,
        key: &CompositeKey,
        attributes: &[String],
    ) -> Result<Option<Item>, StoreError>;
}
