/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use super::{ItemStore, ScanPage};
use crate::config::MAX_BATCH_SIZE;
use crate::error::StoreError;
use crate::record::{Identity, IdentityColumns};
use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use ddb_loader_core::{CompositeKey, Item, KeyType};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A batch write as the store received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteCall {
    pub table: String,
    pub items: usize,
}

/// An in-process table, used for dry runs and tests.
///
/// Keys are compared the way DynamoDB compares them, numbers by value. Requests DynamoDB would
/// reject (oversized or empty batches, items without key attributes or with key attributes of the
/// wrong type, the same key twice in one batch) are rejected here too. Partial failures can be scripted:
/// [`leave_unprocessed`](Self::leave_unprocessed) makes successive batch writes hand back their
/// last `n` items instead of storing them, which is how DynamoDB reports throttling.
#[derive(Debug)]
pub struct MemoryStore {
    key: IdentityColumns,
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    tables: HashMap<String, BTreeMap<Identity, Item>>,
    page_size: Option<usize>,
    unprocessed: VecDeque<usize>,
    write_failures: HashMap<usize, String>,
    update_failures: HashMap<usize, String>,
    count_failure: Option<String>,
    write_calls: Vec<WriteCall>,
    update_calls: usize,
}

impl MemoryStore {
    /// A table keyed by a string partition key and a number sort key.
    pub fn new(partition_key: impl Into<String>, sort_key: impl Into<String>) -> Self {
        Self::for_key(IdentityColumns::new(partition_key, sort_key))
    }

    pub fn for_key(key: IdentityColumns) -> Self {
        Self {
            key,
            state: Mutex::new(State::default()),
        }
    }

    pub fn with_key_types(mut self, partition_type: KeyType, sort_type: KeyType) -> Self {
        self.key = self.key.with_types(partition_type, sort_type);
        self
    }

    /// Limits the number of items returned per scan page.
    pub fn with_page_size(self, page_size: usize) -> Self {
        self.state().page_size = Some(page_size.max(1));
        self
    }

    /// Successive batch writes leave this many of their items unprocessed.
    pub fn leave_unprocessed(self, counts: impl IntoIterator<Item = usize>) -> Self {
        self.state().unprocessed.extend(counts);
        self
    }

    /// The batch write with this 0-based call index is rejected as a whole.
    pub fn fail_write_call(self, index: usize, message: impl Into<String>) -> Self {
        self.state().write_failures.insert(index, message.into());
        self
    }

    /// The update with this 0-based call index fails.
    pub fn fail_update_call(self, index: usize, message: impl Into<String>) -> Self {
        self.state().update_failures.insert(index, message.into());
        self
    }

    /// Every count fails.
    pub fn fail_counts(self, message: impl Into<String>) -> Self {
        self.state().count_failure = Some(message.into());
        self
    }

    /// Stores an item directly, bypassing scripted failures.
    pub fn put(&self, table: &str, item: Item) -> Result<(), StoreError> {
        let key = self.key_of(&item)?;
        self.state()
            .tables
            .entry(table.to_owned())
            .or_default()
            .insert(key, item);
        Ok(())
    }

    pub fn get(
        &self,
        table: &str,
        partition: &AttributeValue,
        sort: &AttributeValue,
    ) -> Option<Item> {
        let key = self
            .key_of(&Item::from([
                (self.key.partition.clone(), partition.clone()),
                (self.key.sort.clone(), sort.clone()),
            ]))
            .ok()?;
        self.state().tables.get(table)?.get(&key).cloned()
    }

    /// All items of `table`, in scan order.
    pub fn items(&self, table: &str) -> Vec<Item> {
        self.state()
            .tables
            .get(table)
            .map(|items| items.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self, table: &str) -> usize {
        self.state().tables.get(table).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self, table: &str) -> bool {
        self.len(table) == 0
    }

    /// Every batch write received so far, failed ones included.
    pub fn write_calls(&self) -> Vec<WriteCall> {
        self.state().write_calls.clone()
    }

    pub fn update_calls(&self) -> usize {
        self.state().update_calls
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn key_of(&self, item: &Item) -> Result<Identity, StoreError> {
        self.key.identity_of(item).map_err(|err| {
            StoreError::Rejected(format!(
                "one or more parameter values were invalid: {err}"
            ))
        })
    }

    fn key_attributes(&self, item: &Item) -> Item {
        item.iter()
            .filter(|(name, _)| **name == self.key.partition || **name == self.key.sort)
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn batch_put(&self, table: &str, items: Vec<Item>) -> Result<Vec<Item>, StoreError> {
        let mut state = self.state();
        let call = state.write_calls.len();
        state.write_calls.push(WriteCall {
            table: table.to_owned(),
            items: items.len(),
        });
        if let Some(message) = state.write_failures.remove(&call) {
            return Err(StoreError::Rejected(message));
        }
        if items.is_empty() || items.len() > MAX_BATCH_SIZE {
            return Err(StoreError::Rejected(format!(
                "batch of {} items is outside 1..={MAX_BATCH_SIZE}",
                items.len()
            )));
        }
        let mut keyed = Vec::with_capacity(items.len());
        let mut seen = HashSet::new();
        for item in items {
            let key = self.key_of(&item)?;
            if !seen.insert(key.clone()) {
                return Err(StoreError::Rejected(
                    "provided list of item keys contains duplicates".into(),
                ));
            }
            keyed.push((key, item));
        }

        let left = state.unprocessed.pop_front().unwrap_or(0).min(keyed.len());
        let unprocessed = keyed
            .split_off(keyed.len() - left)
            .into_iter()
            .map(|(_, item)| item)
            .collect();
        state
            .tables
            .entry(table.to_owned())
            .or_default()
            .extend(keyed);
        Ok(unprocessed)
    }

    async fn count_items(&self, table: &str) -> Result<u64, StoreError> {
        let state = self.state();
        if let Some(message) = &state.count_failure {
            return Err(StoreError::Rejected(message.clone()));
        }
        Ok(state.tables.get(table).map_or(0, BTreeMap::len) as u64)
    }

    async fn scan_page(
        &self,
        table: &str,
        exclusive_start_key: Option<Item>,
    ) -> Result<ScanPage, StoreError> {
        let start = exclusive_start_key
            .map(|key| self.key_of(&key))
            .transpose()?;
        let state = self.state();
        let Some(items) = state.tables.get(table) else {
            return Ok(ScanPage::default());
        };
        let page_size = state.page_size.unwrap_or(usize::MAX);
        let mut remaining = items
            .iter()
            .filter(|(key, _)| start.as_ref().map_or(true, |start| *key > start))
            .map(|(_, item)| item)
            .peekable();
        let page: Vec<Item> = remaining.by_ref().take(page_size).cloned().collect();
        let last_evaluated_key = match (remaining.peek(), page.last()) {
            (Some(_), Some(last)) => Some(self.key_attributes(last)),
            _ => None,
        };
        Ok(ScanPage {
            items: page,
            last_evaluated_key,
        })
    }

    /// Unlike DynamoDB, a missing item is not created.
    async fn remove_attributes(
        &self,
        table: &str,
        key: &CompositeKey,
        attributes: &[String],
    ) -> Result<Option<Item>, StoreError> {
        let mut state = self.state();
        let call = state.update_calls;
        state.update_calls += 1;
        if let Some(message) = state.update_failures.remove(&call) {
            return Err(StoreError::Rejected(message));
        }
        let storage = self.key_of(&key.to_key_map())?;
        let Some(item) = state
            .tables
            .get_mut(table)
            .and_then(|items| items.get_mut(&storage))
        else {
            return Ok(None);
        };
        let old = item.clone();
        for attribute in attributes {
            item.remove(attribute);
        }
        Ok(Some(old))
    }
}
