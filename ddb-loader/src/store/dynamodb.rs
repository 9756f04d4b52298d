/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use super::{ItemStore, ScanPage};
use crate::error::StoreError;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::config::Region;
use aws_sdk_dynamodb::types::{PutRequest, ReturnValue, Select, WriteRequest};
use aws_sdk_dynamodb::Client;
use ddb_loader_core::{CompositeKey, Item};
use std::collections::HashMap;
use tracing::debug;

/// [`ItemStore`] backed by a DynamoDB client.
#[derive(Debug, Clone)]
pub struct DynamoDbStore {
    client: Client,
}

impl DynamoDbStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a client from the default AWS configuration chain, optionally pinned to `region`.
    pub async fn from_env(region: Option<String>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region));
        }
        let shared_config = loader.load().await;
        Self::new(Client::new(&shared_config))
    }
}

#[async_trait]
impl ItemStore for DynamoDbStore {
    async fn batch_put(&self, table: &str, items: Vec<Item>) -> Result<Vec<Item>, StoreError> {
        let requests = items
            .into_iter()
            .map(|item| {
                let put = PutRequest::builder().set_item(Some(item)).build()?;
                Ok(WriteRequest::builder().put_request(put).build())
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        let output = self
            .client
            .batch_write_item()
            .request_items(table, requests)
            .send()
            .await?;

        let unprocessed = output
            .unprocessed_items
            .unwrap_or_default()
            .remove(table)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|request| request.put_request.map(|put| put.item))
            .collect();
        Ok(unprocessed)
    }

    async fn count_items(&self, table: &str) -> Result<u64, StoreError> {
        let mut pages = self
            .client
            .scan()
            .table_name(table)
            .select(Select::Count)
            .consistent_read(true)
            .into_paginator()
            .send();

        let mut total = 0u64;
        while let Some(page) = pages.next().await {
            let page = page?;
            debug!(count = page.count, "counted scan page");
            total += u64::try_from(page.count).unwrap_or_default();
        }
        Ok(total)
    }

    async fn scan_page(
        &self,
        table: &str,
        exclusive_start_key: Option<Item>,
    ) -> Result<ScanPage, StoreError> {
        let output = self
            .client
            .scan()
            .table_name(table)
            .set_exclusive_start_key(exclusive_start_key)
            .send()
            .await?;
        Ok(ScanPage {
            items: output.items.unwrap_or_default(),
            last_evaluated_key: output.last_evaluated_key.filter(|key| !key.is_empty()),
        })
    }

    async fn remove_attributes(
        &self,
        table: &str,
        key: &CompositeKey,
        attributes: &[String],
    ) -> Result<Option<Item>, StoreError> {
        let (expression, names) = removal_expression(attributes);
        let output = self
            .client
            .update_item()
            .table_name(table)
            .set_key(Some(key.to_key_map()))
            .update_expression(expression)
            .set_expression_attribute_names(Some(names))
            .return_values(ReturnValue::AllOld)
            .send()
            .await?;
        Ok(output.attributes)
    }
}

/// Builds `REMOVE #a0, #a1, ...` with every name bound through a placeholder, so reserved words
/// and names with dots or spaces are removed as written.
pub fn removal_expression(attributes: &[String]) -> (String, HashMap<String, String>) {
    let mut placeholders = Vec::with_capacity(attributes.len());
    let mut names = HashMap::with_capacity(attributes.len());
    for (i, attribute) in attributes.iter().enumerate() {
        let placeholder = format!("#a{i}");
        names.insert(placeholder.clone(), attribute.clone());
        placeholders.push(placeholder);
    }
    (format!("REMOVE {}", placeholders.join(", ")), names)
}
