/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! The batch import pipeline: CSV rows in, batched `PutRequest`s out.
//!
//! Rows are read one at a time. A row that lacks its identity or cannot be converted is logged and
//! skipped; only failures of the table itself (or running out of resubmissions) end the run.

use crate::config::Config;
use crate::error::{ConfigError, ImportError};
use crate::record::{Identity, IdentityColumns, RawRow};
use crate::retry::RetryPolicy;
use crate::store::ItemStore;
use crate::summary::{IdentityTracker, RunSummary};
use aws_sdk_dynamodb::error::DisplayErrorContext;
use csv::{ByteRecord, Reader, ReaderBuilder};
use ddb_loader_core::{ColumnType, Item};
use std::collections::{HashMap, HashSet};
use std::io;
use std::mem;
use std::path::Path;
use tracing::{debug, error, info, warn};

/// Everything an import needs besides the store and the input.
#[derive(Debug, Clone)]
pub struct ImportSettings {
    pub table: String,
    pub identity: IdentityColumns,
    pub batch_size: usize,
    pub delimiter: u8,
    pub column_types: HashMap<String, ColumnType>,
    pub retry: RetryPolicy,
    /// Count the table's items once the input is exhausted.
    pub verify: bool,
}

impl ImportSettings {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            table: config.table_name()?.to_owned(),
            identity: config.table.identity_columns(),
            batch_size: config.import.batch_size,
            delimiter: config.import.delimiter_byte(),
            column_types: config.import.column_types.clone(),
            retry: config.retry.policy(),
            verify: config.import.verify,
        })
    }
}

pub struct Importer<'a, S> {
    store: &'a S,
    settings: ImportSettings,
}

impl<'a, S: ItemStore> Importer<'a, S> {
    pub fn new(store: &'a S, settings: ImportSettings) -> Self {
        Self { store, settings }
    }

    /// Imports at most `limit` rows of the CSV file at `path`.
    pub async fn import_file(
        &self,
        path: &Path,
        limit: Option<u64>,
    ) -> Result<RunSummary, ImportError> {
        info!("Starting to process CSV file: {}", path.display());
        let reader = self
            .reader_builder()
            .from_path(path)
            .map_err(|source| ImportError::Open {
                path: path.into(),
                source,
            })?;
        self.run(reader, limit).await
    }

    pub async fn import_from<R: io::Read>(
        &self,
        input: R,
        limit: Option<u64>,
    ) -> Result<RunSummary, ImportError> {
        self.run(self.reader_builder().from_reader(input), limit)
            .await
    }

    fn reader_builder(&self) -> ReaderBuilder {
        let mut builder = ReaderBuilder::new();
        builder
            .delimiter(self.settings.delimiter)
            .has_headers(true)
            .flexible(true);
        builder
    }

    async fn run<R: io::Read>(
        &self,
        mut reader: Reader<R>,
        limit: Option<u64>,
    ) -> Result<RunSummary, ImportError> {
        match limit {
            Some(limit) => info!("Limit set to: {limit}"),
            None => info!("No row limit set"),
        }
        let headers: Vec<String> = reader
            .byte_headers()
            .map_err(ImportError::Read)?
            .iter()
            .map(|name| String::from_utf8_lossy(name).into_owned())
            .collect();
        if headers.iter().all(|name| name.is_empty()) {
            return Err(ImportError::MissingHeader);
        }

        let mut summary = RunSummary::default();
        let mut identities = IdentityTracker::default();
        let mut batch = PendingBatch::default();
        let mut cells = ByteRecord::new();
        loop {
            if let Some(limit) = limit.filter(|limit| summary.rows_read >= *limit) {
                info!("Reached limit of {limit} rows. Stopping processing.");
                break;
            }
            let parsed = reader.read_byte_record(&mut cells);
            match parsed {
                Ok(false) => break,
                Ok(true) => summary.rows_read += 1,
                Err(err) if err.is_io_error() => return Err(ImportError::Read(err)),
                Err(err) => {
                    summary.rows_read += 1;
                    summary.malformed_rows += 1;
                    error!("Row {} could not be parsed: {err}. Skipping.", summary.rows_read);
                    continue;
                }
            }
            let row = summary.rows_read;

            let raw = RawRow::from_byte_record(row, &headers, &cells);
            debug!("Row {row} data: {raw:?}");
            let record = match raw.validate(&self.settings.identity) {
                Ok(record) => record,
                Err(err) => {
                    summary.missing_identity += 1;
                    error!("{err}. Skipping.");
                    continue;
                }
            };
            let (identity, item) =
                match record.to_item(&self.settings.identity, &self.settings.column_types) {
                    Ok(converted) => converted,
                    Err(err) => {
                        let (partition, sort) = record.raw_identity();
                        summary.conversion_failures += 1;
                        error!(
                            "Error processing row {row} with composite key ({partition}, {sort}): {}. Skipping.",
                            DisplayErrorContext(&err)
                        );
                        continue;
                    }
                };

            debug!("Processing item with composite key: {identity}");
            if identities.observe(&identity) {
                warn!("Duplicate composite key {identity} at row {row}");
            }
            // A single request may not put the same key twice.
            if batch.contains(&identity) {
                self.flush(&mut batch, &mut summary).await?;
            }
            batch.push(row, identity, item);
            if batch.len() >= self.settings.batch_size {
                self.flush(&mut batch, &mut summary).await?;
            }
        }
        if !batch.is_empty() {
            self.flush(&mut batch, &mut summary).await?;
        }

        summary.distinct_identities = identities.distinct();
        summary.duplicates = identities.into_duplicates();
        summary.log();

        if self.settings.verify {
            self.verify(&mut summary).await;
        }
        Ok(summary)
    }

    /// Submits the pending batch and resubmits whatever comes back unprocessed.
    async fn flush(
        &self,
        batch: &mut PendingBatch,
        summary: &mut RunSummary,
    ) -> Result<(), ImportError> {
        let (first_row, last_row, items) = batch.take();
        let size = items.len() as u64;
        info!("Sending batch write request for rows {first_row} to {last_row}");
        let mut outstanding = self.submit(items, summary).await?;
        summary.processed += size;

        let policy = &self.settings.retry;
        let mut attempt = 1;
        while !outstanding.is_empty() {
            attempt += 1;
            if !policy.allows_attempt(attempt) {
                return Err(ImportError::RetriesExhausted {
                    attempts: attempt - 1,
                    outstanding: outstanding.len(),
                });
            }
            warn!(
                attempt,
                outstanding = outstanding.len(),
                "Unprocessed items detected. Retrying."
            );
            let delay = policy.backoff(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            summary.resubmissions += 1;
            outstanding = self.submit(outstanding, summary).await?;
        }
        Ok(())
    }

    async fn submit(
        &self,
        items: Vec<Item>,
        summary: &mut RunSummary,
    ) -> Result<Vec<Item>, ImportError> {
        summary.submissions += 1;
        self.store
            .batch_put(&self.settings.table, items)
            .await
            .map_err(|source| ImportError::Store {
                table: self.settings.table.clone(),
                source,
            })
    }

    async fn verify(&self, summary: &mut RunSummary) {
        match self.store.count_items(&self.settings.table).await {
            Ok(count) => {
                info!("Total items in DynamoDB table: {count}");
                summary.verified_count = Some(count);
            }
            Err(err) => error!(
                "Error scanning DynamoDB table {}: {}",
                self.settings.table,
                DisplayErrorContext(&err)
            ),
        }
    }
}

#[derive(Debug, Default)]
struct PendingBatch {
    items: Vec<Item>,
    identities: HashSet<Identity>,
    first_row: u64,
    last_row: u64,
}

impl PendingBatch {
    fn push(&mut self, row: u64, identity: Identity, item: Item) {
        if self.items.is_empty() {
            self.first_row = row;
        }
        self.last_row = row;
        self.identities.insert(identity);
        self.items.push(item);
    }

    fn contains(&self, identity: &Identity) -> bool {
        self.identities.contains(identity)
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn take(&mut self) -> (u64, u64, Vec<Item>) {
        self.identities.clear();
        (self.first_row, self.last_row, mem::take(&mut self.items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, WriteCall};
    use aws_sdk_dynamodb::types::AttributeValue;
    use ddb_loader_core::{KeyType, KeyValue};
    use pretty_assertions::assert_eq;
    use std::fmt::Write;
    use tracing_test::traced_test;

    const TABLE: &str = "receipts";

    fn settings() -> ImportSettings {
        ImportSettings {
            table: TABLE.into(),
            identity: IdentityColumns::new("project", "page"),
            batch_size: 25,
            delimiter: b',',
            column_types: HashMap::new(),
            retry: RetryPolicy::immediate(),
            verify: true,
        }
    }

    fn store() -> MemoryStore {
        MemoryStore::new("project", "page")
    }

    fn rows(count: usize) -> String {
        let mut csv = String::from("project,page,TOTAL\n");
        for page in 1..=count {
            writeln!(csv, "receipts,{page},10.50").unwrap();
        }
        csv
    }

    fn batch_sizes(store: &MemoryStore) -> Vec<usize> {
        store.write_calls().iter().map(|call| call.items).collect()
    }

    #[tokio::test]
    #[traced_test]
    async fn thirty_rows_take_two_batches() {
        let store = store();
        let summary = Importer::new(&store, settings())
            .import_from(rows(30).as_bytes(), None)
            .await
            .unwrap();

        assert_eq!(summary.rows_read, 30);
        assert_eq!(summary.processed, 30);
        assert_eq!(summary.submissions, 2);
        assert_eq!(summary.resubmissions, 0);
        assert_eq!(summary.distinct_identities, 30);
        assert_eq!(summary.duplicate_count(), 0);
        assert_eq!(summary.verified_count, Some(30));
        assert_eq!(batch_sizes(&store), vec![25, 5]);
        assert!(logs_contain("Sending batch write request for rows 1 to 25"));
        assert!(logs_contain("Sending batch write request for rows 26 to 30"));
        assert!(logs_contain("Total items in DynamoDB table: 30"));
    }

    #[tokio::test]
    #[traced_test]
    async fn unprocessed_items_are_resubmitted_to_the_same_table() {
        let store = store().leave_unprocessed([3]);
        let summary = Importer::new(&store, settings())
            .import_from(rows(5).as_bytes(), None)
            .await
            .unwrap();

        assert_eq!(summary.submissions, 2);
        assert_eq!(summary.resubmissions, 1);
        assert_eq!(summary.processed, 5);
        assert_eq!(store.len(TABLE), 5);
        assert_eq!(
            store.write_calls(),
            vec![
                WriteCall { table: TABLE.into(), items: 5 },
                WriteCall { table: TABLE.into(), items: 3 },
            ]
        );
        assert!(logs_contain("Unprocessed items detected. Retrying."));
    }

    #[tokio::test]
    #[traced_test]
    async fn rows_missing_identity_are_skipped_with_one_error_each() {
        let csv = "project,page,TOTAL\n\
                   receipts,1,10.50\n\
                   receipts,,3.00\n\
                   receipts,2,4.00\n\
                   \x20\x20,3,5.00\n";
        let store = store();
        let summary = Importer::new(&store, settings())
            .import_from(csv.as_bytes(), None)
            .await
            .unwrap();

        assert_eq!(summary.rows_read, 4);
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.missing_identity, 2);
        assert_eq!(store.len(TABLE), 2);
        assert!(logs_contain("row 2 is missing primary key component `page`"));
        assert!(logs_contain("row 4 is missing primary key component `project`"));
        logs_assert(|lines: &[&str]| {
            let errors = lines.iter().filter(|line| line.contains("ERROR")).count();
            match errors {
                2 => Ok(()),
                n => Err(format!("expected 2 error lines, found {n}")),
            }
        });
    }

    #[tokio::test]
    #[traced_test]
    async fn limit_stops_reading() {
        let mut csv = rows(3);
        csv.push_str("receipts,,never read\n");
        let store = store();
        let summary = Importer::new(&store, settings())
            .import_from(csv.as_bytes(), Some(3))
            .await
            .unwrap();

        assert_eq!(summary.rows_read, 3);
        assert_eq!(summary.processed, 3);
        assert_eq!(summary.missing_identity, 0);
        assert_eq!(store.len(TABLE), 3);
        assert!(logs_contain("Reached limit of 3 rows. Stopping processing."));
        assert!(!logs_contain("row 4 is missing"));
    }

    #[tokio::test]
    #[traced_test]
    async fn duplicate_identities_are_counted_and_last_write_wins() {
        let csv = "project,page,TOTAL,note\n\
                   receipts,1,10.50,first\n\
                   receipts,2,3.00,other\n\
                   receipts,1,11.00,second\n";
        let store = store();
        let summary = Importer::new(&store, settings())
            .import_from(csv.as_bytes(), None)
            .await
            .unwrap();

        assert_eq!(summary.processed, 3);
        assert_eq!(summary.distinct_identities, 2);
        assert_eq!(
            summary.duplicates,
            vec![Identity {
                partition: KeyValue::S("receipts".into()),
                sort: KeyValue::N("1".into())
            }]
        );
        // The repeat forces the pending batch out first.
        assert_eq!(batch_sizes(&store), vec![2, 1]);
        assert_eq!(store.len(TABLE), 2);
        let item = store
            .get(
                TABLE,
                &AttributeValue::S("receipts".into()),
                &AttributeValue::N("1".into()),
            )
            .unwrap();
        assert_eq!(item["note"], AttributeValue::S("second".into()));
        assert!(logs_contain("Duplicate composite key (receipts, 1) at row 3"));
        assert!(logs_contain("Number of duplicate composite keys: 1"));
    }

    #[tokio::test]
    #[traced_test]
    async fn conversion_failures_skip_the_row() {
        let csv = "project,page,TOTAL\n\
                   receipts,1,n/a\n\
                   receipts,2,4.00\n";
        let mut settings = settings();
        settings
            .column_types
            .insert("TOTAL".into(), ColumnType::Number);
        let store = store();
        let summary = Importer::new(&store, settings)
            .import_from(csv.as_bytes(), None)
            .await
            .unwrap();

        assert_eq!(summary.conversion_failures, 1);
        assert_eq!(summary.processed, 1);
        assert!(logs_contain("Error processing row 1 with composite key (receipts, 1)"));
        assert!(logs_contain("cannot convert column 'TOTAL'"));
    }

    #[tokio::test]
    #[traced_test]
    async fn numerically_equal_keys_are_duplicates() {
        let csv = "project,page,note\n\
                   receipts,1,first\n\
                   receipts,1.0,second\n\
                   receipts,007,third\n";
        let store = store();
        let summary = Importer::new(&store, settings())
            .import_from(csv.as_bytes(), None)
            .await
            .unwrap();

        assert_eq!(summary.processed, 3);
        assert_eq!(summary.distinct_identities, 2);
        assert_eq!(summary.duplicate_count(), 1);
        // `1.0` repeats `1`, so each of them goes out in its own request.
        assert_eq!(batch_sizes(&store), vec![1, 2]);
        assert_eq!(store.len(TABLE), 2);
        let item = store
            .get(
                TABLE,
                &AttributeValue::S("receipts".into()),
                &AttributeValue::N("1".into()),
            )
            .unwrap();
        assert_eq!(item["note"], AttributeValue::S("second".into()));
        assert!(logs_contain("Duplicate composite key (receipts, 1) at row 2"));
    }

    #[tokio::test]
    #[traced_test]
    async fn key_cells_of_the_wrong_type_skip_the_row() {
        let csv = "project,page\n\
                   receipts,1\n\
                   receipts,cover\n\
                   receipts,2\n";
        let store = store();
        let summary = Importer::new(&store, settings())
            .import_from(csv.as_bytes(), None)
            .await
            .unwrap();

        assert_eq!(summary.conversion_failures, 1);
        assert_eq!(summary.processed, 2);
        assert_eq!(batch_sizes(&store), vec![2]);
        assert!(logs_contain("Error processing row 2 with composite key (receipts, cover)"));
        assert!(logs_contain("cannot convert column 'page'"));
    }

    #[tokio::test]
    async fn string_sort_keys_keep_their_text() {
        let csv = "project,page\n\
                   receipts,1\n\
                   receipts,1.0\n\
                   receipts,cover\n";
        let store = MemoryStore::new("project", "page")
            .with_key_types(KeyType::String, KeyType::String);
        let settings = ImportSettings {
            identity: IdentityColumns::new("project", "page")
                .with_types(KeyType::String, KeyType::String),
            ..settings()
        };
        let summary = Importer::new(&store, settings)
            .import_from(csv.as_bytes(), None)
            .await
            .unwrap();

        assert_eq!(summary.duplicate_count(), 0);
        assert_eq!(batch_sizes(&store), vec![3]);
        assert!(store
            .get(
                TABLE,
                &AttributeValue::S("receipts".into()),
                &AttributeValue::S("1.0".into())
            )
            .is_some());
    }

    #[tokio::test]
    async fn rejected_batch_halts_the_run() {
        let store = store().fail_write_call(1, "ValidationException");
        let err = Importer::new(&store, settings())
            .import_from(rows(30).as_bytes(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, ImportError::Store { ref table, .. } if table == TABLE), "{err:?}");
        assert_eq!(store.len(TABLE), 25);
    }

    #[tokio::test]
    async fn exhausted_retries_are_fatal() {
        let store = store().leave_unprocessed([2, 1]);
        let settings = ImportSettings {
            retry: RetryPolicy::immediate().with_max_attempts(2),
            ..settings()
        };
        let err = Importer::new(&store, settings)
            .import_from(rows(4).as_bytes(), None)
            .await
            .unwrap_err();

        assert!(
            matches!(
                err,
                ImportError::RetriesExhausted {
                    attempts: 2,
                    outstanding: 1
                }
            ),
            "{err:?}"
        );
    }

    #[tokio::test]
    #[traced_test]
    async fn failed_verification_does_not_fail_the_run() {
        let store = store().fail_counts("table is being deleted");
        let summary = Importer::new(&store, settings())
            .import_from(rows(2).as_bytes(), None)
            .await
            .unwrap();

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.verified_count, None);
        assert!(logs_contain("Error scanning DynamoDB table receipts"));
    }

    #[tokio::test]
    async fn empty_input_has_no_header() {
        let store = store();
        let err = Importer::new(&store, settings())
            .import_from(&b""[..], None)
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::MissingHeader), "{err:?}");
    }

    #[tokio::test]
    async fn backoff_sleeps_between_resubmissions() {
        tokio::time::pause();
        let store = store().leave_unprocessed([1]);
        let settings = ImportSettings {
            retry: RetryPolicy::new(
                None,
                std::time::Duration::from_millis(250),
                std::time::Duration::from_secs(1),
            ),
            ..settings()
        };
        let start = tokio::time::Instant::now();
        Importer::new(&store, settings)
            .import_from(rows(2).as_bytes(), None)
            .await
            .unwrap();
        assert!(start.elapsed() >= std::time::Duration::from_millis(250));
    }
}
