/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::record::Identity;
use std::collections::HashSet;
use tracing::info;

/// Counters describing one import run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Rows taken from the input, skipped ones included. Rows past the limit are not read.
    pub rows_read: u64,
    /// Rows whose batch was accepted by the table.
    pub processed: u64,
    pub missing_identity: u64,
    pub conversion_failures: u64,
    /// Rows the CSV reader could not parse.
    pub malformed_rows: u64,
    /// Batch write calls, resubmissions included.
    pub submissions: u64,
    pub resubmissions: u64,
    pub distinct_identities: u64,
    /// Identities that appeared more than once, in the order their first repeat was seen.
    pub duplicates: Vec<Identity>,
    /// Item count of the table after the run, if verification ran and succeeded.
    pub verified_count: Option<u64>,
}

impl RunSummary {
    pub fn duplicate_count(&self) -> usize {
        self.duplicates.len()
    }

    pub fn skipped(&self) -> u64 {
        self.missing_identity + self.conversion_failures + self.malformed_rows
    }

    pub fn log(&self) {
        info!("Finished processing. Total rows read: {}", self.rows_read);
        info!("Rows successfully processed: {}", self.processed);
        info!(
            missing_identity = self.missing_identity,
            conversion_failures = self.conversion_failures,
            malformed_rows = self.malformed_rows,
            "Rows skipped: {}",
            self.skipped()
        );
        info!(
            resubmissions = self.resubmissions,
            "Batch submissions: {}", self.submissions
        );
        info!("Total unique composite keys: {}", self.distinct_identities);
        info!("Number of duplicate composite keys: {}", self.duplicate_count());
        if !self.duplicates.is_empty() {
            info!("Duplicate keys found:");
            for identity in &self.duplicates {
                info!("duplicate key {identity}");
            }
        }
    }
}

/// Tracks which identities have been seen during a run.
#[derive(Debug, Default)]
pub(crate) struct IdentityTracker {
    seen: HashSet<Identity>,
    repeated: HashSet<Identity>,
    duplicates: Vec<Identity>,
}

impl IdentityTracker {
    /// Records one occurrence and returns whether the identity had been seen before.
    pub(crate) fn observe(&mut self, identity: &Identity) -> bool {
        if self.seen.insert(identity.clone()) {
            return false;
        }
        if self.repeated.insert(identity.clone()) {
            self.duplicates.push(identity.clone());
        }
        true
    }

    pub(crate) fn distinct(&self) -> u64 {
        self.seen.len() as u64
    }

    pub(crate) fn into_duplicates(self) -> Vec<Identity> {
        self.duplicates
    }
}
