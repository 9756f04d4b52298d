/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use aws_sdk_dynamodb::config::http::HttpResponse;
use aws_sdk_dynamodb::error::{BuildError, SdkError};
use aws_sdk_dynamodb::operation::batch_write_item::BatchWriteItemError;
use aws_sdk_dynamodb::operation::scan::ScanError;
use aws_sdk_dynamodb::operation::update_item::UpdateItemError;
use std::io;
use std::path::PathBuf;

/// The configuration file or a command line override is unusable.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub(crate) fn invalid_config(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}

pub(crate) type BatchWriteItemSdkError = SdkError<BatchWriteItemError, HttpResponse>;
pub(crate) type ScanSdkError = SdkError<ScanError, HttpResponse>;
pub(crate) type UpdateItemSdkError = SdkError<UpdateItemError, HttpResponse>;

/// A call to the item store failed as a whole.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    BatchWriteItem(#[from] BatchWriteItemSdkError),

    #[error(transparent)]
    Scan(#[from] ScanSdkError),

    #[error(transparent)]
    UpdateItem(#[from] UpdateItemSdkError),

    #[error("failed to build request")]
    Build(#[from] BuildError),

    /// Raised by [`MemoryStore`](crate::store::MemoryStore) for requests DynamoDB would reject.
    #[error("request rejected: {0}")]
    Rejected(String),
}

/// Fatal failures of an import run. Row-level problems are logged and skipped instead.
#[derive(thiserror::Error, Debug)]
pub enum ImportError {
    #[error("failed to open input file {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to read input")]
    Read(#[source] csv::Error),

    #[error("input has no header row")]
    MissingHeader,

    #[error("batch write to table `{table}` failed")]
    Store {
        table: String,
        #[source]
        source: StoreError,
    },

    #[error("{outstanding} items were still unprocessed after {attempts} submissions")]
    RetriesExhausted { attempts: u32, outstanding: usize },
}

/// Failures of the CSV-to-CSV tools.
#[derive(thiserror::Error, Debug)]
pub enum CsvToolError {
    #[error("failed to open {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to read input")]
    Read(#[source] csv::Error),

    #[error("failed to write output")]
    Write(#[source] csv::Error),

    #[error("failed to flush output")]
    Flush(#[source] io::Error),

    #[error("input has no `{0}` column")]
    MissingColumn(String),
}
