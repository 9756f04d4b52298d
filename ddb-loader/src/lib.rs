/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Loads CSV files into DynamoDB tables, and the table and CSV maintenance tools that go with it.

pub mod attributes;
pub mod config;
mod csv_file;
pub mod error;
pub mod import;
pub mod logging;
pub mod record;
pub mod retry;
pub mod store;
pub mod subcommand;
pub mod summary;
pub mod synth;
pub mod tax;
