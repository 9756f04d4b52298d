/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Value conversion for `ddb-loader`.
//!
//! - [`convert_cell`] turns raw CSV text into an `AttributeValue`, guided by an optional [`ColumnType`]
//! - [`KeyValue`] is the normalized form DynamoDB compares key attributes in
//! - [`CompositeKey`] addresses an item by its partition and sort attributes

#![warn(missing_docs, rust_2018_idioms)]

mod column;
mod describe;
pub mod error;
mod json;
mod key;

pub use column::{canonical_number, convert_cell, ColumnType, SET_SEPARATOR};
pub use describe::type_name;
pub use error::{ConversionError, ConversionErrorKind};
pub use json::json_to_attribute_value;
pub use key::{CompositeKey, KeyType, KeyValue};

/// A DynamoDB item: attribute name to value.
pub type Item = std::collections::HashMap<String, aws_sdk_dynamodb::types::AttributeValue>;
