/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Composite (partition + sort) keys and the key attribute types DynamoDB allows.

use aws_sdk_dynamodb::types::AttributeValue;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;

use crate::column::{canonical_number, ColumnType};
use crate::describe::type_name;
use crate::error::ConversionError;

/// The scalar type of a key attribute, fixed per table when it is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyType {
    /// `S`
    String,
    /// `N`
    Number,
    /// `B`, read from base64 text.
    Binary,
}

impl KeyType {
    /// The column type key cells of this type are converted with.
    pub fn column_type(self) -> ColumnType {
        match self {
            KeyType::String => ColumnType::String,
            KeyType::Number => ColumnType::Number,
            KeyType::Binary => ColumnType::Binary,
        }
    }

    /// The DynamoDB type descriptor: `S`, `N` or `B`.
    pub fn descriptor(self) -> &'static str {
        match self {
            KeyType::String => "S",
            KeyType::Number => "N",
            KeyType::Binary => "B",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.column_type(), f)
    }
}

/// A key attribute value in the form DynamoDB compares keys in.
///
/// Numbers are held as their [canonical text](canonical_number), so two `KeyValue`s are equal
/// exactly when DynamoDB would treat them as the same key component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyValue {
    /// A string key component.
    S(String),
    /// A number key component, canonicalized.
    N(String),
    /// A binary key component.
    B(Vec<u8>),
}

impl KeyValue {
    /// Normalizes a key attribute. Only `S`, `N` and `B` values can be key components.
    pub fn from_attribute_value(value: &AttributeValue) -> Result<Self, ConversionError> {
        match value {
            AttributeValue::S(s) => Ok(KeyValue::S(s.clone())),
            AttributeValue::N(n) => canonical_number(n).map(KeyValue::N).ok_or_else(|| {
                ConversionError::invalid_value(format!("'{n}' is not a valid DynamoDB number"))
            }),
            AttributeValue::B(b) => Ok(KeyValue::B(b.as_ref().to_vec())),
            other => Err(ConversionError::type_mismatch("S, N or B", type_name(other))),
        }
    }

    /// Normalizes a key attribute that must have type `expected`.
    pub fn expecting(expected: KeyType, value: &AttributeValue) -> Result<Self, ConversionError> {
        let key = Self::from_attribute_value(value)?;
        if key.key_type() != expected {
            return Err(ConversionError::type_mismatch(
                expected.descriptor(),
                type_name(value),
            ));
        }
        Ok(key)
    }

    /// The type of this component.
    pub fn key_type(&self) -> KeyType {
        match self {
            KeyValue::S(_) => KeyType::String,
            KeyValue::N(_) => KeyType::Number,
            KeyValue::B(_) => KeyType::Binary,
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::S(text) | KeyValue::N(text) => f.write_str(text),
            KeyValue::B(bytes) => f.write_str(&aws_smithy_types::base64::encode(bytes)),
        }
    }
}

/// The partition and sort attributes that address one item in a table.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeKey {
    partition: (String, AttributeValue),
    sort: (String, AttributeValue),
}

impl CompositeKey {
    /// Creates a key from its two named components.
    pub fn new(
        partition_name: impl Into<String>,
        partition_value: AttributeValue,
        sort_name: impl Into<String>,
        sort_value: AttributeValue,
    ) -> Self {
        Self {
            partition: (partition_name.into(), partition_value),
            sort: (sort_name.into(), sort_value),
        }
    }

    /// Reads the key attributes out of a full item, as returned by `Scan`.
    pub fn from_item(
        item: &HashMap<String, AttributeValue>,
        partition_name: &str,
        sort_name: &str,
    ) -> Result<Self, ConversionError> {
        let lookup = |name: &str| {
            item.get(name)
                .cloned()
                .ok_or_else(|| ConversionError::missing_attribute(name))
        };
        Ok(Self::new(
            partition_name,
            lookup(partition_name)?,
            sort_name,
            lookup(sort_name)?,
        ))
    }

    /// The partition attribute's name and value.
    pub fn partition(&self) -> (&str, &AttributeValue) {
        (&self.partition.0, &self.partition.1)
    }

    /// The sort attribute's name and value.
    pub fn sort(&self) -> (&str, &AttributeValue) {
        (&self.sort.0, &self.sort.1)
    }

    /// Converts the key into the map shape DynamoDB expects for `Key` parameters.
    pub fn to_key_map(&self) -> HashMap<String, AttributeValue> {
        HashMap::from([self.partition.clone(), self.sort.clone()])
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}={}, {}={}",
            self.partition.0,
            DisplayValue(&self.partition.1),
            self.sort.0,
            DisplayValue(&self.sort.1)
        )
    }
}

/// Renders scalar key values as their bare text, anything else in debug form.
pub(crate) struct DisplayValue<'a>(pub(crate) &'a AttributeValue);

impl fmt::Display for DisplayValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            AttributeValue::S(s) | AttributeValue::N(s) => f.write_str(s),
            other => write!(f, "{other:?}"),
        }
    }
}
