/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Input rows and their composite identity.

use csv::ByteRecord;
use ddb_loader_core::{convert_cell, ColumnType, ConversionError, Item, KeyType, KeyValue};
use std::collections::HashMap;
use std::fmt;

/// Names and key types of the two columns forming the composite identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityColumns {
    pub partition: String,
    pub sort: String,
    pub partition_type: KeyType,
    pub sort_type: KeyType,
}

impl IdentityColumns {
    /// A string partition key and a number sort key.
    pub fn new(partition: impl Into<String>, sort: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            sort: sort.into(),
            partition_type: KeyType::String,
            sort_type: KeyType::Number,
        }
    }

    pub fn with_types(mut self, partition_type: KeyType, sort_type: KeyType) -> Self {
        self.partition_type = partition_type;
        self.sort_type = sort_type;
        self
    }

    /// Normalizes the key attributes of `item`, checking each against its declared type.
    pub fn identity_of(&self, item: &Item) -> Result<Identity, ConversionError> {
        let component = |name: &str, key_type: KeyType| {
            let value = item
                .get(name)
                .ok_or_else(|| ConversionError::missing_attribute(name))?;
            KeyValue::expecting(key_type, value).map_err(|e| e.with_column(name))
        };
        Ok(Identity {
            partition: component(&self.partition, self.partition_type)?,
            sort: component(&self.sort, self.sort_type)?,
        })
    }
}

/// The two identity components of one item, compared the way DynamoDB compares keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity {
    pub partition: KeyValue,
    pub sort: KeyValue,
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.partition, self.sort)
    }
}

/// A row was missing one of its identity components.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("row {row} is missing primary key component `{column}`")]
pub struct MissingIdentity {
    pub row: u64,
    pub column: String,
}

/// One input row, keyed by the header, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    row: u64,
    columns: Vec<(String, String)>,
}

impl RawRow {
    pub fn new(row: u64, columns: Vec<(String, String)>) -> Self {
        Self { row, columns }
    }

    /// Pairs each cell with its header. Cells past the end of the header are dropped and
    /// columns missing from a short row are left out. Invalid UTF-8 is replaced.
    pub fn from_byte_record(row: u64, headers: &[String], record: &ByteRecord) -> Self {
        let columns = headers
            .iter()
            .zip(record.iter())
            .map(|(name, value)| (name.clone(), String::from_utf8_lossy(value).into_owned()))
            .collect();
        Self { row, columns }
    }

    pub fn row(&self) -> u64 {
        self.row
    }

    /// Splits the identity components out of the row. Both must be present and not blank.
    pub fn validate(self, identity: &IdentityColumns) -> Result<Record, MissingIdentity> {
        let mut partition = None;
        let mut sort = None;
        let mut fields = Vec::with_capacity(self.columns.len());
        for (name, value) in self.columns {
            if name == identity.partition {
                partition = Some(value);
            } else if name == identity.sort {
                sort = Some(value);
            } else {
                fields.push((name, value));
            }
        }
        let row = self.row;
        let require = |value: Option<String>, column: &str| {
            value
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| MissingIdentity {
                    row,
                    column: column.to_owned(),
                })
        };
        Ok(Record {
            row,
            partition: require(partition, &identity.partition)?,
            sort: require(sort, &identity.sort)?,
            fields,
        })
    }
}

/// A row with both identity cells present. Non-identity columns are carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    row: u64,
    partition: String,
    sort: String,
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn row(&self) -> u64 {
        self.row
    }

    /// The identity cells as written in the input.
    pub fn raw_identity(&self) -> (&str, &str) {
        (&self.partition, &self.sort)
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    /// Converts every column into an item and returns it with its normalized identity.
    ///
    /// Identity cells always use their column's key type, whatever `column_types` says, so a
    /// cell that does not fit the table's key schema fails here instead of in the batch write.
    pub fn to_item(
        &self,
        identity: &IdentityColumns,
        column_types: &HashMap<String, ColumnType>,
    ) -> Result<(Identity, Item), ConversionError> {
        let convert = |name: &str, value: &str, hint: Option<ColumnType>| {
            convert_cell(value, hint).map_err(|e| e.with_column(name))
        };
        let mut item = Item::with_capacity(self.fields.len() + 2);
        item.insert(
            identity.partition.clone(),
            convert(
                &identity.partition,
                &self.partition,
                Some(identity.partition_type.column_type()),
            )?,
        );
        item.insert(
            identity.sort.clone(),
            convert(
                &identity.sort,
                &self.sort,
                Some(identity.sort_type.column_type()),
            )?,
        );
        let key = identity.identity_of(&item)?;
        for (name, value) in &self.fields {
            item.insert(
                name.clone(),
                convert(name, value, column_types.get(name).copied())?,
            );
        }
        Ok((key, item))
    }
}
