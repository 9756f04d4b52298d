/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Error types for conversions between CSV text, Rust values and DynamoDB `AttributeValue`s.

use std::error::Error as StdError;
use std::fmt;

/// Error raised when a value cannot be converted to or from an `AttributeValue`.
#[derive(Debug)]
pub struct ConversionError {
    kind: ConversionErrorKind,
    column: Option<String>,
}

/// The kind of conversion error that occurred.
#[derive(Debug)]
#[non_exhaustive]
pub enum ConversionErrorKind {
    /// A required attribute was missing from an item.
    MissingAttribute,
    /// The attribute value had an unexpected DynamoDB type.
    InvalidType {
        /// The expected DynamoDB type descriptor.
        expected: &'static str,
        /// The DynamoDB type descriptor that was found.
        actual: &'static str,
    },
    /// The raw value could not be parsed as the requested type.
    InvalidValue {
        /// Why the value was rejected.
        message: String,
    },
    /// A set-typed value had no elements. DynamoDB does not store empty sets.
    EmptySet,
    /// A JSON-typed value was not valid JSON.
    InvalidJson(serde_json::Error),
}

impl ConversionError {
    /// Creates an error for a missing attribute.
    pub fn missing_attribute(column: impl Into<String>) -> Self {
        Self::new(ConversionErrorKind::MissingAttribute).with_column(column)
    }

    /// Creates a type error without a column name.
    pub(crate) fn type_mismatch(expected: &'static str, actual: &'static str) -> Self {
        Self::new(ConversionErrorKind::InvalidType { expected, actual })
    }

    /// Creates an error for a value that could not be parsed.
    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::new(ConversionErrorKind::InvalidValue {
            message: message.into(),
        })
    }

    pub(crate) fn empty_set() -> Self {
        Self::new(ConversionErrorKind::EmptySet)
    }

    pub(crate) fn invalid_json(err: serde_json::Error) -> Self {
        Self::new(ConversionErrorKind::InvalidJson(err))
    }

    fn new(kind: ConversionErrorKind) -> Self {
        Self { kind, column: None }
    }

    /// Attaches the column (attribute) name the failing value belongs to.
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    /// Returns the kind of error.
    pub fn kind(&self) -> &ConversionErrorKind {
        &self.kind
    }

    /// Returns the column name if one was attached.
    pub fn column(&self) -> Option<&str> {
        self.column.as_deref()
    }
}

impl fmt::Display for ConversionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionErrorKind::MissingAttribute => write!(f, "missing required attribute"),
            ConversionErrorKind::InvalidType { expected, actual } => {
                write!(f, "expected {expected}, got {actual}")
            }
            ConversionErrorKind::InvalidValue { message } => write!(f, "{message}"),
            ConversionErrorKind::EmptySet => write!(f, "set values must have at least one element"),
            ConversionErrorKind::InvalidJson(_) => write!(f, "value is not valid JSON"),
        }
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.column {
            Some(column) => write!(f, "cannot convert column '{column}': {}", self.kind),
            None => write!(f, "cannot convert value: {}", self.kind),
        }
    }
}

impl StdError for ConversionError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.kind {
            ConversionErrorKind::InvalidJson(err) => Some(err),
            _ => None,
        }
    }
}
