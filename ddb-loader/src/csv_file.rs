/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Plumbing shared by the tools that rewrite a CSV file row by row.

use crate::error::CsvToolError;
use csv::{ByteRecord, Reader, ReaderBuilder, Writer, WriterBuilder};
use std::fs::File;
use std::io;
use std::path::Path;

pub(crate) fn reader<R: io::Read>(input: R, delimiter: u8) -> Reader<R> {
    ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(input)
}

pub(crate) fn writer<W: io::Write>(output: W, delimiter: u8) -> Writer<W> {
    WriterBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_writer(output)
}

pub(crate) fn open(path: &Path) -> Result<File, CsvToolError> {
    File::open(path).map_err(|err| CsvToolError::Open {
        path: path.into(),
        source: err.into(),
    })
}

pub(crate) fn create(path: &Path) -> Result<File, CsvToolError> {
    File::create(path).map_err(|err| CsvToolError::Open {
        path: path.into(),
        source: err.into(),
    })
}

/// The position of `name` in the header, appending it when absent.
pub(crate) fn column_or_append(headers: &mut ByteRecord, name: &str) -> usize {
    match position(headers, name) {
        Some(index) => index,
        None => {
            headers.push_field(name.as_bytes());
            headers.len() - 1
        }
    }
}

pub(crate) fn require_column(headers: &ByteRecord, name: &str) -> Result<usize, CsvToolError> {
    position(headers, name).ok_or_else(|| CsvToolError::MissingColumn(name.to_owned()))
}

fn position(headers: &ByteRecord, name: &str) -> Option<usize> {
    headers.iter().position(|header| header == name.as_bytes())
}

/// Copies `record`, padded to at least `width` fields, replacing the fields in `replacements`.
pub(crate) fn rewrite(record: &ByteRecord, width: usize, replacements: &[(usize, &[u8])]) -> ByteRecord {
    let width = width.max(record.len());
    let mut out = ByteRecord::with_capacity(record.as_slice().len(), width);
    for index in 0..width {
        let field = replacements
            .iter()
            .find(|(at, _)| *at == index)
            .map(|(_, value)| *value)
            .or_else(|| record.get(index))
            .unwrap_or_default();
        out.push_field(field);
    }
    out
}
