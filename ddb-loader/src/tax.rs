/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Splits tax-inclusive totals into GST and PST components.

use crate::config::TaxConfig;
use crate::csv_file;
use crate::error::CsvToolError;
use serde::Deserialize;
use std::fmt;
use std::io;
use std::path::Path;
use tracing::{info, warn};

/// How a category is taxed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum TaxRule {
    /// Harmonized tax, split into its federal and provincial parts.
    #[serde(rename = "Full HST")]
    FullHst,
    #[serde(rename = "GST Only")]
    GstOnly,
    #[serde(rename = "PST Only")]
    PstOnly,
}

impl fmt::Display for TaxRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TaxRule::FullHst => "Full HST",
            TaxRule::GstOnly => "GST Only",
            TaxRule::PstOnly => "PST Only",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TaxRates {
    pub gst: f64,
    pub pst: f64,
    pub hst: f64,
}

impl Default for TaxRates {
    fn default() -> Self {
        Self {
            gst: 0.05,
            pst: 0.08,
            hst: 0.13,
        }
    }
}

/// A total split into its pre-tax base and tax components, each rounded to cents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaxBreakdown {
    pub base: f64,
    pub gst: f64,
    pub pst: f64,
}

impl TaxRule {
    pub fn apply(self, total: f64, rates: &TaxRates) -> TaxBreakdown {
        let (rate, gst_rate, pst_rate) = match self {
            TaxRule::FullHst => (rates.hst, rates.gst, rates.pst),
            TaxRule::GstOnly => (rates.gst, rates.gst, 0.0),
            TaxRule::PstOnly => (rates.pst, 0.0, rates.pst),
        };
        let base = total / (1.0 + rate);
        TaxBreakdown {
            base: round_cents(base),
            gst: round_cents(base * gst_rate),
            pst: round_cents(base * pst_rate),
        }
    }
}

/// Rounds half away from zero to two decimal places.
pub fn round_cents(value: f64) -> f64 {
    // `+ 0.0` turns a negative zero into zero, so it formats as `0.00`.
    (value * 100.0).round() / 100.0 + 0.0
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaxSummary {
    pub rows: u64,
    pub updated: u64,
    /// Rows whose total was not a number and were copied unchanged.
    pub unparsable: u64,
}

/// Copies CSV `input` to `output`, rewriting the GST and PST columns from each row's total.
pub fn recompute<R: io::Read, W: io::Write>(
    config: &TaxConfig,
    delimiter: u8,
    input: R,
    output: W,
) -> Result<TaxSummary, CsvToolError> {
    let mut reader = csv_file::reader(input, delimiter);
    let mut writer = csv_file::writer(output, delimiter);

    let mut headers = reader.byte_headers().map_err(CsvToolError::Read)?.clone();
    let category_at = csv_file::require_column(&headers, &config.category_column)?;
    let total_at = csv_file::require_column(&headers, &config.total_column)?;
    let gst_at = csv_file::column_or_append(&mut headers, &config.gst_column);
    let pst_at = csv_file::column_or_append(&mut headers, &config.pst_column);
    writer.write_byte_record(&headers).map_err(CsvToolError::Write)?;

    let mut summary = TaxSummary::default();
    for record in reader.byte_records() {
        let record = record.map_err(CsvToolError::Read)?;
        summary.rows += 1;
        let row = summary.rows;

        let category = String::from_utf8_lossy(record.get(category_at).unwrap_or_default());
        let total = String::from_utf8_lossy(record.get(total_at).unwrap_or_default());
        let out = match parse_total(&total) {
            Some(total) => {
                let rule = config.rule_for(category.trim());
                let breakdown = rule.apply(total, &config.rates);
                summary.updated += 1;
                let gst = format!("{:.2}", breakdown.gst);
                let pst = format!("{:.2}", breakdown.pst);
                csv_file::rewrite(
                    &record,
                    headers.len(),
                    &[(gst_at, gst.as_bytes()), (pst_at, pst.as_bytes())],
                )
            }
            None => {
                summary.unparsable += 1;
                warn!("Row {row}: total {total:?} is not a number. Copying the row unchanged.");
                csv_file::rewrite(&record, headers.len(), &[])
            }
        };
        writer.write_byte_record(&out).map_err(CsvToolError::Write)?;
    }
    writer.flush().map_err(CsvToolError::Flush)?;
    info!(
        rows = summary.rows,
        updated = summary.updated,
        unparsable = summary.unparsable,
        "Recomputed tax columns"
    );
    Ok(summary)
}

pub fn recompute_file(
    config: &TaxConfig,
    delimiter: u8,
    input: &Path,
    output: &Path,
) -> Result<TaxSummary, CsvToolError> {
    let source = csv_file::open(input)?;
    let target = csv_file::create(output)?;
    let summary = recompute(config, delimiter, source, target)?;
    info!("Updated file saved as {}", output.display());
    Ok(summary)
}

fn parse_total(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|total| total.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(input: &str) -> (TaxSummary, String) {
        let mut output = Vec::new();
        let summary = recompute(&TaxConfig::default(), b',', input.as_bytes(), &mut output).unwrap();
        (summary, String::from_utf8(output).unwrap())
    }

    #[test]
    fn groceries_are_gst_only() {
        let breakdown = TaxRule::GstOnly.apply(10.50, &TaxRates::default());
        assert_eq!(format!("{:.2}", breakdown.base), "10.00");
        assert_eq!(format!("{:.2}", breakdown.gst), "0.50");
        assert_eq!(format!("{:.2}", breakdown.pst), "0.00");
    }

    #[test]
    fn full_hst_splits_into_both_components() {
        let breakdown = TaxRule::FullHst.apply(113.00, &TaxRates::default());
        assert_eq!(
            breakdown,
            TaxBreakdown {
                base: 100.0,
                gst: 5.0,
                pst: 8.0
            }
        );
    }

    #[test]
    fn pst_only_has_no_gst() {
        let breakdown = TaxRule::PstOnly.apply(54.00, &TaxRates::default());
        assert_eq!(breakdown.base, 50.0);
        assert_eq!(breakdown.gst, 0.0);
        assert_eq!(breakdown.pst, 4.0);
    }

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_cents(0.125), 0.13);
        assert_eq!(round_cents(-0.125), -0.13);
        assert_eq!(format!("{:.2}", round_cents(-0.001)), "0.00");
    }

    #[test]
    fn rewrites_existing_tax_columns() {
        let (summary, output) = run(
            "VENDOR_NAME,TOTAL,gst,pst,note\n\
             Groceries,10.50,9,9,weekly\n\
             Hardware,54.00,,,\n",
        );
        assert_eq!(summary, TaxSummary { rows: 2, updated: 2, unparsable: 0 });
        assert_eq!(
            output,
            "VENDOR_NAME,TOTAL,gst,pst,note\n\
             Groceries,10.50,0.50,0.00,weekly\n\
             Hardware,54.00,0.00,4.00,\n"
        );
    }

    #[test]
    fn appends_missing_tax_columns() {
        let (_, output) = run("VENDOR_NAME,TOTAL\nRestaurants,113\n");
        assert_eq!(output, "VENDOR_NAME,TOTAL,gst,pst\nRestaurants,113,5.00,8.00\n");
    }

    #[test]
    fn unparsable_total_is_copied_unchanged() {
        let (summary, output) = run("VENDOR_NAME,TOTAL,gst,pst\nOther,n/a,1,2\n");
        assert_eq!(summary.unparsable, 1);
        assert_eq!(output, "VENDOR_NAME,TOTAL,gst,pst\nOther,n/a,1,2\n");
    }

    #[test]
    fn missing_total_column_is_an_error() {
        let err = recompute(
            &TaxConfig::default(),
            b',',
            "VENDOR_NAME,AMOUNT\nOther,1\n".as_bytes(),
            Vec::new(),
        )
        .unwrap_err();
        assert!(matches!(err, CsvToolError::MissingColumn(ref column) if column == "TOTAL"));
    }

    #[test]
    fn file_variant_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("receipts.csv");
        let output = dir.path().join("receipts_updated.csv");
        std::fs::write(&input, "VENDOR_NAME,TOTAL\nUtilities,21.00\n").unwrap();

        recompute_file(&TaxConfig::default(), b',', &input, &output).unwrap();
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "VENDOR_NAME,TOTAL,gst,pst\nUtilities,21.00,1.00,0.00\n"
        );
    }
}
