/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Adds a column of randomly drawn category labels to a CSV file.

use crate::config::{CategoryColumnConfig, WeightedLabel};
use crate::csv_file;
use crate::error::{invalid_config, ConfigError, CsvToolError};
use std::io;
use std::path::Path;
use tracing::info;

/// Draws labels independently, each with probability proportional to its weight.
#[derive(Debug)]
pub struct CategorySampler {
    labels: Vec<String>,
    cumulative: Vec<f64>,
    rng: fastrand::Rng,
}

impl CategorySampler {
    /// A `seed` makes the sequence of draws reproducible.
    pub fn new(choices: &[WeightedLabel], seed: Option<u64>) -> Result<Self, ConfigError> {
        total_weight(choices)?;
        let labels = choices.iter().map(|choice| choice.label.clone()).collect();
        let cumulative = choices
            .iter()
            .scan(0.0, |total, choice| {
                *total += choice.weight;
                Some(*total)
            })
            .collect();
        let rng = match seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        Ok(Self {
            labels,
            cumulative,
            rng,
        })
    }

    pub fn sample(&mut self) -> &str {
        let total = self.cumulative.last().copied().unwrap_or_default();
        let point = self.rng.f64() * total;
        // Zero-weight labels share their predecessor's bound and are never picked.
        let index = self
            .cumulative
            .partition_point(|bound| *bound <= point)
            .min(self.labels.len() - 1);
        &self.labels[index]
    }
}

/// Checks every weight and returns their sum, which must be positive.
pub(crate) fn total_weight(choices: &[WeightedLabel]) -> Result<f64, ConfigError> {
    if let Some(bad) = choices
        .iter()
        .find(|choice| !choice.weight.is_finite() || choice.weight < 0.0)
    {
        return Err(invalid_config(format!(
            "weight of `{}` must be a finite, non-negative number",
            bad.label
        )));
    }
    let total: f64 = choices.iter().map(|choice| choice.weight).sum();
    if total <= 0.0 {
        return Err(invalid_config("category weights must add up to more than zero"));
    }
    Ok(total)
}

/// Copies CSV `input` to `output` with the configured column filled in on every row. An existing
/// column of that name is overwritten. Returns the number of data rows written.
pub fn add_column<R: io::Read, W: io::Write>(
    config: &CategoryColumnConfig,
    sampler: &mut CategorySampler,
    delimiter: u8,
    input: R,
    output: W,
) -> Result<u64, CsvToolError> {
    let mut reader = csv_file::reader(input, delimiter);
    let mut writer = csv_file::writer(output, delimiter);

    let mut headers = reader.byte_headers().map_err(CsvToolError::Read)?.clone();
    let column_at = csv_file::column_or_append(&mut headers, &config.column);
    writer.write_byte_record(&headers).map_err(CsvToolError::Write)?;

    let mut rows = 0;
    for record in reader.byte_records() {
        let record = record.map_err(CsvToolError::Read)?;
        let label = sampler.sample();
        let out = csv_file::rewrite(&record, headers.len(), &[(column_at, label.as_bytes())]);
        writer.write_byte_record(&out).map_err(CsvToolError::Write)?;
        rows += 1;
    }
    writer.flush().map_err(CsvToolError::Flush)?;
    Ok(rows)
}

pub fn add_column_file(
    config: &CategoryColumnConfig,
    sampler: &mut CategorySampler,
    delimiter: u8,
    input: &Path,
    output: &Path,
) -> Result<u64, CsvToolError> {
    let source = csv_file::open(input)?;
    let target = csv_file::create(output)?;
    let rows = add_column(config, sampler, delimiter, source, target)?;
    info!(
        "Process completed. Added `{}` to {rows} rows of {}",
        config.column,
        output.display()
    );
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn default_sampler(seed: u64) -> CategorySampler {
        CategorySampler::new(&CategoryColumnConfig::default().choices, Some(seed)).unwrap()
    }

    #[test]
    fn draws_stay_within_support() {
        let choices = vec![
            WeightedLabel::new("Visa", 3.0),
            WeightedLabel::new("Never", 0.0),
            WeightedLabel::new("Cash", 1.0),
        ];
        let mut sampler = CategorySampler::new(&choices, Some(7)).unwrap();
        let mut counts: HashMap<String, u32> = HashMap::new();
        for _ in 0..4000 {
            *counts.entry(sampler.sample().to_owned()).or_default() += 1;
        }
        assert_eq!(counts.get("Never"), None);
        let visa = counts["Visa"] as f64 / 4000.0;
        assert!((0.70..0.80).contains(&visa), "Visa drawn {visa} of the time");
    }

    #[test]
    fn seeded_draws_are_reproducible() {
        let mut a = default_sampler(42);
        let mut b = default_sampler(42);
        let first: Vec<String> = (0..50).map(|_| a.sample().to_owned()).collect();
        let second: Vec<String> = (0..50).map(|_| b.sample().to_owned()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn unusable_weights_are_rejected() {
        assert!(CategorySampler::new(&[], None).is_err());
        assert!(CategorySampler::new(&[WeightedLabel::new("Cash", f64::NAN)], None).is_err());
        assert!(CategorySampler::new(&[WeightedLabel::new("Cash", 0.0)], None).is_err());
    }

    #[test]
    fn appends_column_to_every_row() {
        let config = CategoryColumnConfig {
            column: "PAYMENT_TYPE".into(),
            choices: vec![WeightedLabel::new("Debit", 1.0)],
        };
        let mut sampler = CategorySampler::new(&config.choices, None).unwrap();
        let mut output = Vec::new();
        let rows = add_column(
            &config,
            &mut sampler,
            b',',
            "VENDOR_NAME,TOTAL\nGroceries,10.50\nOther\n".as_bytes(),
            &mut output,
        )
        .unwrap();

        assert_eq!(rows, 2);
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "VENDOR_NAME,TOTAL,PAYMENT_TYPE\nGroceries,10.50,Debit\nOther,,Debit\n"
        );
    }
}
