/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Conversion of raw CSV cell text into DynamoDB `AttributeValue`s.

use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::AttributeValue;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;

use crate::error::ConversionError;
use crate::json::json_to_attribute_value;

/// Separator between elements of set-typed cells.
pub const SET_SEPARATOR: char = '|';

/// The DynamoDB type a column's text should be stored as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColumnType {
    /// `S`
    String,
    /// `N`. The text must be a finite decimal number.
    Number,
    /// `BOOL`. Accepts `true`/`false` in any case.
    Bool,
    /// `B`. The text is base64.
    Binary,
    /// `SS`, elements separated by [`SET_SEPARATOR`].
    StringSet,
    /// `NS`, elements separated by [`SET_SEPARATOR`].
    NumberSet,
    /// Any JSON document; objects become `M` and arrays become `L`.
    Json,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::String => "string",
            ColumnType::Number => "number",
            ColumnType::Bool => "bool",
            ColumnType::Binary => "binary",
            ColumnType::StringSet => "string-set",
            ColumnType::NumberSet => "number-set",
            ColumnType::Json => "json",
        };
        f.write_str(name)
    }
}

/// Converts one cell.
///
/// With no hint, canonical integer and decimal text becomes `N` and everything else stays `S`.
/// Anything that would not survive a round trip through a number (`007`, `+1`, `1e3`) is ambiguous
/// and is kept as a string.
pub fn convert_cell(raw: &str, hint: Option<ColumnType>) -> Result<AttributeValue, ConversionError> {
    match hint {
        None if is_plain_number(raw) && canonical_number(raw).is_some() => {
            Ok(AttributeValue::N(raw.to_owned()))
        }
        None | Some(ColumnType::String) => Ok(AttributeValue::S(raw.to_owned())),
        Some(ColumnType::Number) => parse_number(raw).map(AttributeValue::N),
        Some(ColumnType::Bool) => parse_bool(raw).map(AttributeValue::Bool),
        Some(ColumnType::Binary) => aws_smithy_types::base64::decode(raw.trim())
            .map(|bytes| AttributeValue::B(Blob::new(bytes)))
            .map_err(|_| ConversionError::invalid_value("value is not valid base64")),
        Some(ColumnType::StringSet) => {
            let values: BTreeSet<String> = set_elements(raw).map(str::to_owned).collect();
            non_empty(values).map(AttributeValue::Ss)
        }
        Some(ColumnType::NumberSet) => {
            // Stored canonically, so `1|1.0` is one element as DynamoDB sees it.
            let values = set_elements(raw)
                .map(|element| {
                    canonical_number(element).ok_or_else(|| not_a_number(element))
                })
                .collect::<Result<BTreeSet<_>, _>>()?;
            non_empty(values).map(AttributeValue::Ns)
        }
        Some(ColumnType::Json) => {
            let value = serde_json::from_str(raw).map_err(ConversionError::invalid_json)?;
            Ok(json_to_attribute_value(value))
        }
    }
}

fn set_elements(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(SET_SEPARATOR)
        .map(str::trim)
        .filter(|element| !element.is_empty())
}

fn non_empty(values: BTreeSet<String>) -> Result<Vec<String>, ConversionError> {
    if values.is_empty() {
        return Err(ConversionError::empty_set());
    }
    Ok(values.into_iter().collect())
}

fn parse_number(raw: &str) -> Result<String, ConversionError> {
    let trimmed = raw.trim();
    match canonical_number(trimmed) {
        Some(_) => Ok(trimmed.to_owned()),
        None => Err(not_a_number(raw)),
    }
}

fn not_a_number(raw: &str) -> ConversionError {
    ConversionError::invalid_value(format!("cannot parse '{raw}' as a number"))
}

/// Most significant digits a DynamoDB number may carry.
const MAX_PRECISION: usize = 38;

/// Returns the canonical decimal text of a number DynamoDB would accept, or `None` if it would not.
///
/// DynamoDB compares numbers by value, so `1`, `1.0`, `007` and `1e0` are the same key. The
/// canonical form has no exponent, no leading zeros, no trailing fractional zeros, and no sign on
/// zero.
pub fn canonical_number(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let (negative, unsigned) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let (mantissa, exponent) = match unsigned.find(|c| c == 'e' || c == 'E') {
        Some(at) => (&unsigned[..at], unsigned[at + 1..].parse::<i32>().ok()?),
        None => (unsigned, 0),
    };
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (int_part.is_empty() && frac_part.is_empty()) || !is_digits(int_part) || !is_digits(frac_part)
    {
        return None;
    }

    let digits = format!("{int_part}{frac_part}");
    let leading = digits.bytes().take_while(|b| *b == b'0').count();
    let significant = digits[leading..].trim_end_matches('0');
    if significant.is_empty() {
        return Some("0".to_owned());
    }
    if significant.len() > MAX_PRECISION {
        return None;
    }
    // Digits before the decimal point, counted from the first significant digit.
    let point = int_part.len() as i64 + i64::from(exponent) - leading as i64;
    if !(-129..=126).contains(&point) {
        return None;
    }

    let width = significant.len() as i64;
    let mut out = String::with_capacity(significant.len() + point.unsigned_abs() as usize + 3);
    if negative {
        out.push('-');
    }
    if point <= 0 {
        out.push_str("0.");
        out.extend(std::iter::repeat('0').take(point.unsigned_abs() as usize));
        out.push_str(significant);
    } else if point >= width {
        out.push_str(significant);
        out.extend(std::iter::repeat('0').take((point - width) as usize));
    } else {
        let (whole, fraction) = significant.split_at(point as usize);
        out.push_str(whole);
        out.push('.');
        out.push_str(fraction);
    }
    Some(out)
}

fn parse_bool(raw: &str) -> Result<bool, ConversionError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ConversionError::invalid_value(format!(
            "cannot parse '{raw}' as a bool"
        ))),
    }
}

/// `-?(0|[1-9][0-9]*)(\.[0-9]+)?`
fn is_plain_number(raw: &str) -> bool {
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (digits, None),
    };
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int_part) || (int_part.len() > 1 && int_part.starts_with('0')) {
        return false;
    }
    frac_part.map_or(true, all_digits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn infers_numbers_only_when_unambiguous() {
        assert_eq!(convert_cell("3", None).unwrap(), AttributeValue::N("3".into()));
        assert_eq!(convert_cell("0", None).unwrap(), AttributeValue::N("0".into()));
        assert_eq!(convert_cell("-12.50", None).unwrap(), AttributeValue::N("-12.50".into()));
        for ambiguous in ["007", "+1", "1e3", "1.", ".5", "", "-", "NaN", "true", "12 "] {
            assert_eq!(
                convert_cell(ambiguous, None).unwrap(),
                AttributeValue::S(ambiguous.into()),
                "{ambiguous:?} should stay a string"
            );
        }
    }

    #[test]
    fn explicit_string_hint_keeps_digits_as_text() {
        assert_eq!(
            convert_cell("42", Some(ColumnType::String)).unwrap(),
            AttributeValue::S("42".into())
        );
    }

    #[test]
    fn number_hint_rejects_text() {
        let err = convert_cell("ten", Some(ColumnType::Number)).unwrap_err();
        assert!(err.to_string().contains("cannot parse 'ten' as a number"));
        assert!(convert_cell("inf", Some(ColumnType::Number)).is_err());
        assert_eq!(
            convert_cell(" 1e3 ", Some(ColumnType::Number)).unwrap(),
            AttributeValue::N("1e3".into())
        );
    }

    #[test]
    fn inferred_values_keep_their_text() {
        assert_eq!(convert_cell("1234", None).unwrap(), AttributeValue::N("1234".into()));
        assert_eq!(convert_cell("10.50", None).unwrap(), AttributeValue::N("10.50".into()));
        assert_eq!(
            convert_cell("Groceries", None).unwrap(),
            AttributeValue::S("Groceries".into())
        );
        let too_precise = "1".repeat(39);
        assert_eq!(
            convert_cell(&too_precise, None).unwrap(),
            AttributeValue::S(too_precise.clone())
        );
    }

    #[test]
    fn canonical_numbers_compare_by_value() {
        for (raw, canonical) in [
            ("1", "1"),
            ("1.0", "1"),
            ("007", "7"),
            ("+7", "7"),
            ("1e3", "1000"),
            ("10.50", "10.5"),
            ("0.001", "0.001"),
            ("12.5e-1", "1.25"),
            (".5", "0.5"),
            ("5.", "5"),
            ("-0.00", "0"),
            ("-3.140", "-3.14"),
        ] {
            assert_eq!(canonical_number(raw).as_deref(), Some(canonical), "{raw:?}");
        }
        for invalid in ["", "-", ".", "e3", "1e", "1.2.3", "ten", "inf", "NaN", "1e200", "1 000"] {
            assert_eq!(canonical_number(invalid), None, "{invalid:?}");
        }
        assert_eq!(canonical_number(&"9".repeat(39)), None);
    }

    #[test]
    fn bool_and_binary_hints() {
        assert_eq!(
            convert_cell("TRUE", Some(ColumnType::Bool)).unwrap(),
            AttributeValue::Bool(true)
        );
        assert!(convert_cell("yes", Some(ColumnType::Bool)).is_err());
        assert_eq!(
            convert_cell("aGk=", Some(ColumnType::Binary)).unwrap(),
            AttributeValue::B(Blob::new(b"hi".to_vec()))
        );
        assert!(convert_cell("not base64!", Some(ColumnType::Binary)).is_err());
    }

    #[test]
    fn set_hints_split_and_deduplicate() {
        assert_eq!(
            convert_cell("b| a |b||", Some(ColumnType::StringSet)).unwrap(),
            AttributeValue::Ss(vec!["a".into(), "b".into()])
        );
        assert_eq!(
            convert_cell("3|1|1.0", Some(ColumnType::NumberSet)).unwrap(),
            AttributeValue::Ns(vec!["1".into(), "3".into()])
        );
        assert!(convert_cell(" | ", Some(ColumnType::StringSet)).is_err());
        assert!(convert_cell("1|x", Some(ColumnType::NumberSet)).is_err());
    }

    #[test]
    fn json_hint_builds_maps() {
        let av = convert_cell(r#"{"total": 10.5, "tags": ["a"]}"#, Some(ColumnType::Json)).unwrap();
        let AttributeValue::M(map) = av else {
            panic!("expected a map, got {av:?}");
        };
        assert_eq!(map["total"], AttributeValue::N("10.5".into()));
        assert_eq!(map["tags"], AttributeValue::L(vec![AttributeValue::S("a".into())]));
        assert!(convert_cell("{", Some(ColumnType::Json)).is_err());
    }
}
