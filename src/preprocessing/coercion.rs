//! Declared column coercion and bathroom descriptor parsing

use super::{is_missing_token, text_values, CellOutcome, CoercionType};
use crate::error::{PricerError, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// `NaiveDate::num_days_from_ce` of 1970-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// A successfully coerced cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellValue {
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
}

/// Per-column coercion counts for the cleaning report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnCoercionStats {
    pub column: String,
    pub dtype: String,
    pub parsed: usize,
    pub missing: usize,
    pub defaulted: usize,
}

/// Coerce one raw cell to the declared type
pub fn coerce_cell(raw: Option<&str>, dtype: CoercionType) -> CellOutcome<CellValue> {
    let text = match raw.map(str::trim) {
        Some(t) if !is_missing_token(t) => t,
        _ => return CellOutcome::Missing,
    };

    let parsed = match dtype {
        CoercionType::Percentage => parse_percentage(text).map(CellValue::Float),
        CoercionType::Boolean => parse_flag(text).map(CellValue::Bool),
        CoercionType::DateTime => parse_date(text).map(CellValue::Date),
        CoercionType::Currency => parse_currency(text).map(CellValue::Float),
        CoercionType::Number => parse_number(text).map(CellValue::Float),
    };

    match parsed {
        Ok(value) => CellOutcome::Parsed(value),
        Err(reason) => CellOutcome::Defaulted { reason },
    }
}

fn parse_number(text: &str) -> std::result::Result<f64, String> {
    text.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("'{}' is not a number", text))
}

fn parse_percentage(text: &str) -> std::result::Result<f64, String> {
    let stripped = text.trim_end_matches('%').trim();
    parse_number(stripped)
        .map(|v| v / 100.0)
        .map_err(|_| format!("'{}' is not a percentage", text))
}

fn parse_currency(text: &str) -> std::result::Result<f64, String> {
    let stripped: String = text.chars().filter(|c| *c != '$' && *c != ',').collect();
    let amount = parse_number(stripped.trim()).map_err(|_| format!("'{}' is not an amount", text))?;
    if amount < 0.0 {
        return Err(format!("'{}' is a negative amount", text));
    }
    Ok(amount)
}

fn parse_flag(text: &str) -> std::result::Result<bool, String> {
    match text.to_ascii_lowercase().as_str() {
        "t" | "true" => Ok(true),
        "f" | "false" => Ok(false),
        _ => Err(format!("'{}' is not a t/f flag", text)),
    }
}

fn parse_date(text: &str) -> std::result::Result<NaiveDate, String> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|dt| dt.date())
        })
        .ok_or_else(|| format!("'{}' is not a date", text))
}

/// Coerce a declared column in place.
///
/// Malformed cells become null and are counted. A column that has values but
/// where not a single one coerces is a configuration error.
pub(crate) fn coerce_column(
    df: &mut DataFrame,
    column: &str,
    dtype: CoercionType,
) -> Result<ColumnCoercionStats> {
    let raw = text_values(df, column).map_err(|_| {
        PricerError::config(format!(
            "column '{}' declared as {} is missing from the dataset",
            column, dtype
        ))
    })?;

    let mut stats = ColumnCoercionStats {
        column: column.to_string(),
        dtype: dtype.to_string(),
        ..Default::default()
    };
    let mut first_failure: Option<String> = None;

    let outcomes: Vec<Option<CellValue>> = raw
        .iter()
        .map(|cell| match coerce_cell(cell.as_deref(), dtype) {
            CellOutcome::Parsed(v) => {
                stats.parsed += 1;
                Some(v)
            }
            CellOutcome::Missing => {
                stats.missing += 1;
                None
            }
            CellOutcome::Defaulted { reason } => {
                stats.defaulted += 1;
                first_failure.get_or_insert(reason);
                None
            }
        })
        .collect();

    if stats.parsed == 0 && stats.defaulted > 0 {
        return Err(PricerError::config(format!(
            "column '{}' cannot be coerced to {}: {}",
            column,
            dtype,
            first_failure.unwrap_or_default()
        )));
    }

    let series = match dtype {
        CoercionType::Boolean => {
            let values: Vec<Option<bool>> = outcomes
                .iter()
                .map(|v| match v {
                    Some(CellValue::Bool(b)) => Some(*b),
                    _ => None,
                })
                .collect();
            Series::new(column.into(), values)
        }
        CoercionType::DateTime => {
            let days: Vec<Option<i32>> = outcomes
                .iter()
                .map(|v| match v {
                    Some(CellValue::Date(d)) => Some(d.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE),
                    _ => None,
                })
                .collect();
            Series::new(column.into(), days).cast(&DataType::Date)?
        }
        CoercionType::Percentage | CoercionType::Currency | CoercionType::Number => {
            let values: Vec<Option<f64>> = outcomes
                .iter()
                .map(|v| match v {
                    Some(CellValue::Float(f)) => Some(*f),
                    _ => None,
                })
                .collect();
            Series::new(column.into(), values)
        }
    };

    df.with_column(series)?;
    Ok(stats)
}

/// Numeric and shared-ness parts of a bathroom descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct BathroomParts {
    pub bathrooms: CellOutcome<f64>,
    pub is_shared: bool,
}

fn bathroom_token() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"(\d+\.?\d*)").expect("bathroom token pattern is valid"))
}

/// Split a descriptor such as "1.5 shared baths" into (1.5, shared).
///
/// The count is the first numeric token; descriptors without one ("Half-bath")
/// degrade to a null count.
pub fn parse_bathrooms(text: Option<&str>) -> BathroomParts {
    let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return BathroomParts {
            bathrooms: CellOutcome::Missing,
            is_shared: false,
        };
    };

    let is_shared = text.to_lowercase().contains("shared");
    let bathrooms = match bathroom_token()
        .find(text)
        .and_then(|m| m.as_str().parse::<f64>().ok())
    {
        Some(n) => CellOutcome::Parsed(n),
        None => CellOutcome::Defaulted {
            reason: format!("no numeric token in '{}'", text),
        },
    };

    BathroomParts { bathrooms, is_shared }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_becomes_fraction() {
        assert_eq!(
            coerce_cell(Some("87%"), CoercionType::Percentage),
            CellOutcome::Parsed(CellValue::Float(0.87))
        );
        assert!(coerce_cell(Some("most"), CoercionType::Percentage).is_defaulted());
        assert_eq!(coerce_cell(None, CoercionType::Percentage), CellOutcome::Missing);
        assert_eq!(coerce_cell(Some("N/A"), CoercionType::Percentage), CellOutcome::Missing);
    }

    #[test]
    fn test_currency_strips_symbols() {
        assert_eq!(
            coerce_cell(Some("$1,250.00"), CoercionType::Currency),
            CellOutcome::Parsed(CellValue::Float(1250.0))
        );
        assert!(coerce_cell(Some("-$5.00"), CoercionType::Currency).is_defaulted());
    }

    #[test]
    fn test_flags_and_dates() {
        assert_eq!(
            coerce_cell(Some("t"), CoercionType::Boolean),
            CellOutcome::Parsed(CellValue::Bool(true))
        );
        assert_eq!(
            coerce_cell(Some("f"), CoercionType::Boolean),
            CellOutcome::Parsed(CellValue::Bool(false))
        );
        assert!(coerce_cell(Some("maybe"), CoercionType::Boolean).is_defaulted());
        assert_eq!(
            coerce_cell(Some("2015-03-21"), CoercionType::DateTime),
            CellOutcome::Parsed(CellValue::Date(NaiveDate::from_ymd_opt(2015, 3, 21).unwrap()))
        );
    }

    #[test]
    fn test_parse_bathrooms() {
        let shared = parse_bathrooms(Some("1 shared bath"));
        assert_eq!(shared.bathrooms, CellOutcome::Parsed(1.0));
        assert!(shared.is_shared);

        let private = parse_bathrooms(Some("2.5 baths"));
        assert_eq!(private.bathrooms, CellOutcome::Parsed(2.5));
        assert!(!private.is_shared);

        let half = parse_bathrooms(Some("Shared half-bath"));
        assert!(half.bathrooms.is_defaulted());
        assert!(half.is_shared);

        let missing = parse_bathrooms(None);
        assert_eq!(missing.bathrooms, CellOutcome::Missing);
        assert!(!missing.is_shared);
    }

    #[test]
    fn test_coerce_column_counts_degraded_cells() {
        let mut df = df!(
            "host_response_rate" => &[Some("100%"), Some("most"), None, Some("50%"), Some("N/A")],
        )
        .unwrap();

        let stats = coerce_column(&mut df, "host_response_rate", CoercionType::Percentage).unwrap();
        assert_eq!(stats.parsed, 2);
        assert_eq!(stats.defaulted, 1);
        assert_eq!(stats.missing, 2);

        let col = df.column("host_response_rate").unwrap().f64().unwrap();
        assert_eq!(col.get(0), Some(1.0));
        assert_eq!(col.get(1), None);
        assert_eq!(col.get(3), Some(0.5));
    }

    #[test]
    fn test_coerce_column_entirely_invalid_is_fatal() {
        let mut df = df!("price" => &["free", "ask me"]).unwrap();
        let err = coerce_column(&mut df, "price", CoercionType::Currency).unwrap_err();
        assert!(matches!(err, PricerError::ConfigError(_)));
        assert!(err.to_string().contains("price"));
    }

    #[test]
    fn test_coerce_column_dates() {
        let mut df = df!("host_since" => &["2020-01-02", "bad"]).unwrap();
        coerce_column(&mut df, "host_since", CoercionType::DateTime).unwrap();
        assert_eq!(df.column("host_since").unwrap().dtype(), &DataType::Date);
        assert_eq!(df.column("host_since").unwrap().null_count(), 1);
    }
}
