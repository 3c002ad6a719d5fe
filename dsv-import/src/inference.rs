//! Field type inference and coercion.
//!
//! Every field is resolved independently, in field-discovery order:
//!
//! 1. a hint (explicit field name first, then `*`) forces the type;
//! 2. without a hint, a field becomes numeric only if every non-missing
//!    value parses as a number and at least one value does.
//!
//! Coercion never edits records in place. [`TypeInferencer::infer`] builds
//! a new record sequence that replaces the old one.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::options::{FieldType, FieldTypeHints};
use crate::table::{DataTable, Record, Value};

/// Tokens that mean "no value" and do not disqualify a numeric field.
pub const MISSING_VALUE_SENTINELS: [&str; 2] = ["NA", "NaN"];

static DECIMAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$").unwrap());

/// Parses one raw value as a number.
///
/// Whitespace is trimmed and thousands-separator commas are removed. Empty
/// or unparsable text yields `None`.
///
/// ```rust
/// use dsv_import::inference::parse_number;
///
/// assert_eq!(parse_number(" 1,200.5 "), Some(1200.5));
/// assert_eq!(parse_number(""), None);
/// assert_eq!(parse_number("$3"), None);
/// ```
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let digits = trimmed.replace(',', "");
    if !DECIMAL.is_match(&digits) {
        return None;
    }
    digits.parse::<f64>().ok()
}

/// Numeric coercion of a table value. Numbers pass through.
pub fn parse_number_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => Some(*n),
        Value::String(s) => parse_number(s),
        Value::Null => None,
    }
}

/// String coercion of a table value: null becomes the empty string.
pub fn parse_string_value(value: Value) -> Value {
    match value {
        Value::Null => Value::String(String::new()),
        other => other,
    }
}

/// Decides whether a whole column can be read as numbers.
///
/// A value that fails to parse aborts detection unless it is blank or a
/// missing-value sentinel. At least one value must parse.
pub fn try_numeric_field<'a, I>(values: I) -> bool
where
    I: IntoIterator<Item = Option<&'a Value>>,
{
    let mut parsed = 0usize;
    for value in values {
        let Some(value) = value else { continue };
        if parse_number_value(value).is_some() {
            parsed += 1;
            continue;
        }
        if let Value::String(raw) = value {
            let raw = raw.trim();
            if !raw.is_empty() && !MISSING_VALUE_SENTINELS.contains(&raw) {
                return false;
            }
        }
    }
    parsed > 0
}

/// Result of running inference over a table.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceOutcome {
    /// The table with coerced values
    pub table: DataTable,
    /// Fields converted to numbers without a hint, in field order
    pub auto_detected: Vec<String>,
}

/// Applies type hints and numeric auto-detection to a table.
#[derive(Debug, Clone, Default)]
pub struct TypeInferencer {
    hints: FieldTypeHints,
}

impl TypeInferencer {
    pub fn new(hints: FieldTypeHints) -> Self {
        Self { hints }
    }

    /// Decides the coercion for every field without touching the records.
    fn plan(&self, table: &DataTable) -> (HashMap<String, FieldType>, Vec<String>) {
        let mut conversions = HashMap::new();
        let mut auto_detected = Vec::new();
        for field in table.field_names() {
            match self.hints.resolve(field) {
                Some(ty) => {
                    conversions.insert(field.clone(), ty);
                }
                None if try_numeric_field(table.column(field)) => {
                    conversions.insert(field.clone(), FieldType::Number);
                    auto_detected.push(field.clone());
                }
                None => {}
            }
        }
        (conversions, auto_detected)
    }

    pub fn infer(&self, table: DataTable) -> InferenceOutcome {
        let (conversions, auto_detected) = self.plan(&table);
        if conversions.is_empty() {
            return InferenceOutcome {
                table,
                auto_detected,
            };
        }
        debug!(
            converted = conversions.len(),
            auto_detected = auto_detected.len(),
            "Coercing field types"
        );

        let records: Vec<Record> = table
            .into_records()
            .into_iter()
            .map(|record| {
                record
                    .into_iter()
                    .map(|(name, value)| {
                        let value = match conversions.get(&name) {
                            Some(FieldType::Number) => Value::from(parse_number_value(&value)),
                            Some(FieldType::String) => parse_string_value(value),
                            None => value,
                        };
                        (name, value)
                    })
                    .collect()
            })
            .collect();

        InferenceOutcome {
            table: DataTable::new(records),
            auto_detected,
        }
    }
}
