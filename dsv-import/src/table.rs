//! The owned record table produced by an import.
//!
//! A [`DataTable`] holds an ordered sequence of [`Record`]s and the field
//! names discovered from the first record. A [`Dataset`] wraps exactly one
//! table in a [`Layer`] and carries [`DatasetInfo`] metadata.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::delimiter::Delimiter;

/// A single cell value.
///
/// Freshly tokenized records only contain [`Value::String`]; type inference
/// turns whole fields into [`Value::Number`] / [`Value::Null`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// A missing or unparsable value
    Null,
    /// A numeric value
    Number(f64),
    /// Raw or string-typed text
    String(String),
}

impl Value {
    /// Returns the text if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the number if this is a numeric value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<Option<f64>> for Value {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Value::Null, Value::Number)
    }
}

/// One row: field name to value, in field-discovery order.
pub type Record = IndexMap<String, Value>;

/// An ordered collection of records sharing one field list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DataTable {
    fields: Vec<String>,
    records: Vec<Record>,
}

impl DataTable {
    /// Builds a table; the field list is taken from the first record.
    pub fn new(records: Vec<Record>) -> Self {
        let fields = records
            .first()
            .map(|rec| rec.keys().cloned().collect())
            .unwrap_or_default();
        Self { fields, records }
    }

    /// Field names in discovery order.
    pub fn field_names(&self) -> &[String] {
        &self.fields
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn field_exists(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f == name)
    }

    /// Values of one field, top to bottom. Records lacking the field yield `None`.
    pub fn column(&self, name: &str) -> Vec<Option<&Value>> {
        self.records.iter().map(|rec| rec.get(name)).collect()
    }

    /// Removes every field whose name matches `predicate`, returning the removed names.
    pub fn delete_fields<F>(&mut self, predicate: F) -> Vec<String>
    where
        F: Fn(&str) -> bool,
    {
        let (doomed, kept): (Vec<String>, Vec<String>) =
            self.fields.drain(..).partition(|f| predicate(f));
        self.fields = kept;
        if !doomed.is_empty() {
            for rec in &mut self.records {
                for name in &doomed {
                    rec.shift_remove(name);
                }
            }
        }
        doomed
    }
}

/// A table plus (eventually) geometry; only the table is produced here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layer {
    pub data: DataTable,
}

/// Metadata recorded during import.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetInfo {
    /// The delimiter the sniffer settled on
    pub input_delimiter: Delimiter,
}

/// The result of an import: exactly one layer holding the table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub layers: Vec<Layer>,
    pub info: DatasetInfo,
}

impl Dataset {
    /// Wraps a table in a single-layer dataset.
    pub fn single(table: DataTable, input_delimiter: Delimiter) -> Self {
        Self {
            layers: vec![Layer { data: table }],
            info: DatasetInfo { input_delimiter },
        }
    }

    /// The imported table.
    pub fn table(&self) -> &DataTable {
        &self.layers[0].data
    }
}
