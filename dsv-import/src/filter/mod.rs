//! Per-record filtering and field projection applied during import.
//!
//! A filter expression (`csv_filter`) is compiled by a
//! [`RecordFilterCompiler`] into a [`CompiledFilter`]. A field list
//! (`csv_fields`) is compiled into a [`FieldMapper`]. [`ImportFilter`]
//! chains the two: the predicate runs first, and only records it keeps are
//! projected.

use std::fmt;

use crate::error::{ImportError, Result};
use crate::options::ImportOptions;
use crate::table::{Record, Value};

pub mod expression;

pub use expression::ExpressionCompiler;

/// The value an expression evaluates to.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Bool(bool),
    Number(f64),
    String(String),
    Null,
}

impl FilterValue {
    /// JavaScript-style truthiness.
    pub fn is_truthy(&self) -> bool {
        match self {
            FilterValue::Bool(b) => *b,
            FilterValue::Number(n) => *n != 0.0 && !n.is_nan(),
            FilterValue::String(s) => !s.is_empty(),
            FilterValue::Null => false,
        }
    }
}

impl From<&Value> for FilterValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => FilterValue::Null,
            Value::Number(n) => FilterValue::Number(*n),
            Value::String(s) => FilterValue::String(s.clone()),
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Bool(b) => write!(f, "{b}"),
            FilterValue::Number(n) => write!(f, "{n}"),
            FilterValue::String(s) => write!(f, "{s:?}"),
            FilterValue::Null => f.write_str("null"),
        }
    }
}

/// Evaluation context shared by all records of one import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterContext {
    /// Zero-based position of the record in the source
    pub record_index: usize,
}

/// A compiled filter expression.
pub trait CompiledFilter: Send + Sync {
    /// Evaluates the expression against one raw record.
    ///
    /// `Err` carries a description of the evaluation failure.
    fn evaluate(&self, record: &Record, ctx: &FilterContext) -> std::result::Result<FilterValue, String>;
}

/// Compiles user expressions into [`CompiledFilter`]s.
pub trait RecordFilterCompiler: Send + Sync {
    fn compile(&self, expression: &str) -> Result<Box<dyn CompiledFilter>>;
}

/// Projects and renames fields according to a `csv_fields` list.
///
/// Entries are `name` (keep as is) or `dest=src` (keep `src`, call it
/// `dest`). Surrounding quotes on either side are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapper {
    // (source, destination) in output order
    mapping: Vec<(String, String)>,
}

impl FieldMapper {
    pub fn parse<S: AsRef<str>>(entries: &[S]) -> Result<Self> {
        let mut mapping: Vec<(String, String)> = Vec::with_capacity(entries.len());
        for entry in entries {
            let entry = entry.as_ref();
            let mut parts = entry.split('=');
            let dest = trim_quotes(parts.next().unwrap_or_default());
            let src = parts.next().map(trim_quotes).unwrap_or(dest);
            if src.is_empty() || dest.is_empty() {
                return Err(ImportError::InvalidFieldSpec(entry.to_string()));
            }
            // a later entry for the same source replaces the earlier one in place
            match mapping.iter_mut().find(|(s, _)| s == src) {
                Some(existing) => existing.1 = dest.to_string(),
                None => mapping.push((src.to_string(), dest.to_string())),
            }
        }
        Ok(Self { mapping })
    }

    /// Builds the projected record; absent source fields are skipped.
    pub fn apply(&self, mut record: Record) -> Record {
        let mut out = Record::with_capacity(self.mapping.len());
        for (src, dest) in &self.mapping {
            if let Some(value) = record.get_mut(src) {
                out.insert(dest.clone(), std::mem::replace(value, Value::Null));
            }
        }
        out
    }
}

fn trim_quotes(s: &str) -> &str {
    let s = s.trim();
    for q in ['"', '\''] {
        if let Some(inner) = s.strip_prefix(q).and_then(|rest| rest.strip_suffix(q)) {
            return inner;
        }
    }
    s
}

/// The combined per-record filter built from [`ImportOptions`].
pub struct ImportFilter {
    expression: Option<(String, Box<dyn CompiledFilter>)>,
    mapper: Option<FieldMapper>,
}

impl ImportFilter {
    /// Returns `None` when neither `csv_filter` nor `csv_fields` is set.
    pub fn from_options(
        options: &ImportOptions,
        compiler: &dyn RecordFilterCompiler,
    ) -> Result<Option<Self>> {
        let expression = match options.csv_filter.as_deref() {
            Some(expr) => Some((expr.to_string(), compiler.compile(expr)?)),
            None => None,
        };
        let mapper = options
            .csv_fields
            .as_deref()
            .map(FieldMapper::parse)
            .transpose()?;
        if expression.is_none() && mapper.is_none() {
            return Ok(None);
        }
        Ok(Some(Self { expression, mapper }))
    }

    /// Keeps (and projects) or drops one record.
    ///
    /// A predicate result other than `true`/`false` is an error, as is any
    /// evaluation failure.
    pub fn apply(&self, record: Record, ctx: &FilterContext) -> Result<Option<Record>> {
        if let Some((expr, filter)) = &self.expression {
            match filter.evaluate(&record, ctx) {
                Ok(FilterValue::Bool(true)) => {}
                Ok(FilterValue::Bool(false)) => return Ok(None),
                Ok(_) => {
                    return Err(ImportError::filter_expression(
                        expr.as_str(),
                        "Filter expression must return true or false",
                    ))
                }
                Err(message) => return Err(ImportError::filter_expression(expr.as_str(), message)),
            }
        }
        Ok(Some(match &self.mapper {
            Some(mapper) => mapper.apply(record),
            None => record,
        }))
    }
}

impl fmt::Debug for ImportFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportFilter")
            .field("expression", &self.expression.as_ref().map(|(e, _)| e))
            .field("mapper", &self.mapper)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::from(*v)))
            .collect()
    }

    #[test]
    fn test_field_mapper() {
        let mapper = FieldMapper::parse(&["name", "population=pop", "'zip code'"]).unwrap();
        let out = mapper.apply(record(&[
            ("pop", "12"),
            ("name", "Ely"),
            ("extra", "x"),
            ("zip code", "89301"),
        ]));
        assert_eq!(
            out.keys().collect::<Vec<_>>(),
            ["name", "population", "zip code"]
        );
        assert_eq!(out["population"], Value::from("12"));
    }

    #[test]
    fn test_field_mapper_skips_missing() {
        let mapper = FieldMapper::parse(&["a", "b"]).unwrap();
        let out = mapper.apply(record(&[("b", "1")]));
        assert_eq!(out.keys().collect::<Vec<_>>(), ["b"]);
    }

    #[test]
    fn test_field_mapper_rejects_empty_sides() {
        for bad in ["=x", "x=", "", "''"] {
            assert!(matches!(
                FieldMapper::parse(&[bad]),
                Err(ImportError::InvalidFieldSpec(_))
            ));
        }
    }

    #[test]
    fn test_no_filter_configured() {
        let filter = ImportFilter::from_options(&ImportOptions::new(), &ExpressionCompiler).unwrap();
        assert!(filter.is_none());
    }

    #[test]
    fn test_filter_then_project() {
        let opts = ImportOptions::new()
            .with_csv_filter("state == 'NV'")
            .with_csv_fields(["name"]);
        let filter = ImportFilter::from_options(&opts, &ExpressionCompiler)
            .unwrap()
            .unwrap();
        let ctx = FilterContext::default();

        let kept = filter
            .apply(record(&[("name", "Ely"), ("state", "NV")]), &ctx)
            .unwrap();
        assert_eq!(kept, Some(record(&[("name", "Ely")])));

        let dropped = filter
            .apply(record(&[("name", "Bend"), ("state", "OR")]), &ctx)
            .unwrap();
        assert!(dropped.is_none());
    }

    #[test]
    fn test_non_boolean_result_is_error() {
        let opts = ImportOptions::new().with_csv_filter("name");
        let filter = ImportFilter::from_options(&opts, &ExpressionCompiler)
            .unwrap()
            .unwrap();
        let err = filter
            .apply(record(&[("name", "Ely")]), &FilterContext::default())
            .unwrap_err();
        match err {
            ImportError::FilterExpression { expression, message } => {
                assert_eq!(expression, "name");
                assert_eq!(message, "Filter expression must return true or false");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_evaluation_error_names_expression() {
        let opts = ImportOptions::new().with_csv_filter("missing > 3");
        let filter = ImportFilter::from_options(&opts, &ExpressionCompiler)
            .unwrap()
            .unwrap();
        let err = filter
            .apply(record(&[("name", "Ely")]), &FilterContext::default())
            .unwrap_err();
        assert!(err.to_string().contains("[missing > 3]"));
        assert!(err.to_string().contains("missing is not defined"));
    }

    #[test]
    fn test_truthiness() {
        assert!(FilterValue::Number(2.0).is_truthy());
        assert!(!FilterValue::Number(0.0).is_truthy());
        assert!(!FilterValue::String(String::new()).is_truthy());
        assert!(!FilterValue::Null.is_truthy());
    }
}
