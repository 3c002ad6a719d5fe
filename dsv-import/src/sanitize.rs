//! Field name cleanup.
//!
//! Two separate concerns live here:
//!
//! - table hygiene: [`is_invalid_field_name`] flags names (blank ones) that
//!   the importer deletes from the table outright;
//! - attribute export: [`sanitize_field_name`] and [`valid_data_attribute_names`]
//!   turn arbitrary field names into unique, valid `data-*` attribute names.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::table::DataTable;

/// Whether a field name is unusable and should be removed from the table.
pub fn is_invalid_field_name(name: &str) -> bool {
    name.trim().is_empty()
}

/// Converts one name to a valid attribute-name fragment.
///
/// The name is lowercased and stripped to `[a-z0-9_-]`. An empty result, or
/// one that starts with a digit, a hyphen or the reserved prefix `xml`, gets
/// a leading underscore.
///
/// ```rust
/// use dsv_import::sanitize::sanitize_field_name;
///
/// assert_eq!(sanitize_field_name("1stName"), "_1stname");
/// assert_eq!(sanitize_field_name("Pop. 2010"), "pop2010");
/// ```
pub fn sanitize_field_name(name: &str) -> String {
    let cleaned: String = name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_' || *c == '-')
        .collect();
    let needs_prefix = match cleaned.chars().next() {
        None => true,
        Some(c) => c.is_ascii_digit() || c == '-' || cleaned.starts_with("xml"),
    };
    if needs_prefix {
        format!("_{cleaned}")
    } else {
        cleaned
    }
}

/// Makes every name in the list distinct, keeping list order.
///
/// Names that occur once are kept. Each member of a repeated group gets a
/// numeric suffix counting up from 1, skipping any name already taken.
pub fn uniqify_names(names: &[String]) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for name in names {
        *counts.entry(name.as_str()).or_default() += 1;
    }
    let is_repeated = |name: &str| counts.get(name).is_some_and(|&n| n > 1);

    let mut taken: HashSet<String> = names
        .iter()
        .filter(|name| !is_repeated(name.as_str()))
        .cloned()
        .collect();
    let mut suffixes: HashMap<&str, usize> = HashMap::new();

    names
        .iter()
        .map(|name| {
            if !is_repeated(name) {
                return name.clone();
            }
            let suffix = suffixes.entry(name.as_str()).or_default();
            loop {
                *suffix += 1;
                let candidate = format!("{name}{suffix}");
                if taken.insert(candidate.clone()) {
                    return candidate;
                }
            }
        })
        .collect()
}

/// Sanitizes and de-duplicates a list of field names.
pub fn valid_data_attribute_names(names: &[String]) -> Vec<String> {
    let sanitized: Vec<String> = names.iter().map(|n| sanitize_field_name(n)).collect();
    uniqify_names(&sanitized)
}

/// One record's `data-*` attributes, in field order.
pub type DataAttributes = IndexMap<String, String>;

/// Renders every record of `table` as `data-<name>` attributes.
///
/// A [`Diagnostic::RenamedField`] is reported for each field whose
/// attribute name differs from the field name. Missing and null values are
/// written as empty strings.
pub fn export_data_attributes(table: &DataTable, sink: &dyn DiagnosticSink) -> Vec<DataAttributes> {
    let fields = table.field_names();
    let names = valid_data_attribute_names(fields);
    let attr_names: Vec<String> = names.iter().map(|n| format!("data-{n}")).collect();

    for ((field, name), attr) in fields.iter().zip(&names).zip(&attr_names) {
        if name != field {
            sink.report(Diagnostic::RenamedField {
                from: field.clone(),
                to: attr.clone(),
            });
        }
    }

    table
        .records()
        .iter()
        .map(|record| {
            fields
                .iter()
                .zip(&attr_names)
                .map(|(field, attr)| {
                    let value = record.get(field).map(ToString::to_string).unwrap_or_default();
                    (attr.clone(), value)
                })
                .collect()
        })
        .collect()
}
