//! Property-based tests for the import pipeline.
//!
//! These check invariants that should hold for any input:
//! - field-name sanitizing is idempotent and de-duplication yields distinct names
//! - delimiter detection always picks a supported delimiter
//! - a byte buffer (streamed) and the same text (buffered) import identically
//! - numeric inference is all-or-nothing per field

use proptest::prelude::*;

use dsv_import::delimiter::guess_delimiter;
use dsv_import::inference::TypeInferencer;
use dsv_import::prelude::*;
use dsv_import::sanitize::{sanitize_field_name, valid_data_attribute_names};

fn cell() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z ]{0,6}",
        "-?[0-9]{1,5}(\\.[0-9]{1,2})?",
        Just("NA".to_string()),
        Just(String::new()),
    ]
}

/// Builds delimited text with a fixed header and the given rows.
fn delimited(rows: &[Vec<String>], delimiter: char) -> String {
    let mut text = ["alpha", "beta", "gamma"].join(&delimiter.to_string());
    text.push('\n');
    for row in rows {
        let quoted: Vec<String> = row.iter().map(|c| format!("\"{c}\"")).collect();
        text.push_str(&quoted.join(&delimiter.to_string()));
        text.push('\n');
    }
    text
}

proptest! {
    #[test]
    fn sanitize_is_idempotent(name in "\\PC{0,12}") {
        let once = sanitize_field_name(&name);
        prop_assert_eq!(sanitize_field_name(&once), once.clone());
        prop_assert!(!once.is_empty());
    }

    #[test]
    fn attribute_names_are_unique(names in prop::collection::vec("[A-Za-z0-9 !@-]{0,4}", 0..12)) {
        let out = valid_data_attribute_names(&names);
        prop_assert_eq!(out.len(), names.len());
        let mut deduped = out.clone();
        deduped.sort();
        deduped.dedup();
        prop_assert_eq!(deduped.len(), out.len());
    }

    #[test]
    fn detection_never_fails(sample in "\\PC{0,64}") {
        let delimiter = guess_delimiter(&sample);
        prop_assert!(Delimiter::SUPPORTED.contains(&delimiter));
    }

    #[test]
    fn buffered_and_streamed_agree(
        rows in prop::collection::vec(prop::collection::vec(cell(), 3), 0..20),
        delimiter in prop::sample::select(vec!['|', '\t', ',', ';']),
    ) {
        let text = delimited(&rows, delimiter);
        let options = ImportOptions::new();
        let buffered = Importer::new().import(Source::text(text.clone()), &options).unwrap();
        let streamed = Importer::new()
            .with_config(ImportConfig::default().with_sniff_prefix_len(16))
            .import(Source::bytes(text.into_bytes()), &options)
            .unwrap();
        prop_assert_eq!(&buffered, &streamed);
        prop_assert_eq!(buffered.info.input_delimiter.as_char(), delimiter);
    }

    #[test]
    fn inference_is_all_or_nothing(values in prop::collection::vec(cell(), 1..30)) {
        let records: Vec<Record> = values
            .iter()
            .map(|v| [("f".to_string(), Value::from(v.as_str()))].into_iter().collect())
            .collect();
        let outcome = TypeInferencer::default().infer(DataTable::new(records));
        let column = outcome.table.column("f");
        let numeric = column.iter().all(|v| !matches!(v, Some(Value::String(_))));
        let untouched = column.iter().all(|v| matches!(v, Some(Value::String(_))));
        prop_assert!(numeric || untouched);
        prop_assert_eq!(numeric, !outcome.auto_detected.is_empty());
    }
}
