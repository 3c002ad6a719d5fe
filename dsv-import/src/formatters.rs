//! Rendering imported datasets.
//!
//! Three formatters are provided behind the [`DatasetFormatter`] trait:
//! JSON for programmatic consumption, a plain-text preview for terminals and
//! Markdown for reports.
//!
//! # Examples
//!
//! ```rust
//! use dsv_import::formatters::{DatasetFormatter, HumanFormatter};
//! use dsv_import::importer::import_delim;
//! use dsv_import::options::ImportOptions;
//!
//! let dataset = import_delim("a,b\n1,x", &ImportOptions::new()).unwrap();
//! let text = HumanFormatter::new().format(&dataset).unwrap();
//! assert!(text.contains("1 record"));
//! ```

use std::fmt::{self, Write};

use serde::Serialize;

use crate::error::{ImportError, Result};
use crate::table::{DataTable, Dataset, Record};

/// Configuration options for formatting datasets.
#[derive(Debug, Clone)]
pub struct FormatterConfig {
    /// Maximum number of records to render (`None` for all)
    pub max_rows: Option<usize>,
    /// Include delimiter, record and field counts
    pub include_summary: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            max_rows: Some(10),
            include_summary: true,
        }
    }
}

impl FormatterConfig {
    /// Creates a minimal configuration showing a short preview only.
    pub fn minimal() -> Self {
        Self {
            max_rows: Some(5),
            include_summary: false,
        }
    }

    /// Creates a configuration rendering every record.
    pub fn full() -> Self {
        Self {
            max_rows: None,
            include_summary: true,
        }
    }

    /// Sets the maximum number of records to render.
    pub fn with_max_rows(mut self, max_rows: Option<usize>) -> Self {
        self.max_rows = max_rows;
        self
    }

    /// Sets whether to include the summary.
    pub fn with_summary(mut self, include: bool) -> Self {
        self.include_summary = include;
        self
    }

    fn preview<'a>(&self, table: &'a DataTable) -> &'a [Record] {
        let records = table.records();
        match self.max_rows {
            Some(max) if max < records.len() => &records[..max],
            _ => records,
        }
    }
}

/// Trait for rendering a [`Dataset`] as text.
pub trait DatasetFormatter {
    /// Formats a dataset using the formatter's own configuration.
    fn format(&self, dataset: &Dataset) -> Result<String>;

    /// Formats a dataset with custom configuration.
    fn format_with_config(&self, dataset: &Dataset, _config: &FormatterConfig) -> Result<String> {
        self.format(dataset)
    }
}

fn render_error(e: fmt::Error) -> ImportError {
    ImportError::Internal(format!("Failed to format dataset: {e}"))
}

/// Formats datasets as JSON.
///
/// With a summary the output is an object holding `delimiter`, `fields`,
/// `record_count` and `records`; without one it is the bare records array.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    config: FormatterConfig,
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a JSON formatter that writes every record.
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::full(),
            pretty: true,
        }
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            pretty: true,
        }
    }

    /// Sets whether to use pretty-printed JSON.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct JsonSummary<'a> {
    delimiter: char,
    fields: &'a [String],
    record_count: usize,
    records: &'a [Record],
}

impl DatasetFormatter for JsonFormatter {
    fn format(&self, dataset: &Dataset) -> Result<String> {
        self.format_with_config(dataset, &self.config)
    }

    fn format_with_config(&self, dataset: &Dataset, config: &FormatterConfig) -> Result<String> {
        let table = dataset.table();
        let records = config.preview(table);
        let value = if config.include_summary {
            serde_json::to_value(JsonSummary {
                delimiter: dataset.info.input_delimiter.as_char(),
                fields: table.field_names(),
                record_count: table.len(),
                records,
            })?
        } else {
            serde_json::to_value(records)?
        };
        let out = if self.pretty {
            serde_json::to_string_pretty(&value)?
        } else {
            serde_json::to_string(&value)?
        };
        Ok(out)
    }
}

/// Formats datasets as an aligned plain-text table.
#[derive(Debug, Clone, Default)]
pub struct HumanFormatter {
    config: FormatterConfig,
}

impl HumanFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config }
    }
}

impl DatasetFormatter for HumanFormatter {
    fn format(&self, dataset: &Dataset) -> Result<String> {
        self.format_with_config(dataset, &self.config)
    }

    fn format_with_config(&self, dataset: &Dataset, config: &FormatterConfig) -> Result<String> {
        let mut output = String::new();
        write_human(&mut output, dataset, config).map_err(render_error)?;
        Ok(output)
    }
}

fn write_human(out: &mut String, dataset: &Dataset, config: &FormatterConfig) -> fmt::Result {
    let table = dataset.table();
    let fields = table.field_names();

    if config.include_summary {
        writeln!(
            out,
            "Imported {} with {} (delimiter: '{}')",
            plural(table.len(), "record"),
            plural(fields.len(), "field"),
            dataset.info.input_delimiter
        )?;
        if !fields.is_empty() {
            writeln!(out, "Fields: {}", fields.join(", "))?;
        }
    }

    let rows = config.preview(table);
    if fields.is_empty() || rows.is_empty() {
        return Ok(());
    }

    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|rec| fields.iter().map(|f| cell_text(rec, f)).collect())
        .collect();
    let widths: Vec<usize> = fields
        .iter()
        .enumerate()
        .map(|(i, f)| {
            cells
                .iter()
                .map(|row| row[i].chars().count())
                .chain([f.chars().count()])
                .max()
                .unwrap_or_default()
        })
        .collect();

    writeln!(out)?;
    write_aligned(out, fields.iter().map(String::as_str), &widths)?;
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    writeln!(out, "{}", rule.join("-+-"))?;
    for row in &cells {
        write_aligned(out, row.iter().map(String::as_str), &widths)?;
    }

    let hidden = table.len() - rows.len();
    if hidden > 0 {
        writeln!(out, "... {} more", plural(hidden, "record"))?;
    }
    Ok(())
}

fn write_aligned<'a, I>(out: &mut String, cells: I, widths: &[usize]) -> fmt::Result
where
    I: Iterator<Item = &'a str>,
{
    let padded: Vec<String> = cells
        .zip(widths)
        .map(|(cell, w)| format!("{cell:<w$}", w = *w))
        .collect();
    writeln!(out, "{}", padded.join(" | ").trim_end())
}

fn plural(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("{n} {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

fn cell_text(record: &Record, field: &str) -> String {
    record.get(field).map(ToString::to_string).unwrap_or_default()
}

/// Formats datasets as Markdown.
#[derive(Debug, Clone)]
pub struct MarkdownFormatter {
    config: FormatterConfig,
    heading_level: u8,
}

impl MarkdownFormatter {
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
            heading_level: 2,
        }
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            heading_level: 2,
        }
    }

    /// Sets the heading level for the main heading (1-6).
    pub fn with_heading_level(mut self, level: u8) -> Self {
        self.heading_level = level.clamp(1, 6);
        self
    }
}

impl Default for MarkdownFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetFormatter for MarkdownFormatter {
    fn format(&self, dataset: &Dataset) -> Result<String> {
        self.format_with_config(dataset, &self.config)
    }

    fn format_with_config(&self, dataset: &Dataset, config: &FormatterConfig) -> Result<String> {
        let mut output = String::new();
        self.write_markdown(&mut output, dataset, config)
            .map_err(render_error)?;
        Ok(output)
    }
}

impl MarkdownFormatter {
    fn write_markdown(&self, out: &mut String, dataset: &Dataset, config: &FormatterConfig) -> fmt::Result {
        let table = dataset.table();
        let fields = table.field_names();
        let h = "#".repeat(self.heading_level as usize);

        writeln!(out, "{h} Imported Data")?;
        if config.include_summary {
            writeln!(out)?;
            writeln!(out, "| Property | Value |")?;
            writeln!(out, "|----------|-------|")?;
            writeln!(
                out,
                "| Delimiter | `{}` |",
                escape_markdown(&dataset.info.input_delimiter.to_string())
            )?;
            writeln!(out, "| Records | {} |", table.len())?;
            writeln!(out, "| Fields | {} |", fields.len())?;
        }

        let rows = config.preview(table);
        if fields.is_empty() {
            return Ok(());
        }
        writeln!(out)?;
        writeln!(out, "{h}# Records")?;
        writeln!(out)?;
        let header: Vec<String> = fields.iter().map(|f| escape_markdown(f)).collect();
        writeln!(out, "| {} |", header.join(" | "))?;
        writeln!(out, "|{}", "---|".repeat(fields.len()))?;
        for rec in rows {
            let cells: Vec<String> = fields
                .iter()
                .map(|f| escape_markdown(&cell_text(rec, f)))
                .collect();
            writeln!(out, "| {} |", cells.join(" | "))?;
        }
        if rows.len() < table.len() {
            writeln!(out)?;
            writeln!(out, "_Showing {} of {} records._", rows.len(), table.len())?;
        }
        Ok(())
    }
}

fn escape_markdown(text: &str) -> String {
    text.replace('|', "\\|").replace(['\n', '\r'], " ")
}
