//! dsv
//!
//! Imports delimited text files and prints them as a preview table, JSON or
//! Markdown. Warnings from the import are written to stderr.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use dsv_import::diagnostics::CollectingSink;
use dsv_import::formatters::{
    DatasetFormatter, FormatterConfig, HumanFormatter, JsonFormatter, MarkdownFormatter,
};
use dsv_import::importer::Importer;
use dsv_import::logging::setup::{init_logging, LoggingConfig};
use dsv_import::logging::LogConfig;
use dsv_import::options::{ImportConfig, ImportOptions};
use dsv_import::sanitize::export_data_attributes;
use dsv_import::sources::{expand_globs, Source};
use dsv_import::table::Dataset;
use tracing::Level;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Human,
    Json,
    Markdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Plain,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "dsv", author, version, about, long_about = None)]
struct Args {
    /// Input files or glob patterns; `-` reads standard input
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Text encoding of the input (e.g. utf-8, latin1, utf-16le)
    #[arg(long)]
    encoding: Option<String>,

    /// Keep only records for which this expression is true
    #[arg(long)]
    csv_filter: Option<String>,

    /// Fields to keep, comma separated; `dest=src` renames
    #[arg(long, value_delimiter = ',')]
    csv_fields: Option<Vec<String>>,

    /// Fields to keep as text, comma separated
    #[arg(long, value_delimiter = ',')]
    string_fields: Option<Vec<String>>,

    /// Type hints such as `pop:num`, `fips:str` or `+area`, comma separated
    #[arg(long, value_delimiter = ',')]
    field_types: Option<Vec<String>>,

    /// JSON file with import options; command-line flags take precedence
    #[arg(long)]
    options: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    format: OutputFormat,

    /// Maximum number of records to print (all records for JSON by default)
    #[arg(long)]
    max_rows: Option<usize>,

    /// Print `data-*` attributes per record instead of the table
    #[arg(long)]
    data_attributes: bool,

    /// Read files incrementally regardless of their size
    #[arg(long)]
    streaming: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Plain)]
    log_format: LogFormat,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Args {
    /// Options file first, then command-line overrides.
    fn import_options(&self) -> Result<ImportOptions> {
        let mut options = match &self.options {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("Unable to read options file {}", path.display()))?;
                ImportOptions::from_json_str(&json)
                    .with_context(|| format!("Invalid options file {}", path.display()))?
            }
            None => ImportOptions::default(),
        };
        if self.encoding.is_some() {
            options.encoding = self.encoding.clone();
        }
        if self.csv_filter.is_some() {
            options.csv_filter = self.csv_filter.clone();
        }
        if self.csv_fields.is_some() {
            options.csv_fields = self.csv_fields.clone();
        }
        if self.string_fields.is_some() {
            options.string_fields = self.string_fields.clone();
        }
        if self.field_types.is_some() {
            options.field_types = self.field_types.clone();
        }
        Ok(options)
    }

    fn import_config(&self) -> ImportConfig {
        let config = if self.streaming {
            ImportConfig::streaming()
        } else {
            ImportConfig::default()
        };
        if self.verbose > 1 {
            config.with_log_config(LogConfig::verbose())
        } else {
            config
        }
    }

    fn logging_config(&self) -> LoggingConfig {
        let config = match self.verbose {
            0 => LoggingConfig::default().with_import_level(Level::WARN),
            1 => LoggingConfig::default(),
            _ => LoggingConfig::development(),
        };
        config.with_json_format(self.log_format == LogFormat::Json)
    }

    fn formatter_config(&self) -> FormatterConfig {
        let base = match self.format {
            OutputFormat::Json => FormatterConfig::full(),
            OutputFormat::Human | OutputFormat::Markdown => FormatterConfig::default(),
        };
        match self.max_rows {
            Some(max) => base.with_max_rows(Some(max)),
            None => base,
        }
    }

    /// Sources in command-line order. Runs of consecutive patterns are
    /// expanded together; standard input is read at most once.
    fn sources(&self) -> Result<Vec<(String, Source)>> {
        self.sources_with_stdin(std::io::stdin())
    }

    fn sources_with_stdin(&self, mut input_stream: impl Read) -> Result<Vec<(String, Source)>> {
        let mut sources = Vec::new();
        let mut pending: Vec<String> = Vec::new();
        let mut stdin: Option<Vec<u8>> = None;
        for input in &self.inputs {
            if input != "-" {
                pending.push(input.clone());
                continue;
            }
            push_files(&mut sources, &mut pending)?;
            if stdin.is_none() {
                let mut bytes = Vec::new();
                input_stream
                    .read_to_end(&mut bytes)
                    .context("Unable to read standard input")?;
                stdin = Some(bytes);
            }
            let bytes = stdin.clone().unwrap_or_default();
            sources.push(("<stdin>".to_string(), Source::bytes(bytes)));
        }
        push_files(&mut sources, &mut pending)?;
        Ok(sources)
    }
}

fn push_files(sources: &mut Vec<(String, Source)>, patterns: &mut Vec<String>) -> Result<()> {
    if patterns.is_empty() {
        return Ok(());
    }
    for path in expand_globs(patterns)? {
        sources.push((path.display().to_string(), Source::file(path)));
    }
    patterns.clear();
    Ok(())
}

fn render(args: &Args, dataset: &Dataset, sink: &CollectingSink) -> Result<String> {
    if args.data_attributes {
        let attrs = export_data_attributes(dataset.table(), sink);
        return Ok(serde_json::to_string_pretty(&attrs)?);
    }
    let config = args.formatter_config();
    let out = match args.format {
        OutputFormat::Human => HumanFormatter::with_config(config).format(dataset)?,
        OutputFormat::Json => JsonFormatter::with_config(config).format(dataset)?,
        OutputFormat::Markdown => MarkdownFormatter::with_config(config).format(dataset)?,
    };
    Ok(out)
}

fn report(label: &str, sink: &CollectingSink) {
    for diagnostic in sink.take() {
        if diagnostic.is_warning() {
            eprintln!("warning: {label}: {diagnostic}");
        } else {
            eprintln!("{label}: {diagnostic}");
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.logging_config()).map_err(|e| anyhow!("Failed to initialize logging: {e}"))?;

    let options = args.import_options()?;
    let sink = Arc::new(CollectingSink::new());
    let importer = Importer::new()
        .with_config(args.import_config())
        .with_sink(sink.clone());

    let sources = args.sources()?;
    let multiple = sources.len() > 1;
    for (label, source) in sources {
        let dataset = importer
            .import(source, &options)
            .with_context(|| format!("Failed to import {label}"))?;
        let output = render(&args, &dataset, &sink)?;
        report(&label, &sink);

        if multiple && args.format == OutputFormat::Human {
            println!("==> {label} <==");
        }
        println!("{output}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsv_import::importer::import_delim;
    use std::io::Write;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("dsv").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_requires_input() {
        assert!(Args::try_parse_from(["dsv"]).is_err());
    }

    #[test]
    fn test_list_flags_split_on_commas() {
        let args = parse(&[
            "--csv-fields",
            "name,pop=population",
            "--field-types",
            "pop:num,+area",
            "data.csv",
        ]);
        let options = args.import_options().unwrap();
        assert_eq!(
            options.csv_fields,
            Some(vec!["name".to_string(), "pop=population".to_string()])
        );
        assert_eq!(
            options.field_types,
            Some(vec!["pop:num".to_string(), "+area".to_string()])
        );
        assert_eq!(args.format, OutputFormat::Human);
    }

    #[test]
    fn test_flags_override_options_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"encoding": "latin1", "csv_filter": "pop > 5", "string_fields": ["fips"]}}"#
        )
        .unwrap();
        let path = file.path().to_str().unwrap();
        let args = parse(&["--options", path, "--csv-filter", "pop > 10", "x.csv"]);
        let options = args.import_options().unwrap();
        assert_eq!(options.encoding.as_deref(), Some("latin1"));
        assert_eq!(options.csv_filter.as_deref(), Some("pop > 10"));
        assert_eq!(options.string_fields, Some(vec!["fips".to_string()]));
    }

    #[test]
    fn test_formatter_config_by_format() {
        assert_eq!(parse(&["--format", "json", "x"]).formatter_config().max_rows, None);
        assert_eq!(parse(&["x"]).formatter_config().max_rows, Some(10));
        assert_eq!(
            parse(&["--format", "markdown", "--max-rows", "3", "x"])
                .formatter_config()
                .max_rows,
            Some(3)
        );
    }

    #[test]
    fn test_render_data_attributes() {
        let args = parse(&["--data-attributes", "x"]);
        let dataset = import_delim("Zip Code\n89301", &ImportOptions::new()).unwrap();
        let sink = CollectingSink::new();
        let out = render(&args, &dataset, &sink).unwrap();
        assert!(out.contains("\"data-zipcode\": \"89301\""));
        assert_eq!(sink.take().len(), 1);
    }

    #[test]
    fn test_sources_expand_globs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.csv"), "x\n1").unwrap();
        std::fs::write(dir.path().join("b.csv"), "x\n2").unwrap();
        let pattern = format!("{}/*.csv", dir.path().display());
        let sources = parse(&[pattern.as_str()]).sources().unwrap();
        assert_eq!(sources.len(), 2);
        assert!(matches!(sources[0].1, Source::FilePath(_)));
    }

    #[test]
    fn test_sources_keep_argument_order() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.csv");
        let second = dir.path().join("second.csv");
        std::fs::write(&first, "x\n1").unwrap();
        std::fs::write(&second, "x\n2").unwrap();
        let args = parse(&[second.to_str().unwrap(), "-", first.to_str().unwrap(), "-"]);
        let sources = args
            .sources_with_stdin(std::io::Cursor::new(b"x\n3".to_vec()))
            .unwrap();
        let labels: Vec<&str> = sources.iter().map(|(label, _)| label.as_str()).collect();
        let (second, first) = (second.display().to_string(), first.display().to_string());
        assert_eq!(labels, vec![second.as_str(), "<stdin>", first.as_str(), "<stdin>"]);
        assert!(matches!(&sources[3].1, Source::ByteBuffer(bytes) if bytes.as_slice() == b"x\n3"));
    }
}
