//! Source abstraction for delimited text.
//!
//! A [`Source`] is inline text, a byte buffer or a file path. The
//! [`SourceReader`] classifies it and decides how its content is consumed:
//!
//! - inline text is parsed as a string ([`Content::Buffered`]);
//! - files smaller than the streaming threshold are read fully, decoded and
//!   parsed as a string;
//! - byte buffers and large files are tokenized incrementally
//!   ([`Content::Incremental`]), unless the encoding is not safe for
//!   byte-level delimiter scanning, in which case they are decoded up front
//!   and parsed as a string.

use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

use encoding_rs::Encoding;
use tracing::{debug, instrument};

use crate::error::{ErrorContext, ImportError, Result};
use crate::options::ImportConfig;

pub mod encoding;
mod reader;

pub use encoding::{resolve_encoding, supports_incremental};
pub use reader::IncrementalSource;

use self::encoding::decode_to_string;

/// Where delimited text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Text already in memory
    InlineText(String),
    /// Undecoded bytes already in memory
    ByteBuffer(Vec<u8>),
    /// A file on disk
    FilePath(PathBuf),
}

impl Source {
    pub fn text(text: impl Into<String>) -> Self {
        Source::InlineText(text.into())
    }

    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Source::ByteBuffer(bytes.into())
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Source::FilePath(path.into())
    }

    /// Builds a source from a loosely typed JSON value.
    ///
    /// Accepted shapes: a string (inline text), `{"content": "<text>"}`,
    /// `{"content": [<bytes>]}` and `{"filename": "<path>"}`. Anything else
    /// is [`ImportError::MalformedInput`].
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        use serde_json::Value as Json;

        match value {
            Json::String(text) => Ok(Source::InlineText(text)),
            Json::Object(mut obj) => match (obj.remove("content"), obj.remove("filename")) {
                (Some(Json::String(text)), _) => Ok(Source::InlineText(text)),
                (Some(Json::Array(items)), _) => items
                    .iter()
                    .map(|item| {
                        item.as_u64()
                            .and_then(|b| u8::try_from(b).ok())
                            .ok_or_else(|| ImportError::malformed_input("Byte buffer holds a non-byte value"))
                    })
                    .collect::<Result<Vec<u8>>>()
                    .map(Source::ByteBuffer),
                (None | Some(Json::Null), Some(Json::String(path))) => Ok(Source::FilePath(path.into())),
                _ => Err(ImportError::malformed_input("Unexpected object type")),
            },
            _ => Err(ImportError::malformed_input("Unexpected object type")),
        }
    }

    /// A short description for logs.
    pub fn describe(&self) -> String {
        match self {
            Source::InlineText(text) => format!("text ({} bytes)", text.len()),
            Source::ByteBuffer(bytes) => format!("buffer ({} bytes)", bytes.len()),
            Source::FilePath(path) => format!("file {}", path.display()),
        }
    }
}

impl From<String> for Source {
    fn from(text: String) -> Self {
        Source::InlineText(text)
    }
}

impl From<Vec<u8>> for Source {
    fn from(bytes: Vec<u8>) -> Self {
        Source::ByteBuffer(bytes)
    }
}

impl From<PathBuf> for Source {
    fn from(path: PathBuf) -> Self {
        Source::FilePath(path)
    }
}

impl From<&Path> for Source {
    fn from(path: &Path) -> Self {
        Source::FilePath(path.to_path_buf())
    }
}

/// How the pipeline will consume a source.
#[derive(Debug)]
pub enum Content {
    /// Fully decoded text
    Buffered(String),
    /// A byte stream read record by record
    Incremental(IncrementalSource),
}

impl Content {
    pub fn is_incremental(&self) -> bool {
        matches!(self, Content::Incremental(_))
    }
}

/// Classifies sources and opens their content.
#[derive(Debug, Clone)]
pub struct SourceReader {
    streaming_threshold: u64,
    sniff_prefix_len: usize,
}

impl SourceReader {
    pub fn new(config: &ImportConfig) -> Self {
        Self {
            streaming_threshold: config.streaming_threshold,
            sniff_prefix_len: config.sniff_prefix_len,
        }
    }

    /// Opens `source` for parsing with the given encoding.
    #[instrument(skip(self, source), fields(source = %source.describe(), encoding = encoding.name()))]
    pub fn open(&self, source: Source, encoding: &'static Encoding) -> Result<Content> {
        let content = match source {
            Source::InlineText(text) => Content::Buffered(text),
            Source::ByteBuffer(bytes) => self.incremental(Cursor::new(bytes), encoding)?,
            Source::FilePath(path) => {
                let size = std::fs::metadata(&path)
                    .with_context(|| format!("Unable to stat {}", path.display()))?
                    .len();
                if size < self.streaming_threshold {
                    let bytes = std::fs::read(&path)
                        .with_context(|| format!("Unable to read {}", path.display()))?;
                    Content::Buffered(decode_to_string(&bytes, encoding))
                } else {
                    let file = File::open(&path)
                        .with_context(|| format!("Unable to open {}", path.display()))?;
                    self.incremental(BufReader::new(file), encoding)?
                }
            }
        };
        debug!(incremental = content.is_incremental(), "Classified source");
        Ok(content)
    }

    fn incremental<R>(&self, reader: R, encoding: &'static Encoding) -> Result<Content>
    where
        R: Read + 'static,
    {
        if supports_incremental(encoding) {
            Ok(Content::Incremental(IncrementalSource::new(
                reader,
                self.sniff_prefix_len,
                encoding,
            )?))
        } else {
            // Falls back to buffering silently; this is not an error.
            let mut bytes = Vec::new();
            let mut reader = reader;
            reader.read_to_end(&mut bytes)?;
            debug!(encoding = encoding.name(), "Encoding requires full decoding");
            Ok(Content::Buffered(decode_to_string(&bytes, encoding)))
        }
    }
}

/// Expands glob patterns into the list of matching files.
pub fn expand_globs(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for pattern in patterns {
        let matches = glob::glob(pattern).map_err(|e| {
            ImportError::Configuration(format!("Invalid glob pattern '{pattern}': {e}"))
        })?;

        for entry in matches {
            let path = entry.map_err(|e| ImportError::Io(e.into()))?;
            if path.is_file() {
                paths.push(path);
            }
        }
    }

    if paths.is_empty() {
        return Err(ImportError::Configuration(
            "No files found matching glob patterns".to_string(),
        ));
    }

    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::{UTF_16LE, UTF_8};
    use std::io::Write;

    fn reader() -> SourceReader {
        SourceReader::new(&ImportConfig::default())
    }

    #[test]
    fn test_inline_text_is_buffered() {
        let content = reader().open(Source::text("a,b\n1,2"), UTF_8).unwrap();
        assert!(matches!(content, Content::Buffered(ref s) if s == "a,b\n1,2"));
    }

    #[test]
    fn test_byte_buffer_is_incremental() {
        let content = reader().open(Source::bytes(b"a,b\n1,2".to_vec()), UTF_8).unwrap();
        assert!(content.is_incremental());
    }

    #[test]
    fn test_utf16_buffer_falls_back_to_buffered() {
        let utf16: Vec<u8> = "\u{FEFF}a;b\n1;2"
            .encode_utf16()
            .flat_map(|u| u.to_le_bytes())
            .collect();
        let content = reader().open(Source::bytes(utf16), UTF_16LE).unwrap();
        match content {
            Content::Buffered(text) => assert_eq!(text, "a;b\n1;2"),
            other => panic!("expected buffered content, got {other:?}"),
        }
    }

    #[test]
    fn test_small_file_is_buffered_large_file_streams() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "a|b\n1|2\n").unwrap();

        let content = reader().open(Source::file(file.path()), UTF_8).unwrap();
        assert!(!content.is_incremental());

        let streaming = SourceReader::new(&ImportConfig::streaming());
        let content = streaming.open(Source::file(file.path()), UTF_8).unwrap();
        match content {
            Content::Incremental(src) => assert_eq!(src.sample(), "a|b\n1|2\n"),
            other => panic!("expected incremental content, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_file() {
        let err = reader()
            .open(Source::file("/definitely/not/here.csv"), UTF_8)
            .unwrap_err();
        assert!(matches!(err, ImportError::Io(ref e) if e.kind() == std::io::ErrorKind::NotFound));
    }

    #[test]
    fn test_from_value() {
        use serde_json::json;

        assert_eq!(
            Source::from_value(json!("a,b")).unwrap(),
            Source::text("a,b")
        );
        assert_eq!(
            Source::from_value(json!({"content": [97, 44, 98]})).unwrap(),
            Source::bytes(b"a,b".to_vec())
        );
        assert_eq!(
            Source::from_value(json!({"filename": "data.csv"})).unwrap(),
            Source::file("data.csv")
        );
        for bad in [json!(42), json!(null), json!({"content": 1}), json!([1, 2])] {
            assert!(matches!(
                Source::from_value(bad),
                Err(ImportError::MalformedInput(_))
            ));
        }
    }

    #[test]
    fn test_expand_globs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("one.csv"), "a\n1").unwrap();
        std::fs::write(dir.path().join("two.csv"), "a\n2").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let pattern = format!("{}/*.csv", dir.path().display());
        let paths = expand_globs(&[pattern]).unwrap();
        assert_eq!(paths.len(), 2);

        let none = format!("{}/*.tsv", dir.path().display());
        assert!(expand_globs(&[none]).is_err());
    }
}
