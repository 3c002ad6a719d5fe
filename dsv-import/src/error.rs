//! Error types for the delimited text import pipeline.
//!
//! Every fatal condition is represented by [`ImportError`]. Non-fatal
//! conditions (an empty result, an unrecognized type hint) are reported as
//! [`Diagnostic`](crate::diagnostics::Diagnostic) values instead and never
//! appear here.

use thiserror::Error;

/// The main error type for `dsv-import`.
///
/// Any of these aborts the import; no partial dataset is returned.
#[derive(Error, Debug)]
pub enum ImportError {
    /// The source was none of inline text, byte buffer or file path.
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// A filter expression failed to compile, failed during evaluation, or
    /// returned something other than `true`/`false`.
    #[error("Filter error in expression [{expression}]: {message}")]
    FilterExpression {
        /// The expression text as supplied by the user
        expression: String,
        /// What went wrong
        message: String,
    },

    /// A `csv_fields` entry could not be understood.
    #[error("Invalid field description: {0}")]
    InvalidFieldSpec(String),

    /// The requested text encoding is not known.
    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error raised by the record tokenizer.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Error related to configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A type alias for `Result<T, ImportError>`.
///
/// # Examples
///
/// ```rust
/// use dsv_import::error::Result;
///
/// fn read_something() -> Result<()> {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, ImportError>;

impl ImportError {
    /// Creates a new filter expression error.
    pub fn filter_expression(expression: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FilterExpression {
            expression: expression.into(),
            message: message.into(),
        }
    }

    /// Creates a new malformed input error.
    pub fn malformed_input(message: impl Into<String>) -> Self {
        Self::MalformedInput(message.into())
    }
}

impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;

    /// Adds context with a lazy message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<ImportError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| wrap(msg, e.into()))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| wrap(&f(), e.into()))
    }
}

// Io errors keep their kind so callers can still match on NotFound and friends.
fn wrap(msg: &str, base: ImportError) -> ImportError {
    match base {
        ImportError::Io(inner) => {
            ImportError::Io(std::io::Error::new(inner.kind(), format!("{msg}: {inner}")))
        }
        ImportError::Internal(inner) => ImportError::Internal(format!("{msg}: {inner}")),
        other => ImportError::Internal(format!("{msg}: {other}")),
    }
}
