//! Non-fatal messages produced during an import.
//!
//! The importer never writes to a global message channel. Instead a
//! [`DiagnosticSink`] is handed to it; the default [`TracingSink`] forwards
//! everything to `tracing`, while [`CollectingSink`] keeps the messages for
//! callers that want to show or assert on them.

use std::fmt;
use std::sync::Mutex;

use serde::Serialize;
use tracing::{info, warn};

/// A warning or informational notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Parsing and filtering left zero records.
    EmptyResult,
    /// A `field_types` token was not understood and was ignored.
    InvalidTypeHint { raw: String },
    /// These fields were converted to numbers without a hint.
    AutoDetectedNumberFields { fields: Vec<String> },
    /// A field had to be renamed to form a valid attribute name.
    RenamedField { from: String, to: String },
}

impl Diagnostic {
    /// Whether the message describes a problem with the input.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Diagnostic::EmptyResult | Diagnostic::InvalidTypeHint { .. }
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::EmptyResult => f.write_str("Unable to read any data records"),
            Diagnostic::InvalidTypeHint { raw } => {
                write!(f, "Invalid type hint (expected :str or :num) [{raw}]")
            }
            Diagnostic::AutoDetectedNumberFields { fields } => write!(
                f,
                "Auto-detected number field{}: {}",
                if fields.len() == 1 { "" } else { "s" },
                fields.join(", ")
            ),
            Diagnostic::RenamedField { from, to } => {
                write!(f, "Exporting {from} field as {to}")
            }
        }
    }
}

/// Receives diagnostics from the pipeline.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Forwards diagnostics to `tracing`: warnings at WARN, notices at INFO.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        if diagnostic.is_warning() {
            warn!(diagnostic = ?diagnostic, "{diagnostic}");
        } else {
            info!(diagnostic = ?diagnostic, "{diagnostic}");
        }
    }
}

/// Buffers diagnostics in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    messages: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of everything reported so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Removes and returns everything reported so far.
    pub fn take(&self) -> Vec<Diagnostic> {
        match self.messages.lock() {
            Ok(mut m) => std::mem::take(&mut *m),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    pub fn contains(&self, diagnostic: &Diagnostic) -> bool {
        self.diagnostics().contains(diagnostic)
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&self, diagnostic: Diagnostic) {
        match self.messages.lock() {
            Ok(mut m) => m.push(diagnostic),
            Err(poisoned) => poisoned.into_inner().push(diagnostic),
        }
    }
}

impl<T: DiagnosticSink + ?Sized> DiagnosticSink for std::sync::Arc<T> {
    fn report(&self, diagnostic: Diagnostic) {
        (**self).report(diagnostic)
    }
}
