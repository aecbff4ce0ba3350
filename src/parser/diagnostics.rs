//! Diagnostic messages attached to a document.
//!
//! Malformed input never aborts analysis: the preprocessor and the parser
//! record what went wrong here and keep going.

use crate::base::FilePath;

/// Severity level for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Severity {
    /// A hard error; the AST around it is a best-effort recovery
    #[default]
    Error,
    /// A warning that doesn't affect parsing
    Warning,
    /// An informational hint
    Hint,
}

impl Severity {
    /// Check if this is an error
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Hint => "hint",
        }
    }
}

/// A diagnostic at a 1-based line/column with a length in bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DiagnosticMessage {
    pub severity: Severity,
    pub file: FilePath,
    pub line: u32,
    pub column: u32,
    pub length: u32,
    pub text: String,
}

impl DiagnosticMessage {
    pub fn new(
        severity: Severity,
        file: FilePath,
        line: u32,
        column: u32,
        length: u32,
        text: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            file,
            line,
            column,
            length,
            text: text.into(),
        }
    }

    pub fn error(file: FilePath, line: u32, column: u32, length: u32, text: impl Into<String>) -> Self {
        Self::new(Severity::Error, file, line, column, length, text)
    }

    pub fn warning(file: FilePath, line: u32, column: u32, length: u32, text: impl Into<String>) -> Self {
        Self::new(Severity::Warning, file, line, column, length, text)
    }

    /// Format the diagnostic for display
    pub fn format(&self) -> String {
        format!(
            "{}:{}:{}: {}: {}",
            self.file,
            self.line,
            self.column,
            self.severity.as_str(),
            self.text
        )
    }
}
