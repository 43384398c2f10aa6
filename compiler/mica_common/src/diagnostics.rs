//! Diagnostic message handling for the mica compiler

use crate::{SourceLocation, SourceMap};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity level for diagnostic messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A diagnostic message with location and severity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub location: SourceLocation,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, location: SourceLocation) -> Self {
        Self { severity: Severity::Error, message: message.into(), location }
    }

    pub fn warning(message: impl Into<String>, location: SourceLocation) -> Self {
        Self { severity: Severity::Warning, message: message.into(), location }
    }

    /// Render as `file:line:column: severity: message`
    pub fn render(&self, files: &SourceMap) -> String {
        format!(
            "{}:{}:{}: {}: {}",
            files.name(self.location.file),
            self.location.line,
            self.location.column,
            self.severity,
            self.message
        )
    }
}

/// Collection of diagnostic messages, threaded through every phase
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    pub messages: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.messages.push(diagnostic);
    }

    pub fn error(&mut self, message: impl Into<String>, location: SourceLocation) {
        self.add(Diagnostic::error(message, location));
    }

    pub fn warning(&mut self, message: impl Into<String>, location: SourceLocation) {
        self.add(Diagnostic::warning(message, location));
    }

    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.messages.iter().filter(|d| d.severity == Severity::Error).count()
    }

    pub fn warning_count(&self) -> usize {
        self.messages.iter().filter(|d| d.severity == Severity::Warning).count()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.messages.iter().filter(|d| d.severity == Severity::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FileId;

    fn loc() -> SourceLocation {
        SourceLocation { file: FileId(0), line: 2, column: 5, length: 1 }
    }

    #[test]
    fn test_warnings_do_not_fail() {
        let mut diags = Diagnostics::new();
        diags.warning("something dubious", loc());
        assert!(!diags.has_errors());
        diags.error("something wrong", loc());
        assert!(diags.has_errors());
        assert_eq!(diags.error_count(), 1);
        assert_eq!(diags.warning_count(), 1);
    }

    #[test]
    fn test_render() {
        let mut files = SourceMap::new();
        files.add_file("main.c");
        let d = Diagnostic::error("unexpected token", loc());
        assert_eq!(d.render(&files), "main.c:2:5: error: unexpected token");
    }
}
