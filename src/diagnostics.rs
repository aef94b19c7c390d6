//! Non-fatal diagnostics accumulated by pipeline stages.

use std::fmt;

use crate::token::LineColumn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// Which pipeline stage produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Lex,
    Syntax,
    Semantic,
}

/// One finding with an optional source location.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub phase: Phase,
    pub file: String,
    pub location: Option<LineColumn>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        severity: Severity,
        phase: Phase,
        file: impl Into<String>,
        location: Option<LineColumn>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            phase,
            file: file.into(),
            location,
            message: message.into(),
        }
    }

    pub fn syntax_error(
        file: impl Into<String>,
        location: LineColumn,
        message: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Error, Phase::Syntax, file, Some(location), message)
    }

    pub fn semantic(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, Phase::Semantic, file, None, message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(location) => write!(
                f,
                "{}:{}: {}: {}",
                self.file,
                location,
                self.severity.as_str(),
                self.message
            ),
            None => write!(f, "{}: {}: {}", self.file, self.severity.as_str(), self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_with_location() {
        let d = Diagnostic::syntax_error(
            "top.sv",
            LineColumn { line: 3, column: 7 },
            "expected Semicolon",
        );
        assert_eq!(d.to_string(), "top.sv:3:7: error: expected Semicolon");
    }

    #[test]
    fn display_without_location() {
        let d = Diagnostic::semantic("top.sv", "duplicate symbol \"m\"");
        assert_eq!(d.to_string(), "top.sv: error: duplicate symbol \"m\"");
    }
}
