//! Unified error types for svtools.
//!
//! Library code uses `Error` and `Result<T>`.
//! Binary code (`main.rs`) uses `anyhow` for ergonomic CLI error handling.

use std::path::PathBuf;
use thiserror::Error as ThisError;

/// Unified error type for svtools library operations.
#[derive(Debug, ThisError)]
pub enum Error {
    /// Input file could not be read.
    #[error("cannot open {}: {source}", path.display())]
    Input {
        /// Path that failed to open.
        path: PathBuf,
        source: std::io::Error,
    },

    /// Malformed file-list entry.
    #[error("{}:{line}: {message}", path.display())]
    FileList {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// Configuration file error.
    #[error("configuration error in {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    /// Configuration parse error.
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Unknown lint rule name provided.
    #[error("unknown rule: {0}")]
    UnknownRule(String),

    /// A rule rejected its configuration string.
    #[error("rule {rule}: bad configuration: {message}")]
    RuleConfiguration { rule: String, message: String },

    /// Malformed waiver entry.
    #[error("waiver {}:{line}: {message}", path.display())]
    Waiver {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// Malformed obfuscation map entry.
    #[error("obfuscation map line {line}: {message}")]
    MapLoad { line: usize, message: String },

    /// Obfuscation contract violation (caller error).
    #[error("obfuscation error: {0}")]
    Obfuscation(String),

    /// Internal invariant failure in the obfuscator.
    #[error("internal obfuscation error: {0}\n*** Please file a bug. ***")]
    ObfuscationInternal(String),

    /// Input text failed to lex.
    #[error("input contains lexical errors: {0}")]
    LexicalInput(String),

    /// Two autofix edits overlap.
    #[error("conflicting autofix edits at byte {offset}")]
    AutofixConflict { offset: usize },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error for other cases.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an input error carrying the path.
    pub fn input(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Input {
            path: path.into(),
            source,
        }
    }

    /// Create a config error.
    pub fn config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn unknown_rule(name: impl Into<String>) -> Self {
        Self::UnknownRule(name.into())
    }

    pub fn rule_configuration(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RuleConfiguration {
            rule: rule.into(),
            message: message.into(),
        }
    }

    pub fn obfuscation(message: impl Into<String>) -> Self {
        Self::Obfuscation(message.into())
    }

    pub fn obfuscation_internal(message: impl Into<String>) -> Self {
        Self::ObfuscationInternal(message.into())
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// Result type alias for svtools library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats() {
        let err = Error::unknown_rule("no-such-rule");
        assert_eq!(err.to_string(), "unknown rule: no-such-rule");

        let err = Error::MapLoad {
            line: 3,
            message: "expected two fields".into(),
        };
        assert_eq!(
            err.to_string(),
            "obfuscation map line 3: expected two fields"
        );

        let err = Error::obfuscation_internal("decode(encode) != original");
        assert!(err.to_string().contains("Please file a bug"));
    }

    #[test]
    fn io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
