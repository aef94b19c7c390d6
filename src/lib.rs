//! SystemVerilog developer tools: lint engine, identifier obfuscator, and
//! project-wide symbol analysis.
//!
//! The crate is organized leaves-first: the token model and scanner feed a
//! concrete syntax tree, which the lint rules, the symbol table, and the
//! dependency graph all consume. The `svtools` binary wires these into the
//! `lint`, `obfuscate`, and `project` commands.

pub mod bijective_map;
pub mod cli;
pub mod config;
pub mod dependencies;
pub mod diagnostics;
pub mod error;
pub mod fix;
pub mod handler;
pub mod lexer;
pub mod lint;
pub mod linter;
pub mod obfuscate;
pub mod parser;
pub mod project;
pub mod rules;
pub mod search;
pub mod symbol_table;
pub mod syntax;
pub mod telemetry;
pub mod token;
pub mod waiver;

use crate::config::LinterConfiguration;
use crate::error::Result;
use crate::lint::default_registry;
use crate::linter::{LintFileResult, lint_one_file};
use crate::project::TextStructure;
use crate::waiver::WaiverSet;

/// Lint a single in-memory source string with a given configuration.
///
/// # Examples
///
/// ```
/// use svtools::config::{LinterConfiguration, RuleSet};
/// use svtools::lint::default_registry;
///
/// let config = LinterConfiguration::from_rule_set(default_registry(), RuleSet::Default);
/// let result = svtools::lint_source("module m;\n\twire w;\nendmodule\n", "m.sv", &config)
///     .expect("lint should run");
/// assert!(result.violations.iter().any(|v| v.rule_name == "no-tabs"));
/// ```
pub fn lint_source(
    source: &str,
    file_name: &str,
    configuration: &LinterConfiguration,
) -> Result<LintFileResult> {
    let text = TextStructure::analyze(source.to_string());
    lint_one_file(
        default_registry(),
        configuration,
        &text,
        file_name,
        &WaiverSet::default(),
    )
}
