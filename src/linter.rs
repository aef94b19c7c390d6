//! Per-file lint pipeline: instantiate configured rules, feed each kind its
//! stream, merge statuses into one ordered violation set, apply waivers.

use std::collections::BTreeSet;

use crate::config::LinterConfiguration;
use crate::diagnostics::Diagnostic;
use crate::error::{Error, Result};
use crate::lint::{
    AnyLintRule, LintRuleRegistry, LintRuleStatus, LintViolation, SyntaxTreeLintRule,
};
use crate::project::TextStructure;
use crate::syntax::{SyntaxTreeContext, SyntaxTreeNode, TreeContextVisitor, walk_tree_with_context};
use crate::token::Token;
use crate::waiver::WaiverSet;

/// One violation paired with the rule that produced it; the merge key is
/// (byte offset, rule name).
#[derive(Debug, Clone)]
pub struct ViolationEntry {
    pub rule_name: String,
    pub url: String,
    pub violation: LintViolation,
}

impl PartialEq for ViolationEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for ViolationEntry {}

impl Ord for ViolationEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.violation.token.span.start, &self.rule_name, &self.violation)
            .cmp(&(other.violation.token.span.start, &other.rule_name, &other.violation))
    }
}

impl PartialOrd for ViolationEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// A set of instantiated, configured rules ready to lint files.
pub struct Linter {
    rules: Vec<(String, AnyLintRule)>,
}

impl Linter {
    /// Instantiate and configure every enabled rule.
    pub fn from_configuration(
        registry: &LintRuleRegistry,
        configuration: &LinterConfiguration,
    ) -> Result<Linter> {
        let mut rules = Vec::new();
        for (name, config_string) in configuration.enabled_rules() {
            let Some(mut rule) = registry.create(name) else {
                return Err(Error::unknown_rule(name));
            };
            rule.configure(config_string).map_err(|e| {
                Error::rule_configuration(name, e.to_string())
            })?;
            rules.push((name.to_string(), rule));
        }
        Ok(Linter { rules })
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Run all rules over one analyzed file and collect their statuses.
    /// Rules keep per-file state, so a `Linter` lints one file per instance.
    pub fn lint(&mut self, text: &TextStructure, file_name: &str) -> Vec<LintRuleStatus> {
        // Token-stream rules.
        for (_, rule) in &mut self.rules {
            if let AnyLintRule::TokenStream(rule) = rule {
                for token in &text.tokens {
                    rule.handle_token(token, &text.content);
                }
            }
        }

        // Line rules.
        {
            let mut offset = 0;
            let mut line_number = 0;
            for raw in text.content.split_inclusive('\n') {
                line_number += 1;
                let line = raw.strip_suffix('\n').unwrap_or(raw);
                let line = line.strip_suffix('\r').unwrap_or(line);
                for (_, rule) in &mut self.rules {
                    if let AnyLintRule::Line(rule) = rule {
                        rule.handle_line(line, line_number, offset);
                    }
                }
                offset += raw.len();
            }
        }

        // Text-structure rules.
        for (_, rule) in &mut self.rules {
            if let AnyLintRule::TextStructure(rule) = rule {
                rule.lint(text, file_name);
            }
        }

        // Syntax-tree rules share one traversal.
        if let Some(tree) = &text.syntax_tree {
            let mut syntax_rules: Vec<&mut Box<dyn SyntaxTreeLintRule>> = self
                .rules
                .iter_mut()
                .filter_map(|(_, rule)| match rule {
                    AnyLintRule::SyntaxTree(rule) => Some(rule),
                    _ => None,
                })
                .collect();
            if !syntax_rules.is_empty() {
                let mut dispatch = SyntaxRuleDispatch {
                    rules: &mut syntax_rules,
                    source: &text.content,
                };
                walk_tree_with_context(tree, &mut dispatch);
            }
        }

        self.rules.iter().map(|(_, rule)| rule.report()).collect()
    }
}

struct SyntaxRuleDispatch<'a, 'b, 's> {
    rules: &'a mut Vec<&'b mut Box<dyn SyntaxTreeLintRule>>,
    source: &'s str,
}

impl TreeContextVisitor for SyntaxRuleDispatch<'_, '_, '_> {
    fn handle_node(&mut self, node: &SyntaxTreeNode, context: &SyntaxTreeContext<'_>) {
        for rule in self.rules.iter_mut() {
            rule.handle_node(node, context, self.source);
        }
    }

    fn handle_leaf(&mut self, leaf: &Token, context: &SyntaxTreeContext<'_>) {
        for rule in self.rules.iter_mut() {
            rule.handle_leaf(leaf, context, self.source);
        }
    }
}

/// Merge per-rule statuses into one deterministic violation set.
pub fn merge_statuses(statuses: Vec<LintRuleStatus>) -> BTreeSet<ViolationEntry> {
    let mut merged = BTreeSet::new();
    for status in statuses {
        for violation in status.violations {
            merged.insert(ViolationEntry {
                rule_name: status.rule_name.clone(),
                url: status.url.clone(),
                violation,
            });
        }
    }
    merged
}

/// Outcome of linting one file.
#[derive(Debug)]
pub struct LintFileResult {
    /// Lex and parse diagnostics.
    pub diagnostics: Vec<Diagnostic>,
    /// Waiver-filtered violations in reporting order.
    pub violations: Vec<ViolationEntry>,
    /// True when the file had lex or syntax errors.
    pub parse_failed: bool,
}

/// The full per-file pipeline: diagnostics, all rule kinds, waiver filter.
/// Lint over partial trees is permitted, so parse failures do not stop the
/// rules from running.
pub fn lint_one_file(
    registry: &LintRuleRegistry,
    configuration: &LinterConfiguration,
    text: &TextStructure,
    file_name: &str,
    waivers: &WaiverSet,
) -> Result<LintFileResult> {
    let diagnostics = text.diagnostics(file_name);
    let parse_failed = !diagnostics.is_empty();

    let mut linter = Linter::from_configuration(registry, configuration)?;
    let mut statuses = linter.lint(text, file_name);

    for status in &mut statuses {
        let rule_name = status.rule_name.clone();
        status.waive_violations(|violation| {
            let line = text.line_map.line_of(violation.token.offset());
            waivers.is_waived(&rule_name, file_name, line)
        });
    }

    let violations = merge_statuses(statuses).into_iter().collect();
    Ok(LintFileResult {
        diagnostics,
        violations,
        parse_failed,
    })
}
