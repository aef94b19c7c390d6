//! Lint rule framework: rule contracts, violations, statuses, registry.
//!
//! A rule implements exactly one of four contracts, chosen by what it needs
//! to see: the raw token stream, each source line, the whole text structure,
//! or the syntax tree with traversal context. Each rule accumulates its own
//! violations in an ordered set and surrenders them through `report()`.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::fix::AutoFix;
use crate::project::TextStructure;
use crate::syntax::{NodeTag, SyntaxTreeContext, SyntaxTreeNode};
use crate::token::Token;

/// A single finding: offending token, reason, and optional repair material.
///
/// Ordering (and equality) is by byte offset then reason, which makes
/// reporting deterministic and de-duplicates repeated findings.
#[derive(Debug, Clone)]
pub struct LintViolation {
    pub token: Token,
    pub reason: String,
    /// Ancestor node tags at the point of the finding, outermost first.
    pub context_tags: Vec<NodeTag>,
    /// Alternative fixes; each is a self-contained edit set.
    pub autofixes: Vec<AutoFix>,
    /// Other tokens that participate in the finding.
    pub related_tokens: Vec<Token>,
}

impl LintViolation {
    pub fn new(token: Token, reason: impl Into<String>) -> Self {
        Self {
            token,
            reason: reason.into(),
            context_tags: Vec::new(),
            autofixes: Vec::new(),
            related_tokens: Vec::new(),
        }
    }

    pub fn with_fix(mut self, fix: AutoFix) -> Self {
        self.autofixes.push(fix);
        self
    }

    pub fn with_context(mut self, context: &SyntaxTreeContext<'_>) -> Self {
        self.context_tags = context.tag_stack();
        self
    }
}

impl PartialEq for LintViolation {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for LintViolation {}

impl Ord for LintViolation {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.token.span, &self.reason).cmp(&(other.token.span, &other.reason))
    }
}

impl PartialOrd for LintViolation {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// The findings of one rule over one file.
#[derive(Debug, Clone, Default)]
pub struct LintRuleStatus {
    pub rule_name: String,
    pub url: String,
    pub violations: BTreeSet<LintViolation>,
}

impl LintRuleStatus {
    pub fn new(rule_name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            rule_name: rule_name.into(),
            url: url.into(),
            violations: BTreeSet::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }

    /// Remove all violations matched by `waived`.
    pub fn waive_violations(&mut self, waived: impl Fn(&LintViolation) -> bool) {
        self.violations.retain(|v| !waived(v));
    }
}

fn reject_nonempty_configuration(config: &str) -> Result<()> {
    if config.trim().is_empty() {
        Ok(())
    } else {
        Err(Error::other(format!(
            "rule accepts no configuration, got \"{config}\""
        )))
    }
}

/// Sees every token of the file in order, trivia included.
pub trait TokenStreamLintRule {
    fn configure(&mut self, config: &str) -> Result<()> {
        reject_nonempty_configuration(config)
    }
    fn handle_token(&mut self, token: &Token, source: &str);
    fn report(&self) -> LintRuleStatus;
}

/// Sees each source line.
pub trait LineLintRule {
    fn configure(&mut self, config: &str) -> Result<()> {
        reject_nonempty_configuration(config)
    }
    /// `line` excludes the terminator; `line_offset` is the byte offset of
    /// the line start; `line_number` is 1-based.
    fn handle_line(&mut self, line: &str, line_number: usize, line_offset: usize);
    fn report(&self) -> LintRuleStatus;
}

/// Sees the full analyzed file once.
pub trait TextStructureLintRule {
    fn configure(&mut self, config: &str) -> Result<()> {
        reject_nonempty_configuration(config)
    }
    fn lint(&mut self, text: &TextStructure, file_name: &str);
    fn report(&self) -> LintRuleStatus;
}

/// Sees the syntax tree in pre-order with the ancestor context.
pub trait SyntaxTreeLintRule {
    fn configure(&mut self, config: &str) -> Result<()> {
        reject_nonempty_configuration(config)
    }
    fn handle_node(
        &mut self,
        _node: &SyntaxTreeNode,
        _context: &SyntaxTreeContext<'_>,
        _source: &str,
    ) {
    }
    fn handle_leaf(&mut self, _leaf: &Token, _context: &SyntaxTreeContext<'_>, _source: &str) {}
    fn report(&self) -> LintRuleStatus;
}

/// Which contract a rule implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintRuleKind {
    TokenStream,
    Line,
    TextStructure,
    SyntaxTree,
}

impl LintRuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LintRuleKind::TokenStream => "token-stream",
            LintRuleKind::Line => "line",
            LintRuleKind::TextStructure => "text-structure",
            LintRuleKind::SyntaxTree => "syntax-tree",
        }
    }
}

/// A rule instance of any kind.
pub enum AnyLintRule {
    TokenStream(Box<dyn TokenStreamLintRule>),
    Line(Box<dyn LineLintRule>),
    TextStructure(Box<dyn TextStructureLintRule>),
    SyntaxTree(Box<dyn SyntaxTreeLintRule>),
}

impl AnyLintRule {
    pub fn kind(&self) -> LintRuleKind {
        match self {
            AnyLintRule::TokenStream(_) => LintRuleKind::TokenStream,
            AnyLintRule::Line(_) => LintRuleKind::Line,
            AnyLintRule::TextStructure(_) => LintRuleKind::TextStructure,
            AnyLintRule::SyntaxTree(_) => LintRuleKind::SyntaxTree,
        }
    }

    pub fn configure(&mut self, config: &str) -> Result<()> {
        match self {
            AnyLintRule::TokenStream(r) => r.configure(config),
            AnyLintRule::Line(r) => r.configure(config),
            AnyLintRule::TextStructure(r) => r.configure(config),
            AnyLintRule::SyntaxTree(r) => r.configure(config),
        }
    }

    pub fn report(&self) -> LintRuleStatus {
        match self {
            AnyLintRule::TokenStream(r) => r.report(),
            AnyLintRule::Line(r) => r.report(),
            AnyLintRule::TextStructure(r) => r.report(),
            AnyLintRule::SyntaxTree(r) => r.report(),
        }
    }
}

/// Static metadata describing a lint rule.
#[derive(Debug)]
pub struct LintRuleDescriptor {
    /// Stable kebab-case rule name.
    pub name: &'static str,
    pub kind: LintRuleKind,
    /// Style-guide topic the rule belongs to.
    pub topic: &'static str,
    pub description: &'static str,
    /// Whether the rule is part of the default ruleset.
    pub default_enabled: bool,
    pub url: &'static str,
}

type RuleFactory = fn() -> AnyLintRule;

/// Registry of lint rules by stable name.
#[derive(Default)]
pub struct LintRuleRegistry {
    entries: BTreeMap<&'static str, (&'static LintRuleDescriptor, RuleFactory)>,
}

impl LintRuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: &'static LintRuleDescriptor, factory: RuleFactory) {
        let previous = self.entries.insert(descriptor.name, (descriptor, factory));
        assert!(
            previous.is_none(),
            "duplicate rule registration: {}",
            descriptor.name
        );
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn descriptor(&self, name: &str) -> Option<&'static LintRuleDescriptor> {
        self.entries.get(name).map(|(d, _)| *d)
    }

    /// All descriptors, ordered by rule name.
    pub fn descriptors(&self) -> impl Iterator<Item = &'static LintRuleDescriptor> + '_ {
        self.entries.values().map(|(d, _)| *d)
    }

    /// Instantiate a rule by name.
    pub fn create(&self, name: &str) -> Option<AnyLintRule> {
        self.entries.get(name).map(|(_, f)| f())
    }
}

/// Process-wide registry of bundled rules, initialized on first access and
/// read-only afterwards.
pub fn default_registry() -> &'static LintRuleRegistry {
    static REGISTRY: OnceLock<LintRuleRegistry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut registry = LintRuleRegistry::new();
        crate::rules::register_all(&mut registry);
        registry
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{ByteRange, TokenKind};

    fn violation_at(offset: usize, reason: &str) -> LintViolation {
        LintViolation::new(
            Token::new(TokenKind::SymbolIdentifier, ByteRange::new(offset, offset + 1)),
            reason,
        )
    }

    #[test]
    fn violations_order_by_offset_then_reason() {
        let mut set = BTreeSet::new();
        set.insert(violation_at(10, "b"));
        set.insert(violation_at(10, "a"));
        set.insert(violation_at(2, "z"));
        let reasons: Vec<&str> = set.iter().map(|v| v.reason.as_str()).collect();
        assert_eq!(reasons, vec!["z", "a", "b"]);
    }

    #[test]
    fn duplicate_violations_collapse() {
        let mut set = BTreeSet::new();
        set.insert(violation_at(5, "same"));
        set.insert(violation_at(5, "same"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn waive_filters_by_predicate() {
        let mut status = LintRuleStatus::new("test-rule", "");
        status.violations.insert(violation_at(1, "keep"));
        status.violations.insert(violation_at(2, "drop"));
        status.waive_violations(|v| v.reason == "drop");
        assert_eq!(status.violations.len(), 1);
        assert_eq!(status.violations.iter().next().unwrap().reason, "keep");
    }

    #[test]
    fn default_registry_has_bundled_rules() {
        let registry = default_registry();
        assert!(registry.contains("no-tabs"));
        assert!(registry.contains("line-length"));
        let names: Vec<&str> = registry.descriptors().map(|d| d.name).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted, "descriptors iterate in name order");
    }

    #[test]
    fn default_configure_rejects_nonempty() {
        let registry = default_registry();
        let mut rule = registry.create("no-tabs").unwrap();
        assert!(rule.configure("").is_ok());
        assert!(rule.configure("whatever").is_err());
    }
}
