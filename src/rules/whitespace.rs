//! Whitespace and layout rules, all operating line-by-line.

use crate::error::{Error, Result};
use crate::fix::{AutoFix, ReplacementEdit};
use crate::lint::{
    AnyLintRule, LineLintRule, LintRuleDescriptor, LintRuleKind, LintRuleRegistry, LintRuleStatus,
    LintViolation,
};
use crate::token::{ByteRange, Token, TokenKind};

pub fn register(registry: &mut LintRuleRegistry) {
    registry.register(&NO_TABS, || AnyLintRule::Line(Box::new(NoTabsRule::default())));
    registry.register(&NO_TRAILING_SPACES, || {
        AnyLintRule::Line(Box::new(NoTrailingSpacesRule::default()))
    });
    registry.register(&LINE_LENGTH, || {
        AnyLintRule::Line(Box::new(LineLengthRule::default()))
    });
}

// ============================================================================
// no-tabs
// ============================================================================

static NO_TABS: LintRuleDescriptor = LintRuleDescriptor {
    name: "no-tabs",
    kind: LintRuleKind::Line,
    topic: "tabs",
    description: "Use spaces, not tabs.",
    default_enabled: true,
    url: "https://github.com/lowRISC/style-guides/blob/master/VerilogCodingStyle.md#tabs",
};

#[derive(Default)]
struct NoTabsRule {
    violations: Vec<LintViolation>,
}

impl LineLintRule for NoTabsRule {
    fn handle_line(&mut self, line: &str, _line_number: usize, line_offset: usize) {
        let Some(first) = line.find('\t') else {
            return;
        };
        let run_len = line[first..].bytes().take_while(|&b| b == b'\t').count();
        let span = ByteRange::new(line_offset + first, line_offset + first + run_len);
        let token = Token::new(TokenKind::Whitespace, span);
        let fix = AutoFix::single(
            "replace tabs with spaces",
            ReplacementEdit::new(span.start, span.end, "  "),
        );
        self.violations
            .push(LintViolation::new(token, "Use spaces, not tabs.").with_fix(fix));
    }

    fn report(&self) -> LintRuleStatus {
        let mut status = LintRuleStatus::new(NO_TABS.name, NO_TABS.url);
        status.violations.extend(self.violations.iter().cloned());
        status
    }
}

// ============================================================================
// no-trailing-spaces
// ============================================================================

static NO_TRAILING_SPACES: LintRuleDescriptor = LintRuleDescriptor {
    name: "no-trailing-spaces",
    kind: LintRuleKind::Line,
    topic: "trailing-spaces",
    description: "Remove trailing whitespace at the end of lines.",
    default_enabled: true,
    url: "https://github.com/lowRISC/style-guides/blob/master/VerilogCodingStyle.md#whitespace",
};

#[derive(Default)]
struct NoTrailingSpacesRule {
    violations: Vec<LintViolation>,
}

impl LineLintRule for NoTrailingSpacesRule {
    fn handle_line(&mut self, line: &str, _line_number: usize, line_offset: usize) {
        let trimmed = line.trim_end_matches([' ', '\t']);
        if trimmed.len() == line.len() {
            return;
        }
        let span = ByteRange::new(line_offset + trimmed.len(), line_offset + line.len());
        let token = Token::new(TokenKind::Whitespace, span);
        let fix = AutoFix::single(
            "remove trailing whitespace",
            ReplacementEdit::delete(span.start, span.end),
        );
        self.violations
            .push(LintViolation::new(token, "Remove trailing whitespace.").with_fix(fix));
    }

    fn report(&self) -> LintRuleStatus {
        let mut status = LintRuleStatus::new(NO_TRAILING_SPACES.name, NO_TRAILING_SPACES.url);
        status.violations.extend(self.violations.iter().cloned());
        status
    }
}

// ============================================================================
// line-length
// ============================================================================

static LINE_LENGTH: LintRuleDescriptor = LintRuleDescriptor {
    name: "line-length",
    kind: LintRuleKind::Line,
    topic: "line-length",
    description: "Keep lines at or below the configured length.",
    default_enabled: true,
    url: "https://github.com/lowRISC/style-guides/blob/master/VerilogCodingStyle.md#basic-style-elements",
};

const DEFAULT_LINE_LENGTH: usize = 100;

struct LineLengthRule {
    limit: usize,
    violations: Vec<LintViolation>,
}

impl Default for LineLengthRule {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LINE_LENGTH,
            violations: Vec::new(),
        }
    }
}

impl LineLintRule for LineLengthRule {
    /// Accepts `length:N`.
    fn configure(&mut self, config: &str) -> Result<()> {
        let config = config.trim();
        if config.is_empty() {
            return Ok(());
        }
        match config.strip_prefix("length:") {
            Some(value) => {
                self.limit = value.parse().map_err(|_| {
                    Error::rule_configuration(LINE_LENGTH.name, format!("bad length \"{value}\""))
                })?;
                Ok(())
            }
            None => Err(Error::rule_configuration(
                LINE_LENGTH.name,
                format!("expected length:N, got \"{config}\""),
            )),
        }
    }

    fn handle_line(&mut self, line: &str, _line_number: usize, line_offset: usize) {
        let length = line.chars().count();
        if length <= self.limit {
            return;
        }
        // Anchor the violation at the first character past the limit.
        let excess_start: usize = line
            .char_indices()
            .nth(self.limit)
            .map(|(i, _)| i)
            .unwrap_or(line.len());
        let span = ByteRange::new(line_offset + excess_start, line_offset + line.len());
        let token = Token::new(TokenKind::Whitespace, span);
        self.violations.push(LintViolation::new(
            token,
            format!("Line length {length} exceeds maximum of {}.", self.limit),
        ));
    }

    fn report(&self) -> LintRuleStatus {
        let mut status = LintRuleStatus::new(LINE_LENGTH.name, LINE_LENGTH.url);
        status.violations.extend(self.violations.iter().cloned());
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_line_rule(rule: &mut dyn LineLintRule, source: &str) -> LintRuleStatus {
        let mut offset = 0;
        for (number, line) in source.lines().enumerate() {
            rule.handle_line(line, number + 1, offset);
            offset += line.len() + 1;
        }
        rule.report()
    }

    #[test]
    fn no_tabs_flags_and_fixes() {
        let mut rule = NoTabsRule::default();
        let status = run_line_rule(&mut rule, "ok line\n\t\tindented\n");
        assert_eq!(status.violations.len(), 1);
        let v = status.violations.iter().next().unwrap();
        assert_eq!(v.token.span, ByteRange::new(8, 10));
        let fixed = v.autofixes[0].apply("ok line\n\t\tindented\n");
        assert_eq!(fixed, "ok line\n  indented\n");
    }

    #[test]
    fn no_trailing_spaces_fix_deletes() {
        let mut rule = NoTrailingSpacesRule::default();
        let source = "wire w;   \nclean\n";
        let status = run_line_rule(&mut rule, source);
        assert_eq!(status.violations.len(), 1);
        let v = status.violations.iter().next().unwrap();
        assert_eq!(v.autofixes[0].apply(source), "wire w;\nclean\n");
    }

    #[test]
    fn line_length_respects_configuration() {
        let mut rule = LineLengthRule::default();
        rule.configure("length:10").unwrap();
        let status = run_line_rule(&mut rule, "short\nthis line is too long\n");
        assert_eq!(status.violations.len(), 1);
        assert!(status
            .violations
            .iter()
            .next()
            .unwrap()
            .reason
            .contains("maximum of 10"));
    }

    #[test]
    fn line_length_bad_configuration() {
        let mut rule = LineLengthRule::default();
        assert!(rule.configure("length:ten").is_err());
        assert!(rule.configure("width:10").is_err());
        assert!(rule.configure("").is_ok());
    }
}
