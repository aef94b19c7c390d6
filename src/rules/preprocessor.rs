//! Preprocessor hygiene rules over the raw token stream.

use crate::lint::{
    AnyLintRule, LintRuleDescriptor, LintRuleKind, LintRuleRegistry, LintRuleStatus,
    LintViolation, TokenStreamLintRule,
};
use crate::token::{Token, TokenKind};

pub fn register(registry: &mut LintRuleRegistry) {
    registry.register(&ENDIF_COMMENT, || {
        AnyLintRule::TokenStream(Box::new(EndifCommentRule::default()))
    });
}

static ENDIF_COMMENT: LintRuleDescriptor = LintRuleDescriptor {
    name: "endif-comment",
    kind: LintRuleKind::TokenStream,
    topic: "preprocessor",
    description: "`endif should be followed on the same line by a comment naming its guard.",
    default_enabled: true,
    url: "https://github.com/lowRISC/style-guides/blob/master/VerilogCodingStyle.md#preprocessor-macros",
};

#[derive(Default)]
struct EndifCommentRule {
    pending_endif: Option<Token>,
    violations: Vec<LintViolation>,
}

impl EndifCommentRule {
    fn flush_pending(&mut self) {
        if let Some(token) = self.pending_endif.take() {
            self.violations.push(LintViolation::new(
                token,
                "`endif should be followed by a comment naming the corresponding guard.",
            ));
        }
    }
}

impl TokenStreamLintRule for EndifCommentRule {
    fn handle_token(&mut self, token: &Token, _source: &str) {
        match token.kind {
            TokenKind::PpEndif => {
                // Two `endif in a row: the first one had no comment.
                self.flush_pending();
                self.pending_endif = Some(*token);
            }
            TokenKind::EolComment | TokenKind::BlockComment => {
                self.pending_endif = None;
            }
            TokenKind::Whitespace => {}
            TokenKind::Newline | TokenKind::Eof => self.flush_pending(),
            _ => self.flush_pending(),
        }
    }

    fn report(&self) -> LintRuleStatus {
        let mut status = LintRuleStatus::new(ENDIF_COMMENT.name, ENDIF_COMMENT.url);
        status.violations.extend(self.violations.iter().cloned());
        status
    }
}
