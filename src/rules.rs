//! Bundled lint rules, grouped by topic.

pub mod preprocessor;
pub mod structure;
pub mod whitespace;

use crate::lint::LintRuleRegistry;

/// Register every bundled rule. Called once by the default registry.
pub fn register_all(registry: &mut LintRuleRegistry) {
    whitespace::register(registry);
    preprocessor::register(registry);
    structure::register(registry);
}
