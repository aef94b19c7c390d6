//! Structural rules over the syntax tree and the analyzed file.

use crate::lint::{
    AnyLintRule, LintRuleDescriptor, LintRuleKind, LintRuleRegistry, LintRuleStatus,
    LintViolation, SyntaxTreeLintRule, TextStructureLintRule,
};
use crate::project::TextStructure;
use crate::search::{find_all_tagged, leftmost_leaf};
use crate::syntax::{NodeTag, Symbol, SyntaxTreeContext, SyntaxTreeNode};
use crate::token::Token;

pub fn register(registry: &mut LintRuleRegistry) {
    registry.register(&MODULE_FILENAME, || {
        AnyLintRule::TextStructure(Box::new(ModuleFilenameRule::default()))
    });
    registry.register(&FORBID_UNPACKED_DIMENSIONS, || {
        AnyLintRule::SyntaxTree(Box::new(ForbidUnpackedDimensionsRule::default()))
    });
    registry.register(&EXPLICIT_PARAMETER_STORAGE_TYPE, || {
        AnyLintRule::SyntaxTree(Box::new(ExplicitParameterStorageTypeRule::default()))
    });
}

// ============================================================================
// module-filename
// ============================================================================

static MODULE_FILENAME: LintRuleDescriptor = LintRuleDescriptor {
    name: "module-filename",
    kind: LintRuleKind::TextStructure,
    topic: "file-names",
    description: "A file that declares modules should have one matching its filename.",
    default_enabled: true,
    url: "https://github.com/lowRISC/style-guides/blob/master/VerilogCodingStyle.md#file-naming",
};

#[derive(Default)]
struct ModuleFilenameRule {
    violations: Vec<LintViolation>,
}

fn file_stem(file_name: &str) -> &str {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name);
    base.split('.').next().unwrap_or(base)
}

impl TextStructureLintRule for ModuleFilenameRule {
    fn lint(&mut self, text: &TextStructure, file_name: &str) {
        // Streams and stdin have no meaningful filename.
        if file_name.is_empty() || file_name == "-" {
            return;
        }
        let Some(tree) = &text.syntax_tree else {
            return;
        };
        let mut module_names: Vec<Token> = Vec::new();
        for m in find_all_tagged(tree, NodeTag::ModuleDeclaration) {
            let node = m.symbol.as_node().expect("tagged match is a node");
            if let Some(Symbol::Node(header)) = node.child(0)
                && header.tag == NodeTag::ModuleHeader
                && let Some(name) = header.child(1).and_then(|c| c.as_leaf())
            {
                module_names.push(*name);
            }
        }
        if module_names.is_empty() {
            return;
        }
        let stem = file_stem(file_name);
        let matches_stem = module_names
            .iter()
            .any(|t| t.text(&text.content) == stem);
        if !matches_stem {
            self.violations.push(LintViolation::new(
                module_names[0],
                format!("No module declaration matches the filename stem \"{stem}\"."),
            ));
        }
    }

    fn report(&self) -> LintRuleStatus {
        let mut status = LintRuleStatus::new(MODULE_FILENAME.name, MODULE_FILENAME.url);
        status.violations.extend(self.violations.iter().cloned());
        status
    }
}

// ============================================================================
// forbid-unpacked-dimensions
// ============================================================================

static FORBID_UNPACKED_DIMENSIONS: LintRuleDescriptor = LintRuleDescriptor {
    name: "forbid-unpacked-dimensions",
    kind: LintRuleKind::SyntaxTree,
    topic: "dimensions",
    description: "Avoid unpacked dimensions; declare packed ranges before the name.",
    default_enabled: false,
    url: "https://github.com/lowRISC/style-guides/blob/master/VerilogCodingStyle.md#packed-and-unpacked-arrays",
};

#[derive(Default)]
struct ForbidUnpackedDimensionsRule {
    violations: Vec<LintViolation>,
}

impl SyntaxTreeLintRule for ForbidUnpackedDimensionsRule {
    fn handle_node(
        &mut self,
        node: &SyntaxTreeNode,
        context: &SyntaxTreeContext<'_>,
        _source: &str,
    ) {
        if node.tag != NodeTag::UnpackedDimensions {
            return;
        }
        let Some(anchor) = node.present_children().find_map(leftmost_leaf) else {
            return;
        };
        let mut violation =
            LintViolation::new(*anchor, "Avoid unpacked dimensions.").with_context(context);
        violation.context_tags.push(node.tag);
        self.violations.push(violation);
    }

    fn report(&self) -> LintRuleStatus {
        let mut status = LintRuleStatus::new(
            FORBID_UNPACKED_DIMENSIONS.name,
            FORBID_UNPACKED_DIMENSIONS.url,
        );
        status.violations.extend(self.violations.iter().cloned());
        status
    }
}

// ============================================================================
// explicit-parameter-storage-type
// ============================================================================

static EXPLICIT_PARAMETER_STORAGE_TYPE: LintRuleDescriptor = LintRuleDescriptor {
    name: "explicit-parameter-storage-type",
    kind: LintRuleKind::SyntaxTree,
    topic: "parameters",
    description: "Parameters should declare an explicit storage type.",
    default_enabled: true,
    url: "https://github.com/lowRISC/style-guides/blob/master/VerilogCodingStyle.md#constants",
};

#[derive(Default)]
struct ExplicitParameterStorageTypeRule {
    violations: Vec<LintViolation>,
}

impl SyntaxTreeLintRule for ExplicitParameterStorageTypeRule {
    fn handle_node(
        &mut self,
        node: &SyntaxTreeNode,
        context: &SyntaxTreeContext<'_>,
        source: &str,
    ) {
        if node.tag != NodeTag::ParamDeclaration {
            return;
        }
        let has_storage_type = match node.child(1) {
            Some(Symbol::Node(data_type)) => data_type.child(0).is_some(),
            _ => false,
        };
        if has_storage_type {
            return;
        }
        let Some(name) = node
            .child(2)
            .and_then(|c| c.as_node())
            .filter(|n| n.tag == NodeTag::ParamAssign)
            .and_then(|n| n.child(0))
            .and_then(|c| c.as_leaf())
        else {
            return;
        };
        self.violations.push(
            LintViolation::new(
                *name,
                format!(
                    "Declare an explicit storage type for parameter \"{}\".",
                    name.text(source)
                ),
            )
            .with_context(context),
        );
    }

    fn report(&self) -> LintRuleStatus {
        let mut status = LintRuleStatus::new(
            EXPLICIT_PARAMETER_STORAGE_TYPE.name,
            EXPLICIT_PARAMETER_STORAGE_TYPE.url,
        );
        status.violations.extend(self.violations.iter().cloned());
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::walk_tree_with_context;

    struct SyntaxDriver<'r> {
        rule: &'r mut dyn SyntaxTreeLintRule,
        source: String,
    }

    impl crate::syntax::TreeContextVisitor for SyntaxDriver<'_> {
        fn handle_node(&mut self, node: &SyntaxTreeNode, context: &SyntaxTreeContext<'_>) {
            self.rule.handle_node(node, context, &self.source);
        }
        fn handle_leaf(&mut self, leaf: &Token, context: &SyntaxTreeContext<'_>) {
            self.rule.handle_leaf(leaf, context, &self.source);
        }
    }

    fn run_syntax_rule(rule: &mut dyn SyntaxTreeLintRule, source: &str) -> LintRuleStatus {
        let text = TextStructure::analyze(source.to_string());
        let tree = text.syntax_tree.as_ref().expect("source should parse");
        let mut driver = SyntaxDriver {
            rule,
            source: source.to_string(),
        };
        walk_tree_with_context(tree, &mut driver);
        driver.rule.report()
    }

    #[test]
    fn unpacked_dimensions_flagged_when_enabled() {
        let mut rule = ForbidUnpackedDimensionsRule::default();
        let status = run_syntax_rule(&mut rule, "wire w[4];\n");
        assert_eq!(status.violations.len(), 1);
        let mut rule = ForbidUnpackedDimensionsRule::default();
        let status = run_syntax_rule(&mut rule, "wire [1:0] w;\n");
        assert!(status.is_ok());
    }

    #[test]
    fn parameter_without_type_flagged() {
        let mut rule = ExplicitParameterStorageTypeRule::default();
        let status = run_syntax_rule(&mut rule, "localparam x = 1;\n");
        assert_eq!(status.violations.len(), 1);
        assert!(status
            .violations
            .iter()
            .next()
            .unwrap()
            .reason
            .contains("\"x\""));

        let mut rule = ExplicitParameterStorageTypeRule::default();
        let status = run_syntax_rule(&mut rule, "localparam int x = 1;\n");
        assert!(status.is_ok());
    }

    #[test]
    fn module_filename_match() {
        let source = "module adder;\nendmodule\n";
        let text = TextStructure::analyze(source.to_string());

        let mut rule = ModuleFilenameRule::default();
        rule.lint(&text, "rtl/adder.sv");
        assert!(rule.report().is_ok());

        let mut rule = ModuleFilenameRule::default();
        rule.lint(&text, "rtl/mismatch.sv");
        let status = rule.report();
        assert_eq!(status.violations.len(), 1);
        assert!(status
            .violations
            .iter()
            .next()
            .unwrap()
            .reason
            .contains("mismatch"));
    }

    #[test]
    fn module_filename_skips_stdin() {
        let text = TextStructure::analyze("module m;\nendmodule\n".to_string());
        let mut rule = ModuleFilenameRule::default();
        rule.lint(&text, "-");
        assert!(rule.report().is_ok());
    }
}
