//! Structural search over the concrete syntax tree.
//!
//! `search_syntax_tree` records every subtree matching a predicate, in
//! pre-order. The cast and subtree accessors assert the tags the caller
//! claims to know, but tolerate absent child slots (error-recovery trees
//! leave holes), returning `None` instead of panicking.

use crate::syntax::{NodeTag, Symbol, SyntaxTreeNode};
use crate::token::Token;

/// One match: the matched subtree plus the ancestor tags above it.
#[derive(Debug)]
pub struct TreeSearchMatch<'a> {
    pub symbol: &'a Symbol,
    pub context: Vec<NodeTag>,
}

/// Pre-order DFS recording every subtree for which `predicate` holds.
pub fn search_syntax_tree<'a>(
    root: &'a Symbol,
    predicate: &dyn Fn(&Symbol) -> bool,
) -> Vec<TreeSearchMatch<'a>> {
    fn recurse<'a>(
        symbol: &'a Symbol,
        predicate: &dyn Fn(&Symbol) -> bool,
        context: &mut Vec<NodeTag>,
        matches: &mut Vec<TreeSearchMatch<'a>>,
    ) {
        if predicate(symbol) {
            matches.push(TreeSearchMatch {
                symbol,
                context: context.clone(),
            });
        }
        if let Symbol::Node(n) = symbol {
            context.push(n.tag);
            for child in n.present_children() {
                recurse(child, predicate, context, matches);
            }
            context.pop();
        }
    }
    let mut matches = Vec::new();
    recurse(root, predicate, &mut Vec::new(), &mut matches);
    matches
}

/// Predicate matching nodes with a specific tag.
pub fn node_tag_predicate(tag: NodeTag) -> impl Fn(&Symbol) -> bool {
    move |symbol| symbol.tag() == Some(tag)
}

/// All nodes tagged `tag`, in pre-order.
pub fn find_all_tagged(root: &Symbol, tag: NodeTag) -> Vec<TreeSearchMatch<'_>> {
    search_syntax_tree(root, &node_tag_predicate(tag))
}

/// Asserting node cast. Panics on a leaf or a tag mismatch; both indicate a
/// caller that misread the grammar.
pub fn symbol_cast_to_node(symbol: &Symbol, tag: NodeTag) -> &SyntaxTreeNode {
    match symbol {
        Symbol::Node(n) => {
            assert!(
                n.tag == tag,
                "expected node tagged {tag:?}, found {:?}",
                n.tag
            );
            n
        }
        Symbol::Leaf(t) => panic!("expected node tagged {tag:?}, found leaf {:?}", t.kind),
    }
}

/// Asserting leaf cast.
pub fn symbol_cast_to_leaf(symbol: &Symbol) -> &Token {
    match symbol {
        Symbol::Leaf(t) => t,
        Symbol::Node(n) => panic!("expected leaf, found node tagged {:?}", n.tag),
    }
}

/// Child of a node known to be tagged `tag`, itself expected to be a node.
/// Returns `None` when the child slot is empty; panics when the present
/// child's tag contradicts `child_tag`.
pub fn get_subtree_as_node<'a>(
    symbol: &'a Symbol,
    tag: NodeTag,
    child_index: usize,
    child_tag: Option<NodeTag>,
) -> Option<&'a SyntaxTreeNode> {
    let parent = symbol_cast_to_node(symbol, tag);
    let child = parent.child(child_index)?;
    let child_node = child.as_node()?;
    if let Some(expected) = child_tag {
        assert!(
            child_node.tag == expected,
            "child {child_index} of {tag:?}: expected {expected:?}, found {:?}",
            child_node.tag
        );
    }
    Some(child_node)
}

/// Child of a node known to be tagged `tag`, itself expected to be a leaf.
pub fn get_subtree_as_leaf<'a>(
    symbol: &'a Symbol,
    tag: NodeTag,
    child_index: usize,
) -> Option<&'a Token> {
    let parent = symbol_cast_to_node(symbol, tag);
    parent.child(child_index)?.as_leaf()
}

/// First leaf in pre-order, if any.
pub fn leftmost_leaf(symbol: &Symbol) -> Option<&Token> {
    match symbol {
        Symbol::Leaf(t) => Some(t),
        Symbol::Node(n) => n.present_children().find_map(leftmost_leaf),
    }
}

/// Last leaf in pre-order, if any.
pub fn rightmost_leaf(symbol: &Symbol) -> Option<&Token> {
    match symbol {
        Symbol::Leaf(t) => Some(t),
        Symbol::Node(n) => {
            for child in n.present_children().collect::<Vec<_>>().into_iter().rev() {
                if let Some(leaf) = rightmost_leaf(child) {
                    return Some(leaf);
                }
            }
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{leaf, node};
    use crate::token::{ByteRange, Token, TokenKind};

    fn tk(start: usize) -> Token {
        Token::new(TokenKind::SymbolIdentifier, ByteRange::new(start, start + 1))
    }

    fn tree() -> Symbol {
        node(
            NodeTag::NetDeclaration,
            vec![
                Some(leaf(tk(0))),
                Some(node(NodeTag::PackedDimensions, vec![Some(leaf(tk(1)))])),
                None,
                Some(node(
                    NodeTag::NetVariable,
                    vec![Some(leaf(tk(2))), Some(node(NodeTag::PackedDimensions, vec![]))],
                )),
            ],
        )
    }

    #[test]
    fn search_counts_matches_in_preorder() {
        let tree = tree();
        let matches = find_all_tagged(&tree, NodeTag::PackedDimensions);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].context, vec![NodeTag::NetDeclaration]);
        assert_eq!(
            matches[1].context,
            vec![NodeTag::NetDeclaration, NodeTag::NetVariable]
        );
        assert!(find_all_tagged(&tree, NodeTag::UnpackedDimensions).is_empty());
    }

    #[test]
    fn search_with_custom_predicate() {
        let tree = tree();
        let leaves = search_syntax_tree(&tree, &|s| s.is_leaf());
        assert_eq!(leaves.len(), 3);
    }

    #[test]
    fn subtree_accessors_tolerate_missing_children() {
        let tree = tree();
        assert!(get_subtree_as_node(&tree, NodeTag::NetDeclaration, 2, None).is_none());
        assert!(get_subtree_as_node(&tree, NodeTag::NetDeclaration, 9, None).is_none());
        let dims = get_subtree_as_node(
            &tree,
            NodeTag::NetDeclaration,
            1,
            Some(NodeTag::PackedDimensions),
        );
        assert!(dims.is_some());
        let name = get_subtree_as_leaf(&tree, NodeTag::NetDeclaration, 0).unwrap();
        assert_eq!(name.span.start, 0);
    }

    #[test]
    #[should_panic(expected = "expected node tagged")]
    fn cast_to_wrong_tag_panics() {
        let tree = tree();
        symbol_cast_to_node(&tree, NodeTag::ModuleDeclaration);
    }

    #[test]
    fn extreme_leaves() {
        let tree = tree();
        assert_eq!(leftmost_leaf(&tree).unwrap().span.start, 0);
        assert_eq!(rightmost_leaf(&tree).unwrap().span.start, 2);
        let empty = node(NodeTag::Expression, vec![None]);
        assert!(leftmost_leaf(&empty).is_none());
        assert!(rightmost_leaf(&empty).is_none());
    }
}
