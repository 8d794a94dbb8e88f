//! Cross-language complexity scoring.
//!
//! `complexity_score` is computed once at parse time by counting AST nodes
//! within an entity's byte span, bounded by a cap so that very large
//! entities (e.g. a single file-level module) don't dominate comparisons.

use tree_sitter::Node;

/// Cap applied to the raw node count so outliers don't skew ranking.
pub const COMPLEXITY_CAP: u32 = 500;

/// Compute the bounded complexity score for the subtree rooted at `node`.
///
/// Counts every descendant node (including `node` itself), then clamps to
/// [`COMPLEXITY_CAP`]. Traversal stops early once the cap is reached.
pub fn complexity_score(node: &Node) -> u32 {
    let mut count: u32 = 0;
    count_nodes(*node, &mut count);
    count.min(COMPLEXITY_CAP)
}

fn count_nodes(node: Node, count: &mut u32) {
    if *count >= COMPLEXITY_CAP {
        return;
    }
    *count += 1;
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if *count >= COMPLEXITY_CAP {
            return;
        }
        count_nodes(child, count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::Parser;

    #[test]
    fn counts_nodes_within_cap() {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_rust::LANGUAGE.into())
            .unwrap();
        let tree = parser.parse("fn f() { let x = 1 + 2; }", None).unwrap();
        let score = complexity_score(&tree.root_node());
        assert!(score > 0);
        assert!(score < COMPLEXITY_CAP);
    }

    #[test]
    fn clamps_at_cap() {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_rust::LANGUAGE.into())
            .unwrap();
        let mut src = String::from("fn f() {\n");
        for i in 0..2000 {
            src.push_str(&format!("let x{i} = {i};\n"));
        }
        src.push('}');
        let tree = parser.parse(&src, None).unwrap();
        assert_eq!(complexity_score(&tree.root_node()), COMPLEXITY_CAP);
    }
}
