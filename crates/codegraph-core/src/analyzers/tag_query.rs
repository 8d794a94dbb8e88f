//! Generic tree-sitter tag-query engine shared by every grammar-backed
//! analyzer.
//!
//! Query captures follow the `tree-sitter-tags` convention: a definition is
//! captured as `@definition.{kind}` with its identifier nested as
//! `@name.definition.{kind}`; a reference is `@reference.{kind}` with
//! `@name.reference.{kind}`. `{kind}` is a free-form label (`function`,
//! `class`, `call`, `import`, ...) that each language's analyzer maps onto
//! [`crate::model::EntityType`] / [`crate::model::RelationshipType`].

use tree_sitter::{Language, Query, QueryCursor, StreamingIterator, Tree};

/// Whether a capture denotes something being defined or merely referenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureRole {
    Definition,
    Reference,
}

/// One classified capture from a tag query match.
#[derive(Debug, Clone)]
pub struct Capture {
    pub kind: String,
    pub role: CaptureRole,
    pub name: String,
    pub start_byte: usize,
    pub end_byte: usize,
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
    pub node_kind: &'static str,
}

/// Compile `query_source` for `language` and run it over `tree`, returning
/// one [`Capture`] per matched `definition.*`/`reference.*` capture pair.
pub fn run(query_source: &str, language: Language, tree: &Tree, source: &[u8]) -> Vec<Capture> {
    let query = match Query::new(&language, query_source) {
        Ok(q) => q,
        Err(_) => return Vec::new(),
    };

    let mut cursor = QueryCursor::new();
    let mut captures = Vec::new();
    let mut matches = cursor.matches(&query, tree.root_node(), source);

    while let Some(m) = matches.next() {
        // Each match may carry both the outer `definition.*`/`reference.*`
        // capture (the whole node) and the inner `name.*` capture (the
        // identifier). We pair them by capture-name prefix.
        let mut def_node = None;
        let mut name_text = None;
        let mut kind = None;
        let mut role = None;

        for capture in m.captures {
            let capture_name = query.capture_names()[capture.index as usize];
            if let Some(rest) = capture_name.strip_prefix("definition.") {
                def_node = Some(capture.node);
                kind = Some(rest.to_string());
                role = Some(CaptureRole::Definition);
            } else if let Some(rest) = capture_name.strip_prefix("reference.") {
                def_node = Some(capture.node);
                kind = Some(rest.to_string());
                role = Some(CaptureRole::Reference);
            } else if capture_name.starts_with("name.") {
                name_text = capture.node.utf8_text(source).ok().map(|s| s.to_string());
            }
        }

        if let (Some(node), Some(kind), Some(role)) = (def_node, kind, role) {
            let name = name_text.unwrap_or_else(|| {
                node.utf8_text(source).unwrap_or("").to_string()
            });
            captures.push(Capture {
                kind,
                role,
                name,
                start_byte: node.start_byte(),
                end_byte: node.end_byte(),
                start_line: node.start_position().row as u32,
                start_column: node.start_position().column as u32,
                end_line: node.end_position().row as u32,
                end_column: node.end_position().column as u32,
                node_kind: node.kind(),
            });
        }
    }

    captures
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_rust_function_definitions() {
        let source = b"fn foo() {}\nfn bar() {}";
        let mut parser = tree_sitter::Parser::new();
        let language: Language = tree_sitter_rust::LANGUAGE.into();
        parser.set_language(&language).unwrap();
        let tree = parser.parse(source, None).unwrap();

        let query = r#"
        (function_item name: (identifier) @name.definition.function) @definition.function
        "#;
        let captures = run(query, language, &tree, source);
        assert_eq!(captures.len(), 2);
        assert_eq!(captures[0].name, "foo");
        assert_eq!(captures[0].kind, "function");
        assert!(matches!(captures[0].role, CaptureRole::Definition));
    }
}
