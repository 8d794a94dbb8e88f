//! C++ analyzer: classes/structs, member functions, templates, and
//! inheritance (`class Derived : public Base`) edges. Shares C's
//! preprocessor/call handling.

use serde_json::json;

use super::c::analyze_c_family;
use super::tag_query::{self, CaptureRole};
use super::{common, AnalysisContext, Analyzer};
use crate::ids::relationship_id;
use crate::model::{ParseResult, RelationshipType};
use crate::parser::SupportedLanguage;

const QUERY: &str = r#"
(function_definition declarator: (function_declarator declarator: (identifier) @name.definition.function)) @definition.function
(function_definition declarator: (function_declarator declarator: (field_identifier) @name.definition.method)) @definition.method
(class_specifier name: (type_identifier) @name.definition.class) @definition.class
(struct_specifier name: (type_identifier) @name.definition.struct) @definition.struct
(call_expression function: (identifier) @name.reference.call) @reference.call
(preproc_include path: (_) @name.reference.import) @reference.import
"#;

pub struct CppAnalyzer;

impl Analyzer for CppAnalyzer {
    fn language(&self) -> SupportedLanguage {
        SupportedLanguage::Cpp
    }

    fn analyze(&self, ctx: &AnalysisContext) -> ParseResult {
        let mut result = analyze_c_family(ctx, QUERY);
        result.relationships.extend(inheritance_edges(ctx, &result.entities));
        result
    }
}

fn inheritance_edges(
    ctx: &AnalysisContext,
    entities: &[crate::model::Entity],
) -> Vec<crate::model::Relationship> {
    let mut edges = Vec::new();
    collect_base_clauses(ctx.tree.root_node(), ctx.source, entities, &mut edges);
    edges
}

fn collect_base_clauses(
    node: tree_sitter::Node,
    source: &[u8],
    entities: &[crate::model::Entity],
    edges: &mut Vec<crate::model::Relationship>,
) {
    if node.kind() == "base_class_clause" {
        if let Some(derived_node) = node.parent().and_then(|p| p.child_by_field_name("name")) {
            if let Ok(derived_name) = derived_node.utf8_text(source) {
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    if child.kind() == "type_identifier" {
                        if let Ok(base_name) = child.utf8_text(source) {
                            if let (Some(derived), Some(base)) = (
                                entities.iter().find(|e| e.name == derived_name),
                                entities.iter().find(|e| e.name == base_name),
                            ) {
                                edges.push(crate::model::Relationship {
                                    id: relationship_id(&derived.id, &base.id, RelationshipType::Extends.as_str()),
                                    from_id: derived.id.clone(),
                                    to_id: base.id.clone(),
                                    relationship_type: RelationshipType::Extends,
                                    metadata: json!({}),
                                    weight: 1.0,
                                    created_at: common::now(),
                                });
                            }
                        }
                    }
                }
            }
        }
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_base_clauses(child, source, entities, edges);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::Parser;

    #[test]
    fn extracts_inheritance() {
        let source = "class Base {};\nclass Derived : public Base {};\n";
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_cpp::LANGUAGE.into()).unwrap();
        let tree = parser.parse(source, None).unwrap();
        let ctx = AnalysisContext {
            file_path: "a.cpp",
            source: source.as_bytes(),
            tree: &tree,
            content_hash: "h",
            language: SupportedLanguage::Cpp,
        };
        let result = CppAnalyzer.analyze(&ctx);
        assert!(result
            .relationships
            .iter()
            .any(|r| matches!(r.relationship_type, RelationshipType::Extends)));
    }
}
