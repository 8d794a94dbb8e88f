//! Go analyzer: functions, methods (with receivers), structs, interfaces,
//! and embedded-struct composition edges.

use serde_json::json;

use super::tag_query::{self, CaptureRole};
use super::{common, AnalysisContext, Analyzer};
use crate::ids::relationship_id;
use crate::model::{Entity, ParseResult, Relationship, RelationshipType};
use crate::parser::SupportedLanguage;

const QUERY: &str = r#"
(function_declaration name: (identifier) @name.definition.function) @definition.function
(method_declaration name: (field_identifier) @name.definition.method) @definition.method
(type_declaration (type_spec name: (type_identifier) @name.definition.struct type: (struct_type))) @definition.struct
(type_declaration (type_spec name: (type_identifier) @name.definition.interface type: (interface_type))) @definition.interface
(call_expression function: (identifier) @name.reference.call) @reference.call
(import_spec path: (interpreted_string_literal) @name.reference.import) @reference.import
"#;

pub struct GoAnalyzer;

impl Analyzer for GoAnalyzer {
    fn language(&self) -> SupportedLanguage {
        SupportedLanguage::Go
    }

    fn analyze(&self, ctx: &AnalysisContext) -> ParseResult {
        let start = std::time::Instant::now();
        let language = ctx.language.tree_sitter_language().unwrap();
        let captures = tag_query::run(QUERY, language, ctx.tree, ctx.source);

        let file = common::file_entity(ctx);
        let definitions: Vec<_> = captures
            .iter()
            .filter(|c| c.role == CaptureRole::Definition)
            .map(|c| common::entity_from_capture(c, ctx, json!({})))
            .collect();

        let mut entities = vec![file.clone()];
        entities.extend(definitions.clone());

        let mut relationships = common::containment_relationships(&file, &definitions);
        relationships.extend(embedding_edges(ctx, &definitions));
        let mut placeholders = Vec::new();

        for capture in captures.iter().filter(|c| c.role == CaptureRole::Reference) {
            let from_id = definitions
                .iter()
                .filter(|e| {
                    (e.location.start.byte_index as usize) <= capture.start_byte
                        && capture.start_byte <= (e.location.end.byte_index as usize)
                })
                .min_by_key(|e| e.location.end.byte_index - e.location.start.byte_index)
                .map(|e| e.id.clone())
                .unwrap_or_else(|| file.id.clone());

            let rel_type = if capture.kind == "import" {
                RelationshipType::Imports
            } else {
                RelationshipType::Calls
            };

            let (rel, placeholder) =
                common::resolve_reference(capture, ctx, &definitions, rel_type, &from_id);
            relationships.push(rel);
            if let Some(p) = placeholder {
                placeholders.push(p);
            }
        }

        entities.extend(common::placeholder_entities(&placeholders));

        ParseResult {
            file_path: ctx.file_path.to_string(),
            language: ctx.language.as_str().to_string(),
            entities,
            relationships,
            patterns: if placeholders.is_empty() {
                None
            } else {
                Some(json!({ "unresolved_references": placeholders }))
            },
            content_hash: ctx.content_hash.to_string(),
            timestamp: common::now(),
            parse_time_ms: start.elapsed().as_millis() as u64,
            errors: Vec::new(),
        }
    }
}

/// `struct { Base; ... }` fields with no declared name are embedded types;
/// model them as `DependsOn` composition edges from the containing struct.
fn embedding_edges(ctx: &AnalysisContext, entities: &[Entity]) -> Vec<Relationship> {
    let mut edges = Vec::new();
    walk(ctx.tree.root_node(), ctx.source, entities, &mut edges);
    edges
}

fn walk(node: tree_sitter::Node, source: &[u8], entities: &[Entity], edges: &mut Vec<Relationship>) {
    if node.kind() == "struct_type" {
        if let Some(spec) = node.parent() {
            if let Some(name_node) = spec.child_by_field_name("name") {
                if let Ok(struct_name) = name_node.utf8_text(source) {
                    if let Some(field_list) = node.child_by_field_name("body") {
                        let mut cursor = field_list.walk();
                        for field in field_list.children(&mut cursor) {
                            if field.kind() == "field_declaration" && field.child_by_field_name("name").is_none() {
                                if let Some(type_node) = field.child_by_field_name("type") {
                                    if let Ok(embedded_name) = type_node.utf8_text(source) {
                                        let embedded_name = embedded_name.trim_start_matches('*');
                                        if let (Some(owner), Some(embedded)) = (
                                            entities.iter().find(|e| e.name == struct_name),
                                            entities.iter().find(|e| e.name == embedded_name),
                                        ) {
                                            edges.push(Relationship {
                                                id: relationship_id(
                                                    &owner.id,
                                                    &embedded.id,
                                                    RelationshipType::DependsOn.as_str(),
                                                ),
                                                from_id: owner.id.clone(),
                                                to_id: embedded.id.clone(),
                                                relationship_type: RelationshipType::DependsOn,
                                                metadata: json!({ "embedded": true }),
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
            }
        }
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk(child, source, entities, edges);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::Parser;

    #[test]
    fn extracts_function_and_struct() {
        let source = "package main\n\nfunc Add(a, b int) int {\n\treturn a + b\n}\n\ntype Widget struct {\n\tName string\n}\n";
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_go::LANGUAGE.into()).unwrap();
        let tree = parser.parse(source, None).unwrap();
        let ctx = AnalysisContext {
            file_path: "a.go",
            source: source.as_bytes(),
            tree: &tree,
            content_hash: "h",
            language: SupportedLanguage::Go,
        };
        let result = GoAnalyzer.analyze(&ctx);
        let names: Vec<_> = result.entities.iter().map(|e| e.name.as_str()).collect();
        assert!(names.contains(&"Add"));
        assert!(names.contains(&"Widget"));
    }

    #[test]
    fn detects_embedded_struct() {
        let source = "package main\n\ntype Base struct {\n\tID int\n}\n\ntype Derived struct {\n\tBase\n\tExtra string\n}\n";
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_go::LANGUAGE.into()).unwrap();
        let tree = parser.parse(source, None).unwrap();
        let ctx = AnalysisContext {
            file_path: "a.go",
            source: source.as_bytes(),
            tree: &tree,
            content_hash: "h",
            language: SupportedLanguage::Go,
        };
        let result = GoAnalyzer.analyze(&ctx);
        assert!(result
            .relationships
            .iter()
            .any(|r| matches!(r.relationship_type, RelationshipType::DependsOn)));
    }
}
