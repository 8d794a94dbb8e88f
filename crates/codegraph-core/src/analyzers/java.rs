//! Java analyzer: classes, interfaces, methods, and `extends`/`implements`
//! clauses.

use serde_json::json;

use super::tag_query::{self, CaptureRole};
use super::{common, AnalysisContext, Analyzer};
use crate::ids::relationship_id;
use crate::model::{Entity, ParseResult, Relationship, RelationshipType};
use crate::parser::SupportedLanguage;

const QUERY: &str = r#"
(class_declaration name: (identifier) @name.definition.class) @definition.class
(interface_declaration name: (identifier) @name.definition.interface) @definition.interface
(method_declaration name: (identifier) @name.definition.method) @definition.method
(method_invocation name: (identifier) @name.reference.call) @reference.call
(import_declaration (scoped_identifier) @name.reference.import) @reference.import
"#;

pub struct JavaAnalyzer;

impl Analyzer for JavaAnalyzer {
    fn language(&self) -> SupportedLanguage {
        SupportedLanguage::Java
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
        relationships.extend(supertype_edges(ctx, &definitions));
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

fn supertype_edges(ctx: &AnalysisContext, entities: &[Entity]) -> Vec<Relationship> {
    let mut edges = Vec::new();
    walk(ctx.tree.root_node(), ctx.source, entities, &mut edges);
    edges
}

fn walk(node: tree_sitter::Node, source: &[u8], entities: &[Entity], edges: &mut Vec<Relationship>) {
    if node.kind() == "class_declaration" || node.kind() == "interface_declaration" {
        if let Some(name_node) = node.child_by_field_name("name") {
            if let Ok(derived_name) = name_node.utf8_text(source) {
                if let Some(owner) = entities.iter().find(|e| e.name == derived_name) {
                    if let Some(superclass) = node.child_by_field_name("superclass") {
                        emit_edges(&superclass, source, owner, entities, RelationshipType::Extends, edges);
                    }
                    if let Some(interfaces) = node.child_by_field_name("interfaces") {
                        emit_edges(&interfaces, source, owner, entities, RelationshipType::Implements, edges);
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

fn emit_edges(
    node: &tree_sitter::Node,
    source: &[u8],
    owner: &Entity,
    entities: &[Entity],
    rel_type: RelationshipType,
    edges: &mut Vec<Relationship>,
) {
    if node.kind() == "type_identifier" {
        if let Ok(name) = node.utf8_text(source) {
            if let Some(target) = entities.iter().find(|e| e.name == name) {
                edges.push(Relationship {
                    id: relationship_id(&owner.id, &target.id, rel_type.as_str()),
                    from_id: owner.id.clone(),
                    to_id: target.id.clone(),
                    relationship_type: rel_type,
                    metadata: json!({}),
                    weight: 1.0,
                    created_at: common::now(),
                });
            }
        }
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        emit_edges(&child, source, owner, entities, rel_type, edges);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::Parser;

    #[test]
    fn extracts_class_and_implements_edge() {
        let source = "interface Shape {}\nclass Circle implements Shape {\n  void draw() {}\n}\n";
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_java::LANGUAGE.into()).unwrap();
        let tree = parser.parse(source, None).unwrap();
        let ctx = AnalysisContext {
            file_path: "a.java",
            source: source.as_bytes(),
            tree: &tree,
            content_hash: "h",
            language: SupportedLanguage::Java,
        };
        let result = JavaAnalyzer.analyze(&ctx);
        assert!(result
            .relationships
            .iter()
            .any(|r| matches!(r.relationship_type, RelationshipType::Implements)));
    }
}
