//! C# analyzer: classes, interfaces, methods, and `: BaseType, IFace`
//! inheritance lists.

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
(invocation_expression function: (identifier) @name.reference.call) @reference.call
"#;

pub struct CSharpAnalyzer;

impl Analyzer for CSharpAnalyzer {
    fn language(&self) -> SupportedLanguage {
        SupportedLanguage::CSharp
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
        relationships.extend(base_list_edges(ctx, &definitions));

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

            let (rel, placeholder) = common::resolve_reference(
                capture,
                ctx,
                &definitions,
                RelationshipType::Calls,
                &from_id,
            );
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

fn base_list_edges(ctx: &AnalysisContext, entities: &[Entity]) -> Vec<Relationship> {
    let mut edges = Vec::new();
    walk(ctx.tree.root_node(), ctx.source, entities, &mut edges);
    edges
}

fn walk(node: tree_sitter::Node, source: &[u8], entities: &[Entity], edges: &mut Vec<Relationship>) {
    if node.kind() == "base_list" {
        if let Some(decl) = node.parent() {
            if let Some(name_node) = decl.child_by_field_name("name") {
                if let Ok(derived_name) = name_node.utf8_text(source) {
                    let mut cursor = node.walk();
                    for child in node.children(&mut cursor) {
                        if child.kind() == "identifier" {
                            if let Ok(base_name) = child.utf8_text(source) {
                                if let (Some(derived), Some(base)) = (
                                    entities.iter().find(|e| e.name == derived_name),
                                    entities.iter().find(|e| e.name == base_name),
                                ) {
                                    edges.push(Relationship {
                                        id: relationship_id(
                                            &derived.id,
                                            &base.id,
                                            RelationshipType::Implements.as_str(),
                                        ),
                                        from_id: derived.id.clone(),
                                        to_id: base.id.clone(),
                                        relationship_type: RelationshipType::Implements,
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
    fn extracts_class_and_method() {
        let source = "class Foo {\n  void Bar() {}\n}\n";
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_c_sharp::LANGUAGE.into()).unwrap();
        let tree = parser.parse(source, None).unwrap();
        let ctx = AnalysisContext {
            file_path: "a.cs",
            source: source.as_bytes(),
            tree: &tree,
            content_hash: "h",
            language: SupportedLanguage::CSharp,
        };
        let result = CSharpAnalyzer.analyze(&ctx);
        assert!(result.entities.iter().any(|e| e.name == "Foo"));
        assert!(result.entities.iter().any(|e| e.name == "Bar"));
    }
}
