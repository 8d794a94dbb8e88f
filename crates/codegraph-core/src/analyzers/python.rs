//! Python analyzer: functions, classes, decorators, and dunder ("magic
//! method") classification.

use serde_json::json;

use super::tag_query::{self, CaptureRole};
use super::{common, AnalysisContext, Analyzer};
use crate::model::{ParseResult, RelationshipType};
use crate::parser::SupportedLanguage;

const QUERY: &str = r#"
(function_definition name: (identifier) @name.definition.function) @definition.function
(class_definition name: (identifier) @name.definition.class) @definition.class
(call function: (identifier) @name.reference.call) @reference.call
(call function: (attribute attribute: (identifier) @name.reference.call)) @reference.call
"#;

pub struct PythonAnalyzer;

impl Analyzer for PythonAnalyzer {
    fn language(&self) -> SupportedLanguage {
        SupportedLanguage::Python
    }

    fn analyze(&self, ctx: &AnalysisContext) -> ParseResult {
        let start = std::time::Instant::now();
        let language = ctx.language.tree_sitter_language().unwrap();
        let captures = tag_query::run(QUERY, language, ctx.tree, ctx.source);

        let file = common::file_entity(ctx);
        let definitions: Vec<_> = captures
            .iter()
            .filter(|c| c.role == CaptureRole::Definition)
            .map(|c| {
                let metadata = json!({
                    "is_dunder": c.name.starts_with("__") && c.name.ends_with("__"),
                    "decorators": decorators_for(ctx, c.start_byte),
                });
                common::entity_from_capture(c, ctx, metadata)
            })
            .collect();

        let mut entities = vec![file.clone()];
        entities.extend(definitions.clone());

        let mut relationships = common::containment_relationships(&file, &definitions);

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

/// Collect `@decorator` lines immediately preceding a definition, by walking
/// back over `decorated_definition` siblings in the source text.
fn decorators_for(ctx: &AnalysisContext, def_start_byte: usize) -> Vec<String> {
    let mut decorators = Vec::new();
    let mut node = ctx.tree.root_node().descendant_for_byte_range(def_start_byte, def_start_byte);
    while let Some(n) = node {
        if n.kind() == "decorated_definition" {
            let mut cursor = n.walk();
            for child in n.children(&mut cursor) {
                if child.kind() == "decorator" {
                    if let Ok(text) = child.utf8_text(ctx.source) {
                        decorators.push(text.trim_start_matches('@').to_string());
                    }
                }
            }
            break;
        }
        node = n.parent();
    }
    decorators
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::Parser;

    fn analyze(source: &str) -> ParseResult {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_python::LANGUAGE.into()).unwrap();
        let tree = parser.parse(source, None).unwrap();
        let ctx = AnalysisContext {
            file_path: "m.py",
            source: source.as_bytes(),
            tree: &tree,
            content_hash: "h",
            language: SupportedLanguage::Python,
        };
        PythonAnalyzer.analyze(&ctx)
    }

    #[test]
    fn classifies_dunder_methods() {
        let result = analyze("class Foo:\n    def __init__(self):\n        pass\n");
        let init = result.entities.iter().find(|e| e.name == "__init__").unwrap();
        assert_eq!(init.metadata["is_dunder"], json!(true));
    }

    #[test]
    fn class_contains_method() {
        let result = analyze("class Foo:\n    def bar(self):\n        pass\n");
        let contains = result
            .relationships
            .iter()
            .any(|r| matches!(r.relationship_type, RelationshipType::Contains));
        assert!(contains);
    }
}
