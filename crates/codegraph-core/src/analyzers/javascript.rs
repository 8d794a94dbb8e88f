//! JavaScript analyzer: functions, classes, and ES module import/export
//! edges.

use serde_json::json;

use super::tag_query::{self, CaptureRole};
use super::{common, AnalysisContext, Analyzer};
use crate::model::{ParseResult, RelationshipType};
use crate::parser::SupportedLanguage;

pub(super) const QUERY: &str = r#"
(function_declaration name: (identifier) @name.definition.function) @definition.function
(class_declaration name: (identifier) @name.definition.class) @definition.class
(method_definition name: (property_identifier) @name.definition.method) @definition.method
(call_expression function: (identifier) @name.reference.call) @reference.call
(call_expression function: (member_expression property: (property_identifier) @name.reference.call)) @reference.call
(import_statement source: (string) @name.reference.import) @reference.import
"#;

pub struct JavaScriptAnalyzer;

impl Analyzer for JavaScriptAnalyzer {
    fn language(&self) -> SupportedLanguage {
        SupportedLanguage::JavaScript
    }

    fn analyze(&self, ctx: &AnalysisContext) -> ParseResult {
        analyze_ecma(ctx)
    }
}

/// Shared by JavaScript and TypeScript: both grammars expose the same node
/// shapes for the constructs this query covers.
pub(super) fn analyze_ecma(ctx: &AnalysisContext) -> ParseResult {
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

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::Parser;

    #[test]
    fn extracts_class_and_method() {
        let source = "class Foo {\n  bar() {}\n}\n";
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_javascript::LANGUAGE.into()).unwrap();
        let tree = parser.parse(source, None).unwrap();
        let ctx = AnalysisContext {
            file_path: "a.js",
            source: source.as_bytes(),
            tree: &tree,
            content_hash: "h",
            language: SupportedLanguage::JavaScript,
        };
        let result = JavaScriptAnalyzer.analyze(&ctx);
        let names: Vec<_> = result.entities.iter().map(|e| e.name.as_str()).collect();
        assert!(names.contains(&"Foo"));
        assert!(names.contains(&"bar"));
    }
}
