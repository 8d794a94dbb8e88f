//! C analyzer: functions, structs, and preprocessor `#include` edges.

use serde_json::json;

use super::tag_query::{self, CaptureRole};
use super::{common, AnalysisContext, Analyzer};
use crate::model::{ParseResult, RelationshipType};
use crate::parser::SupportedLanguage;

const QUERY: &str = r#"
(function_definition declarator: (function_declarator declarator: (identifier) @name.definition.function)) @definition.function
(struct_specifier name: (type_identifier) @name.definition.struct) @definition.struct
(call_expression function: (identifier) @name.reference.call) @reference.call
(preproc_include path: (_) @name.reference.import) @reference.import
"#;

pub struct CAnalyzer;

impl Analyzer for CAnalyzer {
    fn language(&self) -> SupportedLanguage {
        SupportedLanguage::C
    }

    fn analyze(&self, ctx: &AnalysisContext) -> ParseResult {
        analyze_c_family(ctx, QUERY)
    }
}

/// Shared by C and C++: both expose `preproc_include`/`call_expression`
/// with the same field names.
pub(super) fn analyze_c_family(ctx: &AnalysisContext, query_src: &str) -> ParseResult {
    let start = std::time::Instant::now();
    let language = ctx.language.tree_sitter_language().unwrap();
    let captures = tag_query::run(query_src, language, ctx.tree, ctx.source);

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
    fn extracts_function_and_include() {
        let source = "#include <stdio.h>\nint add(int a, int b) { return a + b; }\n";
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_c::LANGUAGE.into()).unwrap();
        let tree = parser.parse(source, None).unwrap();
        let ctx = AnalysisContext {
            file_path: "a.c",
            source: source.as_bytes(),
            tree: &tree,
            content_hash: "h",
            language: SupportedLanguage::C,
        };
        let result = CAnalyzer.analyze(&ctx);
        assert!(result.entities.iter().any(|e| e.name == "add"));
        assert!(result
            .relationships
            .iter()
            .any(|r| matches!(r.relationship_type, RelationshipType::Imports)));
    }
}
