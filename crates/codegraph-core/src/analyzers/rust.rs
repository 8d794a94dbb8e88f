//! Rust analyzer: functions, structs, traits, enums, impls, and the
//! `impl Trait for Type` / `calls` edges the generic containment pass can't
//! derive from span nesting alone.

use serde_json::json;

use super::tag_query::{self, CaptureRole};
use super::{common, AnalysisContext, Analyzer};
use crate::ids::relationship_id;
use crate::model::{ParseResult, RelationshipType};
use crate::parser::SupportedLanguage;

const QUERY: &str = r#"
(function_item name: (identifier) @name.definition.function) @definition.function
(struct_item name: (type_identifier) @name.definition.struct) @definition.struct
(enum_item name: (type_identifier) @name.definition.enum) @definition.enum
(trait_item name: (type_identifier) @name.definition.trait) @definition.trait
(mod_item name: (identifier) @name.definition.module) @definition.module
(macro_definition name: (identifier) @name.definition.macro) @definition.macro
(call_expression function: (identifier) @name.reference.call) @reference.call
(call_expression function: (field_expression field: (field_identifier) @name.reference.call)) @reference.call
"#;

pub struct RustAnalyzer;

impl Analyzer for RustAnalyzer {
    fn language(&self) -> SupportedLanguage {
        SupportedLanguage::Rust
    }

    fn analyze(&self, ctx: &AnalysisContext) -> ParseResult {
        let start = std::time::Instant::now();
        let language = ctx.language.tree_sitter_language().unwrap();
        let captures = tag_query::run(QUERY, language, ctx.tree, ctx.source);

        let file = common::file_entity(ctx);
        let mut entities = vec![file.clone()];
        let mut relationships = Vec::new();

        let definitions: Vec<_> = captures
            .iter()
            .filter(|c| c.role == CaptureRole::Definition)
            .map(|c| common::entity_from_capture(c, ctx, json!({})))
            .collect();

        for impl_block in find_impl_blocks(ctx) {
            entities_from_impl(ctx, &impl_block, &mut relationships, &definitions);
        }

        entities.extend(definitions.clone());
        relationships.extend(common::containment_relationships(&file, &definitions));

        let mut placeholders = Vec::new();
        for capture in captures.iter().filter(|c| c.role == CaptureRole::Reference) {
            let from_id = enclosing_definition(capture.start_byte, &definitions)
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

fn enclosing_definition<'a>(
    byte: usize,
    definitions: &'a [crate::model::Entity],
) -> Option<&'a crate::model::Entity> {
    definitions
        .iter()
        .filter(|e| {
            (e.location.start.byte_index as usize) <= byte
                && byte <= (e.location.end.byte_index as usize)
        })
        .min_by_key(|e| e.location.end.byte_index - e.location.start.byte_index)
}

struct ImplBlock {
    trait_name: Option<String>,
    type_name: String,
}

fn find_impl_blocks(ctx: &AnalysisContext) -> Vec<ImplBlock> {
    let mut out = Vec::new();
    collect_impls(ctx.tree.root_node(), ctx.source, &mut out);
    out
}

fn collect_impls(node: tree_sitter::Node, source: &[u8], out: &mut Vec<ImplBlock>) {
    if node.kind() == "impl_item" {
        let trait_name = node
            .child_by_field_name("trait")
            .and_then(|n| n.utf8_text(source).ok())
            .map(|s| s.to_string());
        if let Some(type_node) = node.child_by_field_name("type") {
            if let Ok(type_name) = type_node.utf8_text(source) {
                out.push(ImplBlock {
                    trait_name,
                    type_name: type_name.to_string(),
                });
            }
        }
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_impls(child, source, out);
    }
}

fn entities_from_impl(
    _ctx: &AnalysisContext,
    impl_block: &ImplBlock,
    relationships: &mut Vec<crate::model::Relationship>,
    definitions: &[crate::model::Entity],
) {
    let Some(trait_name) = &impl_block.trait_name else {
        return;
    };
    let Some(type_entity) = definitions.iter().find(|e| e.name == impl_block.type_name) else {
        return;
    };
    let Some(trait_entity) = definitions.iter().find(|e| &e.name == trait_name) else {
        return;
    };
    relationships.push(crate::model::Relationship {
        id: relationship_id(&type_entity.id, &trait_entity.id, RelationshipType::Implements.as_str()),
        from_id: type_entity.id.clone(),
        to_id: trait_entity.id.clone(),
        relationship_type: RelationshipType::Implements,
        metadata: json!({}),
        weight: 1.0,
        created_at: common::now(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::Parser;

    fn analyze(source: &str) -> ParseResult {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_rust::LANGUAGE.into()).unwrap();
        let tree = parser.parse(source, None).unwrap();
        let ctx = AnalysisContext {
            file_path: "lib.rs",
            source: source.as_bytes(),
            tree: &tree,
            content_hash: "deadbeef",
            language: SupportedLanguage::Rust,
        };
        RustAnalyzer.analyze(&ctx)
    }

    #[test]
    fn extracts_function_and_struct() {
        let result = analyze("struct Foo;\nfn bar() {}\n");
        let names: Vec<_> = result.entities.iter().map(|e| e.name.as_str()).collect();
        assert!(names.contains(&"Foo"));
        assert!(names.contains(&"bar"));
    }

    #[test]
    fn impl_trait_creates_implements_edge() {
        let result = analyze("trait Greet {}\nstruct Foo;\nimpl Greet for Foo {}\n");
        let has_implements = result
            .relationships
            .iter()
            .any(|r| matches!(r.relationship_type, RelationshipType::Implements));
        assert!(has_implements);
    }

    #[test]
    fn call_creates_relationship() {
        let result = analyze("fn helper() {}\nfn main() { helper(); }\n");
        let has_call = result
            .relationships
            .iter()
            .any(|r| matches!(r.relationship_type, RelationshipType::Calls));
        assert!(has_call);
    }
}
