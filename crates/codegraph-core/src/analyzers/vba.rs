//! VBA analyzer: no tree-sitter grammar exists for Visual Basic for
//! Applications, so this is a regex-based line scanner rather than an AST
//! analyzer. It recognizes `Sub`/`Function`/`Property` declarations and
//! `Call`-style invocations closely enough to populate the graph, at lower
//! fidelity than the grammar-backed languages.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

use super::{common, AnalysisContext, Analyzer};
use crate::ids::{content_hash, entity_id, relationship_id};
use crate::model::{Entity, EntityType, Location, ParseResult, Position, Relationship, RelationshipType};
use crate::parser::SupportedLanguage;

static DEFINITION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(Public|Private|Friend)?\s*(Static\s+)?(Sub|Function|Property\s+(Get|Let|Set))\s+([A-Za-z_][A-Za-z0-9_]*)",
    )
    .unwrap()
});

static CALL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bCall\s+([A-Za-z_][A-Za-z0-9_]*)|([A-Za-z_][A-Za-z0-9_]*)\s*\(").unwrap()
});

static END_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*End\s+(Sub|Function|Property)").unwrap());

pub struct VbaAnalyzer;

impl Analyzer for VbaAnalyzer {
    fn language(&self) -> SupportedLanguage {
        SupportedLanguage::Vba
    }

    fn analyze(&self, ctx: &AnalysisContext) -> ParseResult {
        let start = std::time::Instant::now();
        let source_text = String::from_utf8_lossy(ctx.source);

        let file = file_entity_no_tree(ctx);
        let definitions = scan_definitions(ctx, &source_text);

        let mut entities = vec![file.clone()];
        entities.extend(definitions.iter().map(|(e, _, _)| e.clone()));
        let mut relationships: Vec<Relationship> = definitions
            .iter()
            .map(|(e, _, _)| common::contains_edge(&file, e))
            .collect();

        let mut placeholders = Vec::new();
        for (entity, body_start, body_end) in &definitions {
            for (name, line) in scan_calls(&source_text, *body_start, *body_end) {
                if name.eq_ignore_ascii_case(&entity.name) {
                    continue;
                }
                if let Some(target) = definitions.iter().find(|(e, _, _)| e.name.eq_ignore_ascii_case(&name)) {
                    relationships.push(Relationship {
                        id: relationship_id(&entity.id, &target.0.id, RelationshipType::Calls.as_str()),
                        from_id: entity.id.clone(),
                        to_id: target.0.id.clone(),
                        relationship_type: RelationshipType::Calls,
                        metadata: json!({ "line": line }),
                        weight: 1.0,
                        created_at: common::now(),
                    });
                } else {
                    let placeholder_id = entity_id("<external>", EntityType::External.as_str(), &name, 0, 0);
                    relationships.push(Relationship {
                        id: relationship_id(&entity.id, &placeholder_id, RelationshipType::Calls.as_str()),
                        from_id: entity.id.clone(),
                        to_id: placeholder_id.clone(),
                        relationship_type: RelationshipType::Calls,
                        metadata: json!({ "line": line, "unresolved": true }),
                        weight: 1.0,
                        created_at: common::now(),
                    });
                    placeholders.push((placeholder_id, name));
                }
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
                Some(json!({ "unresolved_references": placeholders, "fidelity": "regex" }))
            },
            content_hash: ctx.content_hash.to_string(),
            timestamp: common::now(),
            parse_time_ms: start.elapsed().as_millis() as u64,
            errors: Vec::new(),
        }
    }
}

/// VBA has no grammar, so there is no [`tree_sitter::Tree`] to derive a
/// root span from; fall back to the raw byte length.
fn file_entity_no_tree(ctx: &AnalysisContext) -> Entity {
    let ts = common::now();
    let id = entity_id(ctx.file_path, "file", ctx.file_path, 0, ctx.source.len() as u64);
    let line_count = String::from_utf8_lossy(ctx.source).lines().count() as u32;
    Entity {
        id,
        name: ctx.file_path.to_string(),
        entity_type: EntityType::File,
        file_path: ctx.file_path.to_string(),
        location: Location {
            start: Position { line: 0, column: 0, byte_index: 0 },
            end: Position { line: line_count, column: 0, byte_index: ctx.source.len() as u64 },
        },
        hash: ctx.content_hash.to_string(),
        language: ctx.language.as_str().to_string(),
        size_bytes: ctx.source.len() as u64,
        complexity_score: 0,
        metadata: json!({ "fidelity": "regex" }),
        created_at: ts,
        updated_at: ts,
    }
}

/// Returns `(entity, body_start_line, body_end_line)` so call-scanning can
/// be scoped to each procedure's body.
fn scan_definitions(ctx: &AnalysisContext, source_text: &str) -> Vec<(Entity, usize, usize)> {
    let lines: Vec<&str> = source_text.lines().collect();
    let mut out = Vec::new();
    let mut open: Option<(String, String, usize, usize)> = None;

    for (idx, line) in lines.iter().enumerate() {
        if let Some(caps) = DEFINITION_RE.captures(line) {
            let kind = caps.get(3).map(|m| m.as_str().to_lowercase()).unwrap_or_default();
            let kind = if kind.starts_with("property") { "property" } else { &kind };
            let name = caps.get(5).map(|m| m.as_str().to_string()).unwrap_or_default();
            open = Some((name, kind.to_string(), idx, byte_offset(&lines, idx)));
        } else if END_RE.is_match(line) {
            if let Some((name, kind, start_line, start_byte)) = open.take() {
                let end_byte = byte_offset(&lines, idx) + line.len();
                let entity_type = if kind == "property" { EntityType::Property } else { EntityType::Function };
                let span = &source_text.as_bytes()[start_byte.min(source_text.len())..end_byte.min(source_text.len())];
                let ts = common::now();
                let id = entity_id(ctx.file_path, entity_type.as_str(), &name, start_byte as u64, end_byte as u64);
                out.push((
                    Entity {
                        id,
                        name,
                        entity_type,
                        file_path: ctx.file_path.to_string(),
                        location: Location {
                            start: Position { line: start_line as u32, column: 0, byte_index: start_byte as u64 },
                            end: Position { line: idx as u32, column: 0, byte_index: end_byte as u64 },
                        },
                        hash: content_hash(std::str::from_utf8(span).unwrap_or("")),
                        language: "vba".to_string(),
                        size_bytes: span.len() as u64,
                        complexity_score: 0,
                        metadata: json!({ "fidelity": "regex" }),
                        created_at: ts,
                        updated_at: ts,
                    },
                    start_line,
                    idx,
                ));
            }
        }
    }

    out
}

fn byte_offset(lines: &[&str], line_idx: usize) -> usize {
    lines[..line_idx].iter().map(|l| l.len() + 1).sum()
}

fn scan_calls(source_text: &str, start_line: usize, end_line: usize) -> Vec<(String, u32)> {
    let mut out = Vec::new();
    for (idx, line) in source_text.lines().enumerate() {
        if idx < start_line || idx > end_line {
            continue;
        }
        for caps in CALL_RE.captures_iter(line) {
            let name = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str().to_string());
            if let Some(name) = name {
                if !DEFINITION_RE.is_match(line) {
                    out.push((name, idx as u32));
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::Parser;

    #[test]
    fn extracts_sub_and_call() {
        let source = "Sub Main()\n    Helper\nEnd Sub\n\nSub Helper()\n    Debug.Print \"hi\"\nEnd Sub\n";
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_rust::LANGUAGE.into()).unwrap();
        let tree = parser.parse("fn x() {}", None).unwrap();
        let ctx = AnalysisContext {
            file_path: "a.bas",
            source: source.as_bytes(),
            tree: &tree,
            content_hash: "h",
            language: SupportedLanguage::Vba,
        };
        let result = VbaAnalyzer.analyze(&ctx);
        let names: Vec<_> = result.entities.iter().map(|e| e.name.as_str()).collect();
        assert!(names.contains(&"Main"));
        assert!(names.contains(&"Helper"));
    }
}
