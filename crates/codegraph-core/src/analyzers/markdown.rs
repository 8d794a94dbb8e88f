//! Markdown analyzer: a direct tree walk (rather than a tag query) over
//! ATX/setext headings, building a document outline where each heading
//! contains the headings nested beneath it by level.

use serde_json::json;
use tree_sitter::Node;

use super::{common, AnalysisContext, Analyzer};
use crate::breaker::RecursionGuard;
use crate::complexity::complexity_score;
use crate::ids::{content_hash, entity_id};
use crate::model::{Entity, EntityType, Location, ParseResult, Position, Relationship};
use crate::parser::SupportedLanguage;

pub struct MarkdownAnalyzer;

impl Analyzer for MarkdownAnalyzer {
    fn language(&self) -> SupportedLanguage {
        SupportedLanguage::Markdown
    }

    fn analyze(&self, ctx: &AnalysisContext) -> ParseResult {
        let start = std::time::Instant::now();
        let file = common::file_entity(ctx);

        let mut headings = Vec::new();
        let mut guard = RecursionGuard::new(ctx.file_path);
        let walk_result = common::walk_guarded(ctx.tree.root_node(), &mut guard, &mut |node| {
            if let Some(heading) = heading_at(node, ctx) {
                headings.push(heading);
            }
        });

        let mut errors = Vec::new();
        if let Err(e) = walk_result {
            errors.push(e.to_string());
        }

        let mut entities = vec![file.clone()];
        entities.extend(headings.iter().map(|h| h.entity.clone()));
        let relationships = outline_edges(&file, &headings);

        ParseResult {
            file_path: ctx.file_path.to_string(),
            language: ctx.language.as_str().to_string(),
            entities,
            relationships,
            patterns: None,
            content_hash: ctx.content_hash.to_string(),
            timestamp: common::now(),
            parse_time_ms: start.elapsed().as_millis() as u64,
            errors,
        }
    }
}

struct Heading {
    entity: Entity,
    level: u8,
}

fn heading_at(node: Node, ctx: &AnalysisContext) -> Option<Heading> {
    let level = match node.kind() {
        "atx_heading" => atx_level(node),
        "setext_heading" => setext_level(node),
        _ => return None,
    }?;

    let source = ctx.source;
    let text_node = node
        .child_by_field_name("heading_content")
        .or_else(|| find_child(node, "inline"))
        .unwrap_or(node);
    let text = text_node.utf8_text(source).unwrap_or("").trim().to_string();
    let span = &source[node.start_byte().min(source.len())..node.end_byte().min(source.len())];

    let id = entity_id(
        ctx.file_path,
        "module",
        &text,
        node.start_byte() as u64,
        node.end_byte() as u64,
    );
    let ts = common::now();
    let entity = Entity {
        id,
        name: if text.is_empty() { format!("heading@{}", node.start_byte()) } else { text },
        entity_type: EntityType::Module,
        file_path: ctx.file_path.to_string(),
        location: Location {
            start: Position {
                line: node.start_position().row as u32,
                column: node.start_position().column as u32,
                byte_index: node.start_byte() as u64,
            },
            end: Position {
                line: node.end_position().row as u32,
                column: node.end_position().column as u32,
                byte_index: node.end_byte() as u64,
            },
        },
        hash: content_hash(span),
        language: "markdown".to_string(),
        size_bytes: (node.end_byte() - node.start_byte()) as u64,
        complexity_score: complexity_score(&node),
        metadata: json!({ "level": level }),
        created_at: ts,
        updated_at: ts,
    };

    Some(Heading { entity, level })
}

fn atx_level(node: Node) -> Option<u8> {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "atx_h1_marker" => return Some(1),
            "atx_h2_marker" => return Some(2),
            "atx_h3_marker" => return Some(3),
            "atx_h4_marker" => return Some(4),
            "atx_h5_marker" => return Some(5),
            "atx_h6_marker" => return Some(6),
            _ => {}
        }
    }
    None
}

fn setext_level(node: Node) -> Option<u8> {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "setext_h1_underline" => return Some(1),
            "setext_h2_underline" => return Some(2),
            _ => {}
        }
    }
    None
}

fn find_child<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).find(|c| c.kind() == kind)
}

/// Each heading is contained by the nearest preceding heading of a lower
/// level; headings with no such ancestor belong directly to the file.
fn outline_edges(file: &Entity, headings: &[Heading]) -> Vec<Relationship> {
    let mut stack: Vec<&Heading> = Vec::new();
    let mut edges = Vec::new();

    for heading in headings {
        while let Some(top) = stack.last() {
            if top.level >= heading.level {
                stack.pop();
            } else {
                break;
            }
        }
        let parent = stack.last().map(|h| &h.entity).unwrap_or(file);
        edges.push(common::contains_edge(parent, &heading.entity));
        stack.push(heading);
    }

    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::Parser;

    #[test]
    fn builds_nested_outline() {
        let source = "# Title\n\n## Section\n\nbody text\n\n## Another\n";
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_md::LANGUAGE.into()).unwrap();
        let tree = parser.parse(source, None).unwrap();
        let ctx = AnalysisContext {
            file_path: "a.md",
            source: source.as_bytes(),
            tree: &tree,
            content_hash: "h",
            language: SupportedLanguage::Markdown,
        };
        let result = MarkdownAnalyzer.analyze(&ctx);
        let names: Vec<_> = result.entities.iter().map(|e| e.name.as_str()).collect();
        assert!(names.contains(&"Title"));
        assert!(names.contains(&"Section"));
        assert!(names.contains(&"Another"));
    }
}
