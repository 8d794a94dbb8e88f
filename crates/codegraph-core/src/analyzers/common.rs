//! Shared helpers for turning tag-query captures into entities and
//! relationships: the file-level entity, containment edges derived from
//! byte-span nesting, and best-effort same-file reference resolution with
//! placeholder fallback for unresolved targets.

use serde_json::{json, Value};
use tree_sitter::Node;

use super::tag_query::{Capture, CaptureRole};
use super::AnalysisContext;
use crate::complexity::complexity_score;
use crate::ids::{content_hash, entity_id, relationship_id};
use crate::model::{Entity, EntityType, Location, Position, Relationship, RelationshipType};

pub fn now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// The whole-file entity every analyzer emits as the root of its file's
/// subgraph.
pub fn file_entity(ctx: &AnalysisContext) -> Entity {
    let root = ctx.tree.root_node();
    let ts = now();
    let id = entity_id(ctx.file_path, "file", ctx.file_path, 0, ctx.source.len() as u64);
    Entity {
        id,
        name: ctx.file_path.to_string(),
        entity_type: EntityType::File,
        file_path: ctx.file_path.to_string(),
        location: Location {
            start: Position { line: 0, column: 0, byte_index: 0 },
            end: Position {
                line: root.end_position().row as u32,
                column: root.end_position().column as u32,
                byte_index: ctx.source.len() as u64,
            },
        },
        hash: ctx.content_hash.to_string(),
        language: ctx.language.as_str().to_string(),
        size_bytes: ctx.source.len() as u64,
        complexity_score: complexity_score(&root),
        metadata: json!({}),
        created_at: ts,
        updated_at: ts,
    }
}

/// Map a capture's free-form `kind` label onto an [`EntityType`], falling
/// back to `Variable` for labels analyzers don't recognize explicitly.
pub fn entity_type_for_kind(kind: &str) -> EntityType {
    match kind {
        "function" | "method" => {
            if kind == "method" {
                EntityType::Method
            } else {
                EntityType::Function
            }
        }
        "class" => EntityType::Class,
        "interface" => EntityType::Interface,
        "struct" => EntityType::Struct,
        "trait" => EntityType::Trait,
        "enum" => EntityType::Enum,
        "module" | "namespace" | "package" => EntityType::Module,
        "field" | "property" => EntityType::Field,
        "constant" => EntityType::Constant,
        "variable" => EntityType::Variable,
        "import" => EntityType::Import,
        "export" => EntityType::Export,
        "typedef" | "type_alias" => EntityType::Typedef,
        "macro" => EntityType::Macro,
        _ => EntityType::Variable,
    }
}

/// Build an [`Entity`] from a definition capture, with `metadata` supplied
/// by the caller (language-specific detail the query alone can't express).
pub fn entity_from_capture(capture: &Capture, ctx: &AnalysisContext, metadata: Value) -> Entity {
    let ts = now();
    let entity_type = entity_type_for_kind(&capture.kind);
    let span = &ctx.source[capture.start_byte.min(ctx.source.len())..capture.end_byte.min(ctx.source.len())];
    let id = entity_id(
        ctx.file_path,
        entity_type.as_str(),
        &capture.name,
        capture.start_byte as u64,
        capture.end_byte as u64,
    );
    Entity {
        id,
        name: capture.name.clone(),
        entity_type,
        file_path: ctx.file_path.to_string(),
        location: Location {
            start: Position {
                line: capture.start_line,
                column: capture.start_column,
                byte_index: capture.start_byte as u64,
            },
            end: Position {
                line: capture.end_line,
                column: capture.end_column,
                byte_index: capture.end_byte as u64,
            },
        },
        hash: content_hash(span),
        language: ctx.language.as_str().to_string(),
        size_bytes: span.len() as u64,
        complexity_score: 0,
        metadata,
        created_at: ts,
        updated_at: ts,
    }
}

/// Derive `contains` edges from byte-span nesting: the smallest entity whose
/// span strictly encloses another becomes its container. `root` (typically
/// the file entity) contains every top-level entity with no tighter parent.
pub fn containment_relationships(root: &Entity, entities: &[Entity]) -> Vec<Relationship> {
    let mut relationships = Vec::with_capacity(entities.len());

    for (i, entity) in entities.iter().enumerate() {
        let mut best: Option<&Entity> = None;
        for (j, candidate) in entities.iter().enumerate() {
            if i == j {
                continue;
            }
            if encloses(candidate, entity) {
                let tighter = best.is_none_or(|b| span_len(candidate) < span_len(b));
                if tighter {
                    best = Some(candidate);
                }
            }
        }
        let parent = best.unwrap_or(root);
        if parent.id == entity.id {
            continue;
        }
        relationships.push(contains_edge(parent, entity));
    }

    relationships
}

fn span_len(e: &Entity) -> u64 {
    e.location.end.byte_index.saturating_sub(e.location.start.byte_index)
}

fn encloses(outer: &Entity, inner: &Entity) -> bool {
    outer.location.start.byte_index <= inner.location.start.byte_index
        && outer.location.end.byte_index >= inner.location.end.byte_index
        && span_len(outer) > span_len(inner)
}

pub fn contains_edge(from: &Entity, to: &Entity) -> Relationship {
    Relationship {
        id: relationship_id(&from.id, &to.id, RelationshipType::Contains.as_str()),
        from_id: from.id.clone(),
        to_id: to.id.clone(),
        relationship_type: RelationshipType::Contains,
        metadata: json!({}),
        weight: 1.0,
        created_at: now(),
    }
}

/// Resolve a reference capture against same-file definitions by name; when
/// unresolved, synthesize a relationship to a deterministic placeholder ID
/// and return it alongside so the caller can fold it into `entities[]` via
/// [`placeholder_entities`] before writing.
pub fn resolve_reference(
    capture: &Capture,
    ctx: &AnalysisContext,
    definitions: &[Entity],
    rel_type: RelationshipType,
    from_id: &str,
) -> (Relationship, Option<(String, String)>) {
    debug_assert_eq!(capture.role, CaptureRole::Reference);

    if let Some(target) = definitions.iter().find(|e| e.name == capture.name) {
        let rel = Relationship {
            id: relationship_id(from_id, &target.id, rel_type.as_str()),
            from_id: from_id.to_string(),
            to_id: target.id.clone(),
            relationship_type: rel_type,
            metadata: json!({ "line": capture.start_line }),
            weight: 1.0,
            created_at: now(),
        };
        return (rel, None);
    }

    let placeholder_id = entity_id(
        "<external>",
        EntityType::External.as_str(),
        &capture.name,
        0,
        0,
    );
    let rel = Relationship {
        id: relationship_id(from_id, &placeholder_id, rel_type.as_str()),
        from_id: from_id.to_string(),
        to_id: placeholder_id.clone(),
        relationship_type: rel_type,
        metadata: json!({ "line": capture.start_line, "unresolved": true }),
        weight: 1.0,
        created_at: now(),
    };
    (rel, Some((placeholder_id, capture.name.clone())))
}

/// Turn the `(placeholder_id, name)` pairs accumulated from unresolved
/// [`resolve_reference`] calls into `external` entities, deduplicated by
/// id. Analyzers must fold these into their `entities[]` before returning
/// a [`crate::model::ParseResult`] — a relationship whose `to_id` names a
/// placeholder that was never materialized leaves a dangling foreign key.
pub fn placeholder_entities(placeholders: &[(String, String)]) -> Vec<Entity> {
    let ts = now();
    let mut seen = std::collections::HashSet::new();
    placeholders
        .iter()
        .filter(|(id, _)| seen.insert(id.clone()))
        .map(|(id, name)| Entity {
            id: id.clone(),
            name: name.clone(),
            entity_type: EntityType::External,
            file_path: "<external>".to_string(),
            location: Location {
                start: Position { line: 0, column: 0, byte_index: 0 },
                end: Position { line: 0, column: 0, byte_index: 0 },
            },
            hash: String::new(),
            language: "unknown".to_string(),
            size_bytes: 0,
            complexity_score: 0,
            metadata: json!({}),
            created_at: ts,
            updated_at: ts,
        })
        .collect()
}

/// Walk `node`'s descendants under a [`crate::breaker::RecursionGuard`],
/// invoking `f` on each. Used by analyzers that need direct tree walks
/// beyond what a tag query conveniently expresses (Markdown headings, VBA
/// fallback scanning of embedded blocks).
pub fn walk_guarded<'a>(
    node: Node<'a>,
    guard: &mut crate::breaker::RecursionGuard,
    f: &mut impl FnMut(Node<'a>),
) -> Result<(), crate::error::ParserError> {
    guard.enter()?;
    f(node);
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_guarded(child, guard, f)?;
    }
    guard.exit();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Location, Position};

    fn entity(id: &str, start: u64, end: u64) -> Entity {
        Entity {
            id: id.to_string(),
            name: id.to_string(),
            entity_type: EntityType::Function,
            file_path: "f.rs".to_string(),
            location: Location {
                start: Position { line: 0, column: 0, byte_index: start },
                end: Position { line: 0, column: 0, byte_index: end },
            },
            hash: "h".to_string(),
            language: "rust".to_string(),
            size_bytes: end - start,
            complexity_score: 0,
            metadata: json!({}),
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn containment_picks_tightest_parent() {
        let root = entity("root", 0, 100);
        let outer = entity("outer", 10, 90);
        let inner = entity("inner", 20, 40);
        let entities = vec![outer.clone(), inner.clone()];

        let rels = containment_relationships(&root, &entities);
        let inner_parent = rels.iter().find(|r| r.to_id == "inner").unwrap();
        assert_eq!(inner_parent.from_id, "outer");

        let outer_parent = rels.iter().find(|r| r.to_id == "outer").unwrap();
        assert_eq!(outer_parent.from_id, "root");
    }
}
