//! Composes the natural-language description embedded for each entity.
//!
//! Builds a single string per entity: what it is, where it lives, its
//! signature and docs if known, and its closest callers/callees. This is
//! the text actually sent to the embedding provider, not the raw source.

use codegraph_core::{Entity, GraphStore, Relationship, RelationshipType};

/// How many callers/callees to list in the composed text.
const MAX_NEIGHBORS: usize = 5;

/// Builds the composed semantic text for an entity from the graph store.
pub struct SemanticTextBuilder<'a> {
    graph: &'a GraphStore,
}

impl<'a> SemanticTextBuilder<'a> {
    pub fn new(graph: &'a GraphStore) -> Self {
        Self { graph }
    }

    /// Compose the text embedded for `entity`.
    ///
    /// Format:
    /// ```text
    /// {type} {name} in {file_path}
    /// signature: {metadata.signature}
    /// {documentation}
    /// calls: {top callees}
    /// called_by: {top callers}
    /// ```
    /// The signature/documentation/calls/called_by lines are omitted when
    /// there is nothing to say.
    pub fn build(&self, entity: &Entity) -> String {
        let mut lines = Vec::new();
        lines.push(format!("{} {} in {}", entity.entity_type.as_str(), entity.name, entity.file_path));

        if let Some(signature) = entity.metadata.get("signature").and_then(|v| v.as_str()) {
            if !signature.is_empty() {
                lines.push(format!("signature: {}", signature));
            }
        }

        if let Some(doc) = entity.metadata.get("documentation").and_then(|v| v.as_str()) {
            if !doc.is_empty() {
                lines.push(doc.to_string());
            }
        }

        let relationships = self.graph.list_entity_relationships(&entity.id).unwrap_or_default();

        let callees = self.callee_names(entity, &relationships);
        if !callees.is_empty() {
            lines.push(format!("calls: {}", callees.join(", ")));
        }

        let callers = self.caller_names(entity, &relationships);
        if !callers.is_empty() {
            lines.push(format!("called_by: {}", callers.join(", ")));
        }

        lines.join("\n")
    }

    fn callee_names(&self, entity: &Entity, relationships: &[Relationship]) -> Vec<String> {
        relationships
            .iter()
            .filter(|r| r.relationship_type == RelationshipType::Calls && r.from_id == entity.id)
            .filter_map(|r| self.entity_name(&r.to_id))
            .take(MAX_NEIGHBORS)
            .collect()
    }

    fn caller_names(&self, entity: &Entity, relationships: &[Relationship]) -> Vec<String> {
        relationships
            .iter()
            .filter(|r| r.relationship_type == RelationshipType::Calls && r.to_id == entity.id)
            .filter_map(|r| self.entity_name(&r.from_id))
            .take(MAX_NEIGHBORS)
            .collect()
    }

    fn entity_name(&self, id: &str) -> Option<String> {
        self.graph.get_entity(id).ok().flatten().map(|e| e.name)
    }
}
