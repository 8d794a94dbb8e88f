//! Core data model: Entity, Relationship, File, Embedding, ParseResult.
//!
//! This is the schema shared by the Graph Store, Parser, Indexer, and Query
//! Engine. See `graph_store::schema` for the on-disk SQL representation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of code entity. Open-ended in the sense that analyzers may store
/// language-specific subtypes in `metadata`, but every entity is classified
/// into one of these buckets for cross-language querying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    File,
    Module,
    Class,
    Interface,
    Function,
    Method,
    Variable,
    Constant,
    Import,
    Export,
    Typedef,
    Struct,
    Trait,
    Enum,
    Field,
    Macro,
    Property,
    Event,
    /// Placeholder for an unresolved cross-file reference target.
    External,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Module => "module",
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Function => "function",
            Self::Method => "method",
            Self::Variable => "variable",
            Self::Constant => "constant",
            Self::Import => "import",
            Self::Export => "export",
            Self::Typedef => "typedef",
            Self::Struct => "struct",
            Self::Trait => "trait",
            Self::Enum => "enum",
            Self::Field => "field",
            Self::Macro => "macro",
            Self::Property => "property",
            Self::Event => "event",
            Self::External => "external",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "file" => Self::File,
            "module" => Self::Module,
            "class" => Self::Class,
            "interface" => Self::Interface,
            "function" => Self::Function,
            "method" => Self::Method,
            "variable" => Self::Variable,
            "constant" => Self::Constant,
            "import" => Self::Import,
            "export" => Self::Export,
            "typedef" => Self::Typedef,
            "struct" => Self::Struct,
            "trait" => Self::Trait,
            "enum" => Self::Enum,
            "field" => Self::Field,
            "macro" => Self::Macro,
            "property" => Self::Property,
            "event" => Self::Event,
            "external" => Self::External,
            other => return Err(format!("unknown entity type: {other}")),
        })
    }
}

/// Kind of relationship between two entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    Contains,
    Imports,
    Exports,
    Calls,
    References,
    Extends,
    Implements,
    DependsOn,
}

impl RelationshipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::Imports => "imports",
            Self::Exports => "exports",
            Self::Calls => "calls",
            Self::References => "references",
            Self::Extends => "extends",
            Self::Implements => "implements",
            Self::DependsOn => "depends_on",
        }
    }
}

impl std::fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RelationshipType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "contains" => Self::Contains,
            "imports" => Self::Imports,
            "exports" => Self::Exports,
            "calls" => Self::Calls,
            "references" => Self::References,
            "extends" => Self::Extends,
            "implements" => Self::Implements,
            "depends_on" => Self::DependsOn,
            other => return Err(format!("unknown relationship type: {other}")),
        })
    }
}

/// A byte/line/column position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
    pub byte_index: u64,
}

/// A source span (`start` inclusive, `end` exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub start: Position,
    pub end: Position,
}

impl Location {
    pub fn is_valid(&self) -> bool {
        self.start.byte_index <= self.end.byte_index
    }
}

/// A node in the code graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub name: String,
    pub entity_type: EntityType,
    pub file_path: String,
    pub location: Location,
    /// Content hash of the entity's source span.
    pub hash: String,
    pub language: String,
    pub size_bytes: u64,
    pub complexity_score: u32,
    /// Open metadata: modifiers, decorators, parameters, return type,
    /// inheritance, async info, magic-method classification, etc.
    pub metadata: Value,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Entity {
    /// Identity tuple used to derive `id` (see `ids::entity_id`).
    pub fn identity_key(
        file_path: &str,
        entity_type: EntityType,
        name: &str,
        start_index: u64,
        end_index: u64,
    ) -> String {
        crate::ids::entity_id(file_path, entity_type.as_str(), name, start_index, end_index)
    }
}

/// A directed edge between two entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub id: String,
    pub from_id: String,
    pub to_id: String,
    pub relationship_type: RelationshipType,
    pub metadata: Value,
    pub weight: f64,
    pub created_at: i64,
}

/// Tracking record for an indexed file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    pub hash: String,
    pub last_indexed: i64,
    pub entity_count: u64,
    /// Number of times this file's content hash has changed across
    /// indexing passes; used as a churn proxy for hotspot analysis.
    pub reindex_count: u64,
}

/// A dense vector embedding for an entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub entity_id: String,
    pub content: String,
    pub vector: Vec<f32>,
    pub model_name: String,
    pub created_at: i64,
}

/// Transient output of an analyzer pass over one file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ParseResult {
    pub file_path: String,
    pub language: String,
    pub entities: Vec<Entity>,
    pub relationships: Vec<Relationship>,
    pub patterns: Option<Value>,
    pub content_hash: String,
    pub timestamp: i64,
    pub parse_time_ms: u64,
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_type_roundtrips_through_str() {
        for t in [
            EntityType::File,
            EntityType::Class,
            EntityType::Function,
            EntityType::Trait,
            EntityType::External,
        ] {
            let s = t.to_string();
            let parsed: EntityType = s.parse().unwrap();
            assert_eq!(parsed.as_str(), t.as_str());
        }
    }

    #[test]
    fn relationship_type_roundtrips_through_str() {
        for t in [
            RelationshipType::Contains,
            RelationshipType::Calls,
            RelationshipType::DependsOn,
        ] {
            let s = t.to_string();
            let parsed: RelationshipType = s.parse().unwrap();
            assert_eq!(parsed.as_str(), t.as_str());
        }
    }

    #[test]
    fn location_validity() {
        let valid = Location {
            start: Position { line: 1, column: 0, byte_index: 0 },
            end: Position { line: 1, column: 10, byte_index: 10 },
        };
        assert!(valid.is_valid());

        let invalid = Location {
            start: Position { line: 2, column: 0, byte_index: 20 },
            end: Position { line: 1, column: 0, byte_index: 5 },
        };
        assert!(!invalid.is_valid());
    }
}
