//! MCP Tool parameter definitions
//!
//! These structs define the JSON Schema for tool parameters using schemars.

use rmcp::schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};

/// Parameters for the `index` tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct IndexParams {
    /// Directory to index, relative to the server's repository root
    #[schemars(description = "Directory to index (defaults to the repository root)")]
    pub directory: Option<String>,

    /// Skip files whose content hash hasn't changed since the last pass
    #[schemars(description = "Incremental pass skipping unchanged files (default true)")]
    pub incremental: Option<bool>,

    /// Additional glob patterns to exclude, on top of the configured defaults
    #[schemars(description = "Extra exclude glob patterns (e.g. [\"**/fixtures/**\"])")]
    pub exclude_patterns: Option<Vec<String>>,
}

/// Parameters for the `list_file_entities` tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ListFileEntitiesParams {
    /// File to list entities for
    #[schemars(description = "Path of the file to list entities for, as indexed")]
    pub file_path: String,

    /// Filter by entity type
    #[schemars(description = "Filter by entity type (e.g. [\"function\", \"class\"])")]
    pub entity_types: Option<Vec<String>>,
}

/// Parameters for the `list_entity_relationships` tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ListEntityRelationshipsParams {
    /// Entity name to resolve
    #[schemars(description = "Name of the entity to inspect")]
    pub entity_name: String,

    /// Disambiguate by file when multiple entities share a name
    #[schemars(description = "Restrict matches to this file path")]
    pub file_path: Option<String>,

    /// How many hops of the relationship graph to include
    #[schemars(description = "Traversal depth (default 1)")]
    pub depth: Option<usize>,

    /// Filter by relationship type
    #[schemars(description = "Filter by relationship type (e.g. [\"calls\", \"imports\"])")]
    pub relationship_types: Option<Vec<String>>,
}

/// Parameters for the `query` tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct QueryParams {
    /// Free-text query matched against entity names/signatures
    #[schemars(description = "Free-text structural search over entity names and signatures")]
    pub query: String,

    /// Maximum number of results
    #[schemars(description = "Maximum results to return (default 20)")]
    pub limit: Option<usize>,
}

/// Parameters for the `get_metrics` tool (no params needed)
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GetMetricsParams {}

/// Parameters for the `semantic_search` tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SemanticSearchParams {
    /// Natural-language or conceptual query
    #[schemars(description = "Natural-language description of the code to find")]
    pub query: String,

    /// Maximum number of results
    #[schemars(description = "Maximum results to return (default 10)")]
    pub limit: Option<usize>,
}

/// Parameters for the `find_similar_code` tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FindSimilarCodeParams {
    /// Code snippet to match against
    #[schemars(description = "Source code snippet to find near-duplicates of")]
    pub code: String,

    /// Minimum similarity score, in [0, 1]
    #[schemars(description = "Minimum cosine similarity to include (default 0.7)")]
    pub threshold: Option<f32>,

    /// Maximum number of results
    #[schemars(description = "Maximum results to return (default 10)")]
    pub limit: Option<usize>,
}

/// Parameters for the `analyze_code_impact` tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AnalyzeCodeImpactParams {
    /// Entity to analyze
    #[schemars(description = "ID of the entity whose dependents should be traced")]
    pub entity_id: String,

    /// How many hops of reverse dependency edges to include
    #[schemars(description = "Traversal depth (default 2)")]
    pub depth: Option<usize>,
}

/// Parameters for the `detect_code_clones` tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DetectCodeClonesParams {
    /// Minimum similarity for two entities to be considered clones
    #[schemars(description = "Minimum cosine similarity to cluster as a clone (default 0.85)")]
    pub min_similarity: Option<f32>,

    /// Restrict clone detection to a single file
    #[schemars(description = "Restrict the scan to this file path (defaults to the whole graph)")]
    pub scope: Option<String>,
}

/// Parameters for the `suggest_refactoring` tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SuggestRefactoringParams {
    /// File to analyze
    #[schemars(description = "Path of the file to suggest refactorings for")]
    pub file_path: String,

    /// Narrow suggestions to a specific concern
    #[schemars(description = "\"complexity\", \"clones\"/\"duplication\", \"coupling\", or omitted for all")]
    pub focus_area: Option<String>,
}

/// Parameters for the `cross_language_search` tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CrossLanguageSearchParams {
    /// Natural-language or conceptual query
    #[schemars(description = "Conceptual query to search for across languages")]
    pub query: String,

    /// Restrict the search to these languages
    #[schemars(description = "Language filter (e.g. [\"rust\", \"python\"]); searches all if omitted")]
    pub languages: Option<Vec<String>>,
}

/// Parameters for the `analyze_hotspots` tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AnalyzeHotspotsParams {
    /// Which ranking metric to use
    #[schemars(description = "\"complexity\", \"changes\", or \"coupling\" (default \"complexity\")")]
    pub metric: Option<String>,

    /// Maximum number of results
    #[schemars(description = "Maximum results to return (default 20)")]
    pub limit: Option<usize>,
}

/// Parameters for the `find_related_concepts` tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FindRelatedConceptsParams {
    /// Entity to find neighbors of
    #[schemars(description = "ID of the entity to find semantically related entities for")]
    pub entity_id: String,

    /// Maximum number of results
    #[schemars(description = "Maximum results to return (default 10)")]
    pub limit: Option<usize>,
}

/// Parameters for the `get_graph_health` tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GetGraphHealthParams {
    /// Minimum entity count considered healthy
    #[schemars(description = "Entity count below which the graph is reported unhealthy (default 1)")]
    pub min_entities: Option<u64>,

    /// Number of entities to include in the sample
    #[schemars(description = "Number of entities to include in the returned sample (default 5)")]
    pub sample: Option<usize>,
}

/// Parameters for the `reset_graph`/`clean_index` tools
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResetGraphParams {
    /// Directory to re-index immediately after clearing the graph
    #[schemars(description = "If given, re-index this directory right after clearing the graph")]
    pub directory: Option<String>,
}
