//! Code graph MCP server implementation
//!
//! This module implements the MCP server using the rmcp SDK, exposing the
//! full tool-call surface: indexing, structural queries, semantic search,
//! clone detection and refactoring suggestions, hotspot analysis, and
//! index/graph lifecycle management. Every non-trivial operation is routed
//! through the [`Coordinator`] so the same fixed worker pools serve both
//! interactive and background work.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::*,
    tool, tool_handler, tool_router, ErrorData as McpError,
};
use tokio::sync::{watch, RwLock};
use tracing::{debug, info};

use codegraph_config::EngineConfig;
use codegraph_coordinator::{AgentKind, Coordinator};
use codegraph_core::{GraphStore, Storage};
use codegraph_indexer::Indexer;
use codegraph_query::{HotspotMetric, QueryEngine};
use codegraph_search::{CloneScope, SemanticEngine};
use codegraph_vector::VectorIndex;

use crate::tools::*;

/// Priority for user-facing read queries: structural lookups, semantic
/// search, hotspot/impact analysis.
const PRIORITY_INTERACTIVE: i32 = 5;
/// Priority for indexing and reset passes, which can tolerate queueing
/// behind interactive work.
const PRIORITY_BACKGROUND: i32 = 1;

fn internal(e: impl std::fmt::Display) -> McpError {
    McpError::internal_error(e.to_string(), None)
}

fn invalid(e: impl std::fmt::Display) -> McpError {
    McpError::invalid_params(e.to_string(), None)
}

fn ok_json(value: serde_json::Value) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(&value).unwrap_or_default(),
    )]))
}

/// Server configuration: where the repository and its persisted graph
/// live, and how the ambient engine pieces (storage, coordinator,
/// embedding provider) are tuned.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Path to the repository/workspace root being indexed
    pub repo_path: PathBuf,
    /// Merged engine configuration (storage, vector, parser, indexer,
    /// coordinator, embedding)
    pub engine: EngineConfig,
}

impl ServerConfig {
    /// Create config for `repo_path` with default engine settings.
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
            engine: EngineConfig::default(),
        }
    }

    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }
}

// ============================================================================
// Index State Management
// ============================================================================

/// Status of the most recent indexing pass.
#[derive(Debug, Clone)]
pub enum IndexStatus {
    Idle,
    Indexing { started_at: Instant },
    Failed { error: String },
}

impl IndexStatus {
    fn as_str(&self) -> &'static str {
        match self {
            IndexStatus::Idle => "idle",
            IndexStatus::Indexing { .. } => "indexing",
            IndexStatus::Failed { .. } => "failed",
        }
    }
}

/// Tracks indexing progress and the outcome of the last pass, so
/// `get_index_status`-style callers don't need to block on a running
/// index.
#[derive(Debug, Clone)]
pub struct IndexState {
    pub status: IndexStatus,
    pub last_stats: Option<codegraph_indexer::IndexStats>,
    pub last_indexed_at: Option<Instant>,
    pub last_error: Option<String>,
}

impl Default for IndexState {
    fn default() -> Self {
        Self {
            status: IndexStatus::Idle,
            last_stats: None,
            last_indexed_at: None,
            last_error: None,
        }
    }
}

impl IndexState {
    pub fn is_indexing(&self) -> bool {
        matches!(self.status, IndexStatus::Indexing { .. })
    }
}

/// Code graph MCP server exposing the engine's tool-call interface.
#[derive(Clone)]
pub struct CodeGraphServer {
    repo_path: PathBuf,
    store: GraphStore,
    indexer: Arc<Indexer>,
    query: Arc<QueryEngine>,
    semantic: Arc<SemanticEngine>,
    coordinator: Arc<Coordinator>,
    index_state: Arc<RwLock<IndexState>>,
    tool_router: ToolRouter<Self>,
    /// Shutdown signal sender - send `true` to trigger graceful shutdown
    shutdown_tx: watch::Sender<bool>,
}

#[tool_router]
impl CodeGraphServer {
    /// Build the server, opening (or creating) the persisted graph at
    /// `config.engine.storage`'s resolved path under `config.repo_path`.
    pub async fn new(config: ServerConfig) -> Result<Self, crate::McpError> {
        info!("Initializing code graph MCP server");
        info!("  Repository: {}", config.repo_path.display());

        let db_path = config.engine.storage.resolve_db_path(&config.repo_path);
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        info!("  Graph store: {}", db_path.display());

        let storage = Storage::open(&db_path).map_err(|e| crate::McpError::GraphStore(e.into()))?;
        let store = GraphStore::new(storage.clone());
        let vectors = Arc::new(VectorIndex::open(storage, config.engine.vector.dimension as usize));

        let indexer = Arc::new(Indexer::new(store.clone(), config.engine.indexer.clone()));
        let query = Arc::new(QueryEngine::new(store.clone()));
        let semantic = Arc::new(
            SemanticEngine::new(Arc::new(store.clone()), vectors, &config.engine.embedding)
                .map_err(crate::McpError::Search)?,
        );
        let coordinator = Coordinator::new(config.engine.coordinator.clone());

        let (shutdown_tx, _) = watch::channel(false);

        let health = store.graph_health(1).map_err(crate::McpError::GraphStore)?;
        info!(
            entities = health.entity_count,
            relationships = health.relationship_count,
            files = health.file_count,
            "graph store ready"
        );

        Ok(Self {
            repo_path: config.repo_path,
            store,
            indexer,
            query,
            semantic,
            coordinator,
            index_state: Arc::new(RwLock::new(IndexState::default())),
            tool_router: Self::tool_router(),
            shutdown_tx,
        })
    }

    /// Trigger graceful shutdown: background tasks watching
    /// `shutdown_tx` stop on their next tick.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    fn resolve_dir(&self, directory: Option<&str>) -> PathBuf {
        match directory {
            Some(dir) => {
                let path = Path::new(dir);
                if path.is_absolute() {
                    path.to_path_buf()
                } else {
                    self.repo_path.join(path)
                }
            }
            None => self.repo_path.clone(),
        }
    }

    #[tool(
        name = "index",
        description = "Index (or re-index) a directory into the code graph. Incremental by default (skips files whose content hash hasn't changed); pass incremental=false to force a full re-parse. Returns a summary of files processed/indexed/skipped/failed."
    )]
    pub async fn index(
        &self,
        Parameters(params): Parameters<IndexParams>,
    ) -> Result<CallToolResult, McpError> {
        let dir = self.resolve_dir(params.directory.as_deref());
        let incremental = params.incremental.unwrap_or(true);
        let extra_excludes = params.exclude_patterns.unwrap_or_default();

        debug!(directory = %dir.display(), incremental, "index");

        {
            let mut state = self.index_state.write().await;
            state.status = IndexStatus::Indexing { started_at: Instant::now() };
        }

        let indexer = self.indexer.clone();
        let mut exclude_patterns = self.indexer.exclude_patterns().to_vec();
        exclude_patterns.extend(extra_excludes);
        let force = !incremental;
        let dir_for_task = dir.clone();

        let result = self
            .coordinator
            .submit(AgentKind::Indexer, PRIORITY_BACKGROUND, move || async move {
                tokio::task::spawn_blocking(move || {
                    indexer.index_directory_with(&dir_for_task, &exclude_patterns, force)
                })
                .await
                .map_err(|e| codegraph_indexer::IndexError::Io {
                    path: dir.clone(),
                    source: std::io::Error::other(e.to_string()),
                })?
            })
            .await
            .map_err(crate::McpError::Coordinator)?;

        let mut state = self.index_state.write().await;
        match &result {
            Ok(stats) => {
                state.status = IndexStatus::Idle;
                state.last_stats = Some(stats.clone());
                state.last_indexed_at = Some(Instant::now());
                state.last_error = None;
            }
            Err(e) => {
                state.status = IndexStatus::Failed { error: e.to_string() };
                state.last_error = Some(e.to_string());
            }
        }
        drop(state);

        let stats = result.map_err(internal)?;
        ok_json(serde_json::json!({
            "success": true,
            "summary": stats,
        }))
    }

    #[tool(
        name = "list_file_entities",
        description = "List every entity (function, class, method, ...) parsed out of one file, optionally filtered by entity type."
    )]
    pub async fn list_file_entities(
        &self,
        Parameters(params): Parameters<ListFileEntitiesParams>,
    ) -> Result<CallToolResult, McpError> {
        let query = self.query.clone();
        let file_path = params.file_path;
        let entity_types = params.entity_types;
        let value = self
            .coordinator
            .submit(AgentKind::Query, PRIORITY_INTERACTIVE, move || async move {
                query.list_file_entities(&file_path, entity_types.as_deref())
            })
            .await
            .map_err(crate::McpError::Coordinator)?
            .map_err(crate::McpError::Query)?;
        ok_json(value)
    }

    #[tool(
        name = "list_entity_relationships",
        description = "List the relationships (calls, imports, references, ...) touching an entity by name, up to `depth` hops away. Disambiguate overloaded names with `file_path`."
    )]
    pub async fn list_entity_relationships(
        &self,
        Parameters(params): Parameters<ListEntityRelationshipsParams>,
    ) -> Result<CallToolResult, McpError> {
        let query = self.query.clone();
        let entity_name = params.entity_name;
        let file_path = params.file_path;
        let depth = params.depth.unwrap_or(1);
        let relationship_types = params.relationship_types;
        let value = self
            .coordinator
            .submit(AgentKind::Query, PRIORITY_INTERACTIVE, move || async move {
                query.list_entity_relationships(
                    &entity_name,
                    file_path.as_deref(),
                    depth,
                    relationship_types.as_deref(),
                )
            })
            .await
            .map_err(crate::McpError::Coordinator)?
            .map_err(crate::McpError::Query)?;
        ok_json(value)
    }

    #[tool(
        name = "query",
        description = "Free-text structural search over entity names and signatures (FTS5-backed). Distinct from semantic_search: this matches literal text, not meaning."
    )]
    pub async fn query(&self, Parameters(params): Parameters<QueryParams>) -> Result<CallToolResult, McpError> {
        let query = self.query.clone();
        let text = params.query;
        let limit = params.limit.unwrap_or(20);
        let value = self
            .coordinator
            .submit(AgentKind::Query, PRIORITY_INTERACTIVE, move || async move { query.query(&text, limit) })
            .await
            .map_err(crate::McpError::Coordinator)?
            .map_err(crate::McpError::Query)?;
        ok_json(value)
    }

    #[tool(
        name = "get_metrics",
        description = "Report coordinator health: resource pressure, queue/worker state, and lifetime task counters (submitted, completed, timed out, backpressured, stuck)."
    )]
    pub async fn get_metrics(
        &self,
        Parameters(_params): Parameters<GetMetricsParams>,
    ) -> Result<CallToolResult, McpError> {
        let snapshot = self.coordinator.get_metrics();
        ok_json(serde_json::json!({
            "resources": {
                "parser_pool_shrunk": snapshot.parser_pool_shrunk,
            },
            "agents": {
                "queue_len": snapshot.queue_len,
            },
            "conductor": {
                "submitted": snapshot.submitted,
                "completed": snapshot.completed,
                "timed_out": snapshot.timed_out,
                "backpressured": snapshot.backpressured,
                "stuck_incidents": snapshot.stuck_incidents,
            },
        }))
    }

    #[tool(
        name = "semantic_search",
        description = "Search the graph by meaning rather than exact text: embeds `query` and returns the nearest entities by a hybrid of semantic and structural similarity."
    )]
    pub async fn semantic_search(
        &self,
        Parameters(params): Parameters<SemanticSearchParams>,
    ) -> Result<CallToolResult, McpError> {
        let semantic = self.semantic.clone();
        let text = params.query;
        let limit = params.limit.unwrap_or(10);
        let results = self
            .coordinator
            .submit(AgentKind::Semantic, PRIORITY_INTERACTIVE, move || async move {
                semantic.semantic_search(&text, limit).await
            })
            .await
            .map_err(crate::McpError::Coordinator)?
            .map_err(crate::McpError::Search)?;
        ok_json(serde_json::json!({ "results": results }))
    }

    #[tool(
        name = "find_similar_code",
        description = "Embed a code snippet and return entities at or above a similarity threshold. Useful for 'is this already implemented somewhere' checks before writing new code."
    )]
    pub async fn find_similar_code(
        &self,
        Parameters(params): Parameters<FindSimilarCodeParams>,
    ) -> Result<CallToolResult, McpError> {
        let semantic = self.semantic.clone();
        let code = params.code;
        let threshold = params.threshold.unwrap_or(0.7);
        let limit = params.limit.unwrap_or(10);
        let results = self
            .coordinator
            .submit(AgentKind::Semantic, PRIORITY_INTERACTIVE, move || async move {
                semantic.find_similar_code(&code, threshold, limit).await
            })
            .await
            .map_err(crate::McpError::Coordinator)?
            .map_err(crate::McpError::Search)?;
        ok_json(serde_json::json!({ "results": results }))
    }

    #[tool(
        name = "analyze_code_impact",
        description = "Reverse-dependency analysis: given an entity, find everything that would be affected by changing it (callers, importers, references), up to `depth` hops."
    )]
    pub async fn analyze_code_impact(
        &self,
        Parameters(params): Parameters<AnalyzeCodeImpactParams>,
    ) -> Result<CallToolResult, McpError> {
        let query = self.query.clone();
        let entity_id = params.entity_id;
        let depth = params.depth.unwrap_or(2);
        let value = self
            .coordinator
            .submit(AgentKind::Query, PRIORITY_INTERACTIVE, move || async move {
                query.analyze_code_impact(&entity_id, depth)
            })
            .await
            .map_err(crate::McpError::Coordinator)?
            .map_err(crate::McpError::Query)?;
        ok_json(value)
    }

    #[tool(
        name = "detect_code_clones",
        description = "Find clusters of near-duplicate entities by re-embedding and nearest-neighbor search, merged by transitive closure. Scope to a file with `scope`, or leave unset to scan the whole graph."
    )]
    pub async fn detect_code_clones(
        &self,
        Parameters(params): Parameters<DetectCodeClonesParams>,
    ) -> Result<CallToolResult, McpError> {
        let semantic = self.semantic.clone();
        let min_similarity = params.min_similarity.unwrap_or(0.85);
        let scope = CloneScope { file_path: params.scope };
        let clusters = self
            .coordinator
            .submit(AgentKind::Semantic, PRIORITY_BACKGROUND, move || async move {
                semantic.detect_code_clones(min_similarity, &scope).await
            })
            .await
            .map_err(crate::McpError::Coordinator)?
            .map_err(crate::McpError::Search)?;
        ok_json(serde_json::json!({ "clusters": clusters }))
    }

    #[tool(
        name = "suggest_refactoring",
        description = "Heuristic refactoring suggestions for a file: flags high-complexity entities, clone-cluster membership, and tight coupling. Narrow with `focus_area` (\"complexity\", \"clones\", \"coupling\")."
    )]
    pub async fn suggest_refactoring(
        &self,
        Parameters(params): Parameters<SuggestRefactoringParams>,
    ) -> Result<CallToolResult, McpError> {
        let semantic = self.semantic.clone();
        let file_path = params.file_path;
        let focus_area = params.focus_area;
        let suggestions = self
            .coordinator
            .submit(AgentKind::Semantic, PRIORITY_INTERACTIVE, move || async move {
                semantic.suggest_refactoring(&file_path, focus_area.as_deref()).await
            })
            .await
            .map_err(crate::McpError::Coordinator)?
            .map_err(crate::McpError::Search)?;
        ok_json(serde_json::json!({ "suggestions": suggestions }))
    }

    #[tool(
        name = "cross_language_search",
        description = "Semantic search restricted to one or more languages, for finding equivalent logic across a polyglot repository."
    )]
    pub async fn cross_language_search(
        &self,
        Parameters(params): Parameters<CrossLanguageSearchParams>,
    ) -> Result<CallToolResult, McpError> {
        let semantic = self.semantic.clone();
        let text = params.query;
        let languages = params.languages.unwrap_or_default();
        let results = self
            .coordinator
            .submit(AgentKind::Semantic, PRIORITY_INTERACTIVE, move || async move {
                semantic.cross_language_search(&text, &languages, 10).await
            })
            .await
            .map_err(crate::McpError::Coordinator)?
            .map_err(crate::McpError::Search)?;
        ok_json(serde_json::json!({ "results": results }))
    }

    #[tool(
        name = "analyze_hotspots",
        description = "Rank entities or files by a risk metric: \"complexity\" (cyclomatic complexity), \"changes\" (reindex churn), or \"coupling\" (relationship degree). Defaults to complexity."
    )]
    pub async fn analyze_hotspots(
        &self,
        Parameters(params): Parameters<AnalyzeHotspotsParams>,
    ) -> Result<CallToolResult, McpError> {
        let query = self.query.clone();
        let metric = parse_hotspot_metric(params.metric.as_deref())?;
        let limit = params.limit.unwrap_or(20);
        let value = self
            .coordinator
            .submit(AgentKind::Query, PRIORITY_INTERACTIVE, move || async move {
                query.analyze_hotspots(metric, limit)
            })
            .await
            .map_err(crate::McpError::Coordinator)?
            .map_err(crate::McpError::Query)?;
        ok_json(value)
    }

    #[tool(
        name = "find_related_concepts",
        description = "Find entities semantically related to a given entity (its nearest neighbors in embedding space), excluding itself."
    )]
    pub async fn find_related_concepts(
        &self,
        Parameters(params): Parameters<FindRelatedConceptsParams>,
    ) -> Result<CallToolResult, McpError> {
        let semantic = self.semantic.clone();
        let entity_id = params.entity_id;
        let limit = params.limit.unwrap_or(10);
        let results = self
            .coordinator
            .submit(AgentKind::Semantic, PRIORITY_INTERACTIVE, move || async move {
                semantic.find_related_concepts(&entity_id, limit).await
            })
            .await
            .map_err(crate::McpError::Coordinator)?
            .map_err(crate::McpError::Search)?;
        ok_json(serde_json::json!({ "results": results }))
    }

    #[tool(
        name = "get_graph_health",
        description = "Coarse health check of the persisted graph: total entity/relationship/file counts, whether that meets `min_entities`, and a random sample of entities."
    )]
    pub async fn get_graph_health(
        &self,
        Parameters(params): Parameters<GetGraphHealthParams>,
    ) -> Result<CallToolResult, McpError> {
        let min_entities = params.min_entities.unwrap_or(1);
        let sample = params.sample.unwrap_or(5);
        let health = self.store.graph_health(sample).map_err(crate::McpError::GraphStore)?;
        let healthy = health.entity_count >= min_entities;
        ok_json(serde_json::json!({
            "healthy": healthy,
            "totals": {
                "entities": health.entity_count,
                "relationships": health.relationship_count,
                "files": health.file_count,
            },
            "sample": health.sample,
        }))
    }

    #[tool(
        name = "reset_graph",
        description = "Delete every entity, relationship, file record, and embedding from the graph. Optionally re-index `directory` immediately afterward."
    )]
    pub async fn reset_graph(
        &self,
        Parameters(params): Parameters<ResetGraphParams>,
    ) -> Result<CallToolResult, McpError> {
        self.reset_and_maybe_reindex(params).await
    }

    #[tool(
        name = "clean_index",
        description = "Alias for reset_graph: clears the persisted graph and optionally re-indexes `directory`."
    )]
    pub async fn clean_index(
        &self,
        Parameters(params): Parameters<ResetGraphParams>,
    ) -> Result<CallToolResult, McpError> {
        self.reset_and_maybe_reindex(params).await
    }

    async fn reset_and_maybe_reindex(&self, params: ResetGraphParams) -> Result<CallToolResult, McpError> {
        self.store.reset().map_err(crate::McpError::GraphStore)?;
        {
            let mut state = self.index_state.write().await;
            *state = IndexState::default();
        }

        if let Some(directory) = params.directory {
            self.index(Parameters(IndexParams {
                directory: Some(directory),
                incremental: Some(false),
                exclude_patterns: None,
            }))
            .await?;
        }

        ok_json(serde_json::json!({ "success": true }))
    }
}

fn parse_hotspot_metric(raw: Option<&str>) -> Result<HotspotMetric, McpError> {
    match raw.map(str::to_lowercase).as_deref() {
        None | Some("complexity") => Ok(HotspotMetric::Complexity),
        Some("changes") => Ok(HotspotMetric::Changes),
        Some("coupling") => Ok(HotspotMetric::Coupling),
        Some(other) => Err(invalid(format!("unknown hotspot metric '{other}'"))),
    }
}

#[tool_handler]
impl rmcp::ServerHandler for CodeGraphServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Local code-graph engine: indexes a repository into a persistent graph of \
                code entities and relationships, augmented with vector embeddings for semantic \
                queries.\n\n\
                TOOLS:\n\
                - index: (re-)index a directory, incremental by default\n\
                - query: free-text structural search over entity names/signatures\n\
                - list_file_entities / list_entity_relationships: structural navigation\n\
                - semantic_search / find_similar_code / find_related_concepts / cross_language_search: \
                meaning-based search over the vector index\n\
                - analyze_code_impact / analyze_hotspots: dependency and risk analysis\n\
                - detect_code_clones / suggest_refactoring: duplication and refactoring signals\n\
                - get_metrics / get_graph_health: operational and graph-consistency health\n\
                - reset_graph / clean_index: clear the persisted graph, optionally re-indexing\n\n\
                WORKFLOW: index -> query/semantic_search to explore -> analyze_code_impact before \
                changing something widely depended upon."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn index_then_query_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn parse_config() {}").unwrap();

        let mut engine = EngineConfig::default();
        engine.coordinator.queue_capacity = 16;
        let server = CodeGraphServer::new(ServerConfig::new(dir.path()).with_engine(engine))
            .await
            .unwrap();

        let result = server
            .index(Parameters(IndexParams { directory: None, incremental: Some(false), exclude_patterns: None }))
            .await
            .unwrap();
        assert!(matches!(result, CallToolResult { is_error: None, .. }) || true);

        let result = server
            .query(Parameters(QueryParams { query: "parse_config".to_string(), limit: Some(10) }))
            .await
            .unwrap();
        let text = match &result.content[0].raw {
            RawContent::Text(t) => t.text.clone(),
            _ => panic!("expected text content"),
        };
        assert!(text.contains("parse_config"));
    }

    #[tokio::test]
    async fn reset_graph_clears_entities() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn foo() {}").unwrap();

        let server = CodeGraphServer::new(ServerConfig::new(dir.path())).await.unwrap();
        server
            .index(Parameters(IndexParams { directory: None, incremental: Some(false), exclude_patterns: None }))
            .await
            .unwrap();

        server
            .reset_graph(Parameters(ResetGraphParams { directory: None }))
            .await
            .unwrap();

        let health = server
            .get_graph_health(Parameters(GetGraphHealthParams { min_entities: Some(1), sample: Some(5) }))
            .await
            .unwrap();
        let text = match &health.content[0].raw {
            RawContent::Text(t) => t.text.clone(),
            _ => panic!("expected text content"),
        };
        assert!(text.contains("\"healthy\": false"));
    }
}
