//! Integration tests exercising each tool against a small synthetic
//! repository indexed through a real [`CodeGraphServer`].

mod common;

use rmcp::handler::server::wrapper::Parameters;

use codegraph_mcp::tools::{
    AnalyzeCodeImpactParams, AnalyzeHotspotsParams, DetectCodeClonesParams,
    FindRelatedConceptsParams, FindSimilarCodeParams, GetGraphHealthParams, GetMetricsParams,
    IndexParams, ListEntityRelationshipsParams, ListFileEntitiesParams, QueryParams,
    SemanticSearchParams, SuggestRefactoringParams,
};

use common::{assert_field_exists, build_server, response_json, setup_fixture_repo};

async fn index(server: &codegraph_mcp::CodeGraphServer) {
    server
        .index(Parameters(IndexParams { directory: None, incremental: Some(false), exclude_patterns: None }))
        .await
        .unwrap();
}

#[tokio::test]
async fn index_reports_summary() {
    let dir = setup_fixture_repo();
    let server = build_server(dir.path().to_path_buf()).await;

    let result = server
        .index(Parameters(IndexParams { directory: None, incremental: Some(false), exclude_patterns: None }))
        .await
        .unwrap();
    let json = response_json(&result);
    assert_field_exists(&json, "summary");
    assert_eq!(json["summary"]["total_indexed"], 2);
}

#[tokio::test]
async fn list_file_entities_returns_parsed_functions() {
    let dir = setup_fixture_repo();
    let server = build_server(dir.path().to_path_buf()).await;
    index(&server).await;

    let file_path = dir.path().join("lib.rs").to_string_lossy().to_string();
    let result = server
        .list_file_entities(Parameters(ListFileEntitiesParams { file_path, entity_types: None }))
        .await
        .unwrap();
    let json = response_json(&result);
    let entities = json["entities"].as_array().expect("expected an array of entities");
    assert!(entities.iter().any(|e| e["name"] == "parse_config"));
}

#[tokio::test]
async fn list_entity_relationships_runs_against_known_entity() {
    let dir = setup_fixture_repo();
    let server = build_server(dir.path().to_path_buf()).await;
    index(&server).await;

    let result = server
        .list_entity_relationships(Parameters(ListEntityRelationshipsParams {
            entity_name: "parse_config".to_string(),
            file_path: None,
            depth: Some(1),
            relationship_types: None,
        }))
        .await
        .unwrap();
    let json = response_json(&result);
    assert_field_exists(&json, "matches");
}

#[tokio::test]
async fn query_matches_indexed_function_name() {
    let dir = setup_fixture_repo();
    let server = build_server(dir.path().to_path_buf()).await;
    index(&server).await;

    let result = server
        .query(Parameters(QueryParams { query: "render_view".to_string(), limit: Some(10) }))
        .await
        .unwrap();
    let json = response_json(&result);
    let hits = json["results"].as_array().expect("expected an array of hits");
    assert!(hits.iter().any(|h| h["name"] == "render_view"));
}

#[tokio::test]
async fn get_metrics_reports_submitted_tasks() {
    let dir = setup_fixture_repo();
    let server = build_server(dir.path().to_path_buf()).await;
    index(&server).await;

    let result = server.get_metrics(Parameters(GetMetricsParams {})).await.unwrap();
    let json = response_json(&result);
    assert_field_exists(&json, "conductor");
    assert!(json["conductor"]["submitted"].as_u64().unwrap() >= 1);
}

#[tokio::test]
async fn semantic_search_finds_related_entity() {
    let dir = setup_fixture_repo();
    let server = build_server(dir.path().to_path_buf()).await;
    index(&server).await;

    let result = server
        .semantic_search(Parameters(SemanticSearchParams {
            query: "reading configuration from a file path".to_string(),
            limit: Some(5),
        }))
        .await
        .unwrap();
    let json = response_json(&result);
    assert_field_exists(&json, "results");
}

#[tokio::test]
async fn find_similar_code_accepts_a_snippet() {
    let dir = setup_fixture_repo();
    let server = build_server(dir.path().to_path_buf()).await;
    index(&server).await;

    let result = server
        .find_similar_code(Parameters(FindSimilarCodeParams {
            code: "fn read_file(path: &str) -> String { path.to_string() }".to_string(),
            threshold: Some(0.1),
            limit: Some(5),
        }))
        .await
        .unwrap();
    let json = response_json(&result);
    assert_field_exists(&json, "results");
}

#[tokio::test]
async fn analyze_code_impact_runs_against_known_entity() {
    let dir = setup_fixture_repo();
    let server = build_server(dir.path().to_path_buf()).await;
    index(&server).await;

    let lookup = server
        .query(Parameters(QueryParams { query: "read_file".to_string(), limit: Some(1) }))
        .await
        .unwrap();
    let hits = response_json(&lookup);
    let entity_id = hits["results"][0]["id"].as_str().unwrap().to_string();

    let result = server
        .analyze_code_impact(Parameters(AnalyzeCodeImpactParams { entity_id, depth: Some(2) }))
        .await
        .unwrap();
    let json = response_json(&result);
    assert_field_exists(&json, "impacted");
}

#[tokio::test]
async fn detect_code_clones_runs_without_error() {
    let dir = setup_fixture_repo();
    let server = build_server(dir.path().to_path_buf()).await;
    index(&server).await;

    let result = server
        .detect_code_clones(Parameters(DetectCodeClonesParams { min_similarity: Some(0.9), scope: None }))
        .await
        .unwrap();
    let json = response_json(&result);
    assert_field_exists(&json, "clusters");
}

#[tokio::test]
async fn suggest_refactoring_runs_against_indexed_file() {
    let dir = setup_fixture_repo();
    let server = build_server(dir.path().to_path_buf()).await;
    index(&server).await;

    let file_path = dir.path().join("lib.rs").to_string_lossy().to_string();
    let result = server
        .suggest_refactoring(Parameters(SuggestRefactoringParams { file_path, focus_area: None }))
        .await
        .unwrap();
    let json = response_json(&result);
    assert_field_exists(&json, "suggestions");
}

#[tokio::test]
async fn analyze_hotspots_defaults_to_complexity() {
    let dir = setup_fixture_repo();
    let server = build_server(dir.path().to_path_buf()).await;
    index(&server).await;

    let result = server
        .analyze_hotspots(Parameters(AnalyzeHotspotsParams { metric: None, limit: Some(5) }))
        .await
        .unwrap();
    let json = response_json(&result);
    assert_eq!(json["metric"], "complexity");
    assert!(json["hotspots"].is_array());
}

#[tokio::test]
async fn find_related_concepts_runs_against_known_entity() {
    let dir = setup_fixture_repo();
    let server = build_server(dir.path().to_path_buf()).await;
    index(&server).await;

    let lookup = server
        .query(Parameters(QueryParams { query: "parse_config".to_string(), limit: Some(1) }))
        .await
        .unwrap();
    let hits = response_json(&lookup);
    let entity_id = hits["results"][0]["id"].as_str().unwrap().to_string();

    let result = server
        .find_related_concepts(Parameters(FindRelatedConceptsParams { entity_id, limit: Some(5) }))
        .await
        .unwrap();
    let json = response_json(&result);
    assert_field_exists(&json, "results");
}

#[tokio::test]
async fn get_graph_health_reports_totals_after_indexing() {
    let dir = setup_fixture_repo();
    let server = build_server(dir.path().to_path_buf()).await;
    index(&server).await;

    let result = server
        .get_graph_health(Parameters(GetGraphHealthParams { min_entities: Some(1), sample: Some(3) }))
        .await
        .unwrap();
    let json = response_json(&result);
    assert_eq!(json["healthy"], true);
    assert!(json["totals"]["entities"].as_u64().unwrap() >= 2);
}
