//! Error-path tests: tools must reject bad input and unknown entities with
//! a propagated error rather than panicking or silently succeeding.

mod common;

use rmcp::handler::server::wrapper::Parameters;

use codegraph_mcp::tools::{
    AnalyzeCodeImpactParams, AnalyzeHotspotsParams, FindRelatedConceptsParams,
    ListEntityRelationshipsParams, ListFileEntitiesParams, QueryParams,
};

use common::{build_server, response_json, setup_fixture_repo};

#[tokio::test]
async fn list_entity_relationships_errors_for_unknown_entity() {
    let dir = setup_fixture_repo();
    let server = build_server(dir.path().to_path_buf()).await;

    let result = server
        .list_entity_relationships(Parameters(ListEntityRelationshipsParams {
            entity_name: "does_not_exist".to_string(),
            file_path: None,
            depth: Some(1),
            relationship_types: None,
        }))
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn analyze_code_impact_errors_for_unknown_entity() {
    let dir = setup_fixture_repo();
    let server = build_server(dir.path().to_path_buf()).await;

    let result = server
        .analyze_code_impact(Parameters(AnalyzeCodeImpactParams {
            entity_id: "does-not-exist".to_string(),
            depth: Some(1),
        }))
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn find_related_concepts_errors_for_unknown_entity() {
    let dir = setup_fixture_repo();
    let server = build_server(dir.path().to_path_buf()).await;

    let result = server
        .find_related_concepts(Parameters(FindRelatedConceptsParams {
            entity_id: "does-not-exist".to_string(),
            limit: Some(5),
        }))
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn analyze_hotspots_rejects_unknown_metric() {
    let dir = setup_fixture_repo();
    let server = build_server(dir.path().to_path_buf()).await;

    let result = server
        .analyze_hotspots(Parameters(AnalyzeHotspotsParams {
            metric: Some("nonsense".to_string()),
            limit: Some(5),
        }))
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn list_file_entities_returns_empty_for_unindexed_file() {
    let dir = setup_fixture_repo();
    let server = build_server(dir.path().to_path_buf()).await;

    // No index() call has run yet, so the file has no recorded entities.
    let file_path = dir.path().join("lib.rs").to_string_lossy().to_string();
    let result = server
        .list_file_entities(Parameters(ListFileEntitiesParams { file_path, entity_types: None }))
        .await
        .unwrap();
    let json = response_json(&result);
    assert!(json["entities"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn query_with_no_matches_returns_empty_results_not_an_error() {
    let dir = setup_fixture_repo();
    let server = build_server(dir.path().to_path_buf()).await;
    server
        .index(Parameters(codegraph_mcp::tools::IndexParams {
            directory: None,
            incremental: Some(false),
            exclude_patterns: None,
        }))
        .await
        .unwrap();

    let result = server
        .query(Parameters(QueryParams { query: "no_such_symbol_anywhere".to_string(), limit: Some(10) }))
        .await
        .unwrap();
    let json = response_json(&result);
    assert!(json["results"].as_array().unwrap().is_empty());
}
